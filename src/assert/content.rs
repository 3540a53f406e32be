use super::missing_substrings;
use crate::generate::FileTree;
use crate::scenarios::ContentCheck;
use std::collections::BTreeMap;

/// Missing substrings per checked file.
///
/// Checks whose file is absent from the tree are skipped; the file engine
/// already reports the absence. Files with every substring present are
/// omitted from the result.
pub fn content_mismatches(
    checks: &[ContentCheck],
    tree: &FileTree,
) -> BTreeMap<String, Vec<String>> {
    let mut mismatches = BTreeMap::new();
    for check in checks {
        let Some(content) = tree.get(&check.file) else {
            continue;
        };
        let missing = missing_substrings(content, &check.contains);
        if !missing.is_empty() {
            mismatches.insert(check.file.clone(), missing);
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(file: &str, contains: &[&str]) -> ContentCheck {
        ContentCheck {
            file: file.to_string(),
            contains: contains.iter().map(|needle| needle.to_string()).collect(),
        }
    }

    fn tree(entries: &[(&str, &str)]) -> FileTree {
        entries
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect()
    }

    #[test]
    fn claim_key_line_must_match_exactly() {
        let yaml = "backend/src/main/resources/application-auth0.yaml";
        let needle = "tenant-claim-key: https://myapp.com/tenant_id";
        let checks = [check(yaml, &[needle])];

        let written = tree(&[(yaml, "auth0:\n  tenant-claim-key: https://myapp.com/tenant_id\n")]);
        assert!(content_mismatches(&checks, &written).is_empty());

        let quoted = tree(&[(
            yaml,
            "auth0:\n  tenant-claim-key: \"https://myapp.com/tenant_id\"\n",
        )]);
        assert_eq!(content_mismatches(&checks, &quoted)[yaml], vec![needle.to_string()]);

        let empty = tree(&[(yaml, "auth0:\n  tenant-claim-key:\n")]);
        let mismatches = content_mismatches(&checks, &empty);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[yaml], vec![needle.to_string()]);
    }

    #[test]
    fn empty_tenant_claim_yields_null_assignment() {
        let checks = [check(
            "backend/src/main/java/com/example/auth/JwtAuthConverter.java",
            &["String tenantId = null"],
        )];
        let generated = tree(&[(
            "backend/src/main/java/com/example/auth/JwtAuthConverter.java",
            "class JwtAuthConverter {\n    String tenantId = null;\n}\n",
        )]);
        assert!(content_mismatches(&checks, &generated).is_empty());

        let claim_lookup = tree(&[(
            "backend/src/main/java/com/example/auth/JwtAuthConverter.java",
            "String tenantId = jwt.getClaimAsString(\"tenant\");\n",
        )]);
        assert_eq!(content_mismatches(&checks, &claim_lookup).len(), 1);
    }

    #[test]
    fn containment_is_case_sensitive() {
        let checks = [check("frontend/.env", &["VITE_AUTH0_DOMAIN"])];
        let generated = tree(&[("frontend/.env", "vite_auth0_domain=example\n")]);
        assert_eq!(
            content_mismatches(&checks, &generated)["frontend/.env"],
            vec!["VITE_AUTH0_DOMAIN".to_string()]
        );
    }

    #[test]
    fn absent_files_are_skipped_and_only_misses_kept() {
        let checks = [
            check("missing.txt", &["anything"]),
            check("a.txt", &["alpha", "beta", "gamma"]),
            check("b.txt", &["ok"]),
        ];
        let generated = tree(&[("a.txt", "gamma alpha"), ("b.txt", "ok")]);
        let mismatches = content_mismatches(&checks, &generated);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches["a.txt"], vec!["beta".to_string()]);
    }
}
