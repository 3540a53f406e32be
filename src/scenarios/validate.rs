use anyhow::{anyhow, Result};
use regex::Regex;
use std::path::{Component, Path};
use std::sync::OnceLock;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("identifier regex"))
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder regex"))
}

fn placeholder_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("placeholder name regex"))
}

/// Module ids and scenario names end up in report keys and log lines.
pub(crate) fn validate_identifier(raw: &str) -> Result<()> {
    if !identifier_regex().is_match(raw) {
        return Err(anyhow!(
            "must start with an ASCII letter or digit and contain only letters, digits, '.', '_' or '-' (got {raw:?})"
        ));
    }
    Ok(())
}

/// Paths are compared verbatim against generator output keys, so only the
/// canonical `a/b/c` spelling is accepted.
pub(crate) fn validate_relative_path(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(anyhow!("path must not be empty"));
    }
    if raw.trim() != raw {
        return Err(anyhow!("path must not have surrounding whitespace"));
    }
    if raw.contains('\\') {
        return Err(anyhow!("path must use '/' separators"));
    }
    if raw.ends_with('/') {
        return Err(anyhow!("path must name a file, not a directory"));
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        return Err(anyhow!("path must be relative"));
    }
    for segment in raw.split('/') {
        if segment.is_empty() {
            return Err(anyhow!("path must not contain empty segments"));
        }
        if segment == "." {
            return Err(anyhow!("path must not contain '.' segments"));
        }
    }
    if path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(anyhow!("path must not contain '..'"));
    }
    Ok(())
}

/// Template paths keep `{{name}}` segments literally; they only need to be
/// well formed.
pub(crate) fn validate_template_path(raw: &str) -> Result<()> {
    validate_relative_path(raw)?;
    for capture in placeholder_regex().captures_iter(raw) {
        let name = &capture[1];
        if !placeholder_name_regex().is_match(name) {
            return Err(anyhow!("malformed template placeholder {{{{{name}}}}}"));
        }
    }
    let stripped = placeholder_regex().replace_all(raw, "");
    if stripped.contains("{{") || stripped.contains("}}") {
        return Err(anyhow!("unbalanced template placeholder braces"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_reject_separators_and_spaces() {
        assert!(validate_identifier("auth0-spring-no-tenant").is_ok());
        assert!(validate_identifier("extension.rbac_v2").is_ok());
        assert!(validate_identifier("-leading").is_err());
        assert!(validate_identifier("has space").is_err());
        assert!(validate_identifier("a/b").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn relative_paths_must_be_canonical() {
        assert!(validate_relative_path("frontend/.env").is_ok());
        assert!(
            validate_relative_path("backend/src/main/resources/application-auth0.yaml").is_ok()
        );
        assert!(validate_relative_path("").is_err());
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("../outside.txt").is_err());
        assert!(validate_relative_path("./frontend/.env").is_err());
        assert!(validate_relative_path("frontend//.env").is_err());
        assert!(validate_relative_path("frontend/").is_err());
        assert!(validate_relative_path("frontend\\src\\App.tsx").is_err());
        assert!(validate_relative_path(" frontend/.env").is_err());
    }

    #[test]
    fn template_paths_allow_well_formed_placeholders() {
        assert!(validate_template_path(
            "extension-auth0/code-spring/src/main/java/{{packagePath}}/config/CorsConfig.java.mustache"
        )
        .is_ok());
        assert!(validate_template_path("code/{{package path}}/A.java").is_err());
        assert!(validate_template_path("code/{{packagePath}/A.java").is_err());
        assert!(validate_template_path("code/packagePath}}/A.java").is_err());
    }
}
