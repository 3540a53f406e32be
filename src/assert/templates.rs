use super::missing_substrings;
use crate::report::{Outcome, TemplateResult};
use crate::scenarios::ModuleCollection;
use std::fs;
use std::path::Path;

/// Run every template validation against raw files under `templates_root`.
///
/// Templates are read verbatim; `{{placeholder}}` segments in the template
/// path are part of the file name. Without a root every validation is
/// skipped.
pub fn check_templates(
    collections: &[&ModuleCollection],
    templates_root: Option<&Path>,
) -> Vec<TemplateResult> {
    let mut results = Vec::new();
    for collection in collections {
        for validation in &collection.template_validations {
            let mut result = TemplateResult {
                module_id: collection.module_id.clone(),
                name: validation.name.clone(),
                template: validation.template.clone(),
                outcome: Outcome::Skipped,
                missing_substrings: Vec::new(),
                error: None,
                rationale: validation.rationale.clone(),
            };
            let Some(root) = templates_root else {
                results.push(result);
                continue;
            };
            let path = root.join(&validation.template);
            match fs::read(&path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    result.missing_substrings =
                        missing_substrings(&text, &validation.required_substrings);
                    result.outcome = if result.missing_substrings.is_empty() {
                        Outcome::Passed
                    } else {
                        Outcome::Failed
                    };
                }
                Err(err) => {
                    result.outcome = Outcome::Failed;
                    result.error = Some(format!("read {}: {err}", path.display()));
                }
            }
            tracing::debug!(
                module = %result.module_id,
                template = %result.name,
                outcome = result.outcome.as_str(),
                "template validation"
            );
            results.push(result);
        }
    }
    results
}
