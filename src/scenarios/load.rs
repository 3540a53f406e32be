//! Fixture collection loading.
//!
//! Collections arrive as loosely typed JSON. The loader checks every field of
//! every collection in one pass and either returns the typed, immutable model
//! or the complete list of definition errors.
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::validate::{validate_identifier, validate_relative_path, validate_template_path};
use super::{
    ContentCheck, DefinitionWarning, FieldValue, LoadedSuite, ModuleCollection, ModuleConfig,
    ModuleKind, ScenarioDefinition, TargetStack, TemplateValidation,
};
use crate::error::{HarnessError, ValidationError};
use crate::resolve::unknown_dependencies;

const COLLECTION_KEYS: &[&str] = &["moduleId", "moduleName", "scenarios", "templateValidations"];
const SCENARIO_KEYS: &[&str] = &[
    "name",
    "description",
    "dependencies",
    "config",
    "expectedFiles",
    "fileContentChecks",
];
const CONFIG_KEYS: &[&str] = &[
    "moduleId",
    "kind",
    "type",
    "targets",
    "providers",
    "enabled",
    "fieldValues",
];
const CONTENT_CHECK_KEYS: &[&str] = &["file", "contains"];
const TEMPLATE_VALIDATION_KEYS: &[&str] = &["name", "template", "contains", "reason"];

/// One raw collection document and where it came from.
#[derive(Debug, Clone)]
pub struct CollectionSource {
    pub label: String,
    pub document: Value,
}

/// Read collection files from disk. A file may hold one collection object or
/// an array of them.
pub fn read_collection_sources(paths: &[PathBuf]) -> Result<Vec<CollectionSource>> {
    let mut sources = Vec::new();
    for path in paths {
        sources.extend(read_collection_file(path)?);
    }
    Ok(sources)
}

fn read_collection_file(path: &Path) -> Result<Vec<CollectionSource>> {
    let bytes = fs::read(path).with_context(|| format!("read collection {}", path.display()))?;
    let document: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse collection JSON {}", path.display()))?;
    let label = path.display().to_string();
    Ok(match document {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, document)| CollectionSource {
                label: format!("{label}[{idx}]"),
                document,
            })
            .collect(),
        document => vec![CollectionSource { label, document }],
    })
}

/// Validate raw collections and build the typed suite.
pub fn load_suite(sources: &[CollectionSource]) -> Result<LoadedSuite, HarnessError> {
    let mut loader = Loader::default();
    let mut collections = Vec::new();
    let mut labels_by_module: BTreeMap<String, String> = BTreeMap::new();

    for source in sources {
        let Some(collection) = loader.collection(source) else {
            continue;
        };
        if let Some(first) = labels_by_module.get(&collection.module_id) {
            loader.errors.push(ValidationError {
                collection: source.label.clone(),
                scenario: None,
                field: "moduleId".to_string(),
                message: format!(
                    "duplicate module id {:?} (already defined by {first})",
                    collection.module_id
                ),
            });
            continue;
        }
        labels_by_module.insert(collection.module_id.clone(), source.label.clone());
        collections.push(collection);
    }

    if !loader.errors.is_empty() {
        // Module ids count as known even when their collection failed to load.
        let known: BTreeSet<&str> = sources
            .iter()
            .filter_map(|source| source.document.get("moduleId").and_then(Value::as_str))
            .collect();
        return Err(HarnessError::Validation {
            unknown_dependencies: unknown_dependencies(&collections, &known),
            errors: loader.errors,
        });
    }
    for warning in &loader.warnings {
        tracing::warn!(
            module = %warning.module_id,
            scenario = %warning.scenario,
            "{}",
            warning.message
        );
    }
    let suite = LoadedSuite {
        collections,
        warnings: loader.warnings,
    };
    tracing::debug!(
        collections = suite.collections.len(),
        scenarios = suite.scenario_count(),
        warnings = suite.warnings.len(),
        "loaded scenario collections"
    );
    Ok(suite)
}

#[derive(Clone, Copy)]
struct Scope<'a> {
    collection: &'a str,
    scenario: Option<&'a str>,
}

#[derive(Default)]
struct Loader {
    errors: Vec<ValidationError>,
    warnings: Vec<DefinitionWarning>,
}

impl Loader {
    fn push(&mut self, scope: Scope<'_>, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            collection: scope.collection.to_string(),
            scenario: scope.scenario.map(str::to_string),
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn collection(&mut self, source: &CollectionSource) -> Option<ModuleCollection> {
        let Some(object) = source.document.as_object() else {
            let scope = Scope {
                collection: &source.label,
                scenario: None,
            };
            self.push(scope, "$", "collection must be a JSON object");
            return None;
        };
        let label_scope = Scope {
            collection: &source.label,
            scenario: None,
        };
        let module_id = self.required_identifier(label_scope, object, "moduleId", "moduleId");
        let label = module_id.clone().unwrap_or_else(|| source.label.clone());
        let scope = Scope {
            collection: &label,
            scenario: None,
        };
        self.unknown_keys(scope, object, COLLECTION_KEYS, "");
        let module_name = self.optional_string(scope, object, "moduleName", "moduleName");

        let mut scenarios = Vec::new();
        match object.get("scenarios") {
            None => self.push(scope, "scenarios", "required field is missing"),
            Some(Value::Array(items)) if items.is_empty() => {
                self.push(scope, "scenarios", "must contain at least one scenario")
            }
            Some(Value::Array(items)) => {
                let mut seen = BTreeSet::new();
                for (idx, item) in items.iter().enumerate() {
                    let prefix = format!("scenarios[{idx}]");
                    let Some(scenario) = self.scenario(&label, item, &prefix) else {
                        continue;
                    };
                    if !seen.insert(scenario.name.clone()) {
                        let scope = Scope {
                            collection: &label,
                            scenario: Some(&scenario.name),
                        };
                        self.push(
                            scope,
                            &format!("{prefix}.name"),
                            "duplicate scenario name within module",
                        );
                        continue;
                    }
                    scenarios.push(scenario);
                }
            }
            Some(_) => self.push(scope, "scenarios", "must be an array"),
        }

        let template_validations = self.template_validations(scope, object);

        Some(ModuleCollection {
            module_id: module_id?,
            module_name,
            scenarios,
            template_validations,
        })
    }

    fn scenario(
        &mut self,
        collection: &str,
        value: &Value,
        prefix: &str,
    ) -> Option<ScenarioDefinition> {
        let Some(object) = value.as_object() else {
            let scope = Scope {
                collection,
                scenario: None,
            };
            self.push(scope, prefix, "scenario must be a JSON object");
            return None;
        };
        let unnamed = Scope {
            collection,
            scenario: None,
        };
        let name = self.required_identifier(unnamed, object, "name", &format!("{prefix}.name"));
        let scope = Scope {
            collection,
            scenario: name.as_deref(),
        };
        self.unknown_keys(scope, object, SCENARIO_KEYS, prefix);

        let description = self
            .optional_string(scope, object, "description", &format!("{prefix}.description"))
            .unwrap_or_default();
        let dependencies: Vec<String> = self
            .string_set(
                scope,
                object.get("dependencies"),
                &format!("{prefix}.dependencies"),
                false,
            )
            .into_iter()
            .map(|(_, dependency)| dependency)
            .collect();
        let module_config = match object.get("config") {
            None => {
                self.push(scope, &format!("{prefix}.config"), "required field is missing");
                None
            }
            Some(Value::Object(config)) => {
                self.module_config(scope, config, &format!("{prefix}.config"))
            }
            Some(_) => {
                self.push(scope, &format!("{prefix}.config"), "must be a JSON object");
                None
            }
        };

        let expected_files = self.path_set(
            scope,
            object.get("expectedFiles"),
            &format!("{prefix}.expectedFiles"),
        );
        let file_content_checks = self.content_checks(
            scope,
            object.get("fileContentChecks"),
            &format!("{prefix}.fileContentChecks"),
        );

        let name = name?;
        let module_config = module_config?;
        let module_id = collection.to_string();
        if expected_files.is_empty() && file_content_checks.is_empty() {
            self.warnings.push(DefinitionWarning {
                module_id: module_id.clone(),
                scenario: name.clone(),
                message: "scenario declares no expected files and no content checks".to_string(),
            });
        }
        for check in &file_content_checks {
            if !expected_files.contains(&check.file) {
                self.warnings.push(DefinitionWarning {
                    module_id: module_id.clone(),
                    scenario: name.clone(),
                    message: format!(
                        "content check on {} which is not listed in expectedFiles; it only runs if the generator happens to emit the file",
                        check.file
                    ),
                });
            }
        }

        Some(ScenarioDefinition {
            name,
            description,
            module_config,
            dependencies,
            expected_files,
            file_content_checks,
        })
    }

    fn module_config(
        &mut self,
        scope: Scope<'_>,
        object: &Map<String, Value>,
        prefix: &str,
    ) -> Option<ModuleConfig> {
        self.unknown_keys(scope, object, CONFIG_KEYS, prefix);
        let module_id =
            self.required_identifier(scope, object, "moduleId", &format!("{prefix}.moduleId"));
        let generator_type = self.required_string(scope, object, "type", &format!("{prefix}.type"));
        let kind = self
            .optional_string(scope, object, "kind", &format!("{prefix}.kind"))
            .map(|raw| ModuleKind::parse(&raw))
            .unwrap_or(ModuleKind::Extension);
        let enabled = match object.get("enabled") {
            None => true,
            Some(Value::Bool(enabled)) => *enabled,
            Some(_) => {
                self.push(scope, &format!("{prefix}.enabled"), "must be a boolean");
                true
            }
        };

        let targets_key = match (object.get("targets"), object.get("providers")) {
            (Some(_), Some(_)) => {
                self.push(
                    scope,
                    &format!("{prefix}.providers"),
                    "use only one of targets or providers",
                );
                "targets"
            }
            (None, Some(_)) => "providers",
            _ => "targets",
        };
        let targets_field = format!("{prefix}.{targets_key}");
        let mut targets = BTreeSet::new();
        for (idx, raw) in self.string_set(scope, object.get(targets_key), &targets_field, false) {
            match TargetStack::parse(&raw) {
                Some(target) => {
                    targets.insert(target);
                }
                None => {
                    let known: Vec<&str> =
                        TargetStack::ALL.iter().map(TargetStack::as_str).collect();
                    self.push(
                        scope,
                        &format!("{targets_field}[{idx}]"),
                        format!("unknown target {raw:?} (expected one of {})", known.join(", ")),
                    );
                }
            }
        }

        let mut field_values = BTreeMap::new();
        match object.get("fieldValues") {
            None => {}
            Some(Value::Object(values)) => {
                for (key, value) in values {
                    let field = format!("{prefix}.fieldValues.{key}");
                    let scalar = match value {
                        Value::String(text) => FieldValue::String(text.clone()),
                        Value::Bool(flag) => FieldValue::Bool(*flag),
                        Value::Number(number) => FieldValue::Number(number.clone()),
                        _ => {
                            self.push(scope, &field, "must be a string, boolean, or number");
                            continue;
                        }
                    };
                    field_values.insert(key.clone(), scalar);
                }
            }
            Some(_) => self.push(scope, &format!("{prefix}.fieldValues"), "must be a JSON object"),
        }

        Some(ModuleConfig {
            module_id: module_id?,
            kind,
            generator_type: generator_type?,
            targets,
            enabled,
            field_values,
        })
    }

    fn content_checks(
        &mut self,
        scope: Scope<'_>,
        value: Option<&Value>,
        prefix: &str,
    ) -> Vec<ContentCheck> {
        let items = match value {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push(scope, prefix, "must be an array");
                return Vec::new();
            }
        };
        let mut checks = Vec::new();
        let mut seen = BTreeSet::new();
        for (idx, item) in items.iter().enumerate() {
            let field = format!("{prefix}[{idx}]");
            let Some(object) = item.as_object() else {
                self.push(scope, &field, "content check must be a JSON object");
                continue;
            };
            self.unknown_keys(scope, object, CONTENT_CHECK_KEYS, &field);
            let file = self.required_path(scope, object, "file", &format!("{field}.file"));
            let contains =
                self.substrings(scope, object.get("contains"), &format!("{field}.contains"));
            let Some(file) = file else {
                continue;
            };
            if !seen.insert(file.clone()) {
                self.push(
                    scope,
                    &format!("{field}.file"),
                    format!("duplicate content check for {file}"),
                );
                continue;
            }
            if let Some(contains) = contains {
                checks.push(ContentCheck { file, contains });
            }
        }
        checks
    }

    fn template_validations(
        &mut self,
        scope: Scope<'_>,
        object: &Map<String, Value>,
    ) -> Vec<TemplateValidation> {
        let items = match object.get("templateValidations") {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push(scope, "templateValidations", "must be an array");
                return Vec::new();
            }
        };
        let mut validations = Vec::new();
        let mut seen = BTreeSet::new();
        for (idx, item) in items.iter().enumerate() {
            let field = format!("templateValidations[{idx}]");
            let Some(entry) = item.as_object() else {
                self.push(scope, &field, "template validation must be a JSON object");
                continue;
            };
            self.unknown_keys(scope, entry, TEMPLATE_VALIDATION_KEYS, &field);
            let name = self.required_identifier(scope, entry, "name", &format!("{field}.name"));
            let template =
                self.required_string(scope, entry, "template", &format!("{field}.template"));
            let template = template.and_then(|template| match validate_template_path(&template) {
                Ok(()) => Some(template),
                Err(err) => {
                    self.push(scope, &format!("{field}.template"), err.to_string());
                    None
                }
            });
            let required =
                self.substrings(scope, entry.get("contains"), &format!("{field}.contains"));
            let rationale = self
                .optional_string(scope, entry, "reason", &format!("{field}.reason"))
                .unwrap_or_default();
            let (Some(name), Some(template), Some(required_substrings)) = (name, template, required)
            else {
                continue;
            };
            if !seen.insert(name.clone()) {
                self.push(
                    scope,
                    &format!("{field}.name"),
                    "duplicate template validation name within module",
                );
                continue;
            }
            validations.push(TemplateValidation {
                name,
                template,
                required_substrings,
                rationale,
            });
        }
        validations
    }

    /// Non-empty list of distinct, non-empty literal substrings.
    fn substrings(
        &mut self,
        scope: Scope<'_>,
        value: Option<&Value>,
        field: &str,
    ) -> Option<Vec<String>> {
        if value.is_none() {
            self.push(scope, field, "required field is missing");
            return None;
        }
        let errors_before = self.errors.len();
        let entries = self.string_set(scope, value, field, true);
        if self.errors.len() != errors_before {
            return None;
        }
        if entries.is_empty() {
            self.push(scope, field, "must list at least one substring");
            return None;
        }
        Some(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    fn path_set(&mut self, scope: Scope<'_>, value: Option<&Value>, field: &str) -> Vec<String> {
        let mut paths = Vec::new();
        for (idx, path) in self.string_set(scope, value, field, false) {
            match validate_relative_path(&path) {
                Ok(()) => paths.push(path),
                Err(err) => self.push(scope, &format!("{field}[{idx}]"), err.to_string()),
            }
        }
        paths
    }

    /// Array of distinct non-empty strings, returned with their indexes.
    /// Whitespace is preserved when `verbatim` is set (literal substrings).
    fn string_set(
        &mut self,
        scope: Scope<'_>,
        value: Option<&Value>,
        field: &str,
        verbatim: bool,
    ) -> Vec<(usize, String)> {
        let items = match value {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push(scope, field, "must be an array of strings");
                return Vec::new();
            }
        };
        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            let entry_field = format!("{field}[{idx}]");
            let Some(text) = item.as_str() else {
                self.push(scope, &entry_field, "must be a string");
                continue;
            };
            let empty = if verbatim {
                text.is_empty()
            } else {
                text.trim().is_empty()
            };
            if empty {
                self.push(scope, &entry_field, "must not be empty");
                continue;
            }
            if !seen.insert(text) {
                self.push(scope, &entry_field, format!("duplicate entry {text:?}"));
                continue;
            }
            entries.push((idx, text.to_string()));
        }
        entries
    }

    fn required_string(
        &mut self,
        scope: Scope<'_>,
        object: &Map<String, Value>,
        key: &str,
        field: &str,
    ) -> Option<String> {
        match object.get(key) {
            None | Some(Value::Null) => {
                self.push(scope, field, "required field is missing");
                None
            }
            Some(Value::String(text)) if text.trim().is_empty() => {
                self.push(scope, field, "must not be empty");
                None
            }
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => {
                self.push(scope, field, "must be a string");
                None
            }
        }
    }

    fn required_identifier(
        &mut self,
        scope: Scope<'_>,
        object: &Map<String, Value>,
        key: &str,
        field: &str,
    ) -> Option<String> {
        let text = self.required_string(scope, object, key, field)?;
        if let Err(err) = validate_identifier(&text) {
            self.push(scope, field, err.to_string());
            return None;
        }
        Some(text)
    }

    fn required_path(
        &mut self,
        scope: Scope<'_>,
        object: &Map<String, Value>,
        key: &str,
        field: &str,
    ) -> Option<String> {
        let text = self.required_string(scope, object, key, field)?;
        if let Err(err) = validate_relative_path(&text) {
            self.push(scope, field, err.to_string());
            return None;
        }
        Some(text)
    }

    fn optional_string(
        &mut self,
        scope: Scope<'_>,
        object: &Map<String, Value>,
        key: &str,
        field: &str,
    ) -> Option<String> {
        match object.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => {
                self.push(scope, field, "must be a string");
                None
            }
        }
    }

    fn unknown_keys(
        &mut self,
        scope: Scope<'_>,
        object: &Map<String, Value>,
        allowed: &[&str],
        prefix: &str,
    ) {
        for key in object.keys() {
            if allowed.contains(&key.as_str()) {
                continue;
            }
            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            self.push(scope, &field, "unknown field");
        }
    }
}
