//! Typed model for fixture collections.
//!
//! Everything here is built once by the loader and is immutable for the run;
//! untyped JSON never flows past `scenarios::load`.
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Module classification from `config.kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    Extension,
    Other(String),
}

impl ModuleKind {
    pub fn parse(raw: &str) -> ModuleKind {
        match raw {
            "extension" => ModuleKind::Extension,
            other => ModuleKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModuleKind::Extension => "extension",
            ModuleKind::Other(kind) => kind,
        }
    }
}

// Serialized as the bare tag so generators see the fixture value verbatim.
impl Serialize for ModuleKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Layer a target stack belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLayer {
    Backend,
    Frontend,
    Deployment,
}

/// Closed vocabulary of stacks the generator can emit code for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStack {
    Spring,
    Drf,
    React,
    #[serde(rename = "digitalocean")]
    DigitalOcean,
}

impl TargetStack {
    pub const ALL: [TargetStack; 4] = [
        TargetStack::Spring,
        TargetStack::Drf,
        TargetStack::React,
        TargetStack::DigitalOcean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStack::Spring => "spring",
            TargetStack::Drf => "drf",
            TargetStack::React => "react",
            TargetStack::DigitalOcean => "digitalocean",
        }
    }

    pub fn parse(raw: &str) -> Option<TargetStack> {
        TargetStack::ALL
            .into_iter()
            .find(|target| target.as_str() == raw)
    }

    pub fn layer(&self) -> TargetLayer {
        match self {
            TargetStack::Spring | TargetStack::Drf => TargetLayer::Backend,
            TargetStack::React => TargetLayer::Frontend,
            TargetStack::DigitalOcean => TargetLayer::Deployment,
        }
    }
}

/// Opaque scalar handed to the generator untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

/// Generator input for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    pub module_id: String,
    pub kind: ModuleKind,
    #[serde(rename = "type")]
    pub generator_type: String,
    pub targets: BTreeSet<TargetStack>,
    pub enabled: bool,
    pub field_values: BTreeMap<String, FieldValue>,
}

impl ModuleConfig {
    pub fn layers(&self) -> BTreeSet<TargetLayer> {
        self.targets.iter().map(TargetStack::layer).collect()
    }
}

/// Literal substrings that must appear in one generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentCheck {
    pub file: String,
    pub contains: Vec<String>,
}

/// One named acceptance case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub description: String,
    pub module_config: ModuleConfig,
    pub dependencies: Vec<String>,
    pub expected_files: Vec<String>,
    pub file_content_checks: Vec<ContentCheck>,
}

/// Literal checks against a raw (unrendered) generator template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateValidation {
    pub name: String,
    pub template: String,
    pub required_substrings: Vec<String>,
    pub rationale: String,
}

/// One fixture file: a module and its scenarios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleCollection {
    pub module_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    pub scenarios: Vec<ScenarioDefinition>,
    pub template_validations: Vec<TemplateValidation>,
}

/// Non-fatal definition issue worth surfacing in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionWarning {
    pub module_id: String,
    pub scenario: String,
    pub message: String,
}

/// Output of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSuite {
    pub collections: Vec<ModuleCollection>,
    pub warnings: Vec<DefinitionWarning>,
}

impl LoadedSuite {
    pub fn scenario_count(&self) -> usize {
        self.collections
            .iter()
            .map(|collection| collection.scenarios.len())
            .sum()
    }
}
