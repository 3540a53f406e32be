//! Definition-phase error taxonomy.
//!
//! Every variant here is fatal: it means the fixture set cannot be trusted and
//! no scenario may run. Execution-time problems are recorded per scenario in
//! the report instead (see `generate::GenerationError`).
use serde::Serialize;
use std::fmt;

/// A malformed field in a fixture collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Collection label (module id when known, otherwise the source label).
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Field path inside the collection, e.g. `scenarios[2].config.type`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scenario {
            Some(scenario) => write!(
                f,
                "{}: scenario {:?}: {}: {}",
                self.collection, scenario, self.field, self.message
            ),
            None => write!(f, "{}: {}: {}", self.collection, self.field, self.message),
        }
    }
}

/// A scenario dependency naming a module that was never loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownDependencyError {
    pub module_id: String,
    pub scenario: String,
    pub dependency: String,
}

impl fmt::Display for UnknownDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: scenario {:?} depends on unknown module {:?}",
            self.module_id, self.scenario, self.dependency
        )
    }
}

/// A dependency cycle, first module repeated at the end (`a -> b -> a`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CyclicDependencyError {
    pub cycle: Vec<String>,
}

impl fmt::Display for CyclicDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency cycle: {}", self.cycle.join(" -> "))
    }
}

/// Errors that abort a run before any scenario executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Malformed fields, plus any unknown dependency references found in the
    /// same pass.
    Validation {
        errors: Vec<ValidationError>,
        unknown_dependencies: Vec<UnknownDependencyError>,
    },
    UnknownDependency(Vec<UnknownDependencyError>),
    CyclicDependency(CyclicDependencyError),
}

impl HarnessError {
    /// One line per underlying problem, for bulk fixture fixes.
    pub fn lines(&self) -> Vec<String> {
        match self {
            HarnessError::Validation {
                errors,
                unknown_dependencies,
            } => errors
                .iter()
                .map(ToString::to_string)
                .chain(unknown_dependencies.iter().map(ToString::to_string))
                .collect(),
            HarnessError::UnknownDependency(errors) => {
                errors.iter().map(ToString::to_string).collect()
            }
            HarnessError::CyclicDependency(err) => vec![err.to_string()],
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Validation {
                errors,
                unknown_dependencies,
            } => {
                write!(f, "{} scenario definition error(s)", errors.len())?;
                if !unknown_dependencies.is_empty() {
                    write!(
                        f,
                        ", {} unknown dependency reference(s)",
                        unknown_dependencies.len()
                    )?;
                }
                Ok(())
            }
            HarnessError::UnknownDependency(errors) => {
                write!(f, "{} unknown dependency reference(s)", errors.len())
            }
            HarnessError::CyclicDependency(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for HarnessError {}
