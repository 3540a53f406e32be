//! Run report: per-scenario results, template results, and totals.
use crate::generate::GenerationError;
use crate::scenarios::DefinitionWarning;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
        }
    }
}

/// Verdict for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    pub module_id: String,
    pub scenario_name: String,
    pub outcome: Outcome,
    pub missing_files: Vec<String>,
    pub content_mismatches: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<GenerationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_because: Vec<String>,
}

impl AssertionResult {
    /// Result from assertion findings; passes iff both are empty.
    pub fn from_findings(
        module_id: &str,
        scenario_name: &str,
        missing_files: Vec<String>,
        content_mismatches: BTreeMap<String, Vec<String>>,
    ) -> Self {
        let outcome = if missing_files.is_empty() && content_mismatches.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Failed
        };
        AssertionResult {
            module_id: module_id.to_string(),
            scenario_name: scenario_name.to_string(),
            outcome,
            missing_files,
            content_mismatches,
            generation_error: None,
            skipped_because: Vec::new(),
        }
    }

    pub fn generation_failed(module_id: &str, scenario_name: &str, error: GenerationError) -> Self {
        AssertionResult {
            module_id: module_id.to_string(),
            scenario_name: scenario_name.to_string(),
            outcome: Outcome::Failed,
            missing_files: Vec::new(),
            content_mismatches: BTreeMap::new(),
            generation_error: Some(error),
            skipped_because: Vec::new(),
        }
    }

    pub fn skipped(module_id: &str, scenario_name: &str, blocked_by: Vec<String>) -> Self {
        AssertionResult {
            module_id: module_id.to_string(),
            scenario_name: scenario_name.to_string(),
            outcome: Outcome::Skipped,
            missing_files: Vec::new(),
            content_mismatches: BTreeMap::new(),
            generation_error: None,
            skipped_because: blocked_by,
        }
    }
}

/// Verdict for one template validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateResult {
    pub module_id: String,
    pub name: String,
    pub template: String,
    pub outcome: Outcome,
    pub missing_substrings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl OutcomeCounts {
    fn from_outcomes(outcomes: impl Iterator<Item = Outcome>) -> Self {
        let mut counts = OutcomeCounts::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Passed => counts.passed += 1,
                Outcome::Failed => counts.failed += 1,
                Outcome::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub scenarios: OutcomeCounts,
    pub templates: OutcomeCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub results: Vec<AssertionResult>,
    pub template_results: Vec<TemplateResult>,
    pub warnings: Vec<DefinitionWarning>,
    pub totals: Totals,
}

impl RunReport {
    pub fn new(
        results: Vec<AssertionResult>,
        template_results: Vec<TemplateResult>,
        warnings: Vec<DefinitionWarning>,
    ) -> Self {
        let totals = Totals {
            scenarios: OutcomeCounts::from_outcomes(results.iter().map(|result| result.outcome)),
            templates: OutcomeCounts::from_outcomes(
                template_results.iter().map(|result| result.outcome),
            ),
        };
        RunReport {
            schema_version: REPORT_SCHEMA_VERSION,
            results,
            template_results,
            warnings,
            totals,
        }
    }

    /// True iff every scenario passed and no template validation failed.
    pub fn success(&self) -> bool {
        self.totals.scenarios.failed == 0
            && self.totals.scenarios.skipped == 0
            && self.totals.templates.failed == 0
    }
}

/// Collects scenario results from concurrent workers.
///
/// Each resolved position is written at most once; `finish` emits results in
/// resolved order regardless of completion order.
#[derive(Debug)]
pub struct ReportAggregator {
    slots: Mutex<Vec<Option<AssertionResult>>>,
}

impl ReportAggregator {
    pub fn new(scenario_count: usize) -> Self {
        ReportAggregator {
            slots: Mutex::new(vec![None; scenario_count]),
        }
    }

    pub fn record(&self, position: usize, result: AssertionResult) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(position) {
            if slot.is_some() {
                tracing::warn!(position, "scenario result recorded twice; keeping first");
                return;
            }
            *slot = Some(result);
        }
    }

    pub fn outcome(&self, position: usize) -> Option<Outcome> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(position)
            .and_then(|slot| slot.as_ref().map(|result| result.outcome))
    }

    pub fn finish(
        self,
        template_results: Vec<TemplateResult>,
        warnings: Vec<DefinitionWarning>,
    ) -> RunReport {
        let slots = self
            .slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut results = Vec::with_capacity(slots.len());
        for (position, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(result) => results.push(result),
                None => tracing::warn!(position, "scenario result missing from report"),
            }
        }
        RunReport::new(results, template_results, warnings)
    }
}

/// Human-readable report summary.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    let scenarios = report.totals.scenarios;
    out.push_str(&format!(
        "scenarios: {} passed, {} failed, {} skipped ({} total)\n",
        scenarios.passed,
        scenarios.failed,
        scenarios.skipped,
        scenarios.total()
    ));
    let templates = report.totals.templates;
    if templates.total() > 0 {
        out.push_str(&format!(
            "templates: {} passed, {} failed, {} skipped\n",
            templates.passed, templates.failed, templates.skipped
        ));
    }

    for result in &report.results {
        match result.outcome {
            Outcome::Passed => {}
            Outcome::Failed => {
                out.push_str(&format!(
                    "FAIL {}/{}\n",
                    result.module_id, result.scenario_name
                ));
                if let Some(error) = &result.generation_error {
                    out.push_str(&format!("  generation error: {error}\n"));
                }
                for path in &result.missing_files {
                    out.push_str(&format!("  missing file: {path}\n"));
                }
                for (path, missing) in &result.content_mismatches {
                    for needle in missing {
                        out.push_str(&format!("  {path}: missing {needle:?}\n"));
                    }
                }
            }
            Outcome::Skipped => {
                out.push_str(&format!(
                    "SKIP {}/{} (dependency not passed: {})\n",
                    result.module_id,
                    result.scenario_name,
                    result.skipped_because.join(", ")
                ));
            }
        }
    }

    for result in &report.template_results {
        if result.outcome != Outcome::Failed {
            continue;
        }
        out.push_str(&format!(
            "FAIL template {}/{} ({})\n",
            result.module_id, result.name, result.template
        ));
        if let Some(error) = &result.error {
            out.push_str(&format!("  {error}\n"));
        }
        for needle in &result.missing_substrings {
            out.push_str(&format!("  missing {needle:?}\n"));
        }
        if !result.rationale.is_empty() {
            out.push_str(&format!("  why: {}\n", result.rationale));
        }
    }

    for warning in &report.warnings {
        out.push_str(&format!(
            "warning: {}/{}: {}\n",
            warning.module_id, warning.scenario, warning.message
        ));
    }
    out
}
