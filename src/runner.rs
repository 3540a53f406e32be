//! Level-by-level scenario execution.
//!
//! Levels run in order. Inside a level, scenarios run on up to `jobs` scoped
//! worker threads that pull positions from a shared cursor. Skips are decided
//! before a level starts, from outcomes of earlier levels only.
use crate::assert::{check_templates, content_mismatches, missing_files};
use crate::generate::{self, Generator};
use crate::report::{AssertionResult, Outcome, ReportAggregator, RunReport};
use crate::resolve::ResolvedPlan;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct TestRunner {
    jobs: usize,
    templates_root: Option<PathBuf>,
}

impl TestRunner {
    pub fn new(jobs: usize) -> Self {
        TestRunner {
            jobs: jobs.max(1),
            templates_root: None,
        }
    }

    pub fn with_templates_root(mut self, templates_root: Option<PathBuf>) -> Self {
        self.templates_root = templates_root;
        self
    }

    /// Execute every scenario of the plan and assemble the report.
    pub fn run(&self, plan: &ResolvedPlan, generator: &dyn Generator) -> RunReport {
        let scenarios = plan.scenarios();
        let aggregator = ReportAggregator::new(scenarios.len());
        let mut module_passed = vec![true; plan.suite().collections.len()];

        for (level, positions) in plan.levels().iter().enumerate() {
            let mut runnable = Vec::with_capacity(positions.len());
            for &position in positions {
                let planned = &scenarios[position];
                let blocked_by: Vec<String> = planned
                    .dependencies
                    .iter()
                    .filter(|&&dependency| !module_passed[dependency])
                    .map(|&dependency| plan.collection(dependency).module_id.clone())
                    .collect();
                if blocked_by.is_empty() {
                    runnable.push(position);
                    continue;
                }
                let definition = plan.definition(planned);
                tracing::info!(
                    module = plan.module_id(planned),
                    scenario = %definition.name,
                    blocked_by = %blocked_by.join(","),
                    "scenario skipped"
                );
                aggregator.record(
                    position,
                    AssertionResult::skipped(plan.module_id(planned), &definition.name, blocked_by),
                );
            }

            tracing::debug!(
                level,
                runnable = runnable.len(),
                skipped = positions.len() - runnable.len(),
                "level start"
            );
            self.run_level(plan, generator, &aggregator, &runnable);

            for &position in positions {
                if aggregator.outcome(position) != Some(Outcome::Passed) {
                    module_passed[scenarios[position].collection] = false;
                }
            }
        }

        let collections: Vec<_> = plan
            .module_order()
            .into_iter()
            .filter_map(|(module_id, _)| {
                plan.suite()
                    .collections
                    .iter()
                    .find(|collection| collection.module_id == module_id)
            })
            .collect();
        let template_results = check_templates(&collections, self.templates_root.as_deref());
        let report = aggregator.finish(template_results, plan.suite().warnings.clone());
        tracing::info!(
            passed = report.totals.scenarios.passed,
            failed = report.totals.scenarios.failed,
            skipped = report.totals.scenarios.skipped,
            "run complete"
        );
        report
    }

    fn run_level(
        &self,
        plan: &ResolvedPlan,
        generator: &dyn Generator,
        aggregator: &ReportAggregator,
        runnable: &[usize],
    ) {
        let workers = self.jobs.min(runnable.len());
        if workers <= 1 {
            for &position in runnable {
                aggregator.record(position, run_scenario(plan, generator, position));
            }
            return;
        }

        let cursor = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(&position) = runnable.get(next) else {
                        break;
                    };
                    aggregator.record(position, run_scenario(plan, generator, position));
                });
            }
        });
    }
}

fn run_scenario(
    plan: &ResolvedPlan,
    generator: &dyn Generator,
    position: usize,
) -> AssertionResult {
    let planned = &plan.scenarios()[position];
    let module_id = plan.module_id(planned);
    let scenario = plan.definition(planned);
    tracing::debug!(module = module_id, scenario = %scenario.name, "scenario running");

    let result = match generate::invoke(generator, scenario) {
        Ok(generated) => AssertionResult::from_findings(
            module_id,
            &scenario.name,
            missing_files(&scenario.expected_files, &generated.file_tree),
            content_mismatches(&scenario.file_content_checks, &generated.file_tree),
        ),
        Err(err) => AssertionResult::generation_failed(module_id, &scenario.name, err),
    };
    tracing::info!(
        module = module_id,
        scenario = %scenario.name,
        outcome = result.outcome.as_str(),
        "scenario complete"
    );
    result
}
