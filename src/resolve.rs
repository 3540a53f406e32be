//! Dependency resolution between fixture modules.
//!
//! Modules (fixture collections) form a graph through their scenarios'
//! `dependencies`. Resolution rejects unknown references and cycles, assigns
//! each module a level, and orders scenarios by level with declaration order
//! preserved inside a level.
use crate::error::{CyclicDependencyError, HarnessError, UnknownDependencyError};
use crate::scenarios::{LoadedSuite, ModuleCollection, ScenarioDefinition};
use std::collections::{BTreeMap, BTreeSet};

/// A scenario's place in the resolved plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedScenario {
    pub collection: usize,
    pub scenario: usize,
    pub level: usize,
    /// Collection indexes of the scenario's own declared dependencies.
    pub dependencies: Vec<usize>,
}

/// Suite plus a dependency-respecting execution order.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    suite: LoadedSuite,
    module_levels: Vec<usize>,
    module_order: Vec<usize>,
    scenarios: Vec<PlannedScenario>,
    levels: Vec<Vec<usize>>,
}

impl ResolvedPlan {
    pub fn suite(&self) -> &LoadedSuite {
        &self.suite
    }

    pub fn collection(&self, index: usize) -> &ModuleCollection {
        &self.suite.collections[index]
    }

    /// Scenarios in resolved execution order.
    pub fn scenarios(&self) -> &[PlannedScenario] {
        &self.scenarios
    }

    pub fn definition(&self, planned: &PlannedScenario) -> &ScenarioDefinition {
        &self.suite.collections[planned.collection].scenarios[planned.scenario]
    }

    pub fn module_id(&self, planned: &PlannedScenario) -> &str {
        &self.suite.collections[planned.collection].module_id
    }

    /// Positions into `scenarios()`, grouped by level.
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Module ids in resolved order with their levels.
    pub fn module_order(&self) -> Vec<(&str, usize)> {
        self.module_order
            .iter()
            .map(|&idx| {
                (
                    self.suite.collections[idx].module_id.as_str(),
                    self.module_levels[idx],
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Every scenario dependency that names none of the `known` module ids, in
/// declaration order.
pub fn unknown_dependencies(
    collections: &[ModuleCollection],
    known: &BTreeSet<&str>,
) -> Vec<UnknownDependencyError> {
    let mut unknown = Vec::new();
    for collection in collections {
        for scenario in &collection.scenarios {
            for dependency in &scenario.dependencies {
                if !known.contains(dependency.as_str()) {
                    unknown.push(UnknownDependencyError {
                        module_id: collection.module_id.clone(),
                        scenario: scenario.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
    }
    unknown
}

/// Resolve the suite into an execution plan.
pub fn resolve(suite: LoadedSuite) -> Result<ResolvedPlan, HarnessError> {
    let index: BTreeMap<&str, usize> = suite
        .collections
        .iter()
        .enumerate()
        .map(|(idx, collection)| (collection.module_id.as_str(), idx))
        .collect();

    let known: BTreeSet<&str> = index.keys().copied().collect();
    let unknown = unknown_dependencies(&suite.collections, &known);
    if !unknown.is_empty() {
        return Err(HarnessError::UnknownDependency(unknown));
    }

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); suite.collections.len()];
    for (module_idx, collection) in suite.collections.iter().enumerate() {
        for scenario in &collection.scenarios {
            for dependency in &scenario.dependencies {
                let Some(&target) = index.get(dependency.as_str()) else {
                    continue;
                };
                if !edges[module_idx].contains(&target) {
                    edges[module_idx].push(target);
                }
            }
        }
    }

    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut path = Vec::new();
    let mut module_levels = vec![0; edges.len()];
    for module_idx in 0..edges.len() {
        visit(module_idx, &edges, &mut marks, &mut path, &mut module_levels).map_err(
            |cycle| {
                HarnessError::CyclicDependency(CyclicDependencyError {
                    cycle: cycle
                        .into_iter()
                        .map(|idx| suite.collections[idx].module_id.clone())
                        .collect(),
                })
            },
        )?;
    }

    // Stable by construction: ties keep declaration order.
    let mut module_order: Vec<usize> = (0..edges.len()).collect();
    module_order.sort_by_key(|&idx| module_levels[idx]);

    let level_count = module_levels.iter().max().map_or(0, |max| max + 1);
    let mut levels = vec![Vec::new(); level_count];
    let mut scenarios = Vec::new();
    for &module_idx in &module_order {
        let level = module_levels[module_idx];
        for (scenario_idx, scenario) in suite.collections[module_idx].scenarios.iter().enumerate() {
            let dependencies = scenario
                .dependencies
                .iter()
                .filter_map(|dependency| index.get(dependency.as_str()).copied())
                .collect();
            levels[level].push(scenarios.len());
            scenarios.push(PlannedScenario {
                collection: module_idx,
                scenario: scenario_idx,
                level,
                dependencies,
            });
        }
    }

    let plan = ResolvedPlan {
        suite,
        module_levels,
        module_order,
        scenarios,
        levels,
    };
    tracing::debug!(
        modules = plan.module_order.len(),
        levels = plan.levels.len(),
        scenarios = plan.scenarios.len(),
        "resolved scenario order"
    );
    Ok(plan)
}

/// Depth-first walk that fills in levels; returns the cycle on a back-edge.
fn visit(
    node: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    path: &mut Vec<usize>,
    levels: &mut [usize],
) -> Result<(), Vec<usize>> {
    match marks[node] {
        Mark::Done => return Ok(()),
        Mark::Visiting => {
            let start = path.iter().position(|&idx| idx == node).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(node);
            return Err(cycle);
        }
        Mark::Unvisited => {}
    }
    marks[node] = Mark::Visiting;
    path.push(node);
    let mut level = 0;
    for &dependency in &edges[node] {
        visit(dependency, edges, marks, path, levels)?;
        level = level.max(levels[dependency] + 1);
    }
    path.pop();
    marks[node] = Mark::Done;
    levels[node] = level;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{ModuleConfig, ModuleKind};
    use std::collections::{BTreeMap, BTreeSet};

    fn scenario(name: &str, dependencies: &[&str]) -> ScenarioDefinition {
        ScenarioDefinition {
            name: name.to_string(),
            description: String::new(),
            module_config: ModuleConfig {
                module_id: format!("{name}-config"),
                kind: ModuleKind::Extension,
                generator_type: "auth0".to_string(),
                targets: BTreeSet::new(),
                enabled: true,
                field_values: BTreeMap::new(),
            },
            dependencies: dependencies.iter().map(|dep| dep.to_string()).collect(),
            expected_files: vec!["frontend/.env".to_string()],
            file_content_checks: Vec::new(),
        }
    }

    fn module(module_id: &str, scenarios: Vec<ScenarioDefinition>) -> ModuleCollection {
        ModuleCollection {
            module_id: module_id.to_string(),
            module_name: None,
            scenarios,
            template_validations: Vec::new(),
        }
    }

    fn suite(collections: Vec<ModuleCollection>) -> LoadedSuite {
        LoadedSuite {
            collections,
            warnings: Vec::new(),
        }
    }

    fn names(plan: &ResolvedPlan) -> Vec<String> {
        plan.scenarios()
            .iter()
            .map(|planned| plan.definition(planned).name.clone())
            .collect()
    }

    #[test]
    fn independent_scenarios_keep_declaration_order() {
        let plan = resolve(suite(vec![
            module("m-c", vec![scenario("c1", &[]), scenario("c2", &[])]),
            module("m-a", vec![scenario("a1", &[])]),
            module("m-b", vec![scenario("b1", &[])]),
        ]))
        .unwrap();
        assert_eq!(names(&plan), vec!["c1", "c2", "a1", "b1"]);
        assert_eq!(plan.levels(), &[vec![0, 1, 2, 3]]);
    }

    #[test]
    fn dependencies_run_first_and_ties_stay_stable() {
        let plan = resolve(suite(vec![
            module("extension-auth0", vec![scenario("auth0-rbac", &["extension-rbac"])]),
            module("extension-cors", vec![scenario("cors", &[])]),
            module("extension-rbac", vec![scenario("rbac", &[])]),
        ]))
        .unwrap();
        assert_eq!(names(&plan), vec!["cors", "rbac", "auth0-rbac"]);
        assert_eq!(plan.levels(), &[vec![0, 1], vec![2]]);
        assert_eq!(
            plan.module_order(),
            vec![("extension-cors", 0), ("extension-rbac", 0), ("extension-auth0", 1)]
        );
        assert_eq!(plan.scenarios()[2].dependencies, vec![2]);
    }

    #[test]
    fn level_is_longest_dependency_chain() {
        let plan = resolve(suite(vec![
            module("top", vec![scenario("top", &["mid", "base"])]),
            module("mid", vec![scenario("mid", &["base"])]),
            module("base", vec![scenario("base", &[])]),
        ]))
        .unwrap();
        assert_eq!(names(&plan), vec!["base", "mid", "top"]);
        let levels: Vec<usize> = plan.scenarios().iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![0, 1, 2]);
    }

    #[test]
    fn unknown_dependencies_are_all_reported() {
        let err = resolve(suite(vec![
            module("extension-auth0", vec![scenario("auth0-rbac", &["extension-rbac"])]),
            module("extension-cors", vec![scenario("cors", &["extension-missing"])]),
        ]))
        .unwrap_err();
        let HarnessError::UnknownDependency(errors) = err else {
            panic!("expected unknown dependency error");
        };
        let deps: Vec<&str> = errors.iter().map(|err| err.dependency.as_str()).collect();
        assert_eq!(deps, vec!["extension-rbac", "extension-missing"]);
        assert_eq!(errors[0].scenario, "auth0-rbac");
    }

    #[test]
    fn cycle_is_reported_with_full_path() {
        let err = resolve(suite(vec![
            module("free", vec![scenario("free", &[])]),
            module("a", vec![scenario("a", &["b"])]),
            module("b", vec![scenario("b", &["c"])]),
            module("c", vec![scenario("c", &["a"])]),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            HarnessError::CyclicDependency(CyclicDependencyError {
                cycle: vec![
                    "a".to_string(),
                    "b".to_string(),
                    "c".to_string(),
                    "a".to_string()
                ],
            })
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = resolve(suite(vec![module("loop", vec![scenario("loop", &["loop"])])]))
            .unwrap_err();
        assert_eq!(err.to_string(), "dependency cycle: loop -> loop");
    }
}
