mod common;

use common::{shipped_fixture, stderr_text, stdout_json, Workspace};
use serde_json::json;

#[test]
fn shipped_fixtures_resolve_with_rbac_first() {
    let workspace = Workspace::create();
    let output = workspace.genassert([
        "validate".into(),
        "--json".into(),
        shipped_fixture("extension-auth0.json").into_os_string(),
        shipped_fixture("extension-rbac.json").into_os_string(),
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr_text(&output));
    let value = stdout_json(&output);
    assert_eq!(value["ok"], true);
    assert_eq!(
        value["modules"],
        json!([
            { "module_id": "extension-rbac", "level": 0 },
            { "module_id": "extension-auth0", "level": 1 },
        ])
    );
    let scenarios = value["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 15);
    assert_eq!(scenarios[0]["scenario"], "rbac-spring-basic");
    assert_eq!(scenarios[1]["scenario"], "auth0-spring-boot-complete");
    let fullstack = scenarios
        .iter()
        .find(|s| s["scenario"] == "auth0-fullstack-digitalocean")
        .unwrap();
    assert_eq!(
        fullstack["layers"],
        json!(["backend", "frontend", "deployment"])
    );
}

#[test]
fn missing_dependency_module_is_a_definition_error() {
    let workspace = Workspace::create();
    let output = workspace.genassert([
        "validate".into(),
        shipped_fixture("extension-auth0.json").into_os_string(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr_text(&output);
    assert!(stderr.contains("1 unknown dependency reference(s)"), "{stderr}");
    assert!(
        stderr.contains("scenario \"auth0-rbac-integration\" depends on unknown module \"extension-rbac\""),
        "{stderr}"
    );
}

#[test]
fn cycle_is_reported_before_running() {
    let workspace = Workspace::create();
    let module = |id: &str, dep: &str| {
        json!({
            "moduleId": id,
            "scenarios": [{
                "name": format!("{id}-basic"),
                "dependencies": [dep],
                "config": { "moduleId": id, "type": id, "targets": ["spring"] },
                "expectedFiles": ["backend/pom.xml"]
            }]
        })
    };
    let a = workspace.write_json("a.json", &module("a", "b"));
    let b = workspace.write_json("b.json", &module("b", "a"));
    let output = workspace.genassert([
        "run".into(),
        "--generator".into(),
        "false".into(),
        a.into_os_string(),
        b.into_os_string(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("dependency cycle: a -> b -> a"));
    assert!(output.stdout.is_empty());
}

#[test]
fn validation_errors_name_field_paths() {
    let workspace = Workspace::create();
    let path = workspace.write_json(
        "broken.json",
        &json!({
            "moduleId": "extension-auth0",
            "scenarios": [{
                "name": "auth0-react-complete",
                "config": { "moduleId": "auth0-react", "targets": ["vue"] },
                "expectedFiles": ["/etc/passwd", "frontend/../secret"]
            }]
        }),
    );
    let output = workspace.genassert([
        "validate".into(),
        "--json".into(),
        path.into_os_string(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let value = stdout_json(&output);
    assert_eq!(value["ok"], false);
    let details: Vec<String> = value["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line.as_str().unwrap().to_string())
        .collect();
    let mentions = |needle: &str| details.iter().any(|line| line.contains(needle));
    assert!(mentions("scenarios[0].config.type"), "{details:?}");
    assert!(mentions("scenarios[0].config.targets[0]"), "{details:?}");
    assert!(mentions("scenarios[0].expectedFiles[0]"), "{details:?}");
    assert!(mentions("scenarios[0].expectedFiles[1]"), "{details:?}");
}

#[test]
fn unreadable_collection_is_an_infrastructure_error() {
    let workspace = Workspace::create();
    workspace.write("bad.json", "{ not json");
    let output = workspace.genassert(["validate", "bad.json"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("parse collection JSON"));
}
