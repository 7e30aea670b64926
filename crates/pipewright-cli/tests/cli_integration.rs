//! Integration tests for the pipewright-cli commands.
//!
//! These tests exercise the same code paths as the binary, using an
//! in-memory SQLite database and temporary definition files.

use std::fs;

use pipewright_cli::commands;
use pipewright_core::models::run::RunStatus;
use pipewright_core::state::AppState;
use pipewright_core::EngineConfig;
use tempfile::TempDir;

/// Create an in-memory AppState whose skills root is `skills_dir`.
fn test_state(skills_dir: &TempDir) -> AppState {
    let config = EngineConfig {
        skills_dir: skills_dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    commands::open_state(":memory:", config).expect("Failed to open in-memory database")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

const COMPONENTS: &str = r#"
- id: classify
  name: Classifier
  configuration:
    kind: mock
    payload: { status: approve }
- id: notify
  name: Notifier
  configuration:
    kind: mock
    payload: { sent: true }
"#;

const WORKFLOW: &str = r#"
name: "Approval"
steps:
  - step_id: 1
    component_id: classify
    next_step_id: 3
    condition: { field: status, operator: "==", value: approve }
  - step_id: 2
    component_id: review
  - step_id: 3
    component_id: notify
"#;

#[tokio::test]
async fn test_import_and_run_workflow() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let components = commands::component::import(&state, &write(&dir, "c.yaml", COMPONENTS))
        .await
        .unwrap();
    assert_eq!(components.len(), 2);

    let workflow = commands::workflow::import(&state, &write(&dir, "wf.yaml", WORKFLOW))
        .await
        .unwrap();
    assert_eq!(workflow.steps.len(), 3);

    // Step 2 is skipped by the branch, but its component is still required.
    let err = commands::run::execute(&state, &workflow.id, None, None, None)
        .await
        .unwrap_err();
    assert!(err.contains("review"));

    commands::component::import(
        &state,
        &write(
            &dir,
            "review.yaml",
            "id: review\nname: Review\nconfiguration: { kind: mock }\n",
        ),
    )
    .await
    .unwrap();

    let run = commands::run::execute(&state, &workflow.id, Some(r#"{"doc": 1}"#), None, None)
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.output_payload, Some(serde_json::json!({"sent": true})));

    let stored = state.run_store.list_by_workflow(&workflow.id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_reimport_replaces_component() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);
    let file = write(&dir, "c.yaml", COMPONENTS);
    commands::component::import(&state, &file).await.unwrap();

    let changed = COMPONENTS.replace("sent: true", "sent: false");
    commands::component::import(&state, &write(&dir, "c2.yaml", &changed))
        .await
        .unwrap();

    let all = state.component_store.list().await.unwrap();
    assert_eq!(all.len(), 2);
    let notify = state.component_store.require("notify").await.unwrap();
    assert_eq!(notify.configuration["payload"]["sent"], false);
}

#[tokio::test]
async fn test_failed_run_is_an_error_but_persisted() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);
    commands::component::import(
        &state,
        &write(&dir, "c.yaml", "id: ping\nname: Ping\nconfiguration: { kind: mock }\n"),
    )
    .await
    .unwrap();
    let workflow = commands::workflow::import(
        &state,
        &write(
            &dir,
            "loop.yaml",
            "name: loop\nsteps:\n  - { step_id: 1, component_id: ping, next_step_id: 2 }\n  - { step_id: 2, component_id: ping, next_step_id: 1 }\n",
        ),
    )
    .await
    .unwrap();

    let problems = commands::workflow::validate(&state, &workflow.id).await.unwrap();
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("cycle"));

    let err = commands::run::execute(&state, &workflow.id, None, None, None)
        .await
        .unwrap_err();
    assert!(err.contains("maximum step limit"));

    let runs = state.run_store.list_by_workflow(&workflow.id).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_validate_reports_unknown_components() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);
    let workflow = commands::workflow::import(&state, &write(&dir, "wf.yaml", WORKFLOW))
        .await
        .unwrap();

    let problems = commands::workflow::validate(&state, &workflow.id).await.unwrap();
    assert_eq!(problems.len(), 3);
    assert!(problems.iter().all(|p| p.contains("unknown component")));
}

#[test]
fn test_payload_must_be_object() {
    assert!(commands::run::parse_payload(None).unwrap().is_empty());
    assert_eq!(
        commands::run::parse_payload(Some(r#"{"a": 1}"#)).unwrap()["a"],
        1
    );
    assert!(commands::run::parse_payload(Some("[1, 2]")).is_err());
    assert!(commands::run::parse_payload(Some("{not json")).is_err());
}

#[tokio::test]
async fn test_skill_sync_and_model_registration() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let skill_dir = dir.path().join("invoice");
    fs::create_dir_all(&skill_dir).unwrap();
    fs::write(skill_dir.join("run.py"), "def run(payload):\n    return payload\n").unwrap();
    fs::write(
        skill_dir.join("skill.md"),
        "---\nname: invoice-reader\ncategory: finance\n---\nRead invoices.",
    )
    .unwrap();

    let report = commands::skill::sync(&state).await.unwrap();
    assert_eq!(report.registered, vec!["invoice-reader".to_string()]);
    let again = commands::skill::sync(&state).await.unwrap();
    assert!(again.registered.is_empty());
    assert_eq!(state.skill_store.list().await.unwrap().len(), 1);

    let model = commands::model::add(&state, "gpt-4o", "gpt-4o-prod", "2024-02-01", None, true)
        .await
        .unwrap();
    let active = state.ai_model_store.first_active().await.unwrap().unwrap();
    assert_eq!(active.id, model.id);

    commands::model::activate(&state, &model.id, false).await.unwrap();
    assert!(state.ai_model_store.first_active().await.unwrap().is_none());
    commands::model::activate(&state, &model.id, true).await.unwrap();
    assert!(state.ai_model_store.first_active().await.unwrap().is_some());

    let err = commands::model::activate(&state, "no-such-model", true).await.unwrap_err();
    assert!(err.contains("not found"));
}
