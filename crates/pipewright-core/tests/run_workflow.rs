//! End-to-end runs through `AppStateInner::coordinator`, using an
//! in-memory database and scripted providers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use pipewright_core::models::ai_model::{AiModel, CreateAiModelInput};
use pipewright_core::models::business_context::CreateBusinessContextInput;
use pipewright_core::models::component::CreateComponentInput;
use pipewright_core::models::run::{RunLogEntry, RunStatus, StepStatus};
use pipewright_core::models::skill::{CreateSkillInput, SkillType};
use pipewright_core::models::workflow::{CreateWorkflowInput, StepCondition, WorkflowStep};
use pipewright_core::providers::document::{AnalysisStatus, DocumentAnalysisProvider, OperationHandle};
use pipewright_core::providers::llm::{ChatCompletion, ChatRequest, LlmGateway};
use pipewright_core::state::{AppState, AppStateInner};
use pipewright_core::{Database, EngineConfig, EngineError};

/// Returns a fixed response and keeps every request it saw.
struct ScriptedGateway {
    response: Value,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    fn new(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn chat(&self, request: &ChatRequest, _model: &AiModel) -> Result<ChatCompletion, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(ChatCompletion::from_raw(self.response.clone()))
    }
}

struct NoDocuments;

#[async_trait]
impl DocumentAnalysisProvider for NoDocuments {
    async fn submit(&self, _document: Vec<u8>) -> Result<OperationHandle, EngineError> {
        Err(EngineError::Configuration("no document provider in tests".into()))
    }

    async fn poll(&self, _handle: &OperationHandle) -> Result<AnalysisStatus, EngineError> {
        Err(EngineError::Configuration("no document provider in tests".into()))
    }
}

fn test_state(gateway: Arc<ScriptedGateway>) -> AppState {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let inner = AppStateInner::new(db, EngineConfig::default())
        .with_llm_gateway(gateway)
        .with_document_provider(Arc::new(NoDocuments));
    Arc::new(inner)
}

fn map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(m) => m,
        other => panic!("expected object, got {}", other),
    }
}

async fn mock_component(state: &AppState, id: &str, payload: Value) {
    let mut input = CreateComponentInput::new(id, json!({"kind": "mock", "payload": payload}));
    input.id = Some(id.to_string());
    state.component_store.create(input).await.unwrap();
}

async fn workflow(state: &AppState, steps: Vec<WorkflowStep>) -> String {
    state
        .workflow_store
        .create(CreateWorkflowInput {
            name: "wf".into(),
            description: String::new(),
            steps,
        })
        .await
        .unwrap()
        .id
}

async fn active_model(state: &AppState) -> AiModel {
    state
        .ai_model_store
        .create(CreateAiModelInput {
            name: "gpt-4o".into(),
            deployment_name: "gpt-4o-prod".into(),
            api_version: "2024-02-01".into(),
            description: None,
            is_active: true,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_zero_step_workflow_returns_input() {
    let state = test_state(ScriptedGateway::new(json!({})));
    let wf = workflow(&state, vec![]).await;

    let run = state
        .coordinator()
        .run(&wf, map(json!({"ticket": 7})), None, None)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.output_payload, Some(json!({"ticket": 7})));
    assert!(run.log.is_empty());
}

#[tokio::test]
async fn test_single_mock_step_output_and_persistence() {
    let state = test_state(ScriptedGateway::new(json!({})));
    mock_component(&state, "m", json!({"a": 1})).await;
    let wf = workflow(&state, vec![WorkflowStep::new(1, "m")]).await;

    let run = state.coordinator().run(&wf, Map::new(), None, None).await.unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.output_payload, Some(json!({"a": 1})));

    let stored = state.run_store.require(&run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Success);
    assert_eq!(stored.log.len(), 1);
    assert!(stored.finished_at.is_some());
}

#[tokio::test]
async fn test_condition_selects_branch() {
    let state = test_state(ScriptedGateway::new(json!({})));
    mock_component(&state, "classify", json!({"status": "approve"})).await;
    mock_component(&state, "review", json!({"path": "review"})).await;
    mock_component(&state, "notify", json!({"path": "notify"})).await;

    let guarded = |value: &str| {
        WorkflowStep::new(1, "classify")
            .jump_to(3)
            .when(StepCondition::new("status", "==", json!(value)))
    };

    let taken = workflow(
        &state,
        vec![guarded("approve"), WorkflowStep::new(2, "review"), WorkflowStep::new(3, "notify")],
    )
    .await;
    let run = state.coordinator().run(&taken, Map::new(), None, None).await.unwrap();
    let ids: Vec<i64> = run.steps().map(|s| s.step_id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(run.output_payload.as_ref().unwrap()["path"], "notify");

    let fallthrough = workflow(
        &state,
        vec![guarded("reject"), WorkflowStep::new(2, "review"), WorkflowStep::new(3, "notify")],
    )
    .await;
    let run = state.coordinator().run(&fallthrough, Map::new(), None, None).await.unwrap();
    let ids: Vec<i64> = run.steps().map(|s| s.step_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_unconditional_cycle_hits_step_limit() {
    let state = test_state(ScriptedGateway::new(json!({})));
    mock_component(&state, "ping", json!({"n": 1})).await;
    let wf = workflow(
        &state,
        vec![WorkflowStep::new(1, "ping").jump_to(2), WorkflowStep::new(2, "ping").jump_to(1)],
    )
    .await;

    let run = state.coordinator().run(&wf, Map::new(), None, None).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.steps().count(), 50);
    match run.log.last() {
        Some(RunLogEntry::Failure(f)) => assert!(f.error.contains("maximum step limit of 50")),
        other => panic!("expected failure entry, got {:?}", other),
    }
    assert!(run.output_payload.is_none());
}

#[tokio::test]
async fn test_previous_output_overrides_original_input() {
    let state = test_state(ScriptedGateway::new(json!({})));
    mock_component(&state, "first", json!({"y": 3, "z": 4})).await;
    mock_component(&state, "second", json!({"done": true})).await;
    let wf = workflow(&state, vec![WorkflowStep::new(1, "first"), WorkflowStep::new(2, "second")]).await;

    let run = state
        .coordinator()
        .run(&wf, map(json!({"x": 1, "y": 2})), None, None)
        .await
        .unwrap();

    let second = run.steps().nth(1).unwrap();
    assert_eq!(second.input.original_input, map(json!({"x": 1, "y": 2})));
    assert_eq!(second.input.prev_output, json!({"y": 3, "z": 4}));
}

#[tokio::test]
async fn test_unsupported_backend_logs_error_payload_and_continues() {
    let state = test_state(ScriptedGateway::new(json!({})));
    let mut legacy = CreateComponentInput::new("legacy", json!({"kind": "ftp"}));
    legacy.id = Some("legacy".into());
    state.component_store.create(legacy).await.unwrap();

    let rules = state
        .skill_store
        .create(CreateSkillInput::new("rules", SkillType::RuleEngine, json!({})))
        .await
        .unwrap();
    let mut ruled = CreateComponentInput::new("ruled", json!({})).with_skill(rules.id);
    ruled.id = Some("ruled".into());
    state.component_store.create(ruled).await.unwrap();
    mock_component(&state, "after", json!({"ok": true})).await;

    let wf = workflow(
        &state,
        vec![
            WorkflowStep::new(1, "legacy"),
            WorkflowStep::new(2, "ruled"),
            WorkflowStep::new(3, "after"),
        ],
    )
    .await;
    let run = state.coordinator().run(&wf, Map::new(), None, None).await.unwrap();

    assert_eq!(run.status, RunStatus::Success);
    let steps: Vec<_> = run.steps().collect();
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| s.status == StepStatus::Success && s.error.is_none()));
    assert_eq!(steps[0].output, json!({"error": "Unknown component kind: ftp"}));
    assert_eq!(steps[1].output, json!({"error": "Unsupported Skill Type: RULE_ENGINE"}));
    assert_eq!(steps[1].input.prev_output, steps[0].output);
    assert_eq!(run.output_payload, Some(json!({"ok": true})));
}

#[tokio::test]
async fn test_chat_usage_recorded_only_with_usage_and_identity() {
    let gateway = ScriptedGateway::new(json!({
        "choices": [{"message": {"role": "assistant", "content": "hi"}}],
        "usage": {"prompt_tokens": 1000, "completion_tokens": 500, "total_tokens": 1500}
    }));
    let state = test_state(gateway.clone());
    active_model(&state).await;

    let mut chat = CreateComponentInput::new("chat", json!({"kind": "azure_openai"}));
    chat.id = Some("chat".into());
    state.component_store.create(chat).await.unwrap();
    let wf = workflow(&state, vec![WorkflowStep::new(1, "chat")]).await;

    let anonymous = state.coordinator().run(&wf, Map::new(), None, None).await.unwrap();
    assert_eq!(anonymous.status, RunStatus::Success);
    assert!(state.usage_store.list_by_trace(&anonymous.trace_id).await.unwrap().is_empty());

    let run = state
        .coordinator()
        .run(&wf, map(json!({"prompt": "hello"})), Some("u-1".into()), None)
        .await
        .unwrap();
    let records = state.usage_store.list_by_trace(&run.trace_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "u-1");
    assert_eq!(records[0].app_name, "chat");
    assert_eq!(records[0].total_tokens, 1500);
    assert!((records[0].estimated_cost - 0.0125).abs() < 1e-9);

    let last = gateway.requests().pop().unwrap();
    assert_eq!(last.messages[1]["content"], "hello");
}

#[tokio::test]
async fn test_chat_without_usage_block_records_nothing() {
    let state = test_state(ScriptedGateway::new(json!({"choices": []})));
    active_model(&state).await;
    let mut chat = CreateComponentInput::new("chat", json!({"kind": "azure_openai"}));
    chat.id = Some("chat".into());
    state.component_store.create(chat).await.unwrap();
    let wf = workflow(&state, vec![WorkflowStep::new(1, "chat")]).await;

    let run = state
        .coordinator()
        .run(&wf, Map::new(), Some("u-1".into()), None)
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert!(state.usage_store.list_by_user("u-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_without_any_model_fails_run() {
    let state = test_state(ScriptedGateway::new(json!({})));
    let mut chat = CreateComponentInput::new("chat", json!({"kind": "azure_openai"}));
    chat.id = Some("chat".into());
    state.component_store.create(chat).await.unwrap();
    let wf = workflow(&state, vec![WorkflowStep::new(1, "chat")]).await;

    let run = state.coordinator().run(&wf, Map::new(), None, None).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    let step = run.steps().next().unwrap();
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.error.as_deref().unwrap().contains("No AI model configured"));
    assert_eq!(run.log.len(), 2);
}

#[tokio::test]
async fn test_manual_injected_into_prompt_skill() {
    let gateway = ScriptedGateway::new(json!({"choices": []}));
    let state = test_state(gateway.clone());
    active_model(&state).await;

    let skill = state
        .skill_store
        .create(CreateSkillInput::new(
            "summarize",
            SkillType::LlmPrompt,
            json!({"system_prompt": "You summarize."}),
        ))
        .await
        .unwrap();
    let mut bound = CreateComponentInput::new("summarizer", json!({})).with_skill(skill.id);
    bound.id = Some("summarizer".into());
    state.component_store.create(bound).await.unwrap();
    mock_component(&state, "tail", json!({"done": true})).await;

    let context = state
        .business_context_store
        .create(CreateBusinessContextInput {
            name: "Claims SOP".into(),
            description: String::new(),
            department: "claims".into(),
            manual_content: Some("Always cite the claim number.".into()),
            workflow_id: None,
        })
        .await
        .unwrap();

    let wf = workflow(&state, vec![WorkflowStep::new(1, "summarizer"), WorkflowStep::new(2, "tail")]).await;
    let run = state
        .coordinator()
        .run(&wf, Map::new(), None, Some(context.id))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Success);

    let requests = gateway.requests();
    let system = requests[0].messages[0]["content"].as_str().unwrap();
    assert!(system.starts_with("You summarize."));
    assert!(system.contains("=== BUSINESS MANUAL (SOP) ===\nAlways cite the claim number."));

    for step in run.steps() {
        assert_eq!(step.used_manual.as_deref(), Some("Claims SOP"));
    }
}

#[tokio::test]
async fn test_missing_definitions_create_no_run() {
    let state = test_state(ScriptedGateway::new(json!({})));

    let err = state.coordinator().run("nope", Map::new(), None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let wf = workflow(&state, vec![WorkflowStep::new(1, "ghost")]).await;
    let err = state.coordinator().run(&wf, Map::new(), None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    assert_eq!(state.run_store.count().await.unwrap(), 0);
}
