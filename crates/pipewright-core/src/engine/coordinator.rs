//! Run lifecycle: snapshot definitions, create the run, drive the
//! dispatcher, finalize exactly once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::Instrument;

use super::dispatcher::{resolve_input, StepDispatcher};
use crate::backends::{Backends, ExecutionBackend, StepContext};
use crate::error::EngineError;
use crate::models::business_context::ManualContext;
use crate::models::component::Component;
use crate::models::run::{RunExecution, StepInput, StepLogEntry, StepStatus};
use crate::models::skill::Skill;
use crate::models::workflow::Workflow;
use crate::providers::BusinessContextProvider;
use crate::store::{ComponentStore, RunStore, SkillStore, WorkflowStore};

/// Definitions a run executes against, read once before it starts.
struct RunSnapshot {
    components: HashMap<String, (Component, Option<Skill>)>,
}

impl RunSnapshot {
    fn get(&self, component_id: &str) -> Result<&(Component, Option<Skill>), EngineError> {
        self.components.get(component_id).ok_or_else(|| {
            EngineError::Internal(format!("Component {} missing from run snapshot", component_id))
        })
    }
}

#[derive(Clone)]
pub struct RunCoordinator {
    workflows: WorkflowStore,
    components: ComponentStore,
    skills: SkillStore,
    runs: RunStore,
    contexts: Arc<dyn BusinessContextProvider>,
    backends: Arc<Backends>,
    max_steps: usize,
}

impl RunCoordinator {
    pub fn new(
        workflows: WorkflowStore,
        components: ComponentStore,
        skills: SkillStore,
        runs: RunStore,
        contexts: Arc<dyn BusinessContextProvider>,
        backends: Arc<Backends>,
        max_steps: usize,
    ) -> Self {
        Self {
            workflows,
            components,
            skills,
            runs,
            contexts,
            backends,
            max_steps,
        }
    }

    /// Execute a workflow against `input_payload`.
    ///
    /// `Err` means the run could not start (unknown workflow or component,
    /// store failure). Once a run exists its failures are recorded on the
    /// returned `RunExecution` with status `FAILED`.
    pub async fn run(
        &self,
        workflow_id: &str,
        input_payload: Map<String, Value>,
        identity: Option<String>,
        business_context_id: Option<String>,
    ) -> Result<RunExecution, EngineError> {
        let workflow = self.workflows.require(workflow_id).await?;
        let snapshot = self.snapshot(&workflow).await?;

        let manual = match business_context_id.as_deref() {
            Some(id) => self.contexts.manual(id).await?,
            None => None,
        };

        let mut run = RunExecution::pending(&workflow.id, input_payload, identity, business_context_id);
        run.start()?;
        self.runs.save(&run).await?;

        let span = tracing::info_span!(
            "run",
            run_id = %run.id,
            workflow_id = %workflow.id,
            trace_id = %run.trace_id
        );

        async move {
            tracing::info!(
                workflow = %workflow.name,
                steps = workflow.steps.len(),
                manual = manual.as_ref().map(|m| m.name.as_str()),
                "Run started"
            );

            match self.drive(&workflow, &snapshot, manual.as_ref(), &mut run).await {
                Ok(output) => {
                    run.succeed(output)?;
                    tracing::info!(steps = run.steps().count(), "Run succeeded");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Run failed");
                    run.fail(e.to_string())?;
                }
            }

            self.runs.save(&run).await?;
            Ok::<_, EngineError>(run)
        }
        .instrument(span)
        .await
    }

    async fn snapshot(&self, workflow: &Workflow) -> Result<RunSnapshot, EngineError> {
        let mut components = HashMap::new();
        for step in &workflow.steps {
            if components.contains_key(&step.component_id) {
                continue;
            }
            let component = self.components.require(&step.component_id).await?;
            let skill = match component.skill_id.as_deref() {
                Some(skill_id) => Some(self.skills.get(skill_id).await?.ok_or_else(|| {
                    EngineError::NotFound(format!(
                        "Skill {} referenced by component {} not found",
                        skill_id, component.id
                    ))
                })?),
                None => None,
            };
            components.insert(step.component_id.clone(), (component, skill));
        }
        Ok(RunSnapshot { components })
    }

    /// Execute steps until the dispatcher ends the walk. Returns the run
    /// output; the first hard error stops the loop.
    async fn drive(
        &self,
        workflow: &Workflow,
        snapshot: &RunSnapshot,
        manual: Option<&ManualContext>,
        run: &mut RunExecution,
    ) -> Result<Value, EngineError> {
        let original = run.input_payload.clone();
        let identity = run.identity.clone();
        let trace_id = run.trace_id.clone();
        let ctx = StepContext {
            identity: identity.as_deref(),
            manual,
            trace_id: &trace_id,
        };

        let mut dispatcher = StepDispatcher::new(&workflow.steps, self.max_steps);
        let mut prev_output = Value::Object(Map::new());
        let mut last_output: Option<Value> = None;

        while let Some(step) = dispatcher.next_step()? {
            let (component, skill) = snapshot.get(&step.component_id)?;
            let effective = resolve_input(&original, &prev_output);

            let timestamp = Utc::now();
            let clock = Instant::now();
            let result = match ExecutionBackend::resolve(component, skill.as_ref(), &step.config) {
                Ok(backend) => {
                    tracing::debug!(
                        step_id = step.step_id,
                        component = %component.name,
                        backend = backend.label(),
                        "Executing step"
                    );
                    self.backends.execute(&backend, &effective, &ctx).await
                }
                Err(e) => Err(e),
            };
            let duration_ms = clock.elapsed().as_secs_f64() * 1000.0;

            let mut entry = StepLogEntry {
                step_id: step.step_id,
                component: component.name.clone(),
                status: StepStatus::Success,
                input: StepInput {
                    original_input: original.clone(),
                    prev_output: prev_output.clone(),
                },
                output: Value::Null,
                error: None,
                timestamp,
                duration_ms,
                used_manual: manual.map(|m| m.name.clone()),
            };

            match result {
                Ok(output) => {
                    // Soft errors stay in the payload; the step itself succeeded.
                    if let Some(message) = &output.soft_error {
                        tracing::warn!(step_id = step.step_id, "Step returned an error payload: {}", message);
                    }
                    entry.output = output.payload.clone();
                    run.push_step(entry);

                    dispatcher.advance(step, &output.payload);
                    prev_output = output.payload.clone();
                    last_output = Some(output.payload);
                }
                Err(e) => {
                    entry.status = StepStatus::Failed;
                    entry.error = Some(e.to_string());
                    run.push_step(entry);
                    return Err(e);
                }
            }
        }

        tracing::debug!(executed = dispatcher.executed(), "Dispatcher finished");
        Ok(last_output.unwrap_or(Value::Object(original)))
    }
}
