use serde_json::{Map, Value};

use super::graph::StepGraph;
use crate::error::EngineError;
use crate::models::workflow::WorkflowStep;

/// Walks a workflow's step graph, enforcing the per-run step ceiling.
pub struct StepDispatcher<'a> {
    graph: StepGraph<'a>,
    current: Option<i64>,
    executed: usize,
    max_steps: usize,
}

impl<'a> StepDispatcher<'a> {
    pub fn new(steps: &'a [WorkflowStep], max_steps: usize) -> Self {
        let graph = StepGraph::new(steps);
        let current = graph.first();
        Self {
            graph,
            current,
            executed: 0,
            max_steps,
        }
    }

    /// The next step to execute, or `None` when the run is complete.
    /// Fails once `max_steps` steps have already been handed out.
    pub fn next_step(&mut self) -> Result<Option<&'a WorkflowStep>, EngineError> {
        let Some(id) = self.current else {
            return Ok(None);
        };
        let Some(step) = self.graph.step(id) else {
            tracing::warn!(step_id = id, "Jump to unknown step; ending run");
            self.current = None;
            return Ok(None);
        };
        if self.executed >= self.max_steps {
            return Err(EngineError::StepLimitExceeded(self.max_steps));
        }
        self.executed += 1;
        Ok(Some(step))
    }

    /// Record `output` of the step just executed and pick the next one.
    pub fn advance(&mut self, step: &WorkflowStep, output: &Value) {
        self.current = self.graph.next(step, output);
        tracing::debug!(from = step.step_id, to = ?self.current, "Step transition");
    }

    pub fn executed(&self) -> usize {
        self.executed
    }
}

/// Effective input of a step: the run's original input, overwritten key by
/// key with the previous step's output when that output is an object.
pub fn resolve_input(original: &Map<String, Value>, prev_output: &Value) -> Map<String, Value> {
    let mut effective = original.clone();
    if let Value::Object(prev) = prev_output {
        for (k, v) in prev {
            effective.insert(k.clone(), v.clone());
        }
    }
    effective
}
