//! Step graph of a workflow.
//!
//! Nodes are step ids. Every step has a sequential edge to the next larger
//! id, and optionally a jump edge to `next_step_id`, guarded when the step
//! carries a condition. The jump wins when it is unguarded or its guard
//! holds against the step's output.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;

use crate::models::workflow::{StepCondition, WorkflowStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    DuplicateStepId(i64),
    DanglingEdge { from: i64, to: i64 },
    /// Steps that repeat forever without passing a condition.
    UnconditionalCycle(Vec<i64>),
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateStepId(id) => write!(f, "step id {} is declared more than once", id),
            Self::DanglingEdge { from, to } => {
                write!(f, "step {} jumps to unknown step {}", from, to)
            }
            Self::UnconditionalCycle(ids) => {
                let path: Vec<String> = ids.iter().map(i64::to_string).collect();
                write!(f, "unconditional cycle: {} -> {}", path.join(" -> "), ids[0])
            }
        }
    }
}

pub struct StepGraph<'a> {
    steps: BTreeMap<i64, &'a WorkflowStep>,
    order: Vec<i64>,
    duplicates: Vec<i64>,
}

impl<'a> StepGraph<'a> {
    /// Later declarations of a duplicated id replace earlier ones.
    pub fn new(steps: &'a [WorkflowStep]) -> Self {
        let mut map = BTreeMap::new();
        let mut duplicates = Vec::new();
        for step in steps {
            if map.insert(step.step_id, step).is_some() && !duplicates.contains(&step.step_id) {
                duplicates.push(step.step_id);
            }
        }
        let order = map.keys().copied().collect();
        Self {
            steps: map,
            order,
            duplicates,
        }
    }

    pub fn first(&self) -> Option<i64> {
        self.order.first().copied()
    }

    pub fn step(&self, id: i64) -> Option<&'a WorkflowStep> {
        self.steps.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn sequential_after(&self, id: i64) -> Option<i64> {
        let idx = self.order.binary_search(&id).ok()?;
        self.order.get(idx + 1).copied()
    }

    /// Where to go after `step` produced `output`. `None` ends the run.
    pub fn next(&self, step: &WorkflowStep, output: &Value) -> Option<i64> {
        if let Some(target) = step.next_step_id {
            match &step.condition {
                None => return Some(target),
                Some(condition) if evaluate_condition(condition, output) => return Some(target),
                Some(_) => {}
            }
        }
        self.sequential_after(step.step_id)
    }

    fn unconditional_successor(&self, step: &WorkflowStep) -> Option<i64> {
        match (step.next_step_id, &step.condition) {
            (Some(target), None) => Some(target),
            (Some(_), Some(_)) => None,
            (None, _) => self.sequential_after(step.step_id),
        }
    }

    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues: Vec<GraphIssue> = self
            .duplicates
            .iter()
            .map(|id| GraphIssue::DuplicateStepId(*id))
            .collect();

        for step in self.steps.values() {
            if let Some(target) = step.next_step_id {
                if !self.steps.contains_key(&target) {
                    issues.push(GraphIssue::DanglingEdge {
                        from: step.step_id,
                        to: target,
                    });
                }
            }
        }

        // Each node has at most one unconditional successor, so a walk from
        // every unvisited node finds each cycle exactly once.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            OnPath,
            Done,
        }
        let mut marks: HashMap<i64, Mark> = HashMap::new();
        for &start in &self.order {
            let mut path = Vec::new();
            let mut cursor = Some(start);
            while let Some(id) = cursor {
                match marks.get(&id) {
                    Some(Mark::Done) => break,
                    Some(Mark::OnPath) => {
                        if let Some(pos) = path.iter().position(|p| *p == id) {
                            issues.push(GraphIssue::UnconditionalCycle(path[pos..].to_vec()));
                        }
                        break;
                    }
                    None => {}
                }
                let Some(step) = self.step(id) else { break };
                marks.insert(id, Mark::OnPath);
                path.push(id);
                cursor = self.unconditional_successor(step);
            }
            for id in path {
                marks.insert(id, Mark::Done);
            }
        }

        issues
    }
}

/// Render a value the way conditions compare it: raw text for strings,
/// `None`/`True`/`False` for null and booleans, JSON text otherwise.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Evaluate a guard against a step output. Non-object outputs, missing
/// fields and unknown operators are false.
pub fn evaluate_condition(condition: &StepCondition, output: &Value) -> bool {
    let Some(actual) = output.as_object().and_then(|o| o.get(&condition.field)) else {
        return false;
    };
    let actual = stringify(actual);
    let expected = stringify(&condition.value);
    match condition.operator.as_str() {
        "==" => actual == expected,
        "!=" => actual != expected,
        "contains" => actual.contains(&expected),
        _ => false,
    }
}
