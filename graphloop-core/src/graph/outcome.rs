use crate::types::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};

/// Suggested bound for agent loops. Never applied implicitly.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Per-run settings. The iteration bound has no default and must be chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    max_iterations: usize,
}

impl RunConfig {
    pub fn new(max_iterations: usize) -> GraphResult<Self> {
        if max_iterations == 0 {
            return Err(GraphError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_iterations })
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Routing reached `END`
    Completed,
    /// The iteration bound was hit before reaching `END`
    BoundExceeded,
}

/// Final state of a run plus how it got there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome<S> {
    pub state: S,
    /// Node executions performed
    pub iterations: usize,
    /// Executed node names, in order
    pub path: Vec<String>,
    pub termination: Termination,
}

impl<S> RunOutcome<S> {
    pub fn is_completed(&self) -> bool {
        self.termination == Termination::Completed
    }

    pub fn bound_exceeded(&self) -> bool {
        self.termination == Termination::BoundExceeded
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

/// Items of [`Graph::stream`](super::Graph::stream)
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent<S> {
    /// State after a node ran and any tool calls it made were answered
    Step {
        node: String,
        iteration: usize,
        state: S,
    },
    Finished(RunOutcome<S>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_is_caller_mandatory() {
        assert!(matches!(RunConfig::new(0), Err(GraphError::InvalidConfig(_))));
        assert_eq!(RunConfig::new(3).unwrap().max_iterations(), 3);
        assert_eq!(
            RunConfig::new(DEFAULT_MAX_ITERATIONS).unwrap().max_iterations(),
            10
        );
    }

    #[test]
    fn test_termination_flags() {
        let outcome = RunOutcome {
            state: (),
            iterations: 3,
            path: vec!["loop".into(); 3],
            termination: Termination::BoundExceeded,
        };
        assert!(outcome.bound_exceeded());
        assert!(!outcome.is_completed());
        assert_eq!(
            serde_json::to_value(outcome.termination).unwrap(),
            serde_json::json!("bound_exceeded")
        );
    }
}
