use super::error::{GraphError, NodeError};
use super::state::GraphState;

/// What a node hands back to the driver.
///
/// The driver folds it into the current state with [`GraphState::merge`].
#[derive(PartialEq, Debug)]
pub enum NodeOutput<S>
where
    S: GraphState,
{
    /// Replaces the state wholesale.
    Full(S),

    /// Field updates, applied in order with each field's strategy.
    Updates(Vec<S::Update>),
}

impl<S: GraphState> NodeOutput<S> {
    /// A single field update
    pub fn update(update: S::Update) -> Self {
        NodeOutput::Updates(vec![update])
    }

    /// Leaves the state as it is
    pub fn unchanged() -> Self {
        NodeOutput::Updates(Vec::new())
    }
}

pub type NodeResult<S> = Result<NodeOutput<S>, NodeError>;

pub type GraphResult<T> = Result<T, GraphError>;
