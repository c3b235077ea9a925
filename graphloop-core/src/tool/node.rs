use super::ToolExecutor;
use crate::graph::RouteLabel;
use crate::node::{Context, Node};
use crate::types::{MessageState, NodeOutput, NodeResult};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Runs a [`ToolExecutor`] as an explicit graph node.
///
/// For graphs that wire the tool step by hand (`model -> tools -> model`)
/// instead of relying on the driver's automatic round trip.
pub struct ToolNode {
    name: String,
    executor: Arc<ToolExecutor>,
}

impl ToolNode {
    pub fn new(name: impl Into<String>, executor: ToolExecutor) -> Self {
        Self {
            name: name.into(),
            executor: Arc::new(executor),
        }
    }
}

impl Debug for ToolNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolNode")
            .field("name", &self.name)
            .field("executor", &self.executor)
            .finish()
    }
}

#[async_trait]
impl<S: MessageState> Node<S> for ToolNode {
    async fn process(&self, ctx: &Context, state: S) -> NodeResult<S> {
        Ok(NodeOutput::Full(self.executor.dispatch(ctx, state).await))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Labels produced by [`tools_condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolsRoute {
    Tools,
    End,
}

impl RouteLabel for ToolsRoute {
    fn all() -> Option<Vec<Self>> {
        Some(vec![ToolsRoute::Tools, ToolsRoute::End])
    }
}

/// Routes to the tool step while the last assistant turn requests tools
pub fn tools_condition<S: MessageState>(state: &S) -> ToolsRoute {
    if state.pending_tool_calls().is_empty() {
        ToolsRoute::End
    } else {
        ToolsRoute::Tools
    }
}
