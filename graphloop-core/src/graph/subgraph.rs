use async_trait::async_trait;
use std::fmt::{Debug, Formatter, Result};
use tracing::warn;

use super::{Built, Graph, RunConfig};
use crate::node::{Context, Node};
use crate::types::{GraphError, GraphState, NodeError, NodeOutput, NodeResult};

/// A built graph run as a single node of another graph.
///
/// The nested run gets a child trace and its own iteration bound. Hitting
/// that bound is not an error: the nested state is handed back as is.
pub struct Subgraph<S> {
    graph: Graph<S, Built>,
    config: RunConfig,
}

impl<S: GraphState> Subgraph<S> {
    pub fn new(graph: Graph<S, Built>, config: RunConfig) -> Self {
        Self { graph, config }
    }
}

impl<S> Debug for Subgraph<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Subgraph")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl<S: GraphState> Node<S> for Subgraph<S> {
    async fn process(&self, ctx: &Context, state: S) -> NodeResult<S> {
        let outcome = self
            .graph
            .run(&ctx.child(), state, self.config)
            .await
            .map_err(|err| match err {
                GraphError::Node(inner) => inner,
                other => NodeError::SubgraphExecution(other.to_string()),
            })?;

        if outcome.bound_exceeded() {
            warn!(
                trace_id = %ctx.trace_id,
                subgraph = %self.graph.name(),
                iterations = outcome.iterations,
                "subgraph stopped at its iteration bound"
            );
        }
        Ok(NodeOutput::Full(outcome.state))
    }

    fn name(&self) -> &str {
        self.graph.name()
    }
}
