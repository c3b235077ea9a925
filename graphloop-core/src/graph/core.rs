use async_stream::try_stream;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

use super::*;
use crate::node::{Context, Node, NodeConfig};
use crate::tool::{ToolDispatch, ToolExecutor};
use crate::types::{GraphError, GraphResult, GraphState, MessageState, NodeError};

pub const START: &str = "_START_";
pub const END: &str = "_END_";

/// A graph of named nodes joined by static and conditional edges.
///
/// Built in two phases: wire it up as `Graph<S, NotBuilt>`, then `build()`
/// validates the wiring and returns the runnable `Graph<S, Built>`.
pub struct Graph<S, BuildState = NotBuilt> {
    graph_name: String,
    nodes: NodeRegistry<S>,
    edges: EdgeRouter<S>,
    configs: HashMap<String, NodeConfig>,
    tools: Option<Arc<dyn ToolDispatch<S>>>,
    _build_state: PhantomData<BuildState>,
}

impl<S, B> Graph<S, B> {
    pub fn name(&self) -> &str {
        &self.graph_name
    }
}

impl<S: GraphState> Graph<S, NotBuilt> {
    /// Create a new graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph_name: name.into(),
            nodes: NodeRegistry::new(),
            edges: EdgeRouter::new(),
            configs: HashMap::new(),
            tools: None,
            _build_state: PhantomData,
        }
    }

    /// Add a node to the graph. Fails if the name is taken or reserved.
    pub fn add_node<N>(&mut self, node: N) -> GraphResult<&mut Self>
    where
        N: Node<S> + 'static,
    {
        self.nodes.register(Arc::new(node))?;
        Ok(self)
    }

    /// Add a direct edge between nodes
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.add_static(from, to);
        self
    }

    /// Add a conditional edge: `router` labels the state, `path_map` maps labels to nodes.
    pub fn add_conditional_edge<L, F, I, K, T>(
        &mut self,
        from: impl Into<String>,
        router: F,
        path_map: I,
    ) -> &mut Self
    where
        L: RouteLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
        I: IntoIterator<Item = (K, T)>,
        K: Into<L>,
        T: Into<String>,
    {
        self.edges.add_conditional(from, Branch::new(router, path_map));
        self
    }

    pub fn set_entry_point(&mut self, name: impl Into<String>) -> &mut Self {
        self.add_edge(START, name)
    }

    pub fn set_finish_point(&mut self, name: impl Into<String>) -> &mut Self {
        self.add_edge(name, END)
    }

    /// Configure a node with specific settings
    pub fn configure_node(&mut self, name: impl Into<String>, config: NodeConfig) -> &mut Self {
        self.configs.insert(name.into(), config);
        self
    }

    /// Validate the wiring and make the graph runnable
    pub fn build(self) -> GraphResult<Graph<S, Built>> {
        let nodes = &self.nodes;
        self.edges.validate(|name| nodes.contains(name))?;
        if let Some(name) = self.configs.keys().find(|name| !nodes.contains(name)) {
            return Err(GraphError::UnknownNode(name.clone()));
        }

        debug!(graph = %self.graph_name, nodes = self.nodes.len(), "graph built");
        Ok(Graph {
            graph_name: self.graph_name,
            nodes: self.nodes,
            edges: self.edges,
            configs: self.configs,
            tools: self.tools,
            _build_state: PhantomData,
        })
    }
}

impl<S: MessageState> Graph<S, NotBuilt> {
    /// Answer pending tool calls after every node, before routing.
    pub fn with_tools(&mut self, executor: ToolExecutor) -> &mut Self {
        self.tools = Some(Arc::new(executor));
        self
    }
}

impl<S: GraphState> Graph<S, Built> {
    /// Run the graph from `START` until it reaches `END` or the bound.
    pub async fn run(
        &self,
        ctx: &Context,
        initial_state: S,
        config: RunConfig,
    ) -> GraphResult<RunOutcome<S>> {
        let span = info_span!(
            "graph_run",
            graph = %self.graph_name,
            trace_id = %ctx.trace_id,
            max_iterations = config.max_iterations()
        );

        async move {
            let events = self.stream(ctx, initial_state, config);
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                if let GraphEvent::Finished(outcome) = event? {
                    return Ok(outcome);
                }
            }
            Err(GraphError::InvalidState(
                "run ended without an outcome".to_string(),
            ))
        }
        .instrument(span)
        .await
    }

    /// Run the graph, yielding the state after every iteration.
    ///
    /// Each iteration runs a node, answers its tool calls when tools are
    /// attached, and routes on the resulting state. The stream ends with
    /// [`GraphEvent::Finished`], or with the first error.
    pub fn stream<'a>(
        &'a self,
        ctx: &Context,
        initial_state: S,
        config: RunConfig,
    ) -> impl Stream<Item = GraphResult<GraphEvent<S>>> + Send + 'a {
        let ctx = ctx.clone();
        try_stream! {
            let mut state = initial_state;
            let mut path = Vec::new();
            let mut iterations = 0;
            let mut current = self.edges.resolve(START, &state)?;

            let termination = loop {
                if current == END {
                    break Termination::Completed;
                }

                state = self.execute(&ctx, &current, state).await?;
                iterations += 1;
                path.push(current.clone());

                if let Some(tools) = &self.tools {
                    if tools.has_pending(&state) {
                        state = tools.dispatch(&ctx, state).await;
                    }
                }

                yield GraphEvent::Step {
                    node: current.clone(),
                    iteration: iterations,
                    state: state.clone(),
                };

                let next = self.edges.resolve(&current, &state)?;
                debug!(trace_id = %ctx.trace_id, from = %current, to = %next, "routed");
                if next == END {
                    break Termination::Completed;
                }
                if iterations >= config.max_iterations() {
                    warn!(
                        trace_id = %ctx.trace_id,
                        graph = %self.graph_name,
                        iterations,
                        next = %next,
                        "iteration bound reached"
                    );
                    break Termination::BoundExceeded;
                }
                current = next;
            };

            info!(trace_id = %ctx.trace_id, graph = %self.graph_name, iterations, ?termination, "run finished");
            yield GraphEvent::Finished(RunOutcome {
                state,
                iterations,
                path,
                termination,
            });
        }
    }

    async fn execute(&self, ctx: &Context, name: &str, state: S) -> GraphResult<S> {
        let node = self.nodes.get(name)?;
        let config = self.configs.get(name).cloned().unwrap_or_default();
        debug!(trace_id = %ctx.trace_id, node = %name, "running node");

        let output = match tokio::time::timeout(
            Duration::from_secs(config.timeout),
            node.process(ctx, state.clone()),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(trace_id = %ctx.trace_id, node = %name, error = %err, "node failed");
                return Err(err.into());
            }
            Err(_) => {
                warn!(trace_id = %ctx.trace_id, node = %name, seconds = config.timeout, "node timed out");
                return Err(NodeError::Timeout {
                    node: name.to_string(),
                    seconds: config.timeout,
                }
                .into());
            }
        };

        Ok(state.merge(output))
    }

    /// Wrap this graph as a node of a parent graph
    pub fn into_subgraph(self, config: RunConfig) -> Subgraph<S> {
        Subgraph::new(self, config)
    }

    /// Render the graph as a Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        mermaid::render(self.nodes.names(), self.edges.edges())
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.names()
    }
}

impl<S, B> Debug for Graph<S, B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.graph_name)
            .field("nodes", &self.nodes)
            .field("edges", &self.edges)
            .field("configs", &self.configs)
            .field("tools", &self.tools.is_some())
            .finish()
    }
}
