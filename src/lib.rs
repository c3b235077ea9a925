//! graphloop: bounded state-graph execution for LLM agents.
//!
//! Wire named nodes together with static and conditional edges, attach tools,
//! and run the graph under an explicit iteration bound:
//!
//! ```ignore
//! use graphloop::prelude::*;
//!
//! let executor = ToolExecutor::new().with_function(CalculatorAdd(Calculator));
//! let model = Arc::new(OpenAiChatModel::from_env()?.with_tools(executor.specs()));
//!
//! let mut graph = Graph::new("react");
//! graph.add_node(ModelNode::new("agent", model))?;
//! graph.add_node(ToolNode::new("tools", executor))?;
//! graph
//!     .set_entry_point("agent")
//!     .add_conditional_edge("agent", tools_condition, [(ToolsRoute::Tools, "tools"), (ToolsRoute::End, END)])
//!     .add_edge("tools", "agent");
//! let graph = graph.build()?;
//!
//! let outcome = graph.run(&Context::default(), state, RunConfig::new(10)?).await?;
//! ```

pub use graphloop_core::*;
pub use graphloop_macros::{tools, RouteLabel, State};

pub mod prelude {
    //! Core prelude plus the derive and attribute macros
    pub use graphloop_core::prelude::*;
    pub use graphloop_macros::{tools, RouteLabel, State};
}
