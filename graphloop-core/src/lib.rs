//! graphloop-core: a bounded state-graph executor for LLM agents.
//!
//! Nodes transform a state, edges (static or conditional) pick the next node,
//! and the driver answers tool calls between steps until it reaches `END` or
//! the caller's iteration bound.

#![allow(unused_extern_crates)]
extern crate self as graphloop_core;

pub mod completion;
pub mod graph;
pub mod node;
pub mod tool;
pub mod types;

#[doc(hidden)]
pub use async_trait::async_trait;

pub mod prelude {
    //! Convenient re-exports of commonly used types
    pub use crate::completion::{
        ChatModel, LangSmithTracer, ModelOptions, OpenAiChatModel, TracingError, TracingProvider,
    };
    pub use crate::graph::{
        Branch, Built, Edge, EdgeRouter, Graph, GraphEvent, NodeRegistry, NotBuilt, RouteLabel,
        RunConfig, RunOutcome, Subgraph, Termination, DEFAULT_MAX_ITERATIONS, END, START,
    };
    pub use crate::node::{
        Context, FunctionNode, ModelNode, Node, NodeConfig, NodeConfigBuilder, PromptNode,
    };
    pub use crate::tool::{
        tools_condition, FnTool, Tool, ToolExecutor, ToolFunction, ToolMemory, ToolNode, ToolSpec,
        ToolsRoute, TypedTool,
    };
    pub use crate::types::{
        FieldState, FieldUpdate, GraphError, GraphResult, GraphState, MergeField, Message,
        MessageState, ModelError, NodeError, NodeOutput, NodeResult, Role, ToolCall, ToolError,
        ToolStatus,
    };
    pub use schemars::JsonSchema;
}

// Re-export main types
pub use prelude::*;
