use async_openai::error::OpenAIError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool operations
///
/// Tool errors never abort a run: the executor turns them into `tool` messages
/// so the next model turn can see what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution: {0}")]
    Execution(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Serialization: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Serialization(err.to_string())
    }
}

/// Error type for calls to the model capability
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ModelError {
    /// Network failure, timeout or a 5xx from the provider. Safe to retry.
    #[error("Transient model failure: {0}")]
    Transient(String),

    /// Authentication, quota, 4xx or a malformed request. Retrying will not help.
    #[error("Permanent model failure: {0}")]
    Permanent(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Transient(_))
    }
}

impl From<OpenAIError> for ModelError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => {
                let server_side = e.status().map(|s| s.is_server_error()).unwrap_or(true);
                if server_side {
                    ModelError::Transient(e.to_string())
                } else {
                    ModelError::Permanent(e.to_string())
                }
            }
            OpenAIError::ApiError(api) => {
                let kind = api.r#type.clone().unwrap_or_default();
                if kind == "server_error" || kind == "service_unavailable" {
                    ModelError::Transient(api.message)
                } else {
                    ModelError::Permanent(api.message)
                }
            }
            OpenAIError::StreamError(msg) => ModelError::Transient(msg),
            // Gateways answer 502/503/504 with HTML, which surfaces as a
            // body that is not an API payload.
            err @ OpenAIError::JSONDeserialize(_) => ModelError::Transient(err.to_string()),
            other => ModelError::Permanent(other.to_string()),
        }
    }
}

/// Error type for node operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum NodeError {
    #[error("Node execution: {0}")]
    Execution(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Node {node} timed out after {seconds}s")]
    Timeout { node: String, seconds: u64 },

    #[error("Subgraph execution: {0}")]
    SubgraphExecution(String),

    #[error("Other: {0}")]
    Other(String),
}

impl NodeError {
    pub fn is_transient(&self) -> bool {
        match self {
            NodeError::Model(e) => e.is_transient(),
            NodeError::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<anyhow::Error> for NodeError {
    fn from(err: anyhow::Error) -> Self {
        NodeError::Other(err.to_string())
    }
}

/// Lets node bodies use `?` on state accessors such as `FieldState::require_f64`.
impl From<GraphError> for NodeError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Node(inner) => inner,
            other => NodeError::Execution(other.to_string()),
        }
    }
}

impl From<OpenAIError> for NodeError {
    fn from(err: OpenAIError) -> Self {
        NodeError::Model(err.into())
    }
}

/// Error type for overall graph operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum GraphError {
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Router for node {node} returned unmapped label {label}")]
    UnmappedLabel { node: String, label: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    // NodeError can bubble up automatically
    #[error(transparent)]
    Node(#[from] NodeError),

    // Catch-all for other errors like anyhow
    #[error("Other: {0}")]
    Other(String),
}

impl GraphError {
    /// Whether the failure came from a transient model/network condition.
    /// The driver never retries; callers layer their own policy on this.
    pub fn is_transient(&self) -> bool {
        match self {
            GraphError::Node(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<anyhow::Error> for GraphError {
    fn from(err: anyhow::Error) -> Self {
        GraphError::Other(err.to_string())
    }
}

impl From<ModelError> for GraphError {
    fn from(err: ModelError) -> Self {
        GraphError::Node(NodeError::Model(err))
    }
}
