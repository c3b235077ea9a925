mod error;
mod fields;
mod message;
mod result;
mod state;

pub use error::{GraphError, ModelError, NodeError, ToolError};
pub use fields::{FieldState, FieldUpdate};
pub use message::{Message, Role, ToolCall, ToolStatus};
pub use result::{GraphResult, NodeOutput, NodeResult};
pub use state::{GraphState, MergeField, MessageState};
