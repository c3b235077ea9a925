use super::{Tool, ToolFunction, ToolMemory, ToolSpec, TypedTool};
use crate::node::Context;
use crate::types::{Message, MessageState, ToolCall, ToolError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves pending tool calls found in a state.
///
/// The graph driver only sees this seam; [`ToolExecutor`] is the implementation.
#[async_trait]
pub trait ToolDispatch<S>: Send + Sync {
    fn has_pending(&self, state: &S) -> bool;

    async fn dispatch(&self, ctx: &Context, state: S) -> S;
}

/// Registry of tools plus the logic that answers an assistant's tool calls
#[derive(Clone, Default)]
pub struct ToolExecutor {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name replaces the earlier one.
    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        let name = tool.spec().name;
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            warn!(tool = %name, "replacing previously registered tool");
        } else {
            self.order.push(name);
        }
        self
    }

    /// Register a typed tool function
    pub fn with_function<T: ToolFunction + 'static>(self, function: T) -> Self {
        self.with_tool(TypedTool(function))
    }

    /// Bound every tool call. A call that exceeds it becomes an error message.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Schemas of all registered tools, in registration order
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    /// Answers the tool calls of the state's last message.
    ///
    /// Calls run one at a time in request order and each produces exactly one
    /// `tool` message, appended in the same order. Failures (unknown tool, bad
    /// arguments, tool error, timeout) become error messages instead of
    /// aborting the run. A state with nothing pending is returned unchanged.
    pub async fn dispatch<S: MessageState>(&self, ctx: &Context, mut state: S) -> S {
        let calls = state.pending_tool_calls().to_vec();
        if calls.is_empty() {
            return state;
        }

        let mut scratch = ToolMemory::new();
        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            let memory = match state.tool_memory() {
                Some(memory) => memory,
                None => &mut scratch,
            };
            results.push(self.call(ctx, call, memory).await);
        }

        state.append_messages(results);
        state
    }

    /// Runs a single tool call and wraps the outcome as a `tool` message
    pub async fn call(&self, ctx: &Context, call: &ToolCall, memory: &mut ToolMemory) -> Message {
        match self.try_call(call, memory).await {
            Ok(content) => {
                debug!(trace_id = %ctx.trace_id, tool = %call.name, call_id = %call.id, "tool call succeeded");
                Message::tool(call, content)
            }
            Err(err) => {
                warn!(trace_id = %ctx.trace_id, tool = %call.name, call_id = %call.id, error = %err, "tool call failed");
                Message::tool_error(call, format!("Error: {}", err))
            }
        }
    }

    async fn try_call(&self, call: &ToolCall, memory: &mut ToolMemory) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let arguments = call.arguments.clone();
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, tool.call(arguments, memory))
                .await
                .map_err(|_| {
                    ToolError::Timeout(format!("{} did not finish within {:?}", call.name, limit))
                })?,
            None => tool.call(arguments, memory).await,
        }
    }
}

impl Debug for ToolExecutor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("tools", &self.order)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl<S: MessageState> ToolDispatch<S> for ToolExecutor {
    fn has_pending(&self, state: &S) -> bool {
        !state.pending_tool_calls().is_empty()
    }

    async fn dispatch(&self, ctx: &Context, state: S) -> S {
        ToolExecutor::dispatch(self, ctx, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::FnTool;
    use crate::types::{FieldState, ToolStatus};
    use serde_json::json;

    fn add_tool() -> FnTool {
        FnTool::new("add", "Adds a and b", json!({"type": "object"}), |args, _| {
            let a = args["a"].as_i64().ok_or_else(|| ToolError::InvalidArguments("a".into()))?;
            let b = args["b"].as_i64().ok_or_else(|| ToolError::InvalidArguments("b".into()))?;
            Ok((a + b).to_string())
        })
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "slow".into(),
                description: "Takes its time".into(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn call(&self, _arguments: serde_json::Value, _memory: &mut ToolMemory) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("late".into())
        }
    }

    fn state_with_calls(calls: Vec<ToolCall>) -> FieldState {
        FieldState::default().with_messages(vec![
            Message::user("do it"),
            Message::assistant("").with_tool_calls(calls),
        ])
    }

    #[tokio::test]
    async fn test_no_pending_calls_is_noop() {
        let executor = ToolExecutor::new().with_tool(add_tool());
        let state = FieldState::default().with_messages(vec![Message::assistant("done")]);

        let out = executor.dispatch(&Context::new("t"), state.clone()).await;
        assert_eq!(out, state);
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let executor = ToolExecutor::new().with_tool(add_tool());
        let state = state_with_calls(vec![
            ToolCall::new("c1", "add", json!({"a": 2, "b": 3})),
            ToolCall::new("c2", "add", json!({"a": 10, "b": 1})),
        ]);

        let out = executor.dispatch(&Context::new("t"), state).await;
        let tail = &out.messages()[2..];
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "5");
        assert_eq!(tail[0].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(tail[1].content, "11");
        assert_eq!(tail[1].tool_call_id.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_message() {
        let executor = ToolExecutor::new().with_tool(add_tool());
        let state = state_with_calls(vec![
            ToolCall::new("c1", "divide", json!({})),
            ToolCall::new("c2", "add", json!({"a": 1, "b": 1})),
        ]);

        let out = executor.dispatch(&Context::new("t"), state).await;
        let failed = &out.messages()[2];
        assert_eq!(failed.status, Some(ToolStatus::Error));
        assert!(failed.content.contains("Unknown tool: divide"));
        assert_eq!(out.messages()[3].content, "2");
    }

    #[tokio::test]
    async fn test_timeout_becomes_message() {
        let executor = ToolExecutor::new()
            .with_tool(SlowTool)
            .with_timeout(Duration::from_millis(10));
        let state = state_with_calls(vec![ToolCall::new("c1", "slow", json!({}))]);

        let out = executor.dispatch(&Context::new("t"), state).await;
        let last = out.last_message().unwrap();
        assert_eq!(last.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(last.status, Some(ToolStatus::Error));
        assert!(last.content.contains("Timed out"));
    }

    #[test]
    fn test_specs_in_registration_order() {
        let executor = ToolExecutor::new().with_tool(add_tool()).with_tool(SlowTool);
        let names: Vec<_> = executor.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["add", "slow"]);
        assert!(executor.contains("add"));
        assert!(!executor.contains("divide"));
    }
}
