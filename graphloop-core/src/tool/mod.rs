mod executor;
mod memory;
mod node;

pub use executor::{ToolDispatch, ToolExecutor};
pub use memory::ToolMemory;
pub use node::{tools_condition, ToolNode, ToolsRoute};

use crate::types::ToolError;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Name, description and argument schema a model needs to request a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool the executor can call by name.
///
/// Results are plain strings because they are fed back to the model as the
/// content of a `tool` message.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn call(&self, arguments: Value, memory: &mut ToolMemory) -> Result<String, ToolError>;
}

/// Typed tool definition. Usually generated with `#[tools(...)]`.
#[async_trait]
pub trait ToolFunction: Send + Sync {
    /// The parameter type for the tool
    type Params: JsonSchema + DeserializeOwned + Send;
    /// The response type for the tool
    type Response: Serialize + Send;

    /// Get the name of the tool
    fn name() -> &'static str;

    /// Get a description of what the tool does
    fn description() -> &'static str;

    /// Get the JSON Schema for the tool's parameters
    fn parameters_schema() -> Value {
        let schema = schemars::schema_for!(Self::Params);
        let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}));
        if let Some(obj) = value.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        value
    }

    fn spec() -> ToolSpec {
        ToolSpec {
            name: Self::name().to_string(),
            description: Self::description().to_string(),
            parameters: Self::parameters_schema(),
        }
    }

    /// Execute the tool with the given parameters
    async fn execute(
        &self,
        params: Self::Params,
        memory: &mut ToolMemory,
    ) -> Result<Self::Response, ToolError>;
}

/// Adapts a [`ToolFunction`] to the dynamically dispatched [`Tool`] interface.
#[derive(Clone)]
pub struct TypedTool<T>(pub T);

#[async_trait]
impl<T> Tool for TypedTool<T>
where
    T: ToolFunction + 'static,
{
    fn spec(&self) -> ToolSpec {
        T::spec()
    }

    async fn call(&self, arguments: Value, memory: &mut ToolMemory) -> Result<String, ToolError> {
        let params: T::Params = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let response = self.0.execute(params, memory).await?;
        Ok(render_result(serde_json::to_value(response)?))
    }
}

// Strings go back unquoted; everything else as compact JSON ("5", "[1,2]").
fn render_result(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

type ToolFn = dyn Fn(Value, &mut ToolMemory) -> Result<String, ToolError> + Send + Sync;

/// A tool backed by a synchronous closure over raw JSON arguments
#[derive(Clone)]
pub struct FnTool {
    spec: ToolSpec,
    f: Arc<ToolFn>,
}

impl FnTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        f: F,
    ) -> Self
    where
        F: Fn(Value, &mut ToolMemory) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            spec: ToolSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
            f: Arc::new(f),
        }
    }
}

impl Debug for FnTool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.spec.name).finish()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(&self, arguments: Value, memory: &mut ToolMemory) -> Result<String, ToolError> {
        (self.f)(arguments, memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    struct AddParams {
        a: i64,
        b: i64,
    }

    struct Add;

    #[async_trait]
    impl ToolFunction for Add {
        type Params = AddParams;
        type Response = i64;

        fn name() -> &'static str {
            "add"
        }

        fn description() -> &'static str {
            "Adds two numbers"
        }

        async fn execute(&self, params: AddParams, _memory: &mut ToolMemory) -> Result<i64, ToolError> {
            Ok(params.a + params.b)
        }
    }

    #[tokio::test]
    async fn test_typed_tool_renders_result() {
        let tool = TypedTool(Add);
        let mut memory = ToolMemory::new();

        let out = tool.call(json!({"a": 2, "b": 3}), &mut memory).await.unwrap();
        assert_eq!(out, "5");
    }

    #[tokio::test]
    async fn test_typed_tool_rejects_bad_arguments() {
        let tool = TypedTool(Add);
        let mut memory = ToolMemory::new();

        let err = tool.call(json!({"a": "two"}), &mut memory).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_schema_is_trimmed_for_models() {
        let spec = Add::spec();
        assert_eq!(spec.name, "add");
        assert_eq!(spec.parameters["type"], "object");
        assert!(spec.parameters["properties"]["a"].is_object());
        assert!(spec.parameters.get("$schema").is_none());
        assert!(spec.parameters.get("title").is_none());
    }

    #[test]
    fn test_render_result() {
        assert_eq!(render_result(json!("Document updated.")), "Document updated.");
        assert_eq!(render_result(json!(2.5)), "2.5");
        assert_eq!(render_result(json!({"sum": 5})), r#"{"sum":5}"#);
    }

    #[tokio::test]
    async fn test_fn_tool_uses_memory() {
        let tool = FnTool::new("remember", "Stores a note", json!({"type": "object"}), |args, memory| {
            let note = args["note"].as_str().unwrap_or_default().to_string();
            memory.insert("note", note);
            Ok("ok".into())
        });
        let mut memory = ToolMemory::new();

        tool.call(json!({"note": "milk"}), &mut memory).await.unwrap();
        assert_eq!(memory.get_str("note"), Some("milk"));
        assert_eq!(tool.spec().name, "remember");
    }
}
