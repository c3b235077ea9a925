use super::convert::{from_response_message, to_openai_tool, to_request_messages};
use super::{ChatModel, ModelOptions, TracingProvider};
use crate::tool::ToolSpec;
use crate::types::{Message, ModelError};
use async_openai::{
    config::OpenAIConfig,
    types::{CreateChatCompletionRequest, CreateChatCompletionRequestArgs},
    Client as OpenAIClient,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`ChatModel`] backed by the OpenAI chat completions API
#[derive(Clone)]
pub struct OpenAiChatModel {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
    tools: Vec<ToolSpec>,
    timeout: Duration,
    tracer: Option<Arc<dyn TracingProvider>>,
}

impl OpenAiChatModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new().with_api_key(api_key))
    }

    /// Builds a client from `OPENAI_API_KEY` and the optional `OPENAI_API_BASE`
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::Permanent("OPENAI_API_KEY is not set".to_string()))?;
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config = config.with_api_base(base);
        }
        Ok(Self::with_config(config))
    }

    fn with_config(config: OpenAIConfig) -> Self {
        Self {
            client: OpenAIClient::with_config(config),
            model: DEFAULT_MODEL.to_string(),
            tools: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            tracer: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Tool schemas offered to the model on every call
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Upper bound for a single completion call, and for each trace record
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn TracingProvider>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &ModelOptions,
    ) -> Result<CreateChatCompletionRequest, ModelError> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(self.model.clone())
            .messages(to_request_messages(messages)?);
        if let Some(temperature) = options.temperature {
            builder.temperature(temperature);
        }
        if let Some(tokens) = options.max_output_tokens {
            builder.max_tokens(tokens);
        }
        if !self.tools.is_empty() {
            builder.tools(self.tools.iter().map(to_openai_tool).collect::<Vec<_>>());
        }

        builder
            .build()
            .map_err(|e| ModelError::Permanent(format!("could not build request: {}", e)))
    }

    async fn trace_start(&self, trace_id: Uuid, request: &CreateChatCompletionRequest) {
        let Some(tracer) = &self.tracer else { return };
        let inputs = serde_json::to_value(request)
            .unwrap_or_else(|_| json!({ "error": "Failed to serialize request" }));
        let started = tracer.start_trace(trace_id, "chat_completion", "llm", &inputs, None, SystemTime::now());
        match tokio::time::timeout(self.timeout, started).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%trace_id, error = %err, "could not start model trace"),
            Err(_) => warn!(%trace_id, "starting the model trace timed out"),
        }
    }

    async fn trace_end(&self, trace_id: Uuid, outputs: Value) {
        let Some(tracer) = &self.tracer else { return };
        let ended = tracer.end_trace(trace_id, &outputs, SystemTime::now());
        match tokio::time::timeout(self.timeout, ended).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%trace_id, error = %err, "could not end model trace"),
            Err(_) => warn!(%trace_id, "ending the model trace timed out"),
        }
    }
}

impl Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .field("timeout", &self.timeout)
            .field("traced", &self.tracer.is_some())
            .finish()
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(
        &self,
        messages: &[Message],
        options: &ModelOptions,
    ) -> Result<Message, ModelError> {
        let request = self.build_request(messages, options)?;
        let trace_id = Uuid::new_v4();
        self.trace_start(trace_id, &request).await;

        let result = match tokio::time::timeout(self.timeout, self.client.chat().create(request)).await {
            Ok(response) => response.map_err(ModelError::from),
            Err(_) => Err(ModelError::Transient(format!(
                "model call did not finish within {:?}",
                self.timeout
            ))),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.trace_end(trace_id, json!({ "error": err.to_string() })).await;
                return Err(err);
            }
        };

        self.trace_end(
            trace_id,
            serde_json::to_value(&response)
                .unwrap_or_else(|_| json!({ "error": "Failed to serialize response" })),
        )
        .await;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Permanent("response contained no choices".to_string()))?;
        let reply = from_response_message(choice.message);
        debug!(model = %self.model, tool_calls = reply.tool_calls.len(), "chat completion received");
        Ok(reply)
    }
}
