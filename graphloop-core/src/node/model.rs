use crate::completion::{ChatModel, ModelOptions};
use crate::node::{Context, Node};
use crate::types::{FieldState, Message, MessageState, NodeError, NodeOutput, NodeResult};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::debug;

/// Calls the model with the state's conversation and appends the reply.
///
/// The system prompt, if any, is prepended on every call and never stored in
/// the state. Replies carrying tool calls are answered by the driver's tool
/// round trip or by a [`ToolNode`](crate::tool::ToolNode).
pub struct ModelNode {
    name: String,
    model: Arc<dyn ChatModel>,
    system_prompt: Option<String>,
    options: ModelOptions,
}

impl ModelNode {
    pub fn new(name: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            model,
            system_prompt: None,
            options: ModelOptions::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }
}

impl Debug for ModelNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelNode")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl<S: MessageState> Node<S> for ModelNode {
    async fn process(&self, ctx: &Context, mut state: S) -> NodeResult<S> {
        let mut conversation = Vec::with_capacity(state.messages().len() + 1);
        if let Some(prompt) = &self.system_prompt {
            conversation.push(Message::system(prompt.clone()));
        }
        conversation.extend_from_slice(state.messages());

        let reply = self.model.invoke(&conversation, &self.options).await?;
        debug!(
            trace_id = %ctx.trace_id,
            node = %self.name,
            tool_calls = reply.tool_calls.len(),
            "model replied"
        );

        state.append_messages(vec![reply]);
        Ok(NodeOutput::Full(state))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One prompt-template step over a [`FieldState`].
///
/// `{field}` placeholders in the template are filled from the state; the reply
/// text is stored under `output_field`. Chaining several of these with static
/// edges gives a research -> write -> critique style pipeline.
pub struct PromptNode {
    name: String,
    model: Arc<dyn ChatModel>,
    system_prompt: Option<String>,
    template: String,
    output_field: String,
    options: ModelOptions,
}

impl PromptNode {
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn ChatModel>,
        template: impl Into<String>,
        output_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            system_prompt: None,
            template: template.into(),
            output_field: output_field.into(),
            options: ModelOptions::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }
}

impl Debug for PromptNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptNode")
            .field("name", &self.name)
            .field("output_field", &self.output_field)
            .finish()
    }
}

#[async_trait]
impl Node<FieldState> for PromptNode {
    async fn process(&self, ctx: &Context, mut state: FieldState) -> NodeResult<FieldState> {
        let prompt = render_template(&self.template, &state)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        let reply = self.model.invoke(&messages, &self.options).await?;
        debug!(trace_id = %ctx.trace_id, node = %self.name, field = %self.output_field, "prompt answered");

        state.set(self.output_field.clone(), reply.content.trim().to_string());
        Ok(NodeOutput::Full(state))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Replaces `{name}` placeholders with field values. Braces that do not wrap
/// an identifier are copied through untouched.
pub(crate) fn render_template(template: &str, state: &FieldState) -> Result<String, NodeError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let ident_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());

        if ident_len > 0 && after[ident_len..].starts_with('}') {
            let key = &after[..ident_len];
            match state.require(key)? {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
            rest = &after[ident_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    Ok(out)
}
