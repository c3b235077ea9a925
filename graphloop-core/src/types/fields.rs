use super::message::Message;
use super::result::GraphResult;
use super::state::{GraphState, MessageState};
use super::error::GraphError;
use crate::tool::ToolMemory;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dynamic state: an insertion-ordered mapping from field name to JSON value,
/// plus a message channel and the tools' working memory.
///
/// Useful when a graph is assembled at runtime or the set of fields is not
/// worth a struct. Nothing is synthesized: fields exist only once a caller or
/// a node sets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    fields: Map<String, Value>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    memory: ToolMemory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(String, Value),
    Remove(String),
    AppendMessages(Vec<Message>),
}

impl FieldUpdate {
    pub fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldUpdate::Set(key.into(), value.into())
    }
}

impl FieldState {
    /// Builds the initial state from caller-supplied key/value pairs.
    pub fn initialize<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn memory(&self) -> &ToolMemory {
        &self.memory
    }

    /// Presence check used by nodes before they read a field.
    pub fn require(&self, key: &str) -> GraphResult<&Value> {
        self.fields
            .get(key)
            .ok_or_else(|| GraphError::InvalidState(format!("missing field `{}`", key)))
    }

    pub fn require_f64(&self, key: &str) -> GraphResult<f64> {
        self.require(key)?.as_f64().ok_or_else(|| {
            GraphError::InvalidState(format!("field `{}` is not a number", key))
        })
    }

    pub fn require_str(&self, key: &str) -> GraphResult<&str> {
        self.require(key)?.as_str().ok_or_else(|| {
            GraphError::InvalidState(format!("field `{}` is not a string", key))
        })
    }
}

impl GraphState for FieldState {
    type Update = FieldUpdate;

    fn apply(&mut self, update: Self::Update) {
        match update {
            FieldUpdate::Set(key, value) => {
                self.fields.insert(key, value);
            }
            FieldUpdate::Remove(key) => {
                self.fields.shift_remove(&key);
            }
            FieldUpdate::AppendMessages(messages) => self.messages.extend(messages),
        }
    }
}

impl MessageState for FieldState {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn append_messages(&mut self, messages: Vec<Message>) {
        self.messages.extend(messages);
    }

    fn tool_memory(&mut self) -> Option<&mut ToolMemory> {
        Some(&mut self.memory)
    }
}
