use super::message::{Message, ToolCall};
use super::result::NodeOutput;
use crate::tool::ToolMemory;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

/// State carried between the nodes of a graph.
///
/// Usually derived with `#[derive(State)]`, which generates the `Update` enum
/// (one variant per field) and `apply` according to each field's strategy.
pub trait GraphState: Debug + Clone + Send + Sync + 'static {
    type Update: Debug + Send;

    /// Update this state with a single update.
    fn apply(&mut self, update: Self::Update);

    /// Apply multiple updates in sequence.
    fn apply_many<I: IntoIterator<Item = Self::Update>>(&mut self, updates: I) {
        for update in updates {
            self.apply(update);
        }
    }

    /// Fold a node's output into this state.
    ///
    /// A full state replaces the current one wholesale; updates are applied in
    /// order, so append-strategy fields (message sequences) grow instead of
    /// being overwritten.
    fn merge(mut self, output: NodeOutput<Self>) -> Self {
        match output {
            NodeOutput::Full(state) => state,
            NodeOutput::Updates(updates) => {
                self.apply_many(updates);
                self
            }
        }
    }
}

/// A state that owns a conversation history the tool executor can read and extend.
pub trait MessageState: GraphState {
    fn messages(&self) -> &[Message];

    fn append_messages(&mut self, messages: Vec<Message>);

    /// Working memory handed to tools. States without one get a scratch memory
    /// that is dropped after each dispatch.
    fn tool_memory(&mut self) -> Option<&mut ToolMemory> {
        None
    }

    fn last_message(&self) -> Option<&Message> {
        self.messages().last()
    }

    /// Tool calls requested by the last message, if it is an assistant turn.
    fn pending_tool_calls(&self) -> &[ToolCall] {
        match self.last_message() {
            Some(message) if message.has_tool_calls() => &message.tool_calls,
            _ => &[],
        }
    }
}

/// Field types usable with `#[update(merge)]`.
///
/// Unlike `append`, merging combines the update with the current value:
/// maps take the incoming entries and keep the rest, options only change on
/// `Some`, and JSON objects merge key by key.
pub trait MergeField {
    fn merge_from(&mut self, update: Self);
}

impl<T> MergeField for Option<T> {
    fn merge_from(&mut self, update: Self) {
        if update.is_some() {
            *self = update;
        }
    }
}

impl<K: Eq + Hash, V> MergeField for HashMap<K, V> {
    fn merge_from(&mut self, update: Self) {
        for (key, value) in update {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V> MergeField for BTreeMap<K, V> {
    fn merge_from(&mut self, update: Self) {
        for (key, value) in update {
            self.insert(key, value);
        }
    }
}

impl MergeField for Value {
    fn merge_from(&mut self, update: Self) {
        match (self, update) {
            (Value::Object(current), Value::Object(update)) => {
                for (key, value) in update {
                    match current.get_mut(&key) {
                        Some(existing) => existing.merge_from(value),
                        None => {
                            current.insert(key, value);
                        }
                    }
                }
            }
            (current, update) => *current = update,
        }
    }
}
