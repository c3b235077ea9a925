use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Working memory tools share across calls within one run.
///
/// Owned by the state of that run and passed to each tool call by `&mut`, so
/// two concurrent runs never see each other's memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolMemory(Map<String, Value>);

impl ToolMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Appends `text` to the string stored under `key`, creating it if absent.
    /// A non-string value under `key` is replaced.
    pub fn append_text(&mut self, key: &str, text: &str) -> &str {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::String(String::new()));
        let mut current = match entry.take() {
            Value::String(s) => s,
            _ => String::new(),
        };
        current.push_str(text);
        *entry = Value::String(current);
        entry.as_str().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_text() {
        let mut memory = ToolMemory::new();
        memory.append_text("document", "first\n");
        let doc = memory.append_text("document", "second\n").to_string();

        assert_eq!(doc, "first\nsecond\n");
        assert_eq!(memory.get_str("document"), Some("first\nsecond\n"));
    }

    #[test]
    fn test_append_text_replaces_non_string() {
        let mut memory = ToolMemory::new();
        memory.insert("document", json!(3));
        memory.append_text("document", "x");
        assert_eq!(memory.get_str("document"), Some("x"));
    }
}
