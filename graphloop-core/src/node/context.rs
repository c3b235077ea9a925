use std::collections::HashMap;

/// Per-run context handed to every node and tool call.
///
/// Carries no state: two runs with equal inputs behave the same whatever
/// their trace ids are. The trace id tags every log event of the run.
#[derive(Debug, Clone)]
pub struct Context {
    /// Trace of the enclosing run, set for subgraph runs
    pub parent_trace_id: Option<String>,
    pub trace_id: String,
    /// Free-form labels attached by the caller
    pub metadata: HashMap<String, String>,
}

impl Default for Context {
    /// A context with a random trace id
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

impl Context {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            parent_trace_id: None,
            trace_id: trace_id.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// A fresh trace nested under this one, used for subgraph runs
    pub fn child(&self) -> Self {
        Self {
            parent_trace_id: Some(self.trace_id.clone()),
            trace_id: uuid::Uuid::new_v4().to_string(),
            metadata: self.metadata.clone(),
        }
    }
}
