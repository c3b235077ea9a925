use super::{END, START};
use crate::node::Node;
use crate::types::{GraphError, GraphResult, GraphState};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;

/// Nodes of a graph by name, kept in registration order
pub struct NodeRegistry<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    order: Vec<String>,
}

impl<S> Default for NodeRegistry<S> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<S: GraphState> NodeRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node under its own name. Names are unique and `START`/`END` are reserved.
    pub fn register(&mut self, node: Arc<dyn Node<S>>) -> GraphResult<()> {
        let name = node.name().to_string();
        if name == START || name == END {
            return Err(GraphError::InvalidState(format!(
                "node name {} is reserved",
                name
            )));
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        self.order.push(name.clone());
        self.nodes.insert(name, node);
        Ok(())
    }

    pub fn get(&self, name: &str) -> GraphResult<&Arc<dyn Node<S>>> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<S> Debug for NodeRegistry<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_list().entries(self.order.iter()).finish()
    }
}
