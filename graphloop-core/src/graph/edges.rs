use super::{END, START};
use crate::types::{GraphError, GraphResult};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::sync::Arc;
use tracing::warn;

/// A label a conditional router can return.
///
/// Closed label sets (usually an enum, see `#[derive(RouteLabel)]`) return
/// every variant from [`all`](RouteLabel::all) so that `build()` can reject a
/// path map that misses one. Free-form labels (`String`, `&'static str`) keep
/// the default and are only checked when the router returns them.
pub trait RouteLabel: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    fn all() -> Option<Vec<Self>> {
        None
    }

    /// Text used in errors and diagrams
    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

impl RouteLabel for String {
    fn describe(&self) -> String {
        self.clone()
    }
}

impl RouteLabel for &'static str {
    fn describe(&self) -> String {
        self.to_string()
    }
}

type Resolver<S> = Arc<dyn Fn(&S) -> std::result::Result<String, String> + Send + Sync>;

/// A conditional edge with its label type erased.
///
/// The resolver returns the mapped target, or the description of a label
/// missing from the path map.
pub struct Branch<S> {
    resolve: Resolver<S>,
    labels: Vec<(String, String)>,
    unmapped: Vec<String>,
}

impl<S: 'static> Branch<S> {
    pub fn new<L, F, I, K, T>(router: F, path_map: I) -> Self
    where
        L: RouteLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
        I: IntoIterator<Item = (K, T)>,
        K: Into<L>,
        T: Into<String>,
    {
        let entries: Vec<(L, String)> = path_map
            .into_iter()
            .map(|(label, target)| (label.into(), target.into()))
            .collect();
        let labels = entries
            .iter()
            .map(|(label, target)| (label.describe(), target.clone()))
            .collect();
        let map: HashMap<L, String> = entries.into_iter().collect();

        let unmapped = L::all()
            .unwrap_or_default()
            .into_iter()
            .filter(|label| !map.contains_key(label))
            .map(|label| label.describe())
            .collect();

        let resolve = move |state: &S| {
            let label = router(state);
            map.get(&label).cloned().ok_or_else(|| label.describe())
        };

        Self {
            resolve: Arc::new(resolve),
            labels,
            unmapped,
        }
    }
}

impl<S> Branch<S> {
    /// `(label, target)` pairs in the order they were given
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|(_, target)| target.as_str())
    }
}

impl<S> Clone for Branch<S> {
    fn clone(&self) -> Self {
        Self {
            resolve: Arc::clone(&self.resolve),
            labels: self.labels.clone(),
            unmapped: self.unmapped.clone(),
        }
    }
}

impl<S> Debug for Branch<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Branch")
            .field("labels", &self.labels)
            .finish()
    }
}

/// Edge definition for graph transitions
pub enum Edge<S> {
    /// Fixed next node
    Direct(String),
    /// Next node chosen from the state
    Conditional(Branch<S>),
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Edge::Direct(target) => Edge::Direct(target.clone()),
            Edge::Conditional(branch) => Edge::Conditional(branch.clone()),
        }
    }
}

impl<S> Debug for Edge<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Edge::Direct(target) => f.debug_tuple("Direct").field(target).finish(),
            Edge::Conditional(branch) => f.debug_tuple("Conditional").field(branch).finish(),
        }
    }
}

/// Static and conditional edges, keyed by source node.
///
/// A static edge wins over a conditional one registered for the same source.
pub struct EdgeRouter<S> {
    direct: HashMap<String, String>,
    conditional: HashMap<String, Branch<S>>,
    sources: Vec<String>,
}

impl<S> Clone for EdgeRouter<S> {
    fn clone(&self) -> Self {
        Self {
            direct: self.direct.clone(),
            conditional: self.conditional.clone(),
            sources: self.sources.clone(),
        }
    }
}

impl<S> Default for EdgeRouter<S> {
    fn default() -> Self {
        Self {
            direct: HashMap::new(),
            conditional: HashMap::new(),
            sources: Vec::new(),
        }
    }
}

impl<S> EdgeRouter<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        self.track(&from);
        if let Some(previous) = self.direct.insert(from.clone(), to.into()) {
            warn!(source = %from, replaced = %previous, "replacing static edge");
        }
    }

    pub fn add_conditional(&mut self, from: impl Into<String>, branch: Branch<S>) {
        let from = from.into();
        self.track(&from);
        if self.conditional.insert(from.clone(), branch).is_some() {
            warn!(source = %from, "replacing conditional edge");
        }
    }

    fn track(&mut self, from: &str) {
        if !self.sources.iter().any(|s| s == from) {
            self.sources.push(from.to_string());
        }
    }

    pub fn has_edge_from(&self, from: &str) -> bool {
        self.direct.contains_key(from) || self.conditional.contains_key(from)
    }

    /// The edge that decides where `from` goes, in registration order of sources
    pub fn edges(&self) -> impl Iterator<Item = (&str, Edge<S>)> {
        self.sources.iter().filter_map(move |from| {
            self.edge(from).map(|edge| (from.as_str(), edge))
        })
    }

    fn edge(&self, from: &str) -> Option<Edge<S>> {
        if let Some(to) = self.direct.get(from) {
            return Some(Edge::Direct(to.clone()));
        }
        self.conditional
            .get(from)
            .map(|branch| Edge::Conditional(branch.clone()))
    }

    /// Picks the node after `from` for the given state.
    pub fn resolve(&self, from: &str, state: &S) -> GraphResult<String> {
        if let Some(to) = self.direct.get(from) {
            return Ok(to.clone());
        }

        let branch = self.conditional.get(from).ok_or_else(|| {
            GraphError::InvalidTransition(format!("No transition defined from node: {}", from))
        })?;
        (branch.resolve)(state).map_err(|label| GraphError::UnmappedLabel {
            node: from.to_string(),
            label,
        })
    }

    /// Checks every edge against the registered node names.
    pub fn validate(&self, is_node: impl Fn(&str) -> bool) -> GraphResult<()> {
        if !self.has_edge_from(START) {
            return Err(GraphError::UnknownNode(format!("{} (no entry edge)", START)));
        }

        let check_source = |from: &str| -> GraphResult<()> {
            if from == END {
                return Err(GraphError::InvalidTransition(format!(
                    "{} cannot have outgoing edges",
                    END
                )));
            }
            if from != START && !is_node(from) {
                return Err(GraphError::UnknownNode(from.to_string()));
            }
            Ok(())
        };
        let check_target = |to: &str| -> GraphResult<()> {
            if to == START {
                return Err(GraphError::InvalidTransition(format!(
                    "{} cannot be an edge target",
                    START
                )));
            }
            if to != END && !is_node(to) {
                return Err(GraphError::UnknownNode(to.to_string()));
            }
            Ok(())
        };

        for (from, to) in &self.direct {
            check_source(from)?;
            check_target(to)?;
        }
        for (from, branch) in &self.conditional {
            check_source(from)?;
            for target in branch.targets() {
                check_target(target)?;
            }
            if let Some(label) = branch.unmapped.first() {
                return Err(GraphError::UnmappedLabel {
                    node: from.clone(),
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<S> Debug for EdgeRouter<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("EdgeRouter")
            .field("direct", &self.direct)
            .field("conditional", &self.conditional)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Op {
        Add,
        Divide,
    }

    impl RouteLabel for Op {
        fn all() -> Option<Vec<Self>> {
            Some(vec![Op::Add, Op::Divide])
        }
    }

    fn op_of(state: &String) -> Op {
        if state == "divide" {
            Op::Divide
        } else {
            Op::Add
        }
    }

    #[test]
    fn test_static_edge_wins() {
        let mut router: EdgeRouter<String> = EdgeRouter::new();
        router.add_conditional("a", Branch::new(|_: &String| "x", [("x", "c")]));
        router.add_static("a", "b");

        assert_eq!(router.resolve("a", &String::new()).unwrap(), "b");
    }

    #[test]
    fn test_conditional_resolution() {
        let mut router: EdgeRouter<String> = EdgeRouter::new();
        router.add_conditional(
            "router",
            Branch::new(op_of, [(Op::Add, "add_node"), (Op::Divide, "divide_node")]),
        );

        assert_eq!(router.resolve("router", &"divide".to_string()).unwrap(), "divide_node");
        assert_eq!(router.resolve("router", &"add".to_string()).unwrap(), "add_node");
    }

    #[test]
    fn test_unmapped_label_at_resolution() {
        let mut router: EdgeRouter<String> = EdgeRouter::new();
        router.add_conditional(
            "router",
            Branch::new(|s: &String| s.clone(), [("add", "add_node")]),
        );

        let err = router.resolve("router", &"modulo".to_string()).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnmappedLabel {
                node: "router".into(),
                label: "modulo".into()
            }
        );
    }

    #[test]
    fn test_missing_edge_is_invalid_transition() {
        let router: EdgeRouter<String> = EdgeRouter::new();
        assert!(matches!(
            router.resolve("orphan", &String::new()),
            Err(GraphError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_validate_closed_labels() {
        let mut router: EdgeRouter<String> = EdgeRouter::new();
        router.add_static(START, "router");
        router.add_conditional("router", Branch::new(op_of, [(Op::Add, "add_node")]));

        let err = router
            .validate(|name| ["router", "add_node"].contains(&name))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::UnmappedLabel {
                node: "router".into(),
                label: "Divide".into()
            }
        );
    }

    #[test]
    fn test_validate_unknown_target_and_entry() {
        let mut router: EdgeRouter<String> = EdgeRouter::new();
        router.add_static("a", END);
        assert!(matches!(
            router.validate(|name| name == "a"),
            Err(GraphError::UnknownNode(_))
        ));

        router.add_static(START, "missing");
        assert_eq!(
            router.validate(|name| name == "a"),
            Err(GraphError::UnknownNode("missing".into()))
        );
    }

    /// A state type with none of the derived traits
    struct Opaque(u8);

    #[test]
    fn test_edges_of_non_clone_state() {
        let mut router: EdgeRouter<Opaque> = EdgeRouter::new();
        router.add_static(START, "check");
        router.add_conditional(
            "check",
            Branch::new(
                |s: &Opaque| if s.0 > 0 { "yes" } else { "no" },
                [("yes", "check"), ("no", END)],
            ),
        );

        let copy = router.clone();
        assert!(copy.validate(|name| name == "check").is_ok());
        assert_eq!(copy.resolve("check", &Opaque(0)).unwrap(), END);

        let edges: Vec<_> = copy.edges().collect();
        assert!(matches!(&edges[0], (START, Edge::Direct(to)) if to == "check"));
        let (_, Edge::Conditional(branch)) = edges[1].clone() else {
            panic!("expected a conditional edge, got {:?}", edges[1]);
        };
        assert_eq!(branch.targets().collect::<Vec<_>>(), vec!["check", END]);
    }
}
