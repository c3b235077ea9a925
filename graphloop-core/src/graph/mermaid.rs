use super::{Edge, END, START};
use std::fmt::Write;

/// Mermaid flowchart text: solid arrows for static edges, dotted labelled
/// arrows for conditional ones.
pub(crate) fn render<'a, S>(
    nodes: impl Iterator<Item = &'a str>,
    edges: impl Iterator<Item = (&'a str, Edge<S>)>,
) -> String {
    let mut out = String::from("flowchart TD\n");
    // Writing to a String cannot fail.
    let _ = writeln!(out, "    {}([{}])", START, START);
    for node in nodes {
        let _ = writeln!(out, "    {}[{}]", node, node);
    }
    let _ = writeln!(out, "    {}([{}])", END, END);

    for (from, edge) in edges {
        match edge {
            Edge::Direct(to) => {
                let _ = writeln!(out, "    {} --> {}", from, to);
            }
            Edge::Conditional(branch) => {
                for (label, to) in branch.labels() {
                    let _ = writeln!(out, "    {} -.->|{}| {}", from, label, to);
                }
            }
        }
    }
    out
}
