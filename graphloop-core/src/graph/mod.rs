mod core;
mod edges;
mod marker;
mod mermaid;
mod outcome;
mod registry;
mod subgraph;

pub use self::core::{Graph, END, START};
pub use edges::{Branch, Edge, EdgeRouter, RouteLabel};
pub use marker::{Built, NotBuilt};
pub use outcome::{GraphEvent, RunConfig, RunOutcome, Termination, DEFAULT_MAX_ITERATIONS};
pub use registry::NodeRegistry;
pub use subgraph::Subgraph;
