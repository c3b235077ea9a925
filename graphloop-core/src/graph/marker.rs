/// Typestate of a graph that is still being wired
#[derive(Debug)]
pub struct NotBuilt;

/// Typestate of a validated, runnable graph
#[derive(Debug)]
pub struct Built;
