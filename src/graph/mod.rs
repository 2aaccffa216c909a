//! Function-level call graph: construction, pruning and rendering.

pub mod call_graph;
pub mod generator;
pub mod pruner;

pub use call_graph::CallGraph;
pub use generator::{generate_callgraph, CallGraphView};
pub use pruner::{prune, PruneThreshold, PrunedGraph};
