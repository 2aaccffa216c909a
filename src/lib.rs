//! profgraph
//!
//! Call graph and flame graph generation from sampled CPU profiles.
//!
//! The pipeline reads a pprof JSON or folded-stack profile, resolves every
//! sample into a stack of interned functions, attributes self and
//! cumulative time, prunes the call graph, lays it out (layered or
//! force-directed) and renders SVGs plus a JSON report.
//!
//! ## Getting Started
//!
//! ```bash
//! profgraph analyze -i cpu.pb.json --callgraph callgraph.svg --flamegraph flame.svg
//! profgraph top -i cpu.folded -n 20
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod graph;
pub mod layout;
pub mod output;
pub mod parser;
pub mod utils;
