//! Flame tree construction and flame graph rendering.
//!
//! Resolved stacks are folded into an arena tree, which is rendered as an
//! SVG flame graph (root at the bottom).

pub mod generator;
pub mod tree;

// Re-export main types
pub use generator::{
    generate_flamegraph, generate_text_summary, get_truncated_name, FlameStats, FlamegraphConfig,
    NodeCategory,
};
pub use tree::{build_flame_tree, FlameFrame, FlameNode, FlameNodeId, FlameSummary, FlameTree};
