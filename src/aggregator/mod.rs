//! Stack resolution, time attribution and metrics.
//!
//! This module transforms a decoded profile into:
//! - Resolved, interned function stacks
//! - Self/cumulative timing under one attribution policy
//! - Raw call edges for the call graph
//! - Hot-function and hot-path rankings

pub mod metrics;
pub mod stack_builder;
pub mod timing;

// Re-export main types and functions
pub use metrics::{
    calculate_hot_functions, calculate_hot_paths, calculate_weight_distribution, HotFunction,
    HotPath, SortKey, WeightDistribution,
};
pub use stack_builder::{
    build_collapsed_stacks, resolve_stack, resolve_stacks, CollapsedStack, FunctionId,
    FunctionInterner, ResolvedProfile, ResolvedStack,
};
pub use timing::{aggregate, aggregate_timing, Aggregation, SamplingClock, SelfTimePolicy, TimingTable};
