//! Remove immaterial functions from the call graph.

use super::call_graph::CallGraph;
use crate::aggregator::{SamplingClock, TimingTable};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum cumulative cost a function needs to survive pruning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruneThreshold {
    /// Wall-clock seconds, converted through the sampling clock
    Seconds(f64),

    /// Raw sample weight
    Weight(u64),
}

impl fmt::Display for PruneThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneThreshold::Seconds(secs) => write!(f, "{}s", secs),
            PruneThreshold::Weight(weight) => write!(f, "{} samples", weight),
        }
    }
}

impl PruneThreshold {
    /// Threshold expressed in sample weight
    ///
    /// Fractional weights round up, so a function needs at least the full
    /// duration to survive. With an unknown sampling rate a seconds threshold
    /// cannot be converted and keeps everything.
    pub fn to_weight(self, clock: &SamplingClock) -> u64 {
        match self {
            PruneThreshold::Weight(weight) => weight,
            PruneThreshold::Seconds(secs) => {
                if clock.seconds_per_sample <= 0.0 {
                    warn!(
                        "Seconds per sample is zero; a {}s threshold cannot be applied, keeping all functions",
                        secs
                    );
                    return 0;
                }
                (secs / clock.seconds_per_sample).max(0.0).ceil() as u64
            }
        }
    }
}

/// Result of pruning
#[derive(Debug, Clone)]
pub struct PrunedGraph {
    pub graph: CallGraph,

    /// Threshold actually applied, in sample weight
    pub threshold_weight: u64,
    pub dropped_nodes: usize,
    pub dropped_edges: usize,
}

/// Drop functions whose cumulative weight is below `threshold`
///
/// **Public** - main entry point for pruning
///
/// Edges touching a dropped function go with it, and a caller left with no
/// surviving callees disappears from the graph.
pub fn prune(
    graph: &CallGraph,
    timing: &TimingTable,
    threshold: PruneThreshold,
    clock: &SamplingClock,
) -> PrunedGraph {
    let threshold_weight = threshold.to_weight(clock);

    let mut pruned = graph.clone();
    pruned.retain_nodes(|id| timing.cum_weight(id) >= threshold_weight);

    let dropped_nodes = graph.node_count() - pruned.node_count();
    let dropped_edges = graph.edge_count() - pruned.edge_count();

    info!(
        "Pruned call graph at {} ({} samples): kept {} functions / {} edges, dropped {} / {}",
        threshold,
        threshold_weight,
        pruned.node_count(),
        pruned.edge_count(),
        dropped_nodes,
        dropped_edges
    );

    PrunedGraph {
        graph: pruned,
        threshold_weight,
        dropped_nodes,
        dropped_edges,
    }
}
