//! Layered layout: every function sits on the level of its longest call path.
//!
//! Levels are computed on a DAG view of the call graph. A depth-first pass
//! from the roots classifies edges; back edges (recursion cycles) are set
//! aside, and the remaining edges are walked in topological order to take
//! the maximum path length to each node. Level 0 is drawn at the top of the
//! canvas and each deeper level one row lower, so call edges run downward
//! and arrows point back up from callee to caller.

use super::{Canvas, Footprint, LayoutKind, LayoutResult, NodePlacement};
use crate::aggregator::{FunctionId, TimingTable};
use crate::graph::CallGraph;
use log::{debug, warn};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{depth_first_search, DfsEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Geometry of the layered layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalConfig {
    pub canvas: Canvas,
    pub node_width: f64,
    pub node_height: f64,

    /// Space between consecutive levels
    pub vertical_gap: f64,

    /// Lower bound for the gap between boxes on a crowded level
    pub min_horizontal_gap: f64,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::new(1800.0, 1500.0, 40.0),
            node_width: 140.0,
            node_height: 110.0,
            vertical_gap: 70.0,
            min_horizontal_gap: 20.0,
        }
    }
}

impl HierarchicalConfig {
    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas.width = width;
        self.canvas.height = height;
        self
    }
}

/// Longest-path level of every node in `graph`
///
/// Roots are nodes without callers; if every node has a caller the lowest
/// id is used. Nodes the roots cannot reach are used as further starting
/// points in id order, so every node gets a level.
pub fn assign_levels(graph: &CallGraph) -> BTreeMap<FunctionId, usize> {
    let nodes = graph.nodes();
    let Some(&lowest) = nodes.iter().next() else {
        return BTreeMap::new();
    };

    let full: DiGraphMap<FunctionId, ()> = DiGraphMap::from_edges(graph.edges());

    let mut roots = graph.roots();
    if roots.is_empty() {
        debug!("Call graph has no root; starting from {}", lowest);
        roots.insert(lowest);
    }

    let mut back_edges: BTreeSet<(FunctionId, FunctionId)> = BTreeSet::new();
    depth_first_search(
        &full,
        roots.iter().chain(nodes.iter()).copied(),
        |event| {
            if let DfsEvent::BackEdge(u, v) = event {
                back_edges.insert((u, v));
            }
        },
    );

    if !back_edges.is_empty() {
        debug!("Ignoring {} back edges for level assignment", back_edges.len());
    }

    let mut dag: DiGraphMap<FunctionId, ()> = DiGraphMap::new();
    for id in &nodes {
        dag.add_node(*id);
    }
    for (caller, callee) in graph.edges() {
        if !back_edges.contains(&(caller, callee)) {
            dag.add_edge(caller, callee, ());
        }
    }

    let order = match toposort(&dag, None) {
        Ok(order) => order,
        Err(cycle) => {
            warn!(
                "Cycle through {} survived back-edge removal; levels may be shallow",
                cycle.node_id()
            );
            nodes.iter().copied().collect()
        }
    };

    let mut levels: BTreeMap<FunctionId, usize> = nodes.iter().map(|id| (*id, 0)).collect();
    for caller in order {
        let next = levels.get(&caller).copied().unwrap_or(0) + 1;
        for callee in dag.neighbors(caller) {
            let level = levels.entry(callee).or_insert(0);
            *level = (*level).max(next);
        }
    }

    levels
}

/// Place nodes level by level on fixed-size boxes
///
/// **Public** - hierarchical layout engine
///
/// Within a level boxes are spread evenly across the usable width, heaviest
/// cumulative weight first. A crowded level keeps `min_horizontal_gap` and
/// overflows the canvas to the right; see `LayoutResult::extent`.
pub fn hierarchical_layout(
    graph: &CallGraph,
    timing: &TimingTable,
    config: &HierarchicalConfig,
) -> LayoutResult {
    let canvas = config.canvas;
    let mut result = LayoutResult::new(LayoutKind::Hierarchical, canvas);

    let levels = assign_levels(graph);
    if levels.is_empty() {
        return result;
    }

    let mut groups: BTreeMap<usize, Vec<FunctionId>> = BTreeMap::new();
    for (id, level) in &levels {
        groups.entry(*level).or_default().push(*id);
    }

    let (w, h) = (config.node_width, config.node_height);
    for (level, mut ids) in groups {
        ids.sort_by(|a, b| {
            timing
                .cum_weight(*b)
                .cmp(&timing.cum_weight(*a))
                .then_with(|| a.cmp(b))
        });

        let count = ids.len() as f64;
        let gap = ((canvas.usable_width() - count * w) / (count + 1.0)).max(config.min_horizontal_gap);
        let top = canvas.padding + level as f64 * (h + config.vertical_gap);

        for (i, id) in ids.into_iter().enumerate() {
            let left = canvas.padding + gap * (i + 1) as f64 + w * i as f64;
            result.insert(NodePlacement {
                id,
                x: left + w / 2.0,
                y: top + h / 2.0,
                footprint: Footprint::Box {
                    width: w,
                    height: h,
                },
                level: Some(level),
            });
        }
    }

    debug!(
        "Hierarchical layout placed {} nodes on {} levels",
        result.len(),
        levels.values().max().map(|m| m + 1).unwrap_or(0)
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(u32, u32)]) -> CallGraph {
        let mut g = CallGraph::new();
        for (a, b) in edges {
            g.add_edge(FunctionId(*a), FunctionId(*b));
        }
        g
    }

    fn level(levels: &BTreeMap<FunctionId, usize>, n: u32) -> usize {
        levels[&FunctionId(n)]
    }

    #[test]
    fn test_level_is_longest_path() {
        // 0 -> 1 -> 2 and the shortcut 0 -> 2
        let levels = assign_levels(&graph(&[(0, 1), (1, 2), (0, 2)]));
        assert_eq!(level(&levels, 0), 0);
        assert_eq!(level(&levels, 1), 1);
        assert_eq!(level(&levels, 2), 2);
    }

    #[test]
    fn test_cycle_terminates() {
        // 0 -> 1 -> 2 -> 1
        let levels = assign_levels(&graph(&[(0, 1), (1, 2), (2, 1)]));
        assert_eq!(levels.len(), 3);
        assert_eq!(level(&levels, 1), 1);
        assert_eq!(level(&levels, 2), 2);
    }

    #[test]
    fn test_rootless_graph_starts_at_lowest_id() {
        let levels = assign_levels(&graph(&[(3, 5), (5, 3)]));
        assert_eq!(level(&levels, 3), 0);
        assert_eq!(level(&levels, 5), 1);
    }

    #[test]
    fn test_unreachable_cycle_still_placed() {
        // 0 -> 1, plus a separate cycle 4 <-> 6
        let levels = assign_levels(&graph(&[(0, 1), (4, 6), (6, 4)]));
        assert_eq!(levels.len(), 4);
        assert_eq!(level(&levels, 4), 0);
        assert_eq!(level(&levels, 6), 1);
    }

    #[test]
    fn test_empty_graph_gives_empty_layout() {
        let layout = hierarchical_layout(&CallGraph::new(), &TimingTable::new(), &HierarchicalConfig::default());
        assert!(layout.is_empty());
    }

    #[test]
    fn test_rows_and_spacing() {
        let g = graph(&[(0, 1), (0, 2)]);
        let config = HierarchicalConfig::default();
        let layout = hierarchical_layout(&g, &TimingTable::new(), &config);

        let root = layout.get(FunctionId(0)).unwrap();
        let a = layout.get(FunctionId(1)).unwrap();
        let b = layout.get(FunctionId(2)).unwrap();

        assert_eq!(root.top(), 40.0);
        assert_eq!(a.top(), 40.0 + 110.0 + 70.0);
        assert_eq!(a.y, b.y);
        assert!(a.x < b.x);

        // equal gaps on the row: (1720 - 280) / 3 = 480
        assert_eq!(a.left(), 40.0 + 480.0);
        assert_eq!(b.left(), 40.0 + 2.0 * 480.0 + 140.0);
    }
}
