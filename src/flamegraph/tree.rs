//! Merged call-stack tree backing the flame graph.
//!
//! Nodes live in an arena (`Vec<FlameNode>`); a node owns its children by
//! index and refers to its parent by index. Stacks are folded in from the
//! outermost frame inward, so shared prefixes share nodes while the same
//! function reached along different paths gets separate nodes.

use crate::aggregator::{FunctionId, FunctionInterner, ResolvedProfile, ResolvedStack};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a node inside its `FlameTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlameNodeId(pub usize);

/// One frame of the merged tree
#[derive(Debug, Clone, PartialEq)]
pub struct FlameNode {
    /// `None` for the synthetic root
    pub function: Option<FunctionId>,
    pub name: String,

    /// Weight of every stack passing through this node
    pub weight: u64,

    /// Weight of stacks ending exactly here
    pub self_weight: u64,
    pub depth: usize,
    parent: Option<FlameNodeId>,
    children: BTreeMap<FunctionId, FlameNodeId>,
}

impl FlameNode {
    fn new(function: Option<FunctionId>, name: String, depth: usize, parent: Option<FlameNodeId>) -> Self {
        Self {
            function,
            name,
            weight: 0,
            self_weight: 0,
            depth,
            parent,
            children: BTreeMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.function.is_none()
    }
}

/// Arena-allocated flame tree with a synthetic root
#[derive(Debug, Clone, PartialEq)]
pub struct FlameTree {
    nodes: Vec<FlameNode>,
}

impl Default for FlameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FlameTree {
    pub const ROOT_NAME: &'static str = "root";

    pub fn new() -> Self {
        Self {
            nodes: vec![FlameNode::new(None, Self::ROOT_NAME.to_string(), 0, None)],
        }
    }

    pub fn root(&self) -> FlameNodeId {
        FlameNodeId(0)
    }

    /// Node by id. Ids are only ever handed out by this tree.
    pub fn node(&self, id: FlameNodeId) -> &FlameNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: FlameNodeId) -> Option<FlameNodeId> {
        self.node(id).parent
    }

    /// Children ordered by weight descending, then name
    pub fn children(&self, id: FlameNodeId) -> Vec<FlameNodeId> {
        let mut children: Vec<FlameNodeId> = self.node(id).children.values().copied().collect();
        children.sort_by(|a, b| {
            let (a, b) = (self.node(*a), self.node(*b));
            b.weight.cmp(&a.weight).then_with(|| a.name.cmp(&b.name))
        });
        children
    }

    /// Child of `id` for `function`, if present
    pub fn child(&self, id: FlameNodeId, function: FunctionId) -> Option<FlameNodeId> {
        self.node(id).children.get(&function).copied()
    }

    /// Names from the outermost frame down to `id`, root excluded
    pub fn path(&self, id: FlameNodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if !node.is_root() {
                path.push(node.name.as_str());
            }
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Fold one stack into the tree
    ///
    /// Every node on the path gains `stack.weight()`; the innermost node also
    /// records it as self weight.
    pub fn insert(&mut self, stack: &ResolvedStack, interner: &FunctionInterner) {
        let weight = stack.weight();
        let mut current = self.root();
        self.nodes[current.0].weight += weight;

        for function in stack.outermost_first() {
            let next = match self.child(current, function) {
                Some(existing) => existing,
                None => {
                    let id = FlameNodeId(self.nodes.len());
                    let depth = self.node(current).depth + 1;
                    self.nodes.push(FlameNode::new(
                        Some(function),
                        interner.name(function).to_string(),
                        depth,
                        Some(current),
                    ));
                    self.nodes[current.0].children.insert(function, id);
                    id
                }
            };
            self.nodes[next.0].weight += weight;
            current = next;
        }

        self.nodes[current.0].self_weight += weight;
    }

    pub fn total_weight(&self) -> u64 {
        self.node(self.root()).weight
    }

    /// Depth of the deepest frame; 0 for an empty tree
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no stack has been folded in
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlameNodeId, &FlameNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (FlameNodeId(i), n))
    }

    /// Serializable copy of the subtree under `id`
    pub fn export(&self, id: FlameNodeId) -> FlameFrame {
        let node = self.node(id);
        FlameFrame {
            name: node.name.clone(),
            weight: node.weight,
            self_weight: node.self_weight,
            children: self.children(id).into_iter().map(|c| self.export(c)).collect(),
        }
    }

    pub fn flame_summary(&self) -> FlameSummary {
        FlameSummary {
            total_weight: self.total_weight(),
            node_count: self.len() - 1,
            max_depth: self.max_depth(),
            root: self.export(self.root()),
        }
    }
}

/// Exported flame tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameFrame {
    pub name: String,
    pub weight: u64,
    pub self_weight: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FlameFrame>,
}

/// Flame tree as written to the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameSummary {
    pub total_weight: u64,

    /// Frames excluding the synthetic root
    pub node_count: usize,
    pub max_depth: usize,
    pub root: FlameFrame,
}

/// Build the flame tree for every resolved stack
///
/// **Public** - main entry point for the flame view
pub fn build_flame_tree(resolved: &ResolvedProfile) -> FlameTree {
    let mut tree = FlameTree::new();
    for stack in &resolved.stacks {
        tree.insert(stack, &resolved.interner);
    }

    debug!(
        "Flame tree: {} nodes, depth {}, total weight {}",
        tree.len() - 1,
        tree.max_depth(),
        tree.total_weight()
    );

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FrameOrder;

    fn resolved(stacks: &[(&[&str], u64)]) -> ResolvedProfile {
        let mut out = ResolvedProfile::default();
        for (names, weight) in stacks {
            // names are outermost first
            let frames = names.iter().rev().map(|n| out.interner.intern(n)).collect();
            out.stacks.push(ResolvedStack::new(frames, *weight, FrameOrder::RootFirst));
        }
        out
    }

    #[test]
    fn test_shared_prefix_shares_nodes() {
        let tree = build_flame_tree(&resolved(&[(&["a", "b"], 5), (&["a", "c"], 3), (&["a"], 2)]));

        assert_eq!(tree.total_weight(), 10);
        let a = tree.children(tree.root());
        assert_eq!(a.len(), 1);

        let a_node = tree.node(a[0]);
        assert_eq!((a_node.name.as_str(), a_node.weight, a_node.self_weight), ("a", 10, 2));

        let names: Vec<_> = tree.children(a[0]).into_iter().map(|c| tree.node(c).weight).collect();
        assert_eq!(names, vec![5, 3]);
    }

    #[test]
    fn test_same_function_on_different_paths_not_merged() {
        let tree = build_flame_tree(&resolved(&[(&["main", "x", "work"], 1), (&["main", "y", "work"], 1)]));

        let work_nodes: Vec<_> = tree.iter().filter(|(_, n)| n.name == "work").collect();
        assert_eq!(work_nodes.len(), 2);
        assert_eq!(tree.path(work_nodes[0].0), vec!["main", "x", "work"]);
        assert_eq!(tree.max_depth(), 3);
    }

    #[test]
    fn test_weight_is_children_plus_self() {
        let tree = build_flame_tree(&resolved(&[
            (&["m", "f", "g"], 4),
            (&["m", "f"], 1),
            (&["m", "h"], 2),
            (&["m", "f", "g"], 3),
        ]));

        for (id, node) in tree.iter() {
            let child_sum: u64 = tree.children(id).iter().map(|c| tree.node(*c).weight).sum();
            assert_eq!(node.weight, child_sum + node.self_weight, "at {}", node.name);
        }
    }

    #[test]
    fn test_children_ties_broken_by_name() {
        let tree = build_flame_tree(&resolved(&[(&["b"], 1), (&["a"], 1)]));
        let names: Vec<_> = tree
            .children(tree.root())
            .into_iter()
            .map(|c| tree.node(c).name.clone())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(tree.parent(tree.children(tree.root())[0]), Some(tree.root()));
    }

    #[test]
    fn test_summary_export() {
        let tree = build_flame_tree(&resolved(&[(&["a", "b"], 2)]));
        let summary = tree.flame_summary();

        assert_eq!(summary.node_count, 2);
        assert_eq!(summary.root.children[0].children[0].name, "b");
        assert!(FlameTree::new().is_empty());
    }
}
