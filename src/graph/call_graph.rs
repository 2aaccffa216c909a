//! Caller -> callee graph over interned function ids.

use crate::aggregator::stack_builder::{FunctionId, ResolvedStack};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping from caller to its distinct callees
///
/// Self-loops are never stored. Ordered maps keep iteration deterministic,
/// which the layouts and renderers rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    edges: BTreeMap<FunctionId, BTreeSet<FunctionId>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build raw edges from every adjacent frame pair of every stack
    pub fn from_stacks(stacks: &[ResolvedStack]) -> Self {
        let mut graph = Self::new();
        for stack in stacks {
            graph.add_stack(stack);
        }
        graph
    }

    pub fn add_stack(&mut self, stack: &ResolvedStack) {
        for (caller, callee) in stack.call_pairs() {
            self.add_edge(caller, callee);
        }
    }

    /// Insert an edge; returns false for self-loops and duplicates
    pub fn add_edge(&mut self, caller: FunctionId, callee: FunctionId) -> bool {
        if caller == callee {
            return false;
        }
        self.edges.entry(caller).or_default().insert(callee)
    }

    pub fn contains_edge(&self, caller: FunctionId, callee: FunctionId) -> bool {
        self.edges
            .get(&caller)
            .map(|callees| callees.contains(&callee))
            .unwrap_or(false)
    }

    pub fn callees(&self, caller: FunctionId) -> impl Iterator<Item = FunctionId> + '_ {
        self.edges.get(&caller).into_iter().flatten().copied()
    }

    /// Functions with at least one outgoing edge
    pub fn callers(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.edges.keys().copied()
    }

    /// All `(caller, callee)` pairs in id order
    pub fn edges(&self) -> impl Iterator<Item = (FunctionId, FunctionId)> + '_ {
        self.edges
            .iter()
            .flat_map(|(caller, callees)| callees.iter().map(move |callee| (*caller, *callee)))
    }

    /// Every function appearing on either end of an edge
    pub fn nodes(&self) -> BTreeSet<FunctionId> {
        let mut nodes = BTreeSet::new();
        for (caller, callees) in &self.edges {
            nodes.insert(*caller);
            nodes.extend(callees.iter().copied());
        }
        nodes
    }

    /// Functions that are never a callee
    pub fn roots(&self) -> BTreeSet<FunctionId> {
        let called: BTreeSet<FunctionId> = self.edges.values().flatten().copied().collect();
        self.nodes()
            .into_iter()
            .filter(|id| !called.contains(id))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Keep only edges whose both ends satisfy `keep`; callers left with
    /// no callees are removed
    pub fn retain_nodes<F>(&mut self, mut keep: F)
    where
        F: FnMut(FunctionId) -> bool,
    {
        self.edges.retain(|caller, callees| {
            if !keep(*caller) {
                return false;
            }
            callees.retain(|callee| keep(*callee));
            !callees.is_empty()
        });
    }

    /// Union with another graph
    pub fn merge(&mut self, other: &CallGraph) {
        for (caller, callee) in other.edges() {
            self.add_edge(caller, callee);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> FunctionId {
        FunctionId(n)
    }

    #[test]
    fn test_self_loops_and_duplicates_dropped() {
        let mut graph = CallGraph::new();
        assert!(graph.add_edge(id(0), id(1)));
        assert!(!graph.add_edge(id(0), id(1)));
        assert!(!graph.add_edge(id(2), id(2)));

        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.contains_edge(id(2), id(2)));
    }

    #[test]
    fn test_roots_and_nodes() {
        let mut graph = CallGraph::new();
        graph.add_edge(id(0), id(1));
        graph.add_edge(id(1), id(2));
        graph.add_edge(id(3), id(2));

        assert_eq!(graph.nodes().len(), 4);
        assert_eq!(graph.roots().into_iter().collect::<Vec<_>>(), vec![id(0), id(3)]);
    }

    #[test]
    fn test_retain_drops_empty_callers() {
        let mut graph = CallGraph::new();
        graph.add_edge(id(0), id(1));
        graph.add_edge(id(0), id(2));
        graph.add_edge(id(1), id(2));

        graph.retain_nodes(|f| f != id(2));

        assert_eq!(graph.edges().collect::<Vec<_>>(), vec![(id(0), id(1))]);
        assert_eq!(graph.callers().count(), 1);
    }

    #[test]
    fn test_from_stacks_uses_caller_callee_direction() {
        use crate::parser::FrameOrder;

        // innermost first: leaf <- mid <- main, with a recursive mid frame
        let stack = ResolvedStack::new(vec![id(2), id(1), id(1), id(0)], 1, FrameOrder::LeafFirst);
        let graph = CallGraph::from_stacks(&[stack]);

        assert!(graph.contains_edge(id(0), id(1)));
        assert!(graph.contains_edge(id(1), id(2)));
        assert_eq!(graph.edge_count(), 2);
    }
}
