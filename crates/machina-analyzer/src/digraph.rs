//! A directed graph over arena node ids.
//!
//! Nodes are added in arena order, so the petgraph [`NodeIndex`] of a node is
//! always `NodeIndex::new(id.index())` and no id map is needed.

use std::collections::HashSet;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::Bfs,
};

use machina_core::index::{MachineIndex, NodeId};

#[derive(Debug, Clone)]
pub(crate) struct IdGraph<E> {
    graph: DiGraph<NodeId, E>,
}

impl<E> IdGraph<E> {
    /// A graph with one vertex per indexed node and no edges.
    pub(crate) fn new(index: &MachineIndex<'_>) -> Self {
        let mut graph = DiGraph::with_capacity(index.len(), 0);
        for id in index.node_ids() {
            graph.add_node(id);
        }
        Self { graph }
    }

    fn idx(id: NodeId) -> NodeIndex {
        NodeIndex::new(id.index())
    }

    pub(crate) fn add_edge(&mut self, source: NodeId, target: NodeId, weight: E) {
        self.graph.add_edge(Self::idx(source), Self::idx(target), weight);
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn incoming(&self, id: NodeId) -> usize {
        self.graph
            .edges_directed(Self::idx(id), Direction::Incoming)
            .count()
    }

    pub(crate) fn outgoing(&self, id: NodeId) -> usize {
        self.graph
            .edges_directed(Self::idx(id), Direction::Outgoing)
            .count()
    }

    /// Successors in insertion order of the edges.
    pub(crate) fn successors(&self, id: NodeId) -> Vec<NodeId> {
        // petgraph lists the most recently added edge first.
        let mut successors: Vec<NodeId> = self
            .graph
            .neighbors_directed(Self::idx(id), Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        successors.reverse();
        successors
    }

    /// Every node reachable from any of `starts`, the starts included.
    pub(crate) fn reachable_from(&self, starts: &[NodeId]) -> HashSet<NodeId> {
        let mut reached = HashSet::new();
        for &start in starts {
            if reached.contains(&start) {
                continue;
            }
            let mut bfs = Bfs::new(&self.graph, Self::idx(start));
            while let Some(next) = bfs.next(&self.graph) {
                reached.insert(self.graph[next]);
            }
        }
        reached
    }

    /// Returns `true` if a non-empty path leads from `from` to `to`.
    pub(crate) fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        self.successors(from)
            .into_iter()
            .any(|next| next == to || self.reachable_from(&[next]).contains(&to))
    }

    /// Depth-first cycle search with an explicit recursion stack.
    ///
    /// Reaching a node that is still on the stack reports the stack slice from
    /// that node to the current one. A node may appear in several cycles.
    pub(crate) fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut search = CycleSearch {
            graph: self,
            visited: HashSet::new(),
            stack: Vec::new(),
            cycles: Vec::new(),
        };
        for index in self.graph.node_indices() {
            let id = self.graph[index];
            if !search.visited.contains(&id) {
                search.visit(id);
            }
        }
        search.cycles
    }
}

struct CycleSearch<'g, E> {
    graph: &'g IdGraph<E>,
    visited: HashSet<NodeId>,
    stack: Vec<NodeId>,
    cycles: Vec<Vec<NodeId>>,
}

impl<E> CycleSearch<'_, E> {
    fn visit(&mut self, id: NodeId) {
        self.visited.insert(id);
        self.stack.push(id);

        for next in self.graph.successors(id) {
            if let Some(position) = self.stack.iter().position(|&s| s == next) {
                self.cycles.push(self.stack[position..].to_vec());
            } else if !self.visited.contains(&next) {
                self.visit(next);
            }
        }

        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_core::ast::{Machine, Node};

    fn machine(names: &[&str]) -> Machine {
        names
            .iter()
            .fold(Machine::new("m"), |m, name| m.with_node(Node::new(*name)))
    }

    fn ids(index: &MachineIndex<'_>, names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| index.lookup(n).unwrap()).collect()
    }

    #[test]
    fn test_degrees_and_successor_order() {
        let machine = machine(&["a", "b", "c"]);
        let index = MachineIndex::new(&machine);
        let ids = ids(&index, &["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        let mut graph = IdGraph::new(&index);
        graph.add_edge(a, b, ());
        graph.add_edge(a, c, ());

        assert_eq!(graph.outgoing(a), 2);
        assert_eq!(graph.incoming(c), 1);
        assert_eq!(graph.successors(a), vec![b, c]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_reachability() {
        let machine = machine(&["a", "b", "c", "d"]);
        let index = MachineIndex::new(&machine);
        let ids = ids(&index, &["a", "b", "c", "d"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        let mut graph = IdGraph::new(&index);
        graph.add_edge(a, b, ());
        graph.add_edge(c, d, ());

        let reached = graph.reachable_from(&[a]);
        assert!(reached.contains(&a) && reached.contains(&b));
        assert!(!reached.contains(&c));

        assert!(graph.has_path(a, b));
        assert!(!graph.has_path(b, a));
        assert!(!graph.has_path(a, a));
    }

    #[test]
    fn test_cycle_slices() {
        let machine = machine(&["a", "b", "c", "d"]);
        let index = MachineIndex::new(&machine);
        let ids = ids(&index, &["a", "b", "c", "d"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        let mut graph = IdGraph::new(&index);
        graph.add_edge(d, a, ());
        graph.add_edge(a, b, ());
        graph.add_edge(b, c, ());
        graph.add_edge(c, a, ());
        graph.add_edge(c, c, ());

        let cycles = graph.cycles();

        assert_eq!(cycles, vec![vec![a, b, c], vec![c]]);
        assert!(graph.has_path(a, a));
    }
}
