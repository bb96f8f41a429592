//! Fold-based rewriting of the machine AST.
//!
//! The structural passes (qualified-name expansion and linking) are written
//! as [`Folder`]s: each method takes ownership of its input and returns the
//! rewritten value. The default implementations rebuild the tree unchanged, so
//! a pass only overrides the methods for the nodes it rewrites.

use machina_core::ast::{Annotation, Attribute, Edge, Machine, Node};

/// The main trait for folding/rewriting AST nodes.
pub(crate) trait Folder {
    /// Fold a complete machine
    fn fold_machine(&mut self, machine: Machine) -> Machine {
        Machine {
            title: machine.title,
            annotations: self.fold_annotations(machine.annotations),
            nodes: self.fold_nodes(machine.nodes),
            edges: self.fold_edges(machine.edges),
        }
    }

    /// Fold a list of annotations
    fn fold_annotations(&mut self, annotations: Vec<Annotation>) -> Vec<Annotation> {
        annotations
    }

    /// Fold a sibling list of nodes
    fn fold_nodes(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        nodes.into_iter().map(|node| self.fold_node(node)).collect()
    }

    /// Fold a single node and, recursively, its children
    fn fold_node(&mut self, node: Node) -> Node {
        Node {
            name: node.name,
            node_type: node.node_type,
            title: node.title,
            annotations: self.fold_annotations(node.annotations),
            attributes: self.fold_attributes(node.attributes),
            nodes: self.fold_nodes(node.nodes),
            edges: self.fold_edges(node.edges),
        }
    }

    /// Fold a list of attributes
    fn fold_attributes(&mut self, attributes: Vec<Attribute>) -> Vec<Attribute> {
        attributes
            .into_iter()
            .map(|attr| self.fold_attribute(attr))
            .collect()
    }

    /// Fold a single attribute
    fn fold_attribute(&mut self, attribute: Attribute) -> Attribute {
        attribute
    }

    /// Fold a list of edges
    fn fold_edges(&mut self, edges: Vec<Edge>) -> Vec<Edge> {
        edges.into_iter().map(|edge| self.fold_edge(edge)).collect()
    }

    /// Fold a single edge
    fn fold_edge(&mut self, edge: Edge) -> Edge {
        edge
    }
}
