//! Control-flow validation.
//!
//! The validator builds a control graph from the machine's resolved edge
//! hops and answers reachability questions over it. A hop is a *data edge*,
//! and stays out of the control graph, when:
//!
//! - either endpoint is a `context` node
//! - either reference carries an attribute path (`config.retries`)
//! - it connects a `task` with a node whose name reads like a data store
//!
//! Context nodes are never entry points, exit points, unreachable or
//! orphaned. Every finding is advisory: all diagnostics are warnings.

use log::{debug, info};
use serde::Serialize;

use machina_core::{
    identifier::QualifiedName,
    index::{Hop, MachineIndex, NodeId},
};

use crate::{
    digraph::IdGraph,
    error::{ErrorCode, ValidationContext, ValidationError},
    node_type::{NodeTypeChecker, is_context_like_name},
};

/// Findings of a graph validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphValidationResult {
    /// No unreachable nodes, no orphaned nodes, and at least one entry point.
    pub valid: bool,
    pub entry_points: Vec<QualifiedName>,
    pub exit_points: Vec<QualifiedName>,
    pub unreachable_nodes: Vec<QualifiedName>,
    pub orphaned_nodes: Vec<QualifiedName>,
    pub cycles: Vec<Vec<QualifiedName>>,
}

/// Validates the control graph of an indexed machine.
#[derive(Debug)]
pub struct GraphValidator<'a> {
    index: &'a MachineIndex<'a>,
    types: &'a NodeTypeChecker<'a>,
    control: IdGraph<Option<&'a str>>,
    data_edges: usize,
}

impl<'a> GraphValidator<'a> {
    pub fn new(index: &'a MachineIndex<'a>, types: &'a NodeTypeChecker<'a>) -> Self {
        let mut control = IdGraph::new(index);
        let mut data_edges = 0;

        for hop in index.hops() {
            if is_data_edge(index, types, &hop) {
                data_edges += 1;
                continue;
            }
            control.add_edge(hop.source.node, hop.target.node, hop.label);
        }

        debug!(control_edges = control.edge_count(), data_edges; "Built control graph");
        Self {
            index,
            types,
            control,
            data_edges,
        }
    }

    /// Number of hops classified as data edges.
    pub fn data_edge_count(&self) -> usize {
        self.data_edges
    }

    pub fn control_edge_count(&self) -> usize {
        self.control.edge_count()
    }

    fn names(&self, ids: impl IntoIterator<Item = NodeId>) -> Vec<QualifiedName> {
        ids.into_iter()
            .map(|id| self.index.qualified_name(id).clone())
            .collect()
    }

    fn flow_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.index
            .node_ids()
            .filter(|&id| !self.types.is_context(id))
    }

    fn entry_ids(&self) -> Vec<NodeId> {
        self.flow_nodes()
            .filter(|&id| self.control.incoming(id) == 0 || self.types.is_init(id))
            .collect()
    }

    fn exit_ids(&self) -> Vec<NodeId> {
        self.flow_nodes()
            .filter(|&id| self.control.outgoing(id) == 0)
            .collect()
    }

    fn unreachable_ids(&self) -> Vec<NodeId> {
        let reached = self.control.reachable_from(&self.entry_ids());
        self.flow_nodes()
            .filter(|id| !reached.contains(id))
            .collect()
    }

    fn orphaned_ids(&self) -> Vec<NodeId> {
        self.flow_nodes()
            .filter(|&id| {
                !self.types.is_init(id)
                    && self.control.incoming(id) == 0
                    && self.control.outgoing(id) == 0
            })
            .collect()
    }

    /// Nodes with no incoming control edges or an `init` type.
    pub fn find_entry_points(&self) -> Vec<QualifiedName> {
        self.names(self.entry_ids())
    }

    /// Nodes with no outgoing control edges.
    pub fn find_exit_points(&self) -> Vec<QualifiedName> {
        self.names(self.exit_ids())
    }

    /// Nodes that no entry point reaches.
    pub fn find_unreachable_nodes(&self) -> Vec<QualifiedName> {
        self.names(self.unreachable_ids())
    }

    /// Nodes with no control edges at all.
    pub fn find_orphaned_nodes(&self) -> Vec<QualifiedName> {
        self.names(self.orphaned_ids())
    }

    /// Control-flow cycles, each as the path from its first node back to
    /// the node that closes it.
    pub fn detect_cycles(&self) -> Vec<Vec<QualifiedName>> {
        self.control
            .cycles()
            .into_iter()
            .map(|cycle| self.names(cycle))
            .collect()
    }

    /// Runs every check and records warnings in `context`.
    pub fn validate(&self, context: &mut ValidationContext) -> GraphValidationResult {
        let result = self.result();

        for node in &result.unreachable_nodes {
            context.add_error(
                ValidationError::warning(
                    ErrorCode::UnreachableNode,
                    format!("node `{node}` cannot be reached from any entry point"),
                )
                .with_node(node.as_str())
                .with_suggestion("add a transition into this node"),
            );
        }
        for node in &result.orphaned_nodes {
            context.add_error(
                ValidationError::warning(
                    ErrorCode::OrphanedNode,
                    format!("node `{node}` has no incoming or outgoing transitions"),
                )
                .with_node(node.as_str())
                .with_suggestion("connect the node or remove it"),
            );
        }

        match result.entry_points.len() {
            0 => context.add_error(
                ValidationError::warning(ErrorCode::NoEntryPoint, "the machine has no entry point")
                    .with_suggestion("add an `init` node or a node without incoming transitions"),
            ),
            1 => {}
            count => context.add_error(
                ValidationError::warning(
                    ErrorCode::MultipleEntryPoints,
                    format!("the machine has {count} entry points"),
                )
                .with_context("entry_points", join(&result.entry_points, ", ")),
            ),
        }

        if result.exit_points.is_empty() {
            context.add_error(ValidationError::warning(
                ErrorCode::NoExitPoint,
                "the machine has no exit point",
            ));
        }

        for cycle in &result.cycles {
            let path = cycle
                .iter()
                .chain(cycle.first())
                .map(QualifiedName::as_str)
                .collect::<Vec<_>>()
                .join(" -> ");
            context.add_error(
                ValidationError::warning(ErrorCode::CycleDetected, format!("cycle: {path}"))
                    .with_context("cycle", path),
            );
        }

        info!(
            valid = result.valid,
            entries = result.entry_points.len(),
            exits = result.exit_points.len(),
            cycles = result.cycles.len();
            "Validated control graph"
        );
        result
    }

    /// Runs every check without recording diagnostics.
    pub fn result(&self) -> GraphValidationResult {
        let entry_points = self.find_entry_points();
        let unreachable_nodes = self.find_unreachable_nodes();
        let orphaned_nodes = self.find_orphaned_nodes();
        GraphValidationResult {
            valid: unreachable_nodes.is_empty()
                && orphaned_nodes.is_empty()
                && !entry_points.is_empty(),
            entry_points,
            exit_points: self.find_exit_points(),
            unreachable_nodes,
            orphaned_nodes,
            cycles: self.detect_cycles(),
        }
    }
}

fn join(names: &[QualifiedName], separator: &str) -> String {
    names
        .iter()
        .map(QualifiedName::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

fn is_data_edge(index: &MachineIndex<'_>, types: &NodeTypeChecker<'_>, hop: &Hop<'_>) -> bool {
    let (source, target) = (hop.source.node, hop.target.node);
    if types.is_context(source) || types.is_context(target) {
        return true;
    }
    if hop.source.has_attribute_path() || hop.target.has_attribute_path() {
        return true;
    }
    let context_named = |id: NodeId| is_context_like_name(index.node(id).name());
    (types.is_task(source) && context_named(target)) || (types.is_task(target) && context_named(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_core::ast::{Attribute, Edge, Machine, Node};

    fn names(list: &[QualifiedName]) -> Vec<&str> {
        list.iter().map(QualifiedName::as_str).collect()
    }

    fn validate(machine: &Machine) -> (GraphValidationResult, ValidationContext) {
        let index = MachineIndex::new(machine);
        let types = NodeTypeChecker::new(&index);
        let validator = GraphValidator::new(&index, &types);
        let mut context = ValidationContext::new();
        let result = validator.validate(&mut context);
        (result, context)
    }

    #[test]
    fn test_start_to_end() {
        let machine = Machine::new("m")
            .with_node(Node::new("start"))
            .with_node(Node::new("end"))
            .with_edge(Edge::between("start", "end"));

        let (result, context) = validate(&machine);

        assert_eq!(names(&result.entry_points), vec!["start"]);
        assert_eq!(names(&result.exit_points), vec!["end"]);
        assert!(result.unreachable_nodes.is_empty());
        assert!(result.cycles.is_empty());
        assert!(result.valid);
        assert!(context.is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let machine = Machine::new("m")
            .with_node(Node::new("A"))
            .with_node(Node::new("B"))
            .with_node(Node::new("C"))
            .with_edge(Edge::between("A", "B"))
            .with_edge(Edge::between("B", "C"))
            .with_edge(Edge::between("C", "A"));

        let (result, context) = validate(&machine);

        assert_eq!(result.cycles.len(), 1);
        let cycle = names(&result.cycles[0]);
        for node in ["A", "B", "C"] {
            assert!(cycle.contains(&node));
        }
        // Every node has an incoming edge, so nothing is an entry point.
        assert!(result.entry_points.is_empty());
        assert!(!result.valid);

        let codes: Vec<ErrorCode> = context.errors().iter().map(|e| e.code()).collect();
        assert!(codes.contains(&ErrorCode::CycleDetected));
        assert!(codes.contains(&ErrorCode::NoEntryPoint));
        assert!(codes.contains(&ErrorCode::NoExitPoint));
        assert!(!context.has_errors());
    }

    #[test]
    fn test_context_exemption() {
        let machine = Machine::new("m")
            .with_node(Node::new("store").with_type("context"))
            .with_node(Node::new("worker"))
            .with_node(Node::new("isolated"))
            .with_edge(Edge::between("store", "worker"));

        let (result, context) = validate(&machine);

        assert!(result.unreachable_nodes.is_empty());
        assert_eq!(names(&result.orphaned_nodes), vec!["worker", "isolated"]);
        assert!(!result.entry_points.iter().any(|n| n == "store"));
        assert!(!result.exit_points.iter().any(|n| n == "store"));
        // Two orphans plus the multiple-entry warning.
        assert_eq!(context.errors_by_severity(crate::error::Severity::Warning).len(), 3);
    }

    #[test]
    fn test_data_edges_are_excluded() {
        let machine = Machine::new("m")
            .with_node(Node::new("start"))
            .with_node(Node::new("analyze").with_attribute(Attribute::new("prompt", "go")))
            .with_node(Node::new("resultStore"))
            .with_node(Node::new("settings").with_type("flow").with_attribute(Attribute::new("limit", "3")))
            .with_node(Node::new("outputQueue").with_type("queue"))
            .with_edge(Edge::between("start", "analyze"))
            .with_edge(Edge::between("analyze", "resultStore"))
            .with_edge(Edge::between("settings.limit", "analyze"))
            .with_edge(Edge::between("analyze", "outputQueue"));

        let index = MachineIndex::new(&machine);
        let types = NodeTypeChecker::new(&index);
        let validator = GraphValidator::new(&index, &types);

        // `resultStore` is context by name, `settings.limit` is an attribute
        // path, and `outputQueue` is a task accessing a context-like name.
        assert_eq!(validator.control_edge_count(), 1);
        assert_eq!(validator.data_edge_count(), 3);
        assert_eq!(
            names(&validator.find_exit_points()),
            vec!["analyze", "settings", "outputQueue"]
        );
    }

    #[test]
    fn test_unreachable_cycle_behind_entry() {
        let machine = Machine::new("m")
            .with_node(Node::new("start"))
            .with_node(Node::new("end"))
            .with_node(Node::new("loopA"))
            .with_node(Node::new("loopB"))
            .with_edge(Edge::between("start", "end"))
            .with_edge(Edge::between("loopA", "loopB"))
            .with_edge(Edge::between("loopB", "loopA"));

        let (result, context) = validate(&machine);

        assert_eq!(names(&result.unreachable_nodes), vec!["loopA", "loopB"]);
        assert!(!result.valid);
        assert_eq!(context.errors_for_node("loopA")[0].code(), ErrorCode::UnreachableNode);
        assert!(!context.is_node_blocked("loopA"));
    }

    #[test]
    fn test_explicit_init_is_entry_even_with_incoming() {
        let machine = Machine::new("m")
            .with_node(Node::new("boot").with_type("init"))
            .with_node(Node::new("run"))
            .with_edge(Edge::new(["boot"]).to(["run"]).to(["boot"]));

        let (result, context) = validate(&machine);

        assert_eq!(names(&result.entry_points), vec!["boot"]);
        assert!(result.exit_points.is_empty());
        assert!(result.valid);
        assert_eq!(names(&result.cycles[0]), vec!["boot", "run"]);
        let cycle = context
            .errors()
            .iter()
            .find(|e| e.code() == ErrorCode::CycleDetected)
            .unwrap();
        assert_eq!(cycle.message(), "cycle: boot -> run -> boot");
    }

    #[test]
    fn test_multiple_entry_points_warning() {
        let machine = Machine::new("m")
            .with_node(Node::new("a"))
            .with_node(Node::new("b"))
            .with_node(Node::new("c"))
            .with_edge(Edge::between("a", "c"))
            .with_edge(Edge::between("b", "c"));

        let (result, context) = validate(&machine);

        assert_eq!(result.entry_points.len(), 2);
        let warning = context
            .errors()
            .iter()
            .find(|e| e.code() == ErrorCode::MultipleEntryPoints)
            .unwrap();
        assert_eq!(warning.context().get("entry_points").map(String::as_str), Some("a, b"));
    }
}
