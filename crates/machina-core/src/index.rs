//! Read-only arena over an expanded machine.
//!
//! [`MachineIndex`] flattens the node tree into an index-addressed vector so
//! that graph passes can refer to nodes by a cheap, copyable [`NodeId`] rather
//! than by borrowed tree positions. Control graphs may be cyclic; keeping the
//! adjacency in terms of `NodeId`s avoids any ownership cycles.
//!
//! # Architecture
//!
//! - [`NodeId`]: position of a node in document (pre-order) order
//! - [`IndexedNode`]: a borrowed node together with its qualified name and parent
//! - [`IndexedEdge`]: a borrowed edge together with its owning node
//! - [`Hop`]: one resolved `source -> target` step of a (possibly chained) edge
//! - [`ScopeEntry`]: what an edge reference alias names
//!
//! Edge references resolve through an alias table. Each node registers its
//! simple name, its qualified name and then `<alias>.<attribute>` for every
//! name alias it won. Registration follows document order and the first
//! registration of a string wins, so `step` names the first `step` declared,
//! wherever it is nested.
//!
//! The index borrows the machine, so it can only be built once expansion and
//! linking have finished mutating the tree.

use std::collections::HashMap;

use indexmap::{IndexMap, map::Entry};
use log::trace;
use serde::Serialize;

use crate::{
    ast::{Edge, Machine, Node},
    identifier::{QualifiedName, SEPARATOR_STR, split_segments},
};

/// Position of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the arena.
#[derive(Debug)]
pub struct IndexedNode<'a> {
    node: &'a Node,
    qualified_name: QualifiedName,
    parent: Option<NodeId>,
    depth: usize,
}

impl<'a> IndexedNode<'a> {
    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    pub fn qualified_name(&self) -> &QualifiedName {
        &self.qualified_name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Nesting depth, `0` for root-level nodes.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// An edge together with the node whose body declares it.
#[derive(Debug)]
pub struct IndexedEdge<'a> {
    edge: &'a Edge,
    owner: Option<NodeId>,
}

impl<'a> IndexedEdge<'a> {
    pub fn edge(&self) -> &'a Edge {
        self.edge
    }

    /// The declaring node, or `None` for machine-level edges.
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }
}

/// The result of resolving an edge reference.
///
/// `attribute_path` holds whatever trailed the longest node prefix, e.g.
/// resolving `config.retry.max` against a node `config` gives
/// `attribute_path = Some("retry.max")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedReference {
    pub node: NodeId,
    pub attribute_path: Option<String>,
}

impl ResolvedReference {
    pub fn has_attribute_path(&self) -> bool {
        self.attribute_path.is_some()
    }
}

/// What an alias points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeEntry {
    pub node: NodeId,
    /// Set when the alias names one of the node's attributes.
    pub attribute: Option<String>,
}

/// One resolved step of an edge chain.
#[derive(Debug, Clone)]
pub struct Hop<'a> {
    pub source: ResolvedReference,
    pub target: ResolvedReference,
    pub label: Option<&'a str>,
    /// Position of the originating edge in [`MachineIndex::edges`].
    pub edge_index: usize,
}

/// Flattened, read-only view of an expanded machine.
#[derive(Debug)]
pub struct MachineIndex<'a> {
    machine: &'a Machine,
    nodes: Vec<IndexedNode<'a>>,
    edges: Vec<IndexedEdge<'a>>,
    by_qualified: HashMap<QualifiedName, NodeId>,
    by_simple: HashMap<&'a str, NodeId>,
    aliases: IndexMap<String, ScopeEntry>,
}

impl<'a> MachineIndex<'a> {
    /// Builds the index. Nodes and edges are stored in document order.
    pub fn new(machine: &'a Machine) -> Self {
        let mut index = Self {
            machine,
            nodes: Vec::with_capacity(machine.node_count()),
            edges: Vec::new(),
            by_qualified: HashMap::new(),
            by_simple: HashMap::new(),
            aliases: IndexMap::new(),
        };

        index.edges.extend(machine.edges.iter().map(|edge| IndexedEdge { edge, owner: None }));
        index.add_nodes(&machine.nodes, None, &QualifiedName::default(), 0);

        trace!(
            nodes = index.nodes.len(),
            edges = index.edges.len(),
            aliases = index.aliases.len();
            "Built machine index"
        );
        index
    }

    fn add_nodes(
        &mut self,
        nodes: &'a [Node],
        parent: Option<NodeId>,
        parent_name: &QualifiedName,
        depth: usize,
    ) {
        for node in nodes {
            let id = NodeId(self.nodes.len());
            let qualified_name = parent_name.create_nested(&node.name);

            self.by_qualified.entry(qualified_name.clone()).or_insert(id);
            self.by_simple.entry(node.name.as_str()).or_insert(id);
            self.register_aliases(node, id, &qualified_name);
            self.nodes.push(IndexedNode {
                node,
                qualified_name: qualified_name.clone(),
                parent,
                depth,
            });
            self.edges.extend(
                node.edges
                    .iter()
                    .map(|edge| IndexedEdge { edge, owner: Some(id) }),
            );

            self.add_nodes(&node.nodes, Some(id), &qualified_name, depth + 1);
        }
    }

    fn register_aliases(&mut self, node: &Node, id: NodeId, qualified_name: &QualifiedName) {
        let mut names = vec![node.name.as_str(), qualified_name.as_str()];
        names.dedup();

        let won: Vec<&str> = names
            .into_iter()
            .filter(|name| self.register_alias(name.to_string(), id, None))
            .collect();
        for attribute in &node.attributes {
            for name in &won {
                self.register_alias(
                    format!("{name}{SEPARATOR_STR}{}", attribute.name),
                    id,
                    Some(attribute.name.clone()),
                );
            }
        }
    }

    /// Registers an alias unless it is already taken. Returns `true` if this
    /// registration won.
    fn register_alias(&mut self, alias: String, node: NodeId, attribute: Option<String>) -> bool {
        match self.aliases.entry(alias) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(ScopeEntry { node, attribute });
                true
            }
        }
    }

    pub fn machine(&self) -> &'a Machine {
        self.machine
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node for this id.
    ///
    /// # Panics
    /// Panics if the id was not produced by this index.
    pub fn node(&self, id: NodeId) -> &IndexedNode<'a> {
        &self.nodes[id.0]
    }

    /// Iterates over all node ids in document order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Iterates over all nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &IndexedNode<'a>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn qualified_name(&self, id: NodeId) -> &QualifiedName {
        &self.nodes[id.0].qualified_name
    }

    /// Direct children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids()
            .filter(move |child| self.nodes[child.0].parent == Some(id))
    }

    pub fn edges(&self) -> &[IndexedEdge<'a>] {
        &self.edges
    }

    pub fn lookup_qualified(&self, name: &str) -> Option<NodeId> {
        self.by_qualified.get(&QualifiedName::new(name)).copied()
    }

    /// Looks up a simple name. The first node in document order wins.
    pub fn lookup_simple(&self, name: &str) -> Option<NodeId> {
        self.by_simple.get(name).copied()
    }

    /// Looks up a name alias. Attribute aliases are not node names.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.aliases
            .get(name)
            .filter(|entry| entry.attribute.is_none())
            .map(|entry| entry.node)
    }

    /// The entry registered for an alias, attribute aliases included.
    pub fn alias(&self, alias: &str) -> Option<&ScopeEntry> {
        self.aliases.get(alias)
    }

    /// Every alias in registration order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &ScopeEntry)> {
        self.aliases.iter().map(|(alias, entry)| (alias.as_str(), entry))
    }

    /// Returns `true` if some node won this name alias.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Resolves an edge reference to a node and an optional attribute path.
    ///
    /// The whole text is tried as an alias first; for dotted text the longest
    /// aliased prefix wins. A prefix naming an attribute keeps the rest as
    /// part of the attribute path. Otherwise the remaining segments descend
    /// through child nodes as far as they match, and whatever is left becomes
    /// the attribute path.
    pub fn resolve_reference(&self, reference: &str) -> Option<ResolvedReference> {
        let reference = reference.trim();
        if let Some(entry) = self.aliases.get(reference) {
            return Some(ResolvedReference {
                node: entry.node,
                attribute_path: entry.attribute.clone(),
            });
        }

        let segments = split_segments(reference);
        for split in (1..segments.len()).rev() {
            let prefix = segments[..split].join(SEPARATOR_STR);
            let Some(entry) = self.aliases.get(&prefix) else {
                continue;
            };
            if let Some(attribute) = &entry.attribute {
                let rest = segments[split..].join(SEPARATOR_STR);
                return Some(ResolvedReference {
                    node: entry.node,
                    attribute_path: Some(format!("{attribute}{SEPARATOR_STR}{rest}")),
                });
            }

            let mut node = entry.node;
            let mut consumed = split;
            while let Some(segment) = segments.get(consumed) {
                let child_name = self.qualified_name(node).create_nested(segment);
                match self.lookup_qualified(child_name.as_str()) {
                    Some(child) => {
                        node = child;
                        consumed += 1;
                    }
                    None => break,
                }
            }

            let attribute_path = (consumed < segments.len())
                .then(|| segments[consumed..].join(SEPARATOR_STR));
            return Some(ResolvedReference {
                node,
                attribute_path,
            });
        }
        None
    }

    /// Expands every edge into resolved hops.
    ///
    /// For each segment, every resolved source is paired with every resolved
    /// target; the segment's targets then become the next segment's sources.
    /// References that do not resolve are skipped.
    pub fn hops(&self) -> Vec<Hop<'a>> {
        let mut hops = Vec::new();
        for (edge_index, indexed) in self.edges.iter().enumerate() {
            let edge = indexed.edge;
            let mut sources = self.resolve_all(edge.sources.iter().map(String::as_str));

            for segment in &edge.segments {
                let targets = self.resolve_all(segment.targets.iter().map(String::as_str));
                for source in &sources {
                    for target in &targets {
                        hops.push(Hop {
                            source: source.clone(),
                            target: target.clone(),
                            label: segment.label.as_deref(),
                            edge_index,
                        });
                    }
                }
                sources = targets;
            }
        }
        hops
    }

    fn resolve_all<'r>(&self, references: impl Iterator<Item = &'r str>) -> Vec<ResolvedReference> {
        references
            .filter_map(|reference| {
                let resolved = self.resolve_reference(reference);
                if resolved.is_none() {
                    trace!(reference; "Skipping unresolved edge reference");
                }
                resolved
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attribute, Edge, Node};

    fn sample_machine() -> Machine {
        Machine::new("sample")
            .with_node(
                Node::new("workflow")
                    .with_node(Node::new("start"))
                    .with_node(Node::new("end").with_attribute(Attribute::new("x", "1")))
                    .with_edge(Edge::between("start", "end")),
            )
            .with_node(Node::new("start"))
            .with_edge(Edge::new(["workflow"]).to(["start"]).to(["workflow.end"]))
    }

    #[test]
    fn test_nodes_are_in_document_order() {
        let machine = sample_machine();
        let index = MachineIndex::new(&machine);

        let names: Vec<String> = index
            .nodes()
            .map(|(_, n)| n.qualified_name().to_string())
            .collect();
        assert_eq!(names, vec!["workflow", "workflow.start", "workflow.end", "start"]);
    }

    #[test]
    fn test_parent_and_depth() {
        let machine = sample_machine();
        let index = MachineIndex::new(&machine);

        let end = index.lookup_qualified("workflow.end").unwrap();
        let workflow = index.lookup_qualified("workflow").unwrap();
        assert_eq!(index.node(end).parent(), Some(workflow));
        assert_eq!(index.node(end).depth(), 1);
        assert_eq!(index.children(workflow).count(), 2);
    }

    #[test]
    fn test_simple_lookup_first_declaration_wins() {
        let machine = sample_machine();
        let index = MachineIndex::new(&machine);

        let start = index.lookup_simple("start").unwrap();
        assert_eq!(index.qualified_name(start), "workflow.start");
        // The root-level `start` is still reachable by its qualified name.
        let root_start = index.lookup_qualified("start").unwrap();
        assert_eq!(index.node(root_start).depth(), 0);
    }

    #[test]
    fn test_lookup_follows_first_alias_registration() {
        let machine = sample_machine();
        let index = MachineIndex::new(&machine);

        // `workflow.start` registers `start` before the root node does.
        let id = index.lookup("start").unwrap();
        assert_eq!(index.qualified_name(id), "workflow.start");
        assert_eq!(index.lookup("workflow.end"), index.lookup_qualified("workflow.end"));
        // Attribute aliases do not name nodes.
        assert!(index.lookup("end.x").is_none());
    }

    #[test]
    fn test_alias_registration_order() {
        let machine = Machine::new("m")
            .with_node(Node::new("outer").with_node(Node::new("step")))
            .with_node(Node::new("step").with_attribute(Attribute::new("y", "2")));
        let index = MachineIndex::new(&machine);

        let aliases: Vec<&str> = index.aliases().map(|(alias, _)| alias).collect();
        assert_eq!(aliases, vec!["outer", "step", "outer.step"]);

        // The root `step` won no name alias, so it registers no attribute alias.
        assert!(index.alias("step.y").is_none());
    }

    #[test]
    fn test_resolve_reference_shared_simple_name() {
        let machine = Machine::new("m")
            .with_node(Node::new("outer").with_node(Node::new("step")))
            .with_node(Node::new("step"))
            .with_node(Node::new("go"))
            .with_edge(Edge::between("go", "step"));
        let index = MachineIndex::new(&machine);

        let resolved = index.resolve_reference("step").unwrap();
        assert_eq!(index.qualified_name(resolved.node), "outer.step");

        let hops = index.hops();
        assert_eq!(hops.len(), 1);
        assert_eq!(index.qualified_name(hops[0].target.node), "outer.step");
    }

    #[test]
    fn test_resolve_reference_attribute_alias_wins_over_child() {
        let machine = Machine::new("m").with_node(
            Node::new("a")
                .with_attribute(Attribute::new("k", "v"))
                .with_node(Node::new("k")),
        );
        let index = MachineIndex::new(&machine);
        let a = index.lookup_qualified("a").unwrap();

        let resolved = index.resolve_reference("a.k").unwrap();
        assert_eq!(resolved.node, a);
        assert_eq!(resolved.attribute_path.as_deref(), Some("k"));

        let resolved = index.resolve_reference("a.k.deep").unwrap();
        assert_eq!(resolved.node, a);
        assert_eq!(resolved.attribute_path.as_deref(), Some("k.deep"));
    }

    #[test]
    fn test_resolve_reference_with_attribute_suffix() {
        let machine = sample_machine();
        let index = MachineIndex::new(&machine);

        let resolved = index.resolve_reference("workflow.end.x.deep").unwrap();
        assert_eq!(index.qualified_name(resolved.node), "workflow.end");
        assert_eq!(resolved.attribute_path.as_deref(), Some("x.deep"));

        assert!(index.resolve_reference("nowhere.x").is_none());
    }

    #[test]
    fn test_resolve_reference_descends_from_simple_prefix() {
        let machine = Machine::new("m").with_node(
            Node::new("team").with_node(Node::new("lead").with_node(Node::new("helper"))),
        );
        let index = MachineIndex::new(&machine);

        let resolved = index.resolve_reference("lead.helper").unwrap();
        assert_eq!(index.qualified_name(resolved.node), "team.lead.helper");
        assert!(!resolved.has_attribute_path());

        let resolved = index.resolve_reference("lead.helper.mood").unwrap();
        assert_eq!(index.qualified_name(resolved.node), "team.lead.helper");
        assert_eq!(resolved.attribute_path.as_deref(), Some("mood"));
    }

    #[test]
    fn test_hops_chain_segments() {
        let machine = sample_machine();
        let index = MachineIndex::new(&machine);

        let hops: Vec<(String, String)> = index
            .hops()
            .iter()
            .map(|hop| {
                (
                    index.qualified_name(hop.source.node).to_string(),
                    index.qualified_name(hop.target.node).to_string(),
                )
            })
            .collect();

        assert_eq!(
            hops,
            vec![
                ("workflow".to_string(), "workflow.start".to_string()),
                ("workflow.start".to_string(), "workflow.end".to_string()),
                ("workflow.start".to_string(), "workflow.end".to_string()),
            ]
        );
    }

    #[test]
    fn test_hops_skip_unresolved_references() {
        let machine = Machine::new("m")
            .with_node(Node::new("a"))
            .with_edge(Edge::between("a", "ghost"));
        let index = MachineIndex::new(&machine);

        assert!(index.hops().is_empty());
    }
}
