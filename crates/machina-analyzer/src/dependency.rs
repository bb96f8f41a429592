//! Implicit dependencies between nodes.
//!
//! Two sources of dependencies are recognized:
//!
//! - `{{ path }}` placeholders in attribute values make the attribute's owner
//!   depend on the node named by the path's root identifier. Deeper segments
//!   are what is read from that node, so `{{ team.lead.name }}` depends on
//!   `team` and reads `lead.name`.
//! - `when:`, `unless:` and `if:` conditions on edge labels make every source
//!   of the labeled segment depend on each node the condition reads.
//!
//! A condition path such as `config.retry.maxAttempts` is one reference: it
//! depends on the node named by its longest node prefix (`config`). When no
//! prefix names a node, the root identifier may still name an attribute, and
//! the dependency goes to that attribute's owner if exactly one node has it.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::Serialize;

use machina_core::{
    identifier::{QualifiedName, SEPARATOR},
    index::{MachineIndex, NodeId},
};

use crate::{
    digraph::IdGraph,
    error::{ErrorCode, ValidationContext, ValidationError},
    template::{ConditionKind, condition_identifiers, extract_condition, template_paths},
};

/// Identifiers that never name a dependency inside a condition.
pub const RESERVED_IDENTIFIERS: [&str; 6] =
    ["true", "false", "null", "errorCount", "errors", "activeState"];

/// Where a dependency was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Template,
    Condition,
}

/// An inferred edge: `source` reads something owned by `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub kind: DependencyKind,
    pub reason: String,
    /// The referenced path as written.
    pub path: String,
    /// Set for dependencies read from an `unless:` condition.
    pub negated: bool,
}

/// Scans an indexed machine for dependencies.
#[derive(Debug)]
pub struct DependencyAnalyzer<'a> {
    index: &'a MachineIndex<'a>,
    reserved: Vec<String>,
}

impl<'a> DependencyAnalyzer<'a> {
    pub fn new(index: &'a MachineIndex<'a>) -> Self {
        Self {
            index,
            reserved: RESERVED_IDENTIFIERS.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Adds identifiers to the reserved set.
    pub fn with_reserved<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for identifier in extra {
            let identifier = identifier.into();
            if !self.reserved.contains(&identifier) {
                self.reserved.push(identifier);
            }
        }
        self
    }

    /// Collects every dependency, deduplicated on source, target and path.
    pub fn analyze(&self) -> DependencyGraph<'a> {
        let mut collector = Collector {
            index: self.index,
            seen: HashSet::new(),
            edges: Vec::new(),
        };
        self.collect_templates(&mut collector);
        self.collect_conditions(&mut collector);

        let mut graph = IdGraph::new(self.index);
        for &(source, target, _) in &collector.edges {
            graph.add_edge(source, target, ());
        }
        let dependencies: Vec<Dependency> = collector.edges.into_iter().map(|(.., d)| d).collect();

        info!(dependencies = dependencies.len(); "Inferred node dependencies");
        DependencyGraph {
            index: self.index,
            dependencies,
            graph,
        }
    }

    fn collect_templates(&self, collector: &mut Collector<'a>) {
        for (owner, indexed) in self.index.nodes() {
            for attribute in &indexed.node().attributes {
                let Some(value) = &attribute.value else {
                    continue;
                };
                for text in value.texts() {
                    for path in template_paths(&text) {
                        let (root, member) = match path.split_once(SEPARATOR) {
                            Some((root, member)) => (root, member),
                            None => (path, path),
                        };
                        let Some(target) = self.index.lookup(root) else {
                            debug!(owner = indexed.qualified_name().as_str(), path; "Template path names no node");
                            continue;
                        };
                        collector.add(
                            owner,
                            target,
                            DependencyKind::Template,
                            format!("reads {member}"),
                            path,
                            false,
                        );
                    }
                }
            }
        }
    }

    fn collect_conditions(&self, collector: &mut Collector<'a>) {
        let reserved: Vec<&str> = self.reserved.iter().map(String::as_str).collect();
        let owners = self.attribute_owners();

        for indexed in self.index.edges() {
            let edge = indexed.edge();
            let mut sources = &edge.sources;
            for segment in &edge.segments {
                let condition = segment.label.as_deref().and_then(extract_condition);
                if let Some(condition) = condition {
                    let source_ids: Vec<NodeId> = sources
                        .iter()
                        .filter_map(|s| self.index.resolve_reference(s))
                        .map(|r| r.node)
                        .collect();

                    for path in condition_identifiers(condition.expression, &reserved) {
                        let Some(target) = self.condition_target(path, &owners) else {
                            continue;
                        };
                        for &source in &source_ids {
                            collector.add(
                                source,
                                target,
                                DependencyKind::Condition,
                                format!("{} condition reads {path}", condition.kind),
                                path,
                                condition.kind == ConditionKind::Unless,
                            );
                        }
                    }
                }
                sources = &segment.targets;
            }
        }
    }

    fn condition_target(&self, path: &str, owners: &HashMap<&str, Vec<NodeId>>) -> Option<NodeId> {
        if let Some(resolved) = self.index.resolve_reference(path) {
            return Some(resolved.node);
        }
        let root = path.split('.').next().unwrap_or(path);
        match owners.get(root).map(Vec::as_slice) {
            Some([owner]) => Some(*owner),
            Some(several) => {
                debug!(path, owners = several.len(); "Ambiguous attribute reference in condition");
                None
            }
            None => None,
        }
    }

    fn attribute_owners(&self) -> HashMap<&'a str, Vec<NodeId>> {
        let mut owners: HashMap<&'a str, Vec<NodeId>> = HashMap::new();
        for (id, indexed) in self.index.nodes() {
            for attribute in &indexed.node().attributes {
                owners.entry(attribute.name.as_str()).or_default().push(id);
            }
        }
        owners
    }
}

struct Collector<'a> {
    index: &'a MachineIndex<'a>,
    seen: HashSet<(NodeId, NodeId, String)>,
    edges: Vec<(NodeId, NodeId, Dependency)>,
}

impl Collector<'_> {
    fn add(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: DependencyKind,
        reason: String,
        path: &str,
        negated: bool,
    ) {
        // A node reading its own attributes depends on nothing.
        if source == target || !self.seen.insert((source, target, path.to_string())) {
            return;
        }
        let dependency = Dependency {
            source: self.index.qualified_name(source).clone(),
            target: self.index.qualified_name(target).clone(),
            kind,
            reason,
            path: path.to_string(),
            negated,
        };
        self.edges.push((source, target, dependency));
    }
}

/// The inferred dependencies of a machine, with graph queries over them.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    index: &'a MachineIndex<'a>,
    dependencies: Vec<Dependency>,
    graph: IdGraph<()>,
}

impl DependencyGraph<'_> {
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn into_dependencies(self) -> Vec<Dependency> {
        self.dependencies
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Direct dependencies of one node.
    pub fn dependencies_of(&self, source: &str) -> Vec<&Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.source == source)
            .collect()
    }

    /// Returns `true` if `source` depends on `target`, directly or through
    /// other nodes. Names are looked up through the edge reference aliases.
    pub fn has_dependency(&self, source: &str, target: &str) -> bool {
        match (self.index.lookup(source), self.index.lookup(target)) {
            (Some(source), Some(target)) => self.graph.has_path(source, target),
            _ => false,
        }
    }

    /// Cycles in the dependency graph, reported as warnings when a context
    /// is supplied.
    pub fn detect_circular_dependencies(
        &self,
        context: Option<&mut ValidationContext>,
    ) -> Vec<Vec<QualifiedName>> {
        let cycles: Vec<Vec<QualifiedName>> = self
            .graph
            .cycles()
            .into_iter()
            .map(|cycle| {
                cycle
                    .into_iter()
                    .map(|id| self.index.qualified_name(id).clone())
                    .collect()
            })
            .collect();

        if !cycles.is_empty() {
            warn!(cycles = cycles.len(); "Circular dependencies detected");
        }
        if let Some(context) = context {
            for cycle in &cycles {
                let path = cycle
                    .iter()
                    .chain(cycle.first())
                    .map(QualifiedName::as_str)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                let mut error = ValidationError::warning(
                    ErrorCode::CircularDependency,
                    format!("circular dependency: {path}"),
                )
                .with_context("cycle", path);
                if let Some(first) = cycle.first() {
                    error = error.with_node(first.as_str());
                }
                context.add_error(error);
            }
        }
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_core::ast::{Attribute, AttributeValue, Edge, Machine, Node};

    use crate::error::Severity;

    fn names(dependencies: &[Dependency]) -> Vec<(&str, &str)> {
        dependencies
            .iter()
            .map(|d| (d.source.as_str(), d.target.as_str()))
            .collect()
    }

    #[test]
    fn test_template_dependencies() {
        let machine = Machine::new("m")
            .with_node(Node::new("input").with_attribute(Attribute::new("text", "hello")))
            .with_node(
                Node::new("summarize")
                    .with_attribute(Attribute::new("prompt", "Summarize {{ input.text }} for {{ user }}"))
                    .with_attribute(Attribute::new(
                        "extra",
                        AttributeValue::array([AttributeValue::string("{{input.text}}")]),
                    )),
            );
        let index = MachineIndex::new(&machine);

        let graph = DependencyAnalyzer::new(&index).analyze();

        assert_eq!(names(graph.dependencies()), vec![("summarize", "input")]);
        let dependency = &graph.dependencies()[0];
        assert_eq!(dependency.kind, DependencyKind::Template);
        assert_eq!(dependency.reason, "reads text");
        assert_eq!(dependency.path, "input.text");
        assert!(!dependency.negated);
    }

    #[test]
    fn test_template_dependency_targets_root_node() {
        let machine = Machine::new("m")
            .with_node(
                Node::new("team")
                    .with_node(Node::new("lead").with_attribute(Attribute::new("name", "Ada"))),
            )
            .with_node(
                Node::new("worker").with_attribute(Attribute::new("prompt", "ask {{ team.lead.name }}")),
            )
            .with_node(Node::new("report").with_attribute(Attribute::new("body", "{{ worker }}")));
        let index = MachineIndex::new(&machine);

        let graph = DependencyAnalyzer::new(&index).analyze();

        assert_eq!(
            names(graph.dependencies()),
            vec![("worker", "team"), ("report", "worker")]
        );
        assert_eq!(graph.dependencies()[0].reason, "reads lead.name");
        assert_eq!(graph.dependencies()[0].path, "team.lead.name");
        assert_eq!(graph.dependencies()[1].reason, "reads worker");
    }

    #[test]
    fn test_self_reference_is_ignored() {
        let machine = Machine::new("m").with_node(
            Node::new("step")
                .with_attribute(Attribute::new("name", "x"))
                .with_attribute(Attribute::new("greeting", "hi {{ step.name }}")),
        );
        let index = MachineIndex::new(&machine);

        assert!(DependencyAnalyzer::new(&index).analyze().is_empty());
    }

    #[test]
    fn test_condition_dependencies_use_member_paths() {
        let machine = Machine::new("m")
            .with_node(Node::new("config").with_attribute(Attribute::new(
                "retry",
                AttributeValue::object([("maxAttempts", AttributeValue::number(3.0))]),
            )))
            .with_node(Node::new("retry"))
            .with_node(Node::new("start"))
            .with_node(Node::new("finish"))
            .with_edge(Edge::new(["start"]).to_labeled(
                ["finish"],
                "when: config.retry.maxAttempts > 2 && errorCount == 0",
            ));
        let index = MachineIndex::new(&machine);

        let graph = DependencyAnalyzer::new(&index).analyze();

        assert_eq!(names(graph.dependencies()), vec![("start", "config")]);
        assert_eq!(graph.dependencies()[0].reason, "when condition reads config.retry.maxAttempts");
    }

    #[test]
    fn test_condition_attribute_owner() {
        let machine = Machine::new("m")
            .with_node(Node::new("review").with_attribute(Attribute::new("approved", false)))
            .with_node(Node::new("a").with_attribute(Attribute::new("score", 1.0)))
            .with_node(Node::new("b").with_attribute(Attribute::new("score", 2.0)))
            .with_node(Node::new("draft"))
            .with_node(Node::new("publish"))
            .with_edge(
                Edge::new(["draft", "review"])
                    .to_labeled(["publish"], "unless: approved || score > 1 || 'approved' == title"),
            );
        let index = MachineIndex::new(&machine);

        let graph = DependencyAnalyzer::new(&index).analyze();

        // `score` has two owners and `title` has none.
        assert_eq!(names(graph.dependencies()), vec![("draft", "review")]);
        assert!(graph.dependencies()[0].negated);
    }

    #[test]
    fn test_condition_sources_follow_segments() {
        let machine = Machine::new("m")
            .with_node(Node::new("a"))
            .with_node(Node::new("b"))
            .with_node(Node::new("c"))
            .with_node(Node::new("flag"))
            .with_edge(Edge::new(["a"]).to(["b"]).to_labeled(["c"], "if: flag"));
        let index = MachineIndex::new(&machine);

        let graph = DependencyAnalyzer::new(&index).analyze();

        assert_eq!(names(graph.dependencies()), vec![("b", "flag")]);
        assert_eq!(graph.dependencies_of("b").len(), 1);
        assert!(graph.dependencies_of("a").is_empty());
    }

    #[test]
    fn test_extra_reserved_identifiers() {
        let machine = Machine::new("m")
            .with_node(Node::new("a"))
            .with_node(Node::new("b"))
            .with_node(Node::new("retries"))
            .with_edge(Edge::new(["a"]).to_labeled(["b"], "when: retries"));
        let index = MachineIndex::new(&machine);

        let graph = DependencyAnalyzer::new(&index)
            .with_reserved(["retries"])
            .analyze();

        assert!(graph.is_empty());
    }

    #[test]
    fn test_deduplication() {
        let machine = Machine::new("m")
            .with_node(Node::new("a"))
            .with_node(Node::new("b"))
            .with_node(Node::new("ready"))
            .with_edge(Edge::new(["a"]).to_labeled(["b"], "when: ready && ready"))
            .with_edge(Edge::new(["a"]).to_labeled(["b"], "if: ready"));
        let index = MachineIndex::new(&machine);

        let graph = DependencyAnalyzer::new(&index).analyze();

        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_transitive_dependency_and_cycles() {
        let machine = Machine::new("m")
            .with_node(Node::new("a").with_attribute(Attribute::new("v", "{{ b }}")))
            .with_node(Node::new("b").with_attribute(Attribute::new("v", "{{ c }}")))
            .with_node(Node::new("c").with_attribute(Attribute::new("v", "{{ a }}")))
            .with_node(Node::new("d").with_attribute(Attribute::new("v", "{{ a }}")));
        let index = MachineIndex::new(&machine);
        let graph = DependencyAnalyzer::new(&index).analyze();

        assert!(graph.has_dependency("a", "c"));
        assert!(graph.has_dependency("d", "c"));
        assert!(!graph.has_dependency("a", "d"));
        assert!(!graph.has_dependency("a", "missing"));

        let mut context = ValidationContext::new();
        let cycles = graph.detect_circular_dependencies(Some(&mut context));

        assert_eq!(cycles, vec![vec![
            QualifiedName::new("a"),
            QualifiedName::new("b"),
            QualifiedName::new("c"),
        ]]);
        assert_eq!(context.len(), 1);
        let warning = &context.errors()[0];
        assert_eq!(warning.code(), ErrorCode::CircularDependency);
        assert_eq!(warning.severity(), Severity::Warning);
        assert_eq!(warning.context().get("cycle").map(String::as_str), Some("a -> b -> c -> a"));
    }

    #[test]
    fn test_cycles_without_context() {
        let machine = Machine::new("m")
            .with_node(Node::new("a").with_attribute(Attribute::new("v", "{{ b }}")))
            .with_node(Node::new("b"));
        let index = MachineIndex::new(&machine);
        let graph = DependencyAnalyzer::new(&index).analyze();

        assert!(graph.detect_circular_dependencies(None).is_empty());
    }
}
