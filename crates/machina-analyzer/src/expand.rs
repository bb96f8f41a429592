//! Qualified name expansion.
//!
//! Desugars dotted node declarations into nested structure:
//!
//! ```text
//! team.lead.assistant;      =>    team { lead { assistant; } }
//! ```
//!
//! Every sibling list is processed the same way: dotted nodes are removed in
//! reverse index order (so the remaining indices stay valid), then re-inserted
//! in document order under find-or-create intermediate nodes. A leaf that
//! collides with an existing sibling is merged into it:
//!
//! - title: the incoming title wins when present
//! - type: adopted when the existing node has none; on a conflict the incoming
//!   type wins in lenient mode, while strict mode keeps the existing type and
//!   reports [`ErrorCode::TypeConflict`]
//! - annotations: appended unless one with the same name already exists
//! - attributes: last write wins per name
//! - child nodes: merged recursively by simple name
//! - edges: concatenated
//!
//! The pass is idempotent: after one run no node name contains a `.`.

use log::{debug, info, warn};

use machina_core::{
    ast::{Machine, Node},
    identifier::{QualifiedName, is_qualified, split_segments},
};

use crate::{
    error::{ErrorCode, ValidationError},
    fold::Folder,
};

/// Expands dotted node names in a machine.
///
/// Strict mode is taken from the machine's `@StrictMode` annotation.
/// Returns the rewritten machine and any diagnostics raised while merging.
pub fn expand_qualified_names(machine: Machine) -> (Machine, Vec<ValidationError>) {
    let strict = machine.is_strict();
    QualifiedNameExpander::new(strict).expand(machine)
}

/// The expansion pass, with an explicit strictness setting.
#[derive(Debug, Default)]
pub struct QualifiedNameExpander {
    strict: bool,
    path: Vec<String>,
    expanded: usize,
    diagnostics: Vec<ValidationError>,
}

impl QualifiedNameExpander {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    pub fn expand(mut self, machine: Machine) -> (Machine, Vec<ValidationError>) {
        let machine = self.fold_machine(machine);
        info!(expanded = self.expanded, strict = self.strict; "Expanded qualified names");
        (machine, self.diagnostics)
    }

    fn current_path(&self) -> QualifiedName {
        QualifiedName::from_segments(&self.path)
    }

    /// Inserts `node` at `segments` below `container`, creating intermediate
    /// nodes as needed and merging on collision.
    fn insert_at_path(
        &mut self,
        container: &mut Vec<Node>,
        container_path: QualifiedName,
        segments: &[&str],
        mut node: Node,
    ) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        let path = container_path.create_nested(first);

        if rest.is_empty() {
            node.name = (*first).to_string();
            match container.iter_mut().find(|n| n.name == *first) {
                Some(existing) => self.merge_node(existing, node, &path),
                None => container.push(node),
            }
            return;
        }

        let position = match container.iter().position(|n| n.name == *first) {
            Some(position) => position,
            None => {
                debug!(node = path.as_str(); "Creating intermediate node");
                container.push(Node::new(*first));
                container.len() - 1
            }
        };
        let intermediate = &mut container[position].nodes;
        self.insert_at_path(intermediate, path, rest, node);
    }

    /// Merges `incoming` into `existing`. `path` is the qualified name of the
    /// merged node.
    fn merge_node(&mut self, existing: &mut Node, incoming: Node, path: &QualifiedName) {
        if incoming.title.is_some() {
            existing.title = incoming.title;
        }

        if let Some(new) = incoming.node_type {
            match existing.node_type.clone() {
                None => existing.node_type = Some(new),
                Some(current) if current != new => {
                    if self.strict {
                        warn!(node = path.as_str(), kept = current.as_str(), rejected = new.as_str(); "Conflicting node types");
                        self.diagnostics.push(
                            ValidationError::error(
                                ErrorCode::TypeConflict,
                                format!("node `{path}` is declared as both `{current}` and `{new}`"),
                            )
                            .with_node(path.as_str())
                            .with_expected(current)
                            .with_actual(new)
                            .with_suggestion("declare the node with a single type"),
                        );
                    } else {
                        debug!(node = path.as_str(), from = current.as_str(), to = new.as_str(); "Overriding node type");
                        existing.node_type = Some(new);
                    }
                }
                Some(_) => {}
            }
        }

        for annotation in incoming.annotations {
            if !existing.annotations.iter().any(|a| a.name == annotation.name) {
                existing.annotations.push(annotation);
            }
        }

        for attribute in incoming.attributes {
            match existing
                .attributes
                .iter_mut()
                .find(|a| a.name == attribute.name)
            {
                Some(slot) => *slot = attribute,
                None => existing.attributes.push(attribute),
            }
        }

        for child in incoming.nodes {
            let child_path = path.create_nested(&child.name);
            match existing.nodes.iter_mut().find(|n| n.name == child.name) {
                Some(slot) => self.merge_node(slot, child, &child_path),
                None => existing.nodes.push(child),
            }
        }

        existing.edges.extend(incoming.edges);
    }
}

impl Folder for QualifiedNameExpander {
    fn fold_nodes(&mut self, mut nodes: Vec<Node>) -> Vec<Node> {
        let mut dotted = Vec::new();
        for index in (0..nodes.len()).rev() {
            if is_qualified(&nodes[index].name) {
                dotted.push(nodes.remove(index));
            }
        }

        let container_path = self.current_path();
        for node in dotted.into_iter().rev() {
            let name = node.name.clone();
            let segments = split_segments(&name);
            if segments.is_empty() {
                warn!(name = name.as_str(); "Dropping node with an empty qualified name");
                continue;
            }
            self.expanded += 1;
            self.insert_at_path(&mut nodes, container_path.clone(), &segments, node);
        }

        nodes.into_iter().map(|node| self.fold_node(node)).collect()
    }

    fn fold_node(&mut self, mut node: Node) -> Node {
        self.path.push(node.name.clone());
        node.nodes = self.fold_nodes(std::mem::take(&mut node.nodes));
        self.path.pop();
        node
    }
}
