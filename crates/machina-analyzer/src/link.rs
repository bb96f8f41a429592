//! Reference linking.
//!
//! The linker makes sure every edge endpoint names a node. It runs after
//! qualified-name expansion and is the last pass allowed to mutate the tree.
//!
//! - **Strict mode**: every unresolved reference is collected into a single
//!   [`LinkError`] and the machine is left untouched.
//! - **Lenient mode**: missing nodes are materialized as empty placeholders
//!   before anything else reads the tree. Dotted references attach under the
//!   longest prefix that already names a node; otherwise the whole chain is
//!   created from the root. Placeholder creation can be switched off, in which
//!   case each dangling reference becomes an `UNRESOLVED_REFERENCE` warning.
//!
//! In both modes, a `note` node without a `target` attribute receives one
//! holding its own qualified name.

use std::fmt;

use log::{debug, info, warn};
use thiserror::Error;

use machina_core::{
    ast::{Attribute, Machine, Node},
    identifier::{QualifiedName, SEPARATOR_STR, split_segments},
    index::MachineIndex,
};

use crate::{
    error::{ErrorCode, ValidationError},
    fold::Folder,
};

/// Name of the attribute synthesized on `note` nodes.
pub const NOTE_TARGET_ATTRIBUTE: &str = "target";

/// An edge reference that names no node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// The reference text as written on the edge.
    pub reference: String,
    /// Qualified name of the node declaring the edge, `None` at machine level.
    pub owner: Option<QualifiedName>,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "`{}` (in `{owner}`)", self.reference),
            None => write!(f, "`{}`", self.reference),
        }
    }
}

/// Hard linking failure.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unresolved references in strict mode: {}", join_references(.0))]
    Unresolved(Vec<UnresolvedReference>),
}

impl LinkError {
    /// Every reference that failed to resolve, in document order.
    pub fn references(&self) -> &[UnresolvedReference] {
        match self {
            LinkError::Unresolved(references) => references,
        }
    }
}

fn join_references(references: &[UnresolvedReference]) -> String {
    references
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of a successful link.
#[derive(Debug)]
pub struct Linked {
    pub machine: Machine,
    /// Qualified names of every synthesized placeholder, in creation order.
    pub placeholders: Vec<QualifiedName>,
    pub diagnostics: Vec<ValidationError>,
}

/// Links a machine, taking strict mode from its `@StrictMode` annotation.
pub fn link_machine(machine: Machine) -> Result<Linked, LinkError> {
    let strict = machine.is_strict();
    Linker::new(strict).link(machine)
}

/// The linking pass.
#[derive(Debug, Clone)]
pub struct Linker {
    strict: bool,
    auto_create_placeholders: bool,
}

impl Linker {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            auto_create_placeholders: true,
        }
    }

    /// Enables or disables placeholder creation in lenient mode.
    pub fn with_auto_create_placeholders(mut self, enabled: bool) -> Self {
        self.auto_create_placeholders = enabled;
        self
    }

    pub fn link(&self, mut machine: Machine) -> Result<Linked, LinkError> {
        let unresolved = find_unresolved_references(&machine);

        let mut placeholders = Vec::new();
        let mut diagnostics = Vec::new();

        if !unresolved.is_empty() {
            if self.strict {
                warn!(count = unresolved.len(); "Unresolved references in strict mode");
                return Err(LinkError::Unresolved(unresolved));
            }

            if self.auto_create_placeholders {
                let plan = plan_placeholders(&machine, &unresolved);
                for (reference, attach) in plan {
                    for created in materialize(&mut machine, attach) {
                        warn!(node = created.as_str(), reference = reference.as_str(); "Created placeholder node");
                        diagnostics.push(
                            ValidationError::info(
                                ErrorCode::PlaceholderCreated,
                                format!("created placeholder node `{created}` for reference `{reference}`"),
                            )
                            .with_node(created.as_str())
                            .with_context("reference", reference.as_str()),
                        );
                        placeholders.push(created);
                    }
                }
            } else {
                for unresolved in &unresolved {
                    debug!(reference = unresolved.reference.as_str(); "Leaving reference unresolved");
                    let mut diagnostic = ValidationError::warning(
                        ErrorCode::UnresolvedReference,
                        format!("reference {unresolved} does not name a node"),
                    )
                    .with_context("reference", unresolved.reference.as_str())
                    .with_suggestion("declare the node or fix the reference");
                    if let Some(owner) = &unresolved.owner {
                        diagnostic = diagnostic.with_node(owner.as_str());
                    }
                    diagnostics.push(diagnostic);
                }
            }
        }

        let mut notes = NoteTargets::default();
        let machine = notes.fold_machine(machine);

        info!(
            placeholders = placeholders.len(),
            note_targets = notes.synthesized,
            strict = self.strict;
            "Linked machine"
        );
        Ok(Linked {
            machine,
            placeholders,
            diagnostics,
        })
    }
}

/// Returns `true` if `reference` names a node or a `<node>.<attribute>` path.
fn is_resolvable(index: &MachineIndex<'_>, reference: &str) -> bool {
    if index.contains(reference) {
        return true;
    }
    match index.resolve_reference(reference) {
        Some(resolved) => match resolved.attribute_path.as_deref() {
            Some(path) => {
                let attribute = path.split(SEPARATOR_STR).next().unwrap_or(path);
                index.node(resolved.node).node().has_attribute(attribute)
            }
            None => true,
        },
        None => false,
    }
}

/// Collects every unresolved edge reference, deduplicated, in document order.
pub fn find_unresolved_references(machine: &Machine) -> Vec<UnresolvedReference> {
    let index = MachineIndex::new(machine);
    let mut unresolved: Vec<UnresolvedReference> = Vec::new();

    for indexed in index.edges() {
        for reference in indexed.edge().references() {
            let reference = reference.trim();
            if reference.is_empty() || is_resolvable(&index, reference) {
                continue;
            }
            if unresolved.iter().any(|u| u.reference == reference) {
                continue;
            }
            unresolved.push(UnresolvedReference {
                reference: reference.to_string(),
                owner: indexed.owner().map(|id| index.qualified_name(id).clone()),
            });
        }
    }
    unresolved
}

/// Where a placeholder chain goes: below `parent` (or the root), one node per
/// segment.
#[derive(Debug)]
struct Attachment {
    parent: Option<QualifiedName>,
    segments: Vec<String>,
}

fn plan_placeholders(
    machine: &Machine,
    unresolved: &[UnresolvedReference],
) -> Vec<(String, Attachment)> {
    let index = MachineIndex::new(machine);
    unresolved
        .iter()
        .map(|u| {
            let segments = split_segments(&u.reference);
            let mut attachment = Attachment {
                parent: None,
                segments: segments.iter().map(|s| s.to_string()).collect(),
            };
            for split in (1..segments.len()).rev() {
                let prefix = segments[..split].join(SEPARATOR_STR);
                if let Some(id) = index.lookup(&prefix) {
                    attachment = Attachment {
                        parent: Some(index.qualified_name(id).clone()),
                        segments: segments[split..].iter().map(|s| s.to_string()).collect(),
                    };
                    break;
                }
            }
            (u.reference.clone(), attachment)
        })
        .collect()
}

/// Creates the nodes of `attachment` that do not exist yet and returns their
/// qualified names.
fn materialize(machine: &mut Machine, attachment: Attachment) -> Vec<QualifiedName> {
    let mut created = Vec::new();
    let Some(mut siblings) = children_at(machine, attachment.parent.as_ref()) else {
        return created;
    };
    let mut path = attachment.parent.unwrap_or_default();

    for segment in attachment.segments {
        path = path.create_nested(&segment);
        let position = match siblings.iter().position(|n| n.name == segment) {
            Some(position) => position,
            None => {
                siblings.push(Node::new(segment));
                created.push(path.clone());
                siblings.len() - 1
            }
        };
        siblings = &mut siblings[position].nodes;
    }
    created
}

/// Returns the child list of the node at `parent`, or the root list.
fn children_at<'m>(
    machine: &'m mut Machine,
    parent: Option<&QualifiedName>,
) -> Option<&'m mut Vec<Node>> {
    let mut nodes = &mut machine.nodes;
    if let Some(parent) = parent {
        for segment in parent.segments() {
            let node = nodes.iter_mut().find(|n| n.name == segment)?;
            nodes = &mut node.nodes;
        }
    }
    Some(nodes)
}

/// Gives every `note` node without a target a `target` equal to its own
/// qualified name.
#[derive(Debug, Default)]
struct NoteTargets {
    path: Vec<String>,
    synthesized: usize,
}

fn is_note(node: &Node) -> bool {
    node.node_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("note"))
}

impl Folder for NoteTargets {
    fn fold_node(&mut self, mut node: Node) -> Node {
        self.path.push(node.name.clone());
        if is_note(&node) && !node.has_attribute(NOTE_TARGET_ATTRIBUTE) {
            let target = QualifiedName::from_segments(&self.path);
            debug!(node = target.as_str(); "Synthesizing note target");
            node.attributes
                .push(Attribute::new(NOTE_TARGET_ATTRIBUTE, target.into_string()));
            self.synthesized += 1;
        }
        node.nodes = self.fold_nodes(std::mem::take(&mut node.nodes));
        self.path.pop();
        node
    }
}
