//! Name scoping for edge references.
//!
//! Edge endpoints (`source` and `target` references) are not lexically
//! scoped: every node of the machine is visible from every edge, under
//! several aliases:
//!
//! - its simple name (`child`)
//! - its qualified name (`parent.child`)
//! - for each attribute, `<name>.<attribute>` for both of the above
//!   (`child.x`, `parent.child.x`)
//!
//! Aliases are registered in document order and the first registration of a
//! string wins, so a simple name shared by two nodes at different depths
//! resolves to the one declared first. Attribute aliases are only built from
//! the name aliases a node won.
//!
//! The table itself lives in [`MachineIndex`], which resolves edge hops
//! through it, so every pass agrees on what a reference names.

pub use machina_core::index::ScopeEntry;
use machina_core::index::{MachineIndex, NodeId};

/// The kind of reference being scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An edge source.
    Source,
    /// An edge target.
    Target,
    /// Any other reference; uses default scoping (exact qualified name).
    Other,
}

impl ReferenceKind {
    fn uses_aliases(self) -> bool {
        matches!(self, ReferenceKind::Source | ReferenceKind::Target)
    }
}

/// Scoped view over an indexed machine.
#[derive(Debug, Clone, Copy)]
pub struct ScopeProvider<'a> {
    index: &'a MachineIndex<'a>,
}

impl<'a> ScopeProvider<'a> {
    pub fn new(index: &'a MachineIndex<'a>) -> Self {
        Self { index }
    }

    /// Resolves a reference of the given kind.
    pub fn resolve(&self, kind: ReferenceKind, reference: &str) -> Option<ScopeEntry> {
        let reference = reference.trim();
        if kind.uses_aliases() {
            return self.index.alias(reference).cloned();
        }
        self.index
            .lookup_qualified(reference)
            .map(|node| ScopeEntry {
                node,
                attribute: None,
            })
    }

    /// Lists every name visible to a reference of this kind, in registration
    /// order.
    pub fn candidates(&self, kind: ReferenceKind) -> Vec<&'a str> {
        if kind.uses_aliases() {
            self.index.aliases().map(|(alias, _)| alias).collect()
        } else {
            self.index
                .nodes()
                .map(|(_, node)| node.qualified_name().as_str())
                .collect()
        }
    }

    /// Every alias registered for a node, attribute aliases included.
    pub fn aliases_for(&self, node: NodeId) -> Vec<&'a str> {
        self.index
            .aliases()
            .filter(|(_, entry)| entry.node == node)
            .map(|(alias, _)| alias)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.aliases().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_core::ast::{Attribute, Machine, Node};

    #[test]
    fn test_scope_completeness() {
        let machine = Machine::new("m").with_node(
            Node::new("parent")
                .with_node(Node::new("child").with_attribute(Attribute::new("x", "1"))),
        );
        let index = MachineIndex::new(&machine);
        let scope = ScopeProvider::new(&index);
        let child = index.lookup_qualified("parent.child").unwrap();

        for alias in ["child", "parent.child"] {
            let entry = scope.resolve(ReferenceKind::Target, alias).unwrap();
            assert_eq!(entry.node, child, "alias `{alias}`");
            assert!(entry.attribute.is_none());
        }
        for alias in ["child.x", "parent.child.x"] {
            let entry = scope.resolve(ReferenceKind::Source, alias).unwrap();
            assert_eq!(entry.node, child, "alias `{alias}`");
            assert_eq!(entry.attribute.as_deref(), Some("x"));
        }
    }

    #[test]
    fn test_root_node_registers_one_alias() {
        let machine = Machine::new("m").with_node(Node::new("start"));
        let index = MachineIndex::new(&machine);
        let scope = ScopeProvider::new(&index);

        assert_eq!(scope.len(), 1);
        assert_eq!(scope.candidates(ReferenceKind::Source), vec!["start"]);
    }

    #[test]
    fn test_first_registration_wins() {
        let machine = Machine::new("m")
            .with_node(Node::new("outer").with_node(Node::new("step")))
            .with_node(Node::new("step").with_attribute(Attribute::new("y", "2")));
        let index = MachineIndex::new(&machine);
        let scope = ScopeProvider::new(&index);

        let nested = index.lookup_qualified("outer.step").unwrap();
        let root = index
            .nodes()
            .find(|(_, n)| n.depth() == 0 && n.name() == "step")
            .map(|(id, _)| id)
            .unwrap();

        // The nested `step` is declared first, so it owns the simple name.
        assert_eq!(scope.resolve(ReferenceKind::Target, "step").unwrap().node, nested);
        // The root `step` lost both name aliases, and with them its attribute alias.
        assert!(scope.aliases_for(root).is_empty());
        assert!(scope.resolve(ReferenceKind::Source, "step.y").is_none());
        assert_eq!(scope.aliases_for(nested), vec!["step", "outer.step"]);
    }

    #[test]
    fn test_other_kind_uses_exact_qualified_lookup() {
        let machine = Machine::new("m").with_node(
            Node::new("parent")
                .with_node(Node::new("child").with_attribute(Attribute::new("x", "1"))),
        );
        let index = MachineIndex::new(&machine);
        let scope = ScopeProvider::new(&index);

        assert!(scope.resolve(ReferenceKind::Other, "parent.child").is_some());
        assert!(scope.resolve(ReferenceKind::Other, "child").is_none());
        assert!(scope.resolve(ReferenceKind::Other, "child.x").is_none());
        assert_eq!(
            scope.candidates(ReferenceKind::Other),
            vec!["parent", "parent.child"]
        );
    }

    #[test]
    fn test_candidates_in_registration_order() {
        let machine = Machine::new("m").with_node(
            Node::new("a")
                .with_attribute(Attribute::new("k", "v"))
                .with_node(Node::new("b")),
        );
        let index = MachineIndex::new(&machine);
        let scope = ScopeProvider::new(&index);

        assert_eq!(
            scope.candidates(ReferenceKind::Target),
            vec!["a", "a.k", "b", "a.b"]
        );
    }
}
