//! Machina Semantic Analysis
//!
//! This crate runs the semantic passes over a parsed machine. The passes are:
//!
//! - **Expansion**: dotted node names become nested nodes ([`expand`] module)
//! - **Linking**: unresolved edge references become placeholders or errors ([`link`] module)
//! - **Scoping**: every alias a node can be referenced by ([`scope`] module)
//! - **Node types**: explicit and inferred node roles ([`node_type`] module)
//! - **Attribute types**: declared attribute types and their checker ([`types`] module)
//! - **Graph validation**: reachability, entry and exit points, cycles ([`graph`] module)
//! - **Dependencies**: implicit edges from templates and conditions ([`dependency`] module)
//!
//! Expansion and linking rewrite the tree. Every other pass reads it through a
//! [`machina_core::index::MachineIndex`] and reports into an
//! [`error::ValidationContext`].

pub mod dependency;
pub mod error;
pub mod expand;
pub mod graph;
pub mod link;
pub mod node_type;
pub mod scope;
pub mod template;
pub mod types;

mod digraph;
mod fold;
