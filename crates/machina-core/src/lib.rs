//! Machina Core Types
//!
//! This crate provides the foundational types for the Machina workflow graph
//! language. It includes:
//!
//! - **AST**: The machine tree produced by the external parser ([`ast`] module)
//! - **Identifiers**: Dotted qualified names ([`identifier::QualifiedName`])
//! - **Index**: A read-only arena over an expanded machine ([`index::MachineIndex`])
//!
//! The AST is mutated only by the expansion and linking passes in
//! `machina-analyzer`. Every later pass reads it through a [`index::MachineIndex`].

pub mod ast;
pub mod identifier;
pub mod index;
