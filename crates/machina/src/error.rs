//! Error types for Machina operations.
//!
//! Only failures that stop the pipeline are errors here. Everything else is a
//! diagnostic in the [`ValidationContext`](crate::diagnostics::ValidationContext)
//! of an [`Analysis`](crate::Analysis).

use thiserror::Error;

use machina_analyzer::link::LinkError;

/// The main error type for Machina operations.
#[derive(Debug, Error)]
pub enum MachinaError {
    /// Strict linking found references that name no node.
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl MachinaError {
    /// The unresolved references of a link failure.
    pub fn unresolved_references(&self) -> &[machina_analyzer::link::UnresolvedReference] {
        match self {
            MachinaError::Link(err) => err.references(),
            MachinaError::Config(_) => &[],
        }
    }
}
