//! Recovery actions attached to nodes for the executor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the executor should do when it reaches a node with errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecoveryAction {
    /// Stop the whole run.
    Abort,

    /// Skip the node and follow its outgoing transitions.
    Skip,

    /// Use a fallback value in place of the node's output.
    Default { value: String },

    /// Retry the node up to `max_attempts` times.
    Retry { max_attempts: u32 },

    /// Ignore the errors and execute the node anyway.
    Continue,

    /// An executor-specific strategy.
    Custom { name: String },
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryAction::Abort => write!(f, "abort"),
            RecoveryAction::Skip => write!(f, "skip"),
            RecoveryAction::Default { value } => write!(f, "default({value})"),
            RecoveryAction::Retry { max_attempts } => write!(f, "retry(x{max_attempts})"),
            RecoveryAction::Continue => write!(f, "continue"),
            RecoveryAction::Custom { name } => write!(f, "custom({name})"),
        }
    }
}
