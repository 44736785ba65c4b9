//! Host-level errors

use thiserror::Error;
use tos_sandbox_environment::{ErrorCategory, ScriptError};
use tos_sandbox_runtime::RuntimeError;

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;

/// Why a deployment or invocation did not produce a receipt
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    /// Runtime limits rejected by validation
    #[error("{0}")]
    Config(RuntimeError),

    /// The isolate could not be hardened
    #[error("Environment setup failed: {0}")]
    Environment(ScriptError),

    /// No contract is deployed under this name
    #[error("Unknown contract: {0}")]
    UnknownContract(String),

    /// The contract does not expose this method
    #[error("Unknown method: {contract}.{method}")]
    UnknownMethod {
        /// Contract name
        contract: String,
        /// Requested method
        method: String,
    },

    /// A contract is already deployed under this name
    #[error("Contract already deployed: {0}")]
    AlreadyDeployed(String),

    /// Contract name is empty
    #[error("Invalid contract name")]
    InvalidName,

    /// The call failed and every effect it had was rolled back
    #[error("Aborted ({category:?}): {reason}")]
    Aborted {
        /// Error classification
        category: ErrorCategory,
        /// Error message as contract code saw it
        reason: String,
    },

    /// A provider failed while the journal was being applied
    #[error("Commit failed: {0}")]
    Commit(RuntimeError),
}

impl HostError {
    /// Category of an aborted call, `None` for host-side failures
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            HostError::Aborted { category, .. } => Some(*category),
            _ => None,
        }
    }
}

impl From<&ScriptError> for HostError {
    fn from(err: &ScriptError) -> Self {
        HostError::Aborted {
            category: err.category(),
            reason: err.to_string(),
        }
    }
}
