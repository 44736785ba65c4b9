//! Error types for the sandbox runtime

use crate::numeric::{Decimal, NumericError};
use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Rejected value movements
///
/// Any of these aborts the whole invocation; the ledger is never left
/// partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Amount is zero or negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Source account cannot cover the amount
    #[error("Insufficient balance in {account}: have {balance}, need {amount}")]
    InsufficientBalance {
        /// The debited account
        account: String,
        /// Its balance before the call
        balance: Decimal,
        /// The requested amount
        amount: Decimal,
    },

    /// Source account does not exist on the ledger
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Account name is empty
    #[error("Invalid account name")]
    InvalidAccount,

    /// Memo exceeds the configured limit
    #[error("Memo too long: {0} bytes (max {1})")]
    MemoTooLong(usize, usize),
}

/// Errors that can occur while a contract runs against the bridge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Out of compute units (host budget exhausted)
    #[error("Out of compute units (gas exhausted)")]
    OutOfComputeUnits,

    /// Storage key is too large
    #[error("Key too large: {0} bytes (max {1})")]
    KeyTooLarge(usize, usize),

    /// Storage value is too large
    #[error("Value too large: {0} bytes (max {1})")]
    ValueTooLarge(usize, usize),

    /// Numeric failure
    #[error(transparent)]
    Numeric(#[from] NumericError),

    /// Ledger operation rejected
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A storage or account backend failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization of a context document or change set failed
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::Encoding(err.to_string())
    }
}

impl From<bincode::Error> for RuntimeError {
    fn from(err: bincode::Error) -> Self {
        RuntimeError::Encoding(err.to_string())
    }
}
