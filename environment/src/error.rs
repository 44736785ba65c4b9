//! Errors surfaced to contract code

use thiserror::Error;
use tos_sandbox_runtime::{NumericError, RuntimeError};

/// Result type for script-level operations
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Coarse classification the host uses when reporting an aborted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Access to a denied global or method
    CapabilityViolation,
    /// Divide by zero or malformed numeric text
    Numeric,
    /// Rejected value movement
    Bridge,
    /// Compute budget exhausted
    Budget,
    /// Wrong argument shape passed to a native
    Type,
    /// Malformed JSON
    Json,
    /// Storage limits, backend failures, setup errors
    Runtime,
    /// Error raised by the contract itself
    Contract,
}

/// Every failure a contract can observe
///
/// None of these is ever swallowed inside the environment: natives return
/// them and the host rolls the invocation back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Name is not bound in the global scope
    #[error("{0} is not defined")]
    NotDefined(String),

    /// Name is bound to an inert value or is missing from a prototype
    #[error("{0} is not a function")]
    NotCallable(String),

    /// Wrong receiver or argument type
    #[error("TypeError: {0}")]
    Type(String),

    /// Argument outside its allowed range
    #[error("RangeError: {0}")]
    Range(String),

    /// `JSON.parse` input was not valid JSON
    #[error("SyntaxError: {0}")]
    Json(String),

    /// Bridge, numeric or budget failure from the runtime
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Environment construction rejected a registration
    #[error("Registration rejected: {0}")]
    Registration(String),

    /// The isolate has not been hardened yet
    #[error("Isolate environment is not initialized")]
    NotHardened,

    /// Raised by contract code
    #[error("Error: {0}")]
    Thrown(String),
}

impl ScriptError {
    /// Classifies the error for the host
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScriptError::NotDefined(_) | ScriptError::NotCallable(_) => {
                ErrorCategory::CapabilityViolation
            }
            ScriptError::Type(_) | ScriptError::Range(_) => ErrorCategory::Type,
            ScriptError::Json(_) => ErrorCategory::Json,
            ScriptError::Runtime(RuntimeError::Numeric(_)) => ErrorCategory::Numeric,
            ScriptError::Runtime(RuntimeError::Bridge(_)) => ErrorCategory::Bridge,
            ScriptError::Runtime(RuntimeError::OutOfComputeUnits) => ErrorCategory::Budget,
            ScriptError::Runtime(_) | ScriptError::Registration(_) | ScriptError::NotHardened => {
                ErrorCategory::Runtime
            }
            ScriptError::Thrown(_) => ErrorCategory::Contract,
        }
    }

    /// Shorthand for contract code raising its own error
    pub fn thrown(message: impl Into<String>) -> Self {
        ScriptError::Thrown(message.into())
    }
}

impl From<NumericError> for ScriptError {
    fn from(err: NumericError) -> Self {
        ScriptError::Runtime(RuntimeError::Numeric(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tos_sandbox_runtime::BridgeError;

    #[test]
    fn test_categories() {
        assert_eq!(
            ScriptError::NotDefined("Math".into()).category(),
            ErrorCategory::CapabilityViolation
        );
        assert_eq!(
            ScriptError::from(NumericError::DivideByZero).category(),
            ErrorCategory::Numeric
        );
        assert_eq!(
            ScriptError::from(RuntimeError::from(BridgeError::InvalidAccount)).category(),
            ErrorCategory::Bridge
        );
        assert_eq!(
            ScriptError::from(RuntimeError::OutOfComputeUnits).category(),
            ErrorCategory::Budget
        );
        assert_eq!(ScriptError::thrown("nope").category(), ErrorCategory::Contract);
    }

    #[test]
    fn test_messages() {
        assert_eq!(ScriptError::NotDefined("Date".into()).to_string(), "Date is not defined");
        assert_eq!(
            ScriptError::NotCallable("String.prototype.match".into()).to_string(),
            "String.prototype.match is not a function"
        );
    }
}
