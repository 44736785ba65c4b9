//! TOS Sandbox SDK for smart contract development
//!
//! Contracts implement [`Contract`] and talk to the world only through the
//! [`Scope`] they are handed: the restricted globals, the deterministic
//! numeric model and the native bridge (`storage`, `BlockChain`, `block`,
//! `tx`, `console`). A [`ContractHost`] owns the hardened isolate and the
//! chain state, and runs every `init` and method call as one atomic unit.
//!
//! # Example
//!
//! ```
//! use tos_sandbox_sdk::*;
//!
//! struct Counter;
//!
//! impl Contract for Counter {
//!     fn abi(&self) -> &[&'static str] {
//!         &["bump"]
//!     }
//!
//!     fn init(&self, scope: &mut Scope<'_, InvokeContext>) -> Result<(), ScriptError> {
//!         scope.call_method("storage", "put", &[Value::from("count"), Value::Int(0)])?;
//!         Ok(())
//!     }
//!
//!     fn call(
//!         &self,
//!         scope: &mut Scope<'_, InvokeContext>,
//!         _method: &str,
//!         _args: &[Value],
//!     ) -> Result<Value, ScriptError> {
//!         let count = scope.call_method("storage", "get", &[Value::from("count")])?;
//!         let next = Value::Int(count.as_int().unwrap_or(0) + 1);
//!         scope.call_method("storage", "put", &[Value::from("count"), next.clone()])?;
//!         Ok(next)
//!     }
//! }
//!
//! let state = ChainState::new(Box::new(MemoryStorage::new()), Box::new(MemoryLedger::new()));
//! let mut host = ContractHost::new(RuntimeConfig::default(), state).unwrap();
//! host.deploy("counter", Box::new(Counter), BlockContext::default()).unwrap();
//!
//! let receipt = host.invoke("counter", "bump", &[], BlockContext::default()).unwrap();
//! assert_eq!(receipt.value, serde_json::json!(1));
//! ```

#![warn(missing_docs)]

pub mod contract;
pub mod error;
pub mod host;

pub use contract::{Contract, INIT_METHOD};
pub use error::HostError;
pub use host::{ContractHost, Receipt};

// Re-export what contract code needs alongside the trait
pub use tos_sandbox_environment::{
    Decimal, ErrorCategory, Integer, Object, ScriptError, Scope, Sequence, Value,
};
pub use tos_sandbox_runtime::{
    AccountProvider, BlockContext, BlockInfo, ChainState, ChangeSet, InvokeContext, MemoryLedger,
    MemoryStorage, RuntimeConfig, StorageProvider, TxInfo,
};
