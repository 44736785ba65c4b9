//! TOS Sandbox Runtime
//!
//! This crate provides the host-independent core of the deterministic
//! contract sandbox: the numeric model contracts compute with, the
//! invocation context bridge calls run against, and the transactional state
//! layer that makes every invocation all-or-nothing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          TOS Blockchain (host)          │
//! │  (transaction ingestion, persistence)   │
//! └────────────────┬────────────────────────┘
//!                  │ StorageProvider / AccountProvider
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │    tos-sandbox-runtime (this crate)     │
//! │  ┌─────────────────────────────────┐    │
//! │  │    InvokeContext                │    │
//! │  │  - Blockchain snapshot          │    │
//! │  │  - Compute budget tracking      │    │
//! │  │  - StateOverlay (journal)       │    │
//! │  └─────────────────────────────────┘    │
//! │  ┌─────────────────────────────────┐    │
//! │  │    Numeric model                │    │
//! │  │  - Decimal / Integer            │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │  tos-sandbox-environment / -syscalls    │
//! │  - restricted globals, bridge bindings  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use tos_sandbox_runtime::{
//!     BlockContext, ChainState, Decimal, InvokeContext, MemoryLedger, MemoryStorage,
//!     RuntimeConfig,
//! };
//!
//! let mut ledger = MemoryLedger::new();
//! ledger.open("alice", Decimal::parse("10").unwrap());
//! let state = ChainState::new(Box::new(MemoryStorage::new()), Box::new(ledger));
//!
//! let mut context = InvokeContext::new(
//!     RuntimeConfig::default(),
//!     "token",
//!     "pay",
//!     BlockContext::default(),
//!     state,
//! );
//! context.transfer("alice", "bob", &Decimal::parse("2.5").unwrap(), "").unwrap();
//! let (_state, changes) = context.finish(true).unwrap();
//! assert_eq!(changes.unwrap().balances.len(), 2);
//! ```

#![warn(missing_docs)]
#![deny(clippy::arithmetic_side_effects)]

pub mod config;
pub mod error;
pub mod invoke_context;
pub mod numeric;
pub mod state;
pub mod storage;

// Re-export main types
pub use config::RuntimeConfig;
pub use error::{BridgeError, Result, RuntimeError};
pub use invoke_context::{BlockContext, BlockInfo, ContextInfo, InvokeContext, TxInfo};
pub use numeric::{Decimal, Integer, NumericError};
pub use state::{ChainState, ChangeSet, StateOverlay};
pub use storage::{AccountProvider, MemoryLedger, MemoryStorage, NoOpAccounts, NoOpStorage, StorageProvider};
