//! TOS Sandbox Syscalls
//!
//! This crate provides the native bridge of TOS sandboxed contracts: the
//! only bindings in the restricted environment that can reach state outside
//! the script. Each binding is a [`NativeFn`] over [`InvokeContext`] and:
//!
//! 1. Validates its arguments (key sizes, memo length, amount format)
//! 2. Charges compute units with `consume_checked` before doing work
//! 3. Goes through the context's journaled state, never the host directly
//! 4. Returns `Result`, so every failure aborts the invocation
//!
//! # Available Bindings
//!
//! ## Storage (`storage`)
//! - `put`, `get`, `has`, `del`
//! - `mapPut`, `mapHas`, `mapGet`, `mapKeys`, `mapLen`, `mapDel`
//! - `globalHas`, `globalGet`, `globalMapHas`, `globalMapGet`,
//!   `globalMapKeys`, `globalMapLen` (read-only, other contracts)
//!
//! ## Blockchain State (`block`, `tx`, `BlockChain`)
//! - `block.number`, `block.time`, `tx.time`, `tx.hash`
//! - `BlockChain.blockInfo()`, `txInfo()`, `contextInfo()`
//! - `BlockChain.contractName()`, `publisher()`
//!
//! ## Balance (`BlockChain`)
//! - `transfer(from, to, amount, memo)`
//! - `deposit(account, amount, memo)`, `withdraw(account, amount, memo)`
//! - `balanceOf(account)`
//!
//! ## Logging (`console`)
//! - `console.log(...)` - Output a debug message (only in debug mode)
//!
//! # Usage
//!
//! ```rust
//! use tos_sandbox_environment::Isolate;
//! use tos_sandbox_runtime::InvokeContext;
//!
//! let isolate = Isolate::<InvokeContext>::new();
//! let env = isolate.harden(tos_sandbox_syscalls::register_syscalls).unwrap();
//! assert!(env.is_usable("storage"));
//! ```

#![warn(missing_docs)]
#![deny(clippy::arithmetic_side_effects)]

pub mod balance;
pub mod blockchain;
pub mod logging;
pub mod storage;

use thiserror::Error as ThisError;
use tos_sandbox_environment::{EnvironmentBuilder, NativeFn, ScriptError, Value};
use tos_sandbox_runtime::InvokeContext;

/// Syscall error types
#[derive(Debug, ThisError)]
pub enum SyscallError {
    /// Argument has the wrong type
    #[error("{syscall}: argument {index} must be {expected}, got {found}")]
    InvalidArgument {
        /// Qualified binding name
        syscall: &'static str,
        /// Zero-based argument position
        index: usize,
        /// Expected type
        expected: &'static str,
        /// Actual type
        found: &'static str,
    },
    /// Value has no JSON form and cannot be stored
    #[error("{0}: value cannot be stored")]
    Unserializable(&'static str),
    /// `null` is what a read of a missing entry returns, so it is never stored
    #[error("{0}: null cannot be stored, use del to remove an entry")]
    NullValue(&'static str),
    /// Message exceeds maximum length
    #[error("Message too long: {0} bytes (max {1})")]
    MessageTooLong(usize, usize),
}

impl From<SyscallError> for ScriptError {
    fn from(err: SyscallError) -> Self {
        match err {
            SyscallError::MessageTooLong(..) => ScriptError::Range(err.to_string()),
            SyscallError::InvalidArgument { .. }
            | SyscallError::Unserializable(_)
            | SyscallError::NullValue(_) => ScriptError::Type(err.to_string()),
        }
    }
}

/// Namespace names the bindings are registered under
pub mod syscall_names {
    /// Contract storage
    pub const STORAGE: &str = "storage";
    /// Ledger and context documents
    pub const BLOCKCHAIN: &str = "BlockChain";
    /// Current block properties
    pub const BLOCK: &str = "block";
    /// Current transaction properties
    pub const TX: &str = "tx";
    /// Debug output
    pub const CONSOLE: &str = "console";
}

/// Register all TOS bindings with the environment builder
///
/// Pass this to `Isolate::harden` so the bridge is in place before any
/// contract code runs.
pub fn register_syscalls(builder: &mut EnvironmentBuilder<InvokeContext>) -> Result<(), ScriptError> {
    storage::register(builder)?;
    blockchain::register(builder)?;
    balance::register(builder)?;
    logging::register(builder)?;
    Ok(())
}

fn register_methods(
    builder: &mut EnvironmentBuilder<InvokeContext>,
    namespace: &str,
    natives: &[(&str, NativeFn<InvokeContext>)],
) -> Result<(), ScriptError> {
    for (name, native) in natives {
        builder.register_method(namespace, name, *native)?;
    }
    Ok(())
}

/// Reads a required text argument
fn text_arg<'a>(syscall: &'static str, args: &'a [Value], index: usize) -> Result<&'a str, ScriptError> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s),
        other => Err(SyscallError::InvalidArgument {
            syscall,
            index,
            expected: "a string",
            found: other.map_or("nothing", Value::type_name),
        }
        .into()),
    }
}

/// Charges compute units against the invocation's meter
fn charge(ctx: &mut InvokeContext, cost: u64) -> Result<(), ScriptError> {
    ctx.consume_checked(cost).map_err(ScriptError::from)
}

/// Byte length as compute-unit operand
fn byte_len(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tos_sandbox_environment::{Isolate, TraceHook};

    #[test]
    fn test_register_syscalls() {
        let mut builder = EnvironmentBuilder::<InvokeContext>::new(Arc::new(TraceHook));
        register_syscalls(&mut builder).expect("Failed to register syscalls");
        let env = builder.build();
        for name in [
            syscall_names::STORAGE,
            syscall_names::BLOCKCHAIN,
            syscall_names::BLOCK,
            syscall_names::TX,
            syscall_names::CONSOLE,
        ] {
            assert!(env.is_usable(name), "{name}");
        }
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let mut builder = EnvironmentBuilder::<InvokeContext>::new(Arc::new(TraceHook));
        register_syscalls(&mut builder).unwrap();
        assert!(register_syscalls(&mut builder).is_err());
    }

    #[test]
    fn test_harden_with_syscalls() {
        let isolate = Isolate::<InvokeContext>::new();
        let first = isolate.harden(register_syscalls).unwrap();
        let second = isolate.harden(register_syscalls).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_text_arg() {
        let args = [Value::from("k"), Value::Int(1)];
        assert_eq!(text_arg("storage.get", &args, 0).unwrap(), "k");
        let err = text_arg("storage.get", &args, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: storage.get: argument 1 must be a string, got number"
        );
        assert!(text_arg("storage.get", &args, 2).is_err());
    }
}
