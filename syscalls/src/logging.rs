//! Logging bindings for TOS contracts
//!
//! `console.log` lets contracts output debug messages during execution.
//! Messages are charged for and length-checked in every mode, but only
//! reach the host log when the invocation runs in debug mode.

use log::info;
use tos_sandbox_environment::{EnvironmentBuilder, Result, Value};
use tos_sandbox_runtime::InvokeContext;

use crate::{byte_len, charge, syscall_names, SyscallError};

/// Base compute cost of a log call
pub const LOG_BASE_COST: u64 = 100;

/// Compute units charged per byte of log message
pub const LOG_COST_PER_BYTE: u64 = 1;

pub(crate) fn register(builder: &mut EnvironmentBuilder<InvokeContext>) -> Result<()> {
    builder.register_method(syscall_names::CONSOLE, "log", console_log)
}

/// `console.log(...args)`
///
/// Arguments are rendered with `String()` semantics and joined by spaces.
///
/// # Errors
/// - `MessageTooLong` - If the message exceeds `max_log_length`
/// - `OutOfComputeUnits` - If not enough compute units remain
///
/// # Compute Cost
/// Base cost (100 CU) + message length * LOG_COST_PER_BYTE
pub fn console_log(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let message = args
        .iter()
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(" ");

    let max = ctx.config().max_log_length;
    if message.len() > max {
        return Err(SyscallError::MessageTooLong(message.len(), max).into());
    }

    let cost = LOG_BASE_COST.saturating_add(byte_len(message.len()).saturating_mul(LOG_COST_PER_BYTE));
    charge(ctx, cost)?;

    if ctx.debug_mode {
        info!("[Contract {}]: {}", ctx.contract_name(), message);
    }
    Ok(Value::Undefined)
}
