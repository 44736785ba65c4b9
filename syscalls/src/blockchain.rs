//! Blockchain state bindings for TOS contracts
//!
//! Read-only access to the block and transaction the invocation runs in.
//! `block` and `tx` expose plain properties; `BlockChain` returns whole
//! documents as JSON text, the form `JSON.parse` turns back into objects.

use tos_sandbox_environment::{EnvironmentBuilder, Integer, NativeFn, Result, Value};
use tos_sandbox_runtime::InvokeContext;

use crate::{charge, register_methods, syscall_names};

/// Compute units for blockchain queries
pub const BLOCKCHAIN_QUERY_COST: u64 = 50;

pub(crate) fn register(builder: &mut EnvironmentBuilder<InvokeContext>) -> Result<()> {
    builder.register_property(syscall_names::BLOCK, "number", block_number)?;
    builder.register_property(syscall_names::BLOCK, "time", block_time)?;
    builder.register_property(syscall_names::TX, "time", tx_time)?;
    builder.register_property(syscall_names::TX, "hash", tx_hash)?;

    let natives: [(&str, NativeFn<InvokeContext>); 5] = [
        ("blockInfo", block_info),
        ("txInfo", tx_info),
        ("contextInfo", context_info),
        ("contractName", contract_name),
        ("publisher", publisher),
    ];
    register_methods(builder, syscall_names::BLOCKCHAIN, &natives)
}

/// `block.number`
///
/// Heights beyond the small-integer range come back as an `Integer`.
pub fn block_number(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    let number = ctx.block_number();
    match i64::try_from(number) {
        Ok(n) => Ok(Value::Int(n)),
        Err(_) => Ok(Value::Integer(Integer::parse(&number.to_string())?)),
    }
}

/// `block.time`, nanoseconds
pub fn block_time(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::Int(ctx.block_time()))
}

/// `tx.time`, nanoseconds
pub fn tx_time(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::Int(ctx.tx_time()))
}

/// `tx.hash`
pub fn tx_hash(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::from(ctx.tx_hash()))
}

/// `BlockChain.blockInfo()`
pub fn block_info(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::Text(ctx.block_info_json()?))
}

/// `BlockChain.txInfo()`
pub fn tx_info(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::Text(ctx.tx_info_json()?))
}

/// `BlockChain.contextInfo()`
pub fn context_info(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::Text(ctx.context_info_json()?))
}

/// `BlockChain.contractName()`
pub fn contract_name(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::from(ctx.contract_name()))
}

/// `BlockChain.publisher()`
pub fn publisher(ctx: &mut InvokeContext, _this: &Value, _args: &[Value]) -> Result<Value> {
    charge(ctx, BLOCKCHAIN_QUERY_COST)?;
    Ok(Value::from(ctx.publisher()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_context;
    use pretty_assertions::assert_eq;
    use tos_sandbox_environment::json;

    #[test]
    fn test_block_properties() {
        let mut ctx = test_context(10_000);
        assert_eq!(block_number(&mut ctx, &Value::Undefined, &[]).unwrap(), Value::Int(12345));
        assert_eq!(
            block_time(&mut ctx, &Value::Undefined, &[]).unwrap(),
            Value::Int(1_500_000_000)
        );
        assert_eq!(tx_time(&mut ctx, &Value::Undefined, &[]).unwrap(), Value::Int(1_500_000_001));
        assert_eq!(tx_hash(&mut ctx, &Value::Undefined, &[]).unwrap(), Value::from("txhash"));
        assert_eq!(ctx.get_compute_units_consumed(), 4 * BLOCKCHAIN_QUERY_COST);
    }

    #[test]
    fn test_identity() {
        let mut ctx = test_context(10_000);
        assert_eq!(contract_name(&mut ctx, &Value::Undefined, &[]).unwrap(), Value::from("token"));
        assert_eq!(publisher(&mut ctx, &Value::Undefined, &[]).unwrap(), Value::from("alice"));
    }

    #[test]
    fn test_info_documents_parse() {
        let mut ctx = test_context(10_000);
        let block = block_info(&mut ctx, &Value::Undefined, &[]).unwrap();
        let block = json::parse(&[block]).unwrap();
        assert_eq!(block.get("number"), Some(Value::Int(12345)));
        assert_eq!(block.get("witness"), Some(Value::from("producer")));

        let tx = json::parse(&[tx_info(&mut ctx, &Value::Undefined, &[]).unwrap()]).unwrap();
        assert_eq!(tx.get("hash"), Some(Value::from("txhash")));
        assert_eq!(tx.get("publisher"), Some(Value::from("alice")));

        let context = json::parse(&[context_info(&mut ctx, &Value::Undefined, &[]).unwrap()]).unwrap();
        assert_eq!(context.get("contractName"), Some(Value::from("token")));
        assert_eq!(context.get("abiName"), Some(Value::from("test")));
        // Caller defaults to the publisher
        assert_eq!(context.get("caller"), Some(Value::from("alice")));
    }

    #[test]
    fn test_query_out_of_budget() {
        let mut ctx = test_context(BLOCKCHAIN_QUERY_COST);
        assert!(tx_hash(&mut ctx, &Value::Undefined, &[]).is_ok());
        assert!(tx_hash(&mut ctx, &Value::Undefined, &[]).is_err());
    }
}
