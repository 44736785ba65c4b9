//! Storage bindings for TOS contracts
//!
//! Values are persisted as their JSON text, so anything `JSON.stringify`
//! accepts can be stored and `get` hands back what `JSON.parse` would.
//! Missing entries read as `null`, and `null` itself cannot be stored, so a
//! `null` read always means absent. Writes only touch the calling contract's
//! own storage; the `global*` bindings read other contracts.

use tos_sandbox_environment::json::{from_json, to_json};
use tos_sandbox_environment::{EnvironmentBuilder, NativeFn, Result, Value};
use tos_sandbox_runtime::{InvokeContext, RuntimeError};

use crate::{byte_len, charge, register_methods, syscall_names, text_arg, SyscallError};

/// Base compute cost for storage reads
pub const STORAGE_READ_BASE_COST: u64 = 200;
/// Base compute cost for storage writes
pub const STORAGE_WRITE_BASE_COST: u64 = 500;
/// Compute cost for storage deletes
pub const STORAGE_DELETE_COST: u64 = 300;

/// Per-byte cost for storage reads
pub const STORAGE_READ_BYTE_COST: u64 = 1;
/// Per-byte cost for storage writes
pub const STORAGE_WRITE_BYTE_COST: u64 = 2;
/// Per-field cost for listing map fields
pub const STORAGE_FIELD_COST: u64 = 1;

pub(crate) fn register(builder: &mut EnvironmentBuilder<InvokeContext>) -> Result<()> {
    let natives: [(&str, NativeFn<InvokeContext>); 16] = [
        ("put", put),
        ("get", get),
        ("has", has),
        ("del", del),
        ("mapPut", map_put),
        ("mapHas", map_has),
        ("mapGet", map_get),
        ("mapKeys", map_keys),
        ("mapLen", map_len),
        ("mapDel", map_del),
        ("globalHas", global_has),
        ("globalGet", global_get),
        ("globalMapHas", global_map_has),
        ("globalMapGet", global_map_get),
        ("globalMapKeys", global_map_keys),
        ("globalMapLen", global_map_len),
    ];
    register_methods(builder, syscall_names::STORAGE, &natives)
}

fn check_key(ctx: &InvokeContext, key: &str) -> Result<()> {
    let max = ctx.config().max_key_size;
    if key.len() > max {
        return Err(RuntimeError::KeyTooLarge(key.len(), max).into());
    }
    Ok(())
}

fn encode(ctx: &InvokeContext, syscall: &'static str, value: &Value) -> Result<Vec<u8>> {
    if matches!(value, Value::Null) {
        return Err(SyscallError::NullValue(syscall).into());
    }
    let json = to_json(value)?.ok_or(SyscallError::Unserializable(syscall))?;
    let bytes = serde_json::to_vec(&json).map_err(RuntimeError::from)?;
    let max = ctx.config().max_value_size;
    if bytes.len() > max {
        return Err(RuntimeError::ValueTooLarge(bytes.len(), max).into());
    }
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_slice(bytes).map_err(RuntimeError::from)?;
    from_json(&json)
}

/// Charges the per-byte read cost and decodes, `null` on a miss
fn loaded(ctx: &mut InvokeContext, found: Option<Vec<u8>>) -> Result<Value> {
    match found {
        Some(bytes) => {
            charge(ctx, byte_len(bytes.len()).saturating_mul(STORAGE_READ_BYTE_COST))?;
            decode(&bytes)
        }
        None => Ok(Value::Null),
    }
}

fn read_cost(key: &str) -> u64 {
    STORAGE_READ_BASE_COST.saturating_add(byte_len(key.len()).saturating_mul(STORAGE_READ_BYTE_COST))
}

fn write_cost(key_len: usize, value_len: usize) -> u64 {
    let bytes = byte_len(key_len).saturating_add(byte_len(value_len));
    STORAGE_WRITE_BASE_COST.saturating_add(bytes.saturating_mul(STORAGE_WRITE_BYTE_COST))
}

fn fields_value(fields: Vec<Vec<u8>>) -> Value {
    Value::sequence(
        fields
            .into_iter()
            .map(|field| Value::Text(String::from_utf8_lossy(&field).into_owned()))
            .collect(),
    )
}

fn fields_len(fields: &[Vec<u8>]) -> Value {
    Value::Int(i64::try_from(fields.len()).unwrap_or(i64::MAX))
}

/// `storage.put(key, value)`
///
/// # Compute Cost
/// 500 CU + 2 CU per byte of key and encoded value
pub fn put(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.put", args, 0)?;
    check_key(ctx, key)?;
    let bytes = encode(ctx, "storage.put", args.get(1).unwrap_or(&Value::Undefined))?;
    charge(ctx, write_cost(key.len(), bytes.len()))?;
    ctx.set_storage(key.as_bytes(), &bytes)?;
    Ok(Value::Undefined)
}

/// `storage.get(key)`, `null` when absent
///
/// # Compute Cost
/// 200 CU + 1 CU per byte of key and stored value
pub fn get(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.get", args, 0)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    let found = ctx.get_storage(key.as_bytes())?;
    loaded(ctx, found)
}

/// `storage.has(key)`
pub fn has(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.has", args, 0)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    Ok(Value::Bool(ctx.get_storage(key.as_bytes())?.is_some()))
}

/// `storage.del(key)`; deleting a missing key is not an error
///
/// # Compute Cost
/// 300 CU
pub fn del(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.del", args, 0)?;
    check_key(ctx, key)?;
    charge(ctx, STORAGE_DELETE_COST)?;
    ctx.delete_storage(key.as_bytes())?;
    Ok(Value::Undefined)
}

/// `storage.mapPut(key, field, value)`
pub fn map_put(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.mapPut", args, 0)?;
    let field = text_arg("storage.mapPut", args, 1)?;
    check_key(ctx, key)?;
    check_key(ctx, field)?;
    let bytes = encode(ctx, "storage.mapPut", args.get(2).unwrap_or(&Value::Undefined))?;
    charge(ctx, write_cost(key.len().saturating_add(field.len()), bytes.len()))?;
    ctx.map_set(key.as_bytes(), field.as_bytes(), &bytes)?;
    Ok(Value::Undefined)
}

/// `storage.mapHas(key, field)`
pub fn map_has(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.mapHas", args, 0)?;
    let field = text_arg("storage.mapHas", args, 1)?;
    check_key(ctx, key)?;
    check_key(ctx, field)?;
    charge(ctx, read_cost(key))?;
    Ok(Value::Bool(ctx.map_get(key.as_bytes(), field.as_bytes())?.is_some()))
}

/// `storage.mapGet(key, field)`, `null` when absent
pub fn map_get(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.mapGet", args, 0)?;
    let field = text_arg("storage.mapGet", args, 1)?;
    check_key(ctx, key)?;
    check_key(ctx, field)?;
    charge(ctx, read_cost(key))?;
    let found = ctx.map_get(key.as_bytes(), field.as_bytes())?;
    loaded(ctx, found)
}

/// `storage.mapKeys(key)`, fields in byte order
///
/// # Compute Cost
/// 200 CU + 1 CU per field
pub fn map_keys(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.mapKeys", args, 0)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    let fields = ctx.map_fields(key.as_bytes())?;
    charge(ctx, byte_len(fields.len()).saturating_mul(STORAGE_FIELD_COST))?;
    Ok(fields_value(fields))
}

/// `storage.mapLen(key)`
pub fn map_len(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.mapLen", args, 0)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    Ok(fields_len(&ctx.map_fields(key.as_bytes())?))
}

/// `storage.mapDel(key, field)`
pub fn map_del(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let key = text_arg("storage.mapDel", args, 0)?;
    let field = text_arg("storage.mapDel", args, 1)?;
    check_key(ctx, key)?;
    check_key(ctx, field)?;
    charge(ctx, STORAGE_DELETE_COST)?;
    ctx.map_delete(key.as_bytes(), field.as_bytes())?;
    Ok(Value::Undefined)
}

/// `storage.globalHas(contract, key)`
pub fn global_has(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let contract = text_arg("storage.globalHas", args, 0)?;
    let key = text_arg("storage.globalHas", args, 1)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    Ok(Value::Bool(ctx.global_get(contract, key.as_bytes())?.is_some()))
}

/// `storage.globalGet(contract, key)`, `null` when absent
pub fn global_get(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let contract = text_arg("storage.globalGet", args, 0)?;
    let key = text_arg("storage.globalGet", args, 1)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    let found = ctx.global_get(contract, key.as_bytes())?;
    loaded(ctx, found)
}

/// `storage.globalMapHas(contract, key, field)`
pub fn global_map_has(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let contract = text_arg("storage.globalMapHas", args, 0)?;
    let key = text_arg("storage.globalMapHas", args, 1)?;
    let field = text_arg("storage.globalMapHas", args, 2)?;
    check_key(ctx, key)?;
    check_key(ctx, field)?;
    charge(ctx, read_cost(key))?;
    let found = ctx.global_map_get(contract, key.as_bytes(), field.as_bytes())?;
    Ok(Value::Bool(found.is_some()))
}

/// `storage.globalMapGet(contract, key, field)`, `null` when absent
pub fn global_map_get(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let contract = text_arg("storage.globalMapGet", args, 0)?;
    let key = text_arg("storage.globalMapGet", args, 1)?;
    let field = text_arg("storage.globalMapGet", args, 2)?;
    check_key(ctx, key)?;
    check_key(ctx, field)?;
    charge(ctx, read_cost(key))?;
    let found = ctx.global_map_get(contract, key.as_bytes(), field.as_bytes())?;
    loaded(ctx, found)
}

/// `storage.globalMapKeys(contract, key)`
pub fn global_map_keys(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let contract = text_arg("storage.globalMapKeys", args, 0)?;
    let key = text_arg("storage.globalMapKeys", args, 1)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    let fields = ctx.global_map_fields(contract, key.as_bytes())?;
    charge(ctx, byte_len(fields.len()).saturating_mul(STORAGE_FIELD_COST))?;
    Ok(fields_value(fields))
}

/// `storage.globalMapLen(contract, key)`
pub fn global_map_len(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let contract = text_arg("storage.globalMapLen", args, 0)?;
    let key = text_arg("storage.globalMapLen", args, 1)?;
    check_key(ctx, key)?;
    charge(ctx, read_cost(key))?;
    Ok(fields_len(&ctx.global_map_fields(contract, key.as_bytes())?))
}
