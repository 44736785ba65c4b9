//! Balance and transfer bindings for TOS contracts
//!
//! Amounts are `Decimal`s; numeric text and integers are accepted and
//! widened. Every movement is validated in full before any balance changes,
//! so a rejected call leaves the ledger untouched.

use tos_sandbox_environment::numeric::decimal_arg;
use tos_sandbox_environment::{Decimal, EnvironmentBuilder, NativeFn, Result, Value};
use tos_sandbox_runtime::InvokeContext;

use crate::{charge, register_methods, syscall_names, text_arg, SyscallError};

/// Compute units for balance query
pub const BALANCE_QUERY_COST: u64 = 100;

/// Compute units for transfer operation
pub const TRANSFER_COST: u64 = 500;

pub(crate) fn register(builder: &mut EnvironmentBuilder<InvokeContext>) -> Result<()> {
    let natives: [(&str, NativeFn<InvokeContext>); 4] = [
        ("transfer", transfer),
        ("deposit", deposit),
        ("withdraw", withdraw),
        ("balanceOf", balance_of),
    ];
    register_methods(builder, syscall_names::BLOCKCHAIN, &natives)
}

/// Optional trailing memo, empty when omitted
fn memo_arg<'a>(syscall: &'static str, args: &'a [Value], index: usize) -> Result<&'a str> {
    match args.get(index) {
        None | Some(Value::Undefined | Value::Null) => Ok(""),
        Some(Value::Text(memo)) => Ok(memo),
        Some(other) => Err(SyscallError::InvalidArgument {
            syscall,
            index,
            expected: "a string memo",
            found: other.type_name(),
        }
        .into()),
    }
}

fn amount_arg(args: &[Value], index: usize) -> Result<Decimal> {
    decimal_arg(args.get(index).unwrap_or(&Value::Undefined))
}

/// `BlockChain.transfer(from, to, amount, memo)`
///
/// # Compute Cost
/// 500 CU
pub fn transfer(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let from = text_arg("BlockChain.transfer", args, 0)?;
    let to = text_arg("BlockChain.transfer", args, 1)?;
    let amount = amount_arg(args, 2)?;
    let memo = memo_arg("BlockChain.transfer", args, 3)?;
    charge(ctx, TRANSFER_COST)?;
    ctx.transfer(from, to, &amount, memo)?;
    Ok(Value::Undefined)
}

/// `BlockChain.deposit(account, amount, memo)`, from `account` into this contract
pub fn deposit(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let account = text_arg("BlockChain.deposit", args, 0)?;
    let amount = amount_arg(args, 1)?;
    let memo = memo_arg("BlockChain.deposit", args, 2)?;
    charge(ctx, TRANSFER_COST)?;
    ctx.deposit(account, &amount, memo)?;
    Ok(Value::Undefined)
}

/// `BlockChain.withdraw(account, amount, memo)`, from this contract to `account`
pub fn withdraw(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let account = text_arg("BlockChain.withdraw", args, 0)?;
    let amount = amount_arg(args, 1)?;
    let memo = memo_arg("BlockChain.withdraw", args, 2)?;
    charge(ctx, TRANSFER_COST)?;
    ctx.withdraw(account, &amount, memo)?;
    Ok(Value::Undefined)
}

/// `BlockChain.balanceOf(account)`, zero for unknown accounts
///
/// # Compute Cost
/// 100 CU
pub fn balance_of(ctx: &mut InvokeContext, _this: &Value, args: &[Value]) -> Result<Value> {
    let account = text_arg("BlockChain.balanceOf", args, 0)?;
    charge(ctx, BALANCE_QUERY_COST)?;
    Ok(Value::Decimal(ctx.get_balance(account)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_context;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tos_sandbox_environment::{ErrorCategory, ScriptError};
    use tos_sandbox_runtime::{BridgeError, RuntimeError};

    fn balance(ctx: &mut InvokeContext, account: &str) -> String {
        balance_of(ctx, &Value::Undefined, &[Value::from(account)])
            .unwrap()
            .to_display_string()
    }

    fn dec(text: &str) -> Value {
        Value::Decimal(Decimal::parse(text).unwrap())
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mut ctx = test_context(10_000);
        let args = [Value::from("alice"), Value::from("bob"), dec("12.5"), Value::from("rent")];
        transfer(&mut ctx, &Value::Undefined, &args).unwrap();
        assert_eq!(balance(&mut ctx, "alice"), "87.5");
        assert_eq!(balance(&mut ctx, "bob"), "17.5");
        assert_eq!(ctx.get_compute_units_consumed(), TRANSFER_COST + 2 * BALANCE_QUERY_COST);
    }

    #[test]
    fn test_amount_as_text_and_int() {
        let mut ctx = test_context(10_000);
        let text = [Value::from("alice"), Value::from("carol"), Value::from("0.001")];
        transfer(&mut ctx, &Value::Undefined, &text).unwrap();
        let int = [Value::from("alice"), Value::from("carol"), Value::Int(3)];
        transfer(&mut ctx, &Value::Undefined, &int).unwrap();
        assert_eq!(balance(&mut ctx, "carol"), "3.001");
    }

    #[rstest]
    #[case::insufficient(dec("100.01"))]
    #[case::zero(dec("0"))]
    #[case::negative(dec("-1"))]
    fn test_rejected_transfer_leaves_balances(#[case] amount: Value) {
        let mut ctx = test_context(10_000);
        let args = [Value::from("alice"), Value::from("bob"), amount];
        let err = transfer(&mut ctx, &Value::Undefined, &args).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Bridge);
        assert_eq!(balance(&mut ctx, "alice"), "100");
        assert_eq!(balance(&mut ctx, "bob"), "5");
    }

    #[test]
    fn test_unknown_source_account() {
        let mut ctx = test_context(10_000);
        let args = [Value::from("mallory"), Value::from("bob"), dec("1")];
        let err = transfer(&mut ctx, &Value::Undefined, &args).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Runtime(RuntimeError::Bridge(BridgeError::UnknownAccount(_)))
        ));
    }

    #[test]
    fn test_malformed_amount() {
        let mut ctx = test_context(10_000);
        let args = [Value::from("alice"), Value::from("bob"), Value::from("1e3")];
        let err = transfer(&mut ctx, &Value::Undefined, &args).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Numeric);
        // Rejected before any compute is charged
        assert_eq!(ctx.get_compute_units_consumed(), 0);
    }

    #[test]
    fn test_memo_must_be_text() {
        let mut ctx = test_context(10_000);
        let args = [Value::from("alice"), Value::from("bob"), dec("1"), Value::Int(1)];
        let err = transfer(&mut ctx, &Value::Undefined, &args).unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn test_memo_too_long() {
        let mut ctx = test_context(10_000);
        let memo = "m".repeat(ctx.config().max_memo_size + 1);
        let args = [Value::from("alice"), Value::from("bob"), dec("1"), Value::from(memo)];
        let err = transfer(&mut ctx, &Value::Undefined, &args).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Runtime(RuntimeError::Bridge(BridgeError::MemoTooLong(..)))
        ));
        assert_eq!(balance(&mut ctx, "alice"), "100");
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let mut ctx = test_context(10_000);
        deposit(&mut ctx, &Value::Undefined, &[Value::from("alice"), dec("40")]).unwrap();
        assert_eq!(balance(&mut ctx, "token"), "40");
        assert_eq!(balance(&mut ctx, "alice"), "60");

        withdraw(&mut ctx, &Value::Undefined, &[Value::from("bob"), dec("15"), Value::from("payout")])
            .unwrap();
        assert_eq!(balance(&mut ctx, "token"), "25");
        assert_eq!(balance(&mut ctx, "bob"), "20");

        let err = withdraw(&mut ctx, &Value::Undefined, &[Value::from("bob"), dec("26")]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Bridge);
    }

    #[test]
    fn test_balance_of_unknown_is_zero() {
        let mut ctx = test_context(10_000);
        assert_eq!(balance(&mut ctx, "nobody"), "0");
    }
}
