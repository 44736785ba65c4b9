//! `Decimal` and `Integer` bindings
//!
//! Both constructors accept only text or a value of the same variant, so no
//! binary floating point number can ever enter the numeric model. Method
//! operands are more lenient: a plain `Int` or numeric text is accepted, and a
//! decimal receiver also accepts an `Integer` operand (widening is exact).

use tos_sandbox_runtime::{Decimal, Integer};

use crate::adapter::NativeFn;
use crate::error::{Result, ScriptError};
use crate::value::{arg, int_arg, Value};

/// Largest number of fractional digits `toFixed` prints
pub const MAX_FIXED_PLACES: i64 = 100;

/// Largest exponent `pow` accepts
pub const MAX_EXPONENT: i64 = 4096;

/// Most digits an arithmetic operand or product may carry
pub const MAX_DIGITS: usize = 4096;

/// Methods bound on the `Decimal` prototype
pub(crate) mod decimal {
    use super::*;

    natives! { receiver;
        "plus" => plus,
        "minus" => minus,
        "multi" => multi,
        "div" => div,
        "mod" => modulo,
        "pow" => pow,
        "eq" => eq,
        "gt" => gt,
        "gte" => gte,
        "lt" => lt,
        "lte" => lte,
        "negated" => negated,
        "isZero" => is_zero,
        "isPositive" => is_positive,
        "isNegative" => is_negative,
        "toString" => to_string,
        "toFixed" => to_fixed,
    }

    fn receiver<'a>(this: &'a Value, method: &str) -> Result<&'a Decimal> {
        match this {
            Value::Decimal(d) => Ok(d),
            other => Err(ScriptError::Type(format!(
                "Decimal.prototype.{method} called on {}",
                other.type_name()
            ))),
        }
    }

    fn operand(args: &[Value]) -> Result<Decimal> {
        decimal_arg(arg(args, 0))
    }

    /// Operand of an arithmetic method, with both sides within [`MAX_DIGITS`]
    fn bounded(method: &str, d: &Decimal, args: &[Value]) -> Result<Decimal> {
        let rhs = operand(args)?;
        within_digits(method, d.digits().max(rhs.digits()))?;
        Ok(rhs)
    }

    pub fn plus(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.add(&bounded("plus", d, args)?).into())
    }

    pub fn minus(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.subtract(&bounded("minus", d, args)?).into())
    }

    pub fn multi(d: &Decimal, args: &[Value]) -> Result<Value> {
        let rhs = bounded("multi", d, args)?;
        within_digits("multi", d.digits().saturating_add(rhs.digits()))?;
        Ok(d.multiply(&rhs).into())
    }

    pub fn div(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.divide(&bounded("div", d, args)?)?.into())
    }

    pub fn modulo(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.modulo(&bounded("mod", d, args)?)?.into())
    }

    pub fn pow(d: &Decimal, args: &[Value]) -> Result<Value> {
        let exponent = exponent(args)?;
        within_digits("pow", power_digits(d.digits(), exponent))?;
        Ok(d.pow(exponent).into())
    }

    pub fn eq(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.equals(&operand(args)?).into())
    }

    pub fn gt(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.greater_than(&operand(args)?).into())
    }

    pub fn gte(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.greater_or_equal(&operand(args)?).into())
    }

    pub fn lt(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.less_than(&operand(args)?).into())
    }

    pub fn lte(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(d.less_or_equal(&operand(args)?).into())
    }

    pub fn negated(d: &Decimal, _args: &[Value]) -> Result<Value> {
        Ok(d.negate().into())
    }

    pub fn is_zero(d: &Decimal, _args: &[Value]) -> Result<Value> {
        Ok(d.is_zero().into())
    }

    pub fn is_positive(d: &Decimal, _args: &[Value]) -> Result<Value> {
        Ok(d.is_positive().into())
    }

    pub fn is_negative(d: &Decimal, _args: &[Value]) -> Result<Value> {
        Ok(d.is_negative().into())
    }

    pub fn to_string(d: &Decimal, _args: &[Value]) -> Result<Value> {
        Ok(Value::Text(d.to_string()))
    }

    pub fn to_fixed(d: &Decimal, args: &[Value]) -> Result<Value> {
        Ok(Value::Text(d.to_fixed(places(args)?)))
    }
}

/// Methods bound on the `Integer` prototype
pub(crate) mod integer {
    use super::*;

    natives! { receiver;
        "plus" => plus,
        "minus" => minus,
        "multi" => multi,
        "div" => div,
        "mod" => modulo,
        "pow" => pow,
        "eq" => eq,
        "gt" => gt,
        "gte" => gte,
        "lt" => lt,
        "lte" => lte,
        "negated" => negated,
        "isZero" => is_zero,
        "isPositive" => is_positive,
        "isNegative" => is_negative,
        "toString" => to_string,
        "toFixed" => to_fixed,
    }

    fn receiver<'a>(this: &'a Value, method: &str) -> Result<&'a Integer> {
        match this {
            Value::Integer(i) => Ok(i),
            other => Err(ScriptError::Type(format!(
                "Integer.prototype.{method} called on {}",
                other.type_name()
            ))),
        }
    }

    fn operand(args: &[Value]) -> Result<Integer> {
        integer_arg(arg(args, 0))
    }

    /// Operand of an arithmetic method, with both sides within [`MAX_DIGITS`]
    fn bounded(method: &str, i: &Integer, args: &[Value]) -> Result<Integer> {
        let rhs = operand(args)?;
        within_digits(method, i.digits().max(rhs.digits()))?;
        Ok(rhs)
    }

    pub fn plus(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.add(&bounded("plus", i, args)?).into())
    }

    pub fn minus(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.subtract(&bounded("minus", i, args)?).into())
    }

    pub fn multi(i: &Integer, args: &[Value]) -> Result<Value> {
        let rhs = bounded("multi", i, args)?;
        within_digits("multi", i.digits().saturating_add(rhs.digits()))?;
        Ok(i.multiply(&rhs).into())
    }

    pub fn div(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.divide(&bounded("div", i, args)?)?.into())
    }

    pub fn modulo(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.modulo(&bounded("mod", i, args)?)?.into())
    }

    pub fn pow(i: &Integer, args: &[Value]) -> Result<Value> {
        let exponent = exponent(args)?;
        within_digits("pow", power_digits(i.digits(), exponent))?;
        Ok(i.pow(exponent).into())
    }

    pub fn eq(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.equals(&operand(args)?).into())
    }

    pub fn gt(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.greater_than(&operand(args)?).into())
    }

    pub fn gte(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.greater_or_equal(&operand(args)?).into())
    }

    pub fn lt(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.less_than(&operand(args)?).into())
    }

    pub fn lte(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(i.less_or_equal(&operand(args)?).into())
    }

    pub fn negated(i: &Integer, _args: &[Value]) -> Result<Value> {
        Ok(i.negate().into())
    }

    pub fn is_zero(i: &Integer, _args: &[Value]) -> Result<Value> {
        Ok(i.is_zero().into())
    }

    pub fn is_positive(i: &Integer, _args: &[Value]) -> Result<Value> {
        Ok(i.is_positive().into())
    }

    pub fn is_negative(i: &Integer, _args: &[Value]) -> Result<Value> {
        Ok(i.is_negative().into())
    }

    pub fn to_string(i: &Integer, _args: &[Value]) -> Result<Value> {
        Ok(Value::Text(i.to_string()))
    }

    pub fn to_fixed(i: &Integer, args: &[Value]) -> Result<Value> {
        Ok(Value::Text(i.to_fixed(places(args)?)))
    }
}

fn exponent(args: &[Value]) -> Result<u32> {
    let n = int_arg(args, 0, "exponent")?.unwrap_or(0);
    if !(0..=MAX_EXPONENT).contains(&n) {
        return Err(ScriptError::Range(format!(
            "exponent must be between 0 and {MAX_EXPONENT}, got {n}"
        )));
    }
    Ok(u32::try_from(n).unwrap_or(0))
}

fn within_digits(method: &str, digits: usize) -> Result<()> {
    if digits > MAX_DIGITS {
        return Err(ScriptError::Range(format!(
            "{method}() needs {digits} digits, limit is {MAX_DIGITS}"
        )));
    }
    Ok(())
}

/// Upper bound on the digits of a `digits`-digit base raised to `exponent`
fn power_digits(digits: usize, exponent: u32) -> usize {
    digits.saturating_mul(usize::try_from(exponent).unwrap_or(usize::MAX))
}

fn places(args: &[Value]) -> Result<usize> {
    let n = int_arg(args, 0, "digits")?.unwrap_or(0);
    if !(0..=MAX_FIXED_PLACES).contains(&n) {
        return Err(ScriptError::Range(format!(
            "toFixed() digits argument must be between 0 and {MAX_FIXED_PLACES}"
        )));
    }
    Ok(usize::try_from(n).unwrap_or(0))
}

/// Coerces a method operand or bridge amount to a `Decimal`
///
/// Accepts decimals, integers (widened), small ints and numeric text.
pub fn decimal_arg(value: &Value) -> Result<Decimal> {
    match value {
        Value::Decimal(d) => Ok(d.clone()),
        Value::Integer(i) => Ok(Decimal::from(i)),
        Value::Int(n) => Ok(Decimal::from(Integer::from(*n))),
        Value::Text(s) => Ok(Decimal::parse(s)?),
        other => Err(ScriptError::Type(format!(
            "expected a Decimal operand, got {}",
            other.type_name()
        ))),
    }
}

/// Coerces a method operand to an `Integer`
///
/// Decimals are rejected rather than truncated.
pub fn integer_arg(value: &Value) -> Result<Integer> {
    match value {
        Value::Integer(i) => Ok(i.clone()),
        Value::Int(n) => Ok(Integer::from(*n)),
        Value::Text(s) => Ok(Integer::parse(s)?),
        other => Err(ScriptError::Type(format!(
            "expected an Integer operand, got {}",
            other.type_name()
        ))),
    }
}

/// The global `Decimal(text)` constructor
pub(crate) fn construct_decimal<C>(_ctx: &mut C, _this: &Value, args: &[Value]) -> Result<Value> {
    match arg(args, 0) {
        Value::Text(s) => Ok(Value::Decimal(Decimal::parse(s)?)),
        Value::Decimal(d) => Ok(Value::Decimal(d.clone())),
        other => Err(ScriptError::Type(format!(
            "Decimal() expects a numeric string, got {}",
            other.type_name()
        ))),
    }
}

/// The global `Integer(text)` constructor
pub(crate) fn construct_integer<C>(_ctx: &mut C, _this: &Value, args: &[Value]) -> Result<Value> {
    match arg(args, 0) {
        Value::Text(s) => Ok(Value::Integer(Integer::parse(s)?)),
        Value::Integer(i) => Ok(Value::Integer(i.clone())),
        other => Err(ScriptError::Type(format!(
            "Integer() expects a numeric string, got {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use rstest::rstest;

    fn dec(text: &str) -> Decimal {
        text.parse().unwrap()
    }

    fn int(text: &str) -> Integer {
        text.parse().unwrap()
    }

    #[test]
    fn test_decimal_methods() {
        let d = dec("12345.6789");
        assert_eq!(
            decimal::minus(&d, &[Value::from("100")]).unwrap(),
            Value::Decimal(dec("12245.6789"))
        );
        assert_eq!(
            decimal::minus(&d, &[Value::Int(100)]).unwrap(),
            Value::Decimal(dec("12245.6789"))
        );
        assert_eq!(
            decimal::plus(&d, &[Value::Integer(int("1"))]).unwrap(),
            Value::Decimal(dec("12346.6789"))
        );
        assert_eq!(
            decimal::to_fixed(&d, &[Value::Int(2)]).unwrap(),
            Value::from("12345.68")
        );
        assert_eq!(decimal::gt(&d, &[Value::Int(0)]).unwrap(), Value::Bool(true));
        assert_eq!(decimal::negated(&d, &[]).unwrap(), Value::Decimal(dec("-12345.6789")));
    }

    #[test]
    fn test_integer_methods() {
        let i = int("1234500000");
        assert_eq!(
            integer::minus(&i, &[Value::Integer(int("680"))]).unwrap(),
            Value::Integer(int("1234499320"))
        );
        assert_eq!(integer::div(&i, &[Value::Int(7)]).unwrap(), Value::Integer(int("176357142")));
        assert_eq!(integer::modulo(&i, &[Value::Int(7)]).unwrap(), Value::Integer(int("6")));
    }

    #[rstest]
    #[case(Value::Decimal(Decimal::zero()))]
    #[case(Value::from("0"))]
    #[case(Value::Int(0))]
    fn test_divide_by_zero(#[case] zero: Value) {
        let d = dec("1.5");
        let err = decimal::div(&d, std::slice::from_ref(&zero)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Numeric);
        let err = decimal::modulo(&d, &[zero]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Numeric);
    }

    #[test]
    fn test_integer_rejects_decimal_operand() {
        let i = int("10");
        assert!(matches!(
            integer::plus(&i, &[Value::Decimal(dec("0.5"))]),
            Err(ScriptError::Type(_))
        ));
    }

    #[test]
    fn test_pow_and_places_ranges() {
        let d = dec("1.1");
        assert_eq!(decimal::pow(&d, &[Value::Int(2)]).unwrap(), Value::Decimal(dec("1.21")));
        assert!(matches!(decimal::pow(&d, &[Value::Int(-1)]), Err(ScriptError::Range(_))));
        assert!(matches!(
            integer::pow(&int("2"), &[Value::Int(MAX_EXPONENT + 1)]),
            Err(ScriptError::Range(_))
        ));
        assert!(matches!(
            decimal::to_fixed(&d, &[Value::Int(101)]),
            Err(ScriptError::Range(_))
        ));
    }

    #[test]
    fn test_result_size_is_bounded() {
        let nines = int(&"9".repeat(200));
        let err = integer::pow(&nines, &[Value::Int(1024)]).unwrap_err();
        assert!(matches!(err, ScriptError::Range(_)));
        assert!(integer::pow(&nines, &[Value::Int(20)]).is_ok());

        let wide = int(&"9".repeat(MAX_DIGITS));
        assert!(integer::multi(&wide, &[Value::Int(99)]).is_err());
        assert!(integer::plus(&wide, &[Value::Int(1)]).is_ok());

        let widest = Integer::parse(&format!("1{}", "0".repeat(MAX_DIGITS))).unwrap();
        assert!(matches!(
            integer::div(&widest, &[Value::Int(7)]),
            Err(ScriptError::Range(_))
        ));

        let fraction = dec(&format!("0.{}", "3".repeat(MAX_DIGITS / 2 + 1)));
        assert!(matches!(
            decimal::multi(&fraction, &[Value::Decimal(fraction.clone())]),
            Err(ScriptError::Range(_))
        ));
        assert!(decimal::pow(&dec("1"), &[Value::Int(MAX_EXPONENT)]).is_ok());
    }

    #[test]
    fn test_constructors_accept_text_only() {
        let mut ctx = ();
        assert_eq!(
            construct_decimal(&mut ctx, &Value::Undefined, &[Value::from("1.50")]).unwrap(),
            Value::Decimal(dec("1.5"))
        );
        assert!(matches!(
            construct_decimal(&mut ctx, &Value::Undefined, &[Value::Int(1)]),
            Err(ScriptError::Type(_))
        ));
        let err = construct_integer(&mut ctx, &Value::Undefined, &[Value::from("1.5")]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Numeric);
        let err = construct_decimal(&mut ctx, &Value::Undefined, &[Value::from("1e5")]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Numeric);
    }
}
