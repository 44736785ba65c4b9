//! `JSON` namespace and conversions between script values and `serde_json`
//!
//! Integers that fit in 64 bits decode to `Int`; every other number decodes
//! to an exact `Decimal` taken from the literal text, so no binary floating
//! point conversion ever happens. Exponent notation is rejected. On the way
//! out, `Decimal` and `Integer` encode as JSON strings.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Serializer};
use tos_sandbox_runtime::Decimal;

use crate::adapter::NativeFn;
use crate::error::{Result, ScriptError};
use crate::value::{arg, Value};

/// Deepest nesting either direction accepts
pub const MAX_DEPTH: usize = 128;

/// Longest indentation `stringify` applies
const MAX_INDENT: usize = 10;

/// Unwrapped primitive registered under `name`
pub(crate) fn native<C>(name: &str) -> Option<NativeFn<C>> {
    let native: NativeFn<C> = match name {
        "parse" => |_ctx: &mut C, _this: &Value, args: &[Value]| -> Result<Value> { parse(args) },
        "stringify" => {
            |_ctx: &mut C, _this: &Value, args: &[Value]| -> Result<Value> { stringify(args) }
        }
        _ => return None,
    };
    Some(native)
}

/// `JSON.parse(text)`
pub fn parse(args: &[Value]) -> Result<Value> {
    let text = arg(args, 0).as_text().ok_or_else(|| {
        ScriptError::Type(format!(
            "JSON.parse expects a string, got {}",
            arg(args, 0).type_name()
        ))
    })?;
    if !arg(args, 1).is_nullish() {
        return Err(ScriptError::Type("JSON.parse reviver is not supported".to_string()));
    }
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ScriptError::Json(e.to_string()))?;
    from_json(&json)
}

/// `JSON.stringify(value, replacer, indent)`
///
/// Returns `Undefined` when the value itself has no JSON form.
pub fn stringify(args: &[Value]) -> Result<Value> {
    if !arg(args, 1).is_nullish() {
        return Err(ScriptError::Type(
            "JSON.stringify replacer is not supported".to_string(),
        ));
    }
    let Some(json) = to_json(arg(args, 0))? else {
        return Ok(Value::Undefined);
    };
    let indent = match arg(args, 2) {
        Value::Int(n) => " ".repeat(usize::try_from(*n).unwrap_or(0).min(MAX_INDENT)),
        Value::Text(s) => s.chars().take(MAX_INDENT).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json).map_err(|e| ScriptError::Json(e.to_string()))?
    } else {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
        json.serialize(&mut ser)
            .map_err(|e| ScriptError::Json(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| ScriptError::Json(e.to_string()))?
    };
    Ok(Value::Text(text))
}

/// Converts a JSON document into a script value
pub fn from_json(json: &serde_json::Value) -> Result<Value> {
    from_json_at(json, 0)
}

fn from_json_at(json: &serde_json::Value, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(ScriptError::Json("document nested too deeply".to_string()));
    }
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => number(n)?,
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::sequence(
            items
                .iter()
                .map(|item| from_json_at(item, depth + 1))
                .collect::<Result<_>>()?,
        ),
        serde_json::Value::Object(fields) => Value::object(
            fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), from_json_at(v, depth + 1)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn number(n: &Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    let literal = n.to_string();
    Decimal::parse(&literal)
        .map(Value::Decimal)
        .map_err(|_| ScriptError::Json(format!("unsupported number literal {literal}")))
}

/// Converts a script value into a JSON document
///
/// `Undefined` and functions have no JSON form: they yield `None` at the top
/// level, are skipped as object fields and become `null` inside sequences.
pub fn to_json(value: &Value) -> Result<Option<serde_json::Value>> {
    to_json_at(value, 0)
}

fn to_json_at(value: &Value, depth: usize) -> Result<Option<serde_json::Value>> {
    if depth > MAX_DEPTH {
        return Err(ScriptError::Type(
            "Converting circular structure to JSON".to_string(),
        ));
    }
    let json = match value {
        Value::Undefined | Value::Function(_) => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number(Number::from(*n)),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Decimal(d) => serde_json::Value::String(d.to_string()),
        Value::Integer(i) => serde_json::Value::String(i.to_string()),
        Value::Sequence(seq) => serde_json::Value::Array(
            seq.snapshot()
                .iter()
                .map(|item| Ok(to_json_at(item, depth + 1)?.unwrap_or(serde_json::Value::Null)))
                .collect::<Result<_>>()?,
        ),
        Value::Object(obj) => {
            let mut fields = Map::new();
            for (key, item) in obj.snapshot() {
                if let Some(json) = to_json_at(&item, depth + 1)? {
                    fields.insert(key, json);
                }
            }
            serde_json::Value::Object(fields)
        }
    };
    Ok(Some(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn text(value: Value) -> String {
        value.as_text().map(str::to_string).expect("text value")
    }

    #[test]
    fn test_parse_numbers_exactly() {
        let value = parse(&[Value::from(r#"{"a":1,"b":0.1,"c":123456789012345678901234567890}"#)]).unwrap();
        assert_eq!(value.get("a"), Some(Value::Int(1)));
        assert_eq!(value.get("b"), Some(Value::Decimal("0.1".parse().unwrap())));
        assert_eq!(
            value.get("c"),
            Some(Value::Decimal("123456789012345678901234567890".parse().unwrap()))
        );
    }

    #[test]
    fn test_parse_rejects_exponent_and_garbage() {
        assert!(matches!(parse(&[Value::from("1e5")]), Err(ScriptError::Json(_))));
        assert!(matches!(parse(&[Value::from("{")]), Err(ScriptError::Json(_))));
        assert!(matches!(parse(&[Value::Int(1)]), Err(ScriptError::Type(_))));
    }

    #[test]
    fn test_stringify_preserves_field_order() {
        let mut fields = IndexMap::new();
        fields.insert("z".to_string(), Value::Int(1));
        fields.insert("a".to_string(), Value::Decimal("1.50".parse().unwrap()));
        fields.insert("skip".to_string(), Value::Undefined);
        fields.insert(
            "list".to_string(),
            Value::sequence(vec![Value::Undefined, Value::from("x")]),
        );
        let out = text(stringify(&[Value::object(fields)]).unwrap());
        assert_eq!(out, r#"{"z":1,"a":"1.5","list":[null,"x"]}"#);
    }

    #[test]
    fn test_stringify_indent() {
        let value = Value::sequence(vec![Value::Int(1)]);
        let out = text(stringify(&[value, Value::Null, Value::Int(2)]).unwrap());
        assert_eq!(out, "[\n  1\n]");
    }

    #[test]
    fn test_stringify_top_level_undefined() {
        assert_eq!(stringify(&[Value::Undefined]).unwrap(), Value::Undefined);
        assert_eq!(text(stringify(&[Value::from("a\"b")]).unwrap()), r#""a\"b""#);
    }

    #[test]
    fn test_stringify_cycle_is_an_error() {
        let seq = Value::sequence(vec![]);
        if let Value::Sequence(inner) = &seq {
            inner.push(seq.clone());
        }
        assert!(matches!(stringify(&[seq]), Err(ScriptError::Type(_))));
    }

    #[test]
    fn test_round_trip_through_text() {
        let source = r#"{"name":"tos","tags":["a","b"],"nested":{"ok":true,"n":null}}"#;
        let value = parse(&[Value::from(source)]).unwrap();
        assert_eq!(text(stringify(&[value]).unwrap()), source);
    }
}
