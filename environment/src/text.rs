//! Text primitives
//!
//! Positions and lengths count UTF-16 code units so indices agree with the
//! engine this environment replaces. Pattern arguments are always literal
//! text: the regular expression engine is not part of the environment.

use crate::adapter::NativeFn;
use crate::error::{Result, ScriptError};
use crate::value::{arg, clamp, int_arg, len_i64, relative, Value};

/// Longest text `repeat` may produce
pub const MAX_TEXT_LENGTH: usize = (1 << 29) - 24;

natives! { receiver;
    "charCodeAt" => char_code_at,
    "length" => length,
    "constructor" => constructor,
    "toString" => to_string,
    "valueOf" => to_string,
    "concat" => concat,
    "includes" => includes,
    "endsWith" => ends_with,
    "indexOf" => index_of,
    "lastIndexOf" => last_index_of,
    "replace" => replace,
    "search" => search,
    "split" => split,
    "startsWith" => starts_with,
    "slice" => slice,
    "substring" => substring,
    "toLowerCase" => to_lower_case,
    "toUpperCase" => to_upper_case,
    "trim" => trim,
    "trimLeft" => trim_left,
    "trimRight" => trim_right,
    "repeat" => repeat,
}

fn receiver<'a>(this: &'a Value, method: &str) -> Result<&'a str> {
    this.as_text().ok_or_else(|| {
        ScriptError::Type(format!(
            "String.prototype.{method} called on {}",
            this.type_name()
        ))
    })
}

/// The global `String(value)` conversion
pub(crate) fn construct<C>(_ctx: &mut C, _this: &Value, args: &[Value]) -> Result<Value> {
    constructor("", args)
}

fn units(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

fn pattern(args: &[Value], index: usize) -> Vec<u16> {
    units(&arg(args, index).to_display_string())
}

fn find_from(hay: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    let from = from.min(hay.len());
    if needle.is_empty() {
        return Some(from);
    }
    hay[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn rfind_from(hay: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    let last = hay.len().checked_sub(needle.len())?.min(from);
    (0..=last)
        .rev()
        .find(|&i| &hay[i..i + needle.len()] == needle)
}

fn is_space(c: char) -> bool {
    c == '\u{feff}' || (c.is_whitespace() && c != '\u{85}')
}

fn position(value: Option<usize>) -> Value {
    value.map_or(Value::Int(-1), |pos| Value::Int(len_i64(pos)))
}

/// UTF-16 code unit at an index, `Undefined` when out of range
pub fn char_code_at(text: &str, args: &[Value]) -> Result<Value> {
    let index = int_arg(args, 0, "index")?.unwrap_or(0);
    let units = units(text);
    let unit = usize::try_from(index).ok().and_then(|i| units.get(i));
    Ok(unit.map_or(Value::Undefined, |u| Value::Int(i64::from(*u))))
}

/// Length in UTF-16 code units
pub fn length(text: &str, _args: &[Value]) -> Result<Value> {
    Ok(Value::Int(len_i64(text.encode_utf16().count())))
}

/// Converts the first argument to text; the receiver is ignored
pub fn constructor(_text: &str, args: &[Value]) -> Result<Value> {
    Ok(Value::Text(
        args.first().map(Value::to_display_string).unwrap_or_default(),
    ))
}

/// The receiver itself
pub fn to_string(text: &str, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(text))
}

/// Receiver followed by the text of every argument
pub fn concat(text: &str, args: &[Value]) -> Result<Value> {
    let mut out = text.to_string();
    for value in args {
        out.push_str(&value.to_display_string());
    }
    Ok(Value::Text(out))
}

/// Whether the pattern occurs at or after `position`
pub fn includes(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let from = clamp(int_arg(args, 1, "position")?.unwrap_or(0), hay.len());
    Ok(Value::Bool(find_from(&hay, &pattern(args, 0), from).is_some()))
}

/// Whether the text before `endPosition` ends with the pattern
pub fn ends_with(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let end = match int_arg(args, 1, "endPosition")? {
        Some(end) => clamp(end, hay.len()),
        None => hay.len(),
    };
    Ok(Value::Bool(hay[..end].ends_with(&pattern(args, 0))))
}

/// Whether the text from `position` starts with the pattern
pub fn starts_with(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let start = clamp(int_arg(args, 1, "position")?.unwrap_or(0), hay.len());
    Ok(Value::Bool(hay[start..].starts_with(&pattern(args, 0))))
}

/// First position of the pattern at or after `fromIndex`, or -1
pub fn index_of(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let from = clamp(int_arg(args, 1, "fromIndex")?.unwrap_or(0), hay.len());
    Ok(position(find_from(&hay, &pattern(args, 0), from)))
}

/// Last position of the pattern at or before `fromIndex`, or -1
pub fn last_index_of(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let from = match int_arg(args, 1, "fromIndex")? {
        Some(from) => clamp(from, hay.len()),
        None => hay.len(),
    };
    Ok(position(rfind_from(&hay, &pattern(args, 0), from)))
}

/// First position of the pattern, or -1
pub fn search(text: &str, args: &[Value]) -> Result<Value> {
    Ok(position(find_from(&units(text), &pattern(args, 0), 0)))
}

/// Replaces the first occurrence of the pattern
///
/// The replacement is either text, where `$$`, `$&`, `` $` `` and `$'` are
/// expanded, or a callback receiving the match, its position and the whole
/// receiver.
pub fn replace(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let needle = pattern(args, 0);
    let Some(pos) = find_from(&hay, &needle, 0) else {
        return Ok(Value::from(text));
    };
    let end = pos + needle.len();
    let replacement = match arg(args, 1) {
        Value::Function(callback) => {
            let result = callback.call(&[
                Value::Text(from_units(&needle)),
                Value::Int(len_i64(pos)),
                Value::from(text),
            ])?;
            units(&result.to_display_string())
        }
        other => expand(
            &units(&other.to_display_string()),
            &needle,
            &hay[..pos],
            &hay[end..],
        ),
    };
    let mut out = Vec::with_capacity(hay.len() + replacement.len());
    out.extend_from_slice(&hay[..pos]);
    out.extend_from_slice(&replacement);
    out.extend_from_slice(&hay[end..]);
    Ok(Value::Text(from_units(&out)))
}

fn expand(template: &[u16], matched: &[u16], before: &[u16], after: &[u16]) -> Vec<u16> {
    const DOLLAR: u16 = b'$' as u16;
    let mut out = Vec::with_capacity(template.len());
    let mut i = 0;
    while i < template.len() {
        let unit = template[i];
        if unit == DOLLAR {
            let expansion: Option<&[u16]> = match template.get(i + 1).copied() {
                Some(u) if u == DOLLAR => Some(&template[i..i + 1]),
                Some(u) if u == u16::from(b'&') => Some(matched),
                Some(u) if u == u16::from(b'`') => Some(before),
                Some(u) if u == u16::from(b'\'') => Some(after),
                _ => None,
            };
            if let Some(expansion) = expansion {
                out.extend_from_slice(expansion);
                i += 2;
                continue;
            }
        }
        out.push(unit);
        i += 1;
    }
    out
}

/// Splits on every occurrence of the separator
///
/// A missing separator yields the whole text; an empty one yields single
/// code units. `limit` caps the number of pieces.
pub fn split(text: &str, args: &[Value]) -> Result<Value> {
    let limit = match int_arg(args, 1, "limit")? {
        Some(n) if n >= 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => usize::MAX,
    };
    if limit == 0 {
        return Ok(Value::sequence(Vec::new()));
    }
    if matches!(arg(args, 0), Value::Undefined) {
        return Ok(Value::sequence(vec![Value::from(text)]));
    }

    let hay = units(text);
    let separator = pattern(args, 0);
    let pieces: Vec<Value> = if separator.is_empty() {
        hay.iter()
            .take(limit)
            .map(|unit| Value::Text(from_units(std::slice::from_ref(unit))))
            .collect()
    } else {
        let mut pieces = Vec::new();
        let mut start = 0;
        while pieces.len() < limit {
            match find_from(&hay, &separator, start) {
                Some(pos) => {
                    pieces.push(Value::Text(from_units(&hay[start..pos])));
                    start = pos + separator.len();
                }
                None => {
                    pieces.push(Value::Text(from_units(&hay[start..])));
                    break;
                }
            }
        }
        pieces
    };
    Ok(Value::sequence(pieces))
}

/// Section between two positions, negative positions counting from the end
pub fn slice(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let start = relative(int_arg(args, 0, "start")?.unwrap_or(0), hay.len());
    let end = match int_arg(args, 1, "end")? {
        Some(end) => relative(end, hay.len()),
        None => hay.len(),
    };
    if start >= end {
        return Ok(Value::from(""));
    }
    Ok(Value::Text(from_units(&hay[start..end])))
}

/// Section between two clamped positions, swapped when out of order
pub fn substring(text: &str, args: &[Value]) -> Result<Value> {
    let hay = units(text);
    let start = clamp(int_arg(args, 0, "start")?.unwrap_or(0), hay.len());
    let end = match int_arg(args, 1, "end")? {
        Some(end) => clamp(end, hay.len()),
        None => hay.len(),
    };
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    Ok(Value::Text(from_units(&hay[lo..hi])))
}

/// Lower-cased copy
pub fn to_lower_case(text: &str, _args: &[Value]) -> Result<Value> {
    Ok(Value::Text(text.to_lowercase()))
}

/// Upper-cased copy
pub fn to_upper_case(text: &str, _args: &[Value]) -> Result<Value> {
    Ok(Value::Text(text.to_uppercase()))
}

/// Copy without leading and trailing white space
pub fn trim(text: &str, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(text.trim_matches(is_space)))
}

/// Copy without leading white space
pub fn trim_left(text: &str, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(text.trim_start_matches(is_space)))
}

/// Copy without trailing white space
pub fn trim_right(text: &str, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(text.trim_end_matches(is_space)))
}

/// Receiver repeated `count` times
pub fn repeat(text: &str, args: &[Value]) -> Result<Value> {
    let count = int_arg(args, 0, "count")?.unwrap_or(0);
    let count = usize::try_from(count)
        .map_err(|_| ScriptError::Range(format!("Invalid count value: {count}")))?;
    let total = text
        .encode_utf16()
        .count()
        .checked_mul(count)
        .filter(|total| *total <= MAX_TEXT_LENGTH);
    if total.is_none() {
        return Err(ScriptError::Range("Invalid string length".to_string()));
    }
    Ok(Value::Text(text.repeat(count)))
}
