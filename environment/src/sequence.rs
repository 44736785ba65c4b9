//! Sequence primitives
//!
//! Callbacks receive `(element, index, sequence)`. Iterating methods work on
//! a snapshot taken before the first callback runs, so a callback that
//! mutates the sequence never observes a half-applied change.

use std::cmp::Ordering;

use crate::adapter::NativeFn;
use crate::error::{Result, ScriptError};
use crate::value::{arg, callback_arg, clamp, int_arg, len_i64, relative, Callback, Sequence, Value};

/// Largest sequence `Array(n)` may allocate
pub const MAX_SEQUENCE_LENGTH: usize = 1 << 24;

natives! { receiver;
    "constructor" => constructor,
    "toString" => to_string,
    "concat" => concat,
    "every" => every,
    "filter" => filter,
    "find" => find,
    "findIndex" => find_index,
    "forEach" => for_each,
    "includes" => includes,
    "indexOf" => index_of,
    "join" => join,
    "keys" => keys,
    "lastIndexOf" => last_index_of,
    "map" => map,
    "pop" => pop,
    "push" => push,
    "reverse" => reverse,
    "shift" => shift,
    "slice" => slice,
    "sort" => sort,
    "splice" => splice,
    "unshift" => unshift,
}

fn receiver<'a>(this: &'a Value, method: &str) -> Result<&'a Sequence> {
    match this {
        Value::Sequence(seq) => Ok(seq),
        other => Err(ScriptError::Type(format!(
            "Array.prototype.{method} called on {}",
            other.type_name()
        ))),
    }
}

/// The global `Array(...)` constructor
pub(crate) fn construct<C>(_ctx: &mut C, _this: &Value, args: &[Value]) -> Result<Value> {
    build(args)
}

fn build(args: &[Value]) -> Result<Value> {
    if let [Value::Int(n)] = args {
        let len = usize::try_from(*n)
            .ok()
            .filter(|len| *len <= MAX_SEQUENCE_LENGTH)
            .ok_or_else(|| ScriptError::Range("Invalid array length".to_string()))?;
        return Ok(Value::sequence(vec![Value::Undefined; len]));
    }
    Ok(Value::sequence(args.to_vec()))
}

/// Calls `callback` for each element of a snapshot until `stop` says so
fn visit(
    seq: &Sequence,
    callback: &Callback,
    mut stop: impl FnMut(usize, &Value, &Value) -> bool,
) -> Result<Option<usize>> {
    let whole = Value::Sequence(seq.clone());
    for (index, item) in seq.snapshot().iter().enumerate() {
        let result = callback.call(&[item.clone(), Value::Int(len_i64(index)), whole.clone()])?;
        if stop(index, item, &result) {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// New sequence holding the arguments, or `n` empty slots for a single count
pub fn constructor(_seq: &Sequence, args: &[Value]) -> Result<Value> {
    build(args)
}

/// Elements joined with commas
pub fn to_string(seq: &Sequence, _args: &[Value]) -> Result<Value> {
    Ok(Value::Text(Value::Sequence(seq.clone()).to_display_string()))
}

/// New sequence of the receiver followed by each argument, flattening sequences one level
pub fn concat(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let mut items = seq.snapshot();
    for value in args {
        match value {
            Value::Sequence(other) => items.extend(other.snapshot()),
            other => items.push(other.clone()),
        }
    }
    Ok(Value::sequence(items))
}

/// Whether the callback is truthy for every element
pub fn every(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let callback = callback_arg(args, 0, "every")?;
    let failed = visit(seq, callback, |_, _, result| !result.is_truthy())?;
    Ok(Value::Bool(failed.is_none()))
}

/// New sequence of the elements the callback accepts
pub fn filter(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let callback = callback_arg(args, 0, "filter")?;
    let mut kept = Vec::new();
    visit(seq, callback, |_, item, result| {
        if result.is_truthy() {
            kept.push(item.clone());
        }
        false
    })?;
    Ok(Value::sequence(kept))
}

/// First element the callback accepts, or `Undefined`
pub fn find(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let callback = callback_arg(args, 0, "find")?;
    let mut found = Value::Undefined;
    visit(seq, callback, |_, item, result| {
        if result.is_truthy() {
            found = item.clone();
            return true;
        }
        false
    })?;
    Ok(found)
}

/// Index of the first element the callback accepts, or -1
pub fn find_index(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let callback = callback_arg(args, 0, "findIndex")?;
    let index = visit(seq, callback, |_, _, result| result.is_truthy())?;
    Ok(index.map_or(Value::Int(-1), |i| Value::Int(len_i64(i))))
}

/// Calls the callback for every element
pub fn for_each(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let callback = callback_arg(args, 0, "forEach")?;
    visit(seq, callback, |_, _, _| false)?;
    Ok(Value::Undefined)
}

/// Whether an element strictly equals the argument
pub fn includes(seq: &Sequence, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(index_of(seq, args)? != Value::Int(-1)))
}

/// Index of the first element strictly equal to the argument, or -1
pub fn index_of(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let items = seq.snapshot();
    let from = relative(int_arg(args, 1, "fromIndex")?.unwrap_or(0), items.len());
    let needle = arg(args, 0);
    let index = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, item)| item.strict_equals(needle))
        .map(|(i, _)| i);
    Ok(index.map_or(Value::Int(-1), |i| Value::Int(len_i64(i))))
}

/// Index of the last element strictly equal to the argument, or -1
pub fn last_index_of(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let items = seq.snapshot();
    let Some(last) = items.len().checked_sub(1) else {
        return Ok(Value::Int(-1));
    };
    let from = match int_arg(args, 1, "fromIndex")? {
        Some(from) if from < 0 => match len_i64(items.len()).checked_add(from) {
            Some(pos) if pos >= 0 => usize::try_from(pos).unwrap_or(0),
            _ => return Ok(Value::Int(-1)),
        },
        Some(from) => clamp(from, last),
        None => last,
    };
    let needle = arg(args, 0);
    let index = (0..=from).rev().find(|&i| items[i].strict_equals(needle));
    Ok(index.map_or(Value::Int(-1), |i| Value::Int(len_i64(i))))
}

/// Elements converted to text and joined with the separator (default `,`)
pub fn join(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let separator = match arg(args, 0) {
        Value::Undefined => ",".to_string(),
        other => other.to_display_string(),
    };
    let joined = seq.join_display(&separator);
    Ok(Value::Text(joined))
}

/// Sequence of the valid indices
pub fn keys(seq: &Sequence, _args: &[Value]) -> Result<Value> {
    let indices = (0..seq.len()).map(|i| Value::Int(len_i64(i))).collect();
    Ok(Value::sequence(indices))
}

/// New sequence of callback results
pub fn map(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let callback = callback_arg(args, 0, "map")?;
    let mut mapped = Vec::with_capacity(seq.len());
    visit(seq, callback, |_, _, result| {
        mapped.push(result.clone());
        false
    })?;
    Ok(Value::sequence(mapped))
}

/// Removes and returns the last element
pub fn pop(seq: &Sequence, _args: &[Value]) -> Result<Value> {
    Ok(seq.with_mut(|items| items.pop()).unwrap_or_default())
}

/// Appends the arguments and returns the new length
pub fn push(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let len = seq.with_mut(|items| {
        items.extend_from_slice(args);
        items.len()
    });
    Ok(Value::Int(len_i64(len)))
}

/// Reverses in place and returns the receiver
pub fn reverse(seq: &Sequence, _args: &[Value]) -> Result<Value> {
    seq.with_mut(|items| items.reverse());
    Ok(Value::Sequence(seq.clone()))
}

/// Removes and returns the first element
pub fn shift(seq: &Sequence, _args: &[Value]) -> Result<Value> {
    let first = seq.with_mut(|items| (!items.is_empty()).then(|| items.remove(0)));
    Ok(first.unwrap_or_default())
}

/// Prepends the arguments and returns the new length
pub fn unshift(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let len = seq.with_mut(|items| {
        items.splice(0..0, args.iter().cloned());
        items.len()
    });
    Ok(Value::Int(len_i64(len)))
}

/// New sequence between two positions, negative positions counting from the end
pub fn slice(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let items = seq.snapshot();
    let start = relative(int_arg(args, 0, "start")?.unwrap_or(0), items.len());
    let end = match int_arg(args, 1, "end")? {
        Some(end) => relative(end, items.len()),
        None => items.len(),
    };
    if start >= end {
        return Ok(Value::sequence(Vec::new()));
    }
    Ok(Value::sequence(items[start..end].to_vec()))
}

/// Stable in-place sort, returning the receiver
///
/// Without a comparator elements are ordered by their text form. `Undefined`
/// elements always go last and are never passed to the comparator. An error
/// raised by the comparator aborts the sort and leaves the receiver unchanged.
pub fn sort(seq: &Sequence, args: &[Value]) -> Result<Value> {
    let comparator = match arg(args, 0) {
        Value::Undefined => None,
        Value::Function(callback) => Some(callback),
        other => {
            return Err(ScriptError::Type(format!(
                "The comparison function must be either a function or undefined, got {}",
                other.type_name()
            )))
        }
    };

    let (defined, undefined): (Vec<Value>, Vec<Value>) = seq
        .snapshot()
        .into_iter()
        .partition(|item| !matches!(item, Value::Undefined));

    let mut sorted = match comparator {
        Some(callback) => merge_sort(defined, &mut |a, b| compare_with(callback, a, b))?,
        None => merge_sort(defined, &mut |a, b| Ok(default_order(a, b)))?,
    };
    sorted.extend(undefined);
    seq.replace(sorted);
    Ok(Value::Sequence(seq.clone()))
}

fn default_order(a: &Value, b: &Value) -> Ordering {
    let a = a.to_display_string();
    let b = b.to_display_string();
    a.encode_utf16().cmp(b.encode_utf16())
}

fn compare_with(callback: &Callback, a: &Value, b: &Value) -> Result<Ordering> {
    match callback.call(&[a.clone(), b.clone()])? {
        Value::Int(n) => Ok(n.cmp(&0)),
        Value::Decimal(d) if d.is_negative() => Ok(Ordering::Less),
        Value::Decimal(d) if d.is_positive() => Ok(Ordering::Greater),
        Value::Integer(i) if i.is_negative() => Ok(Ordering::Less),
        Value::Integer(i) if i.is_positive() => Ok(Ordering::Greater),
        Value::Decimal(_) | Value::Integer(_) | Value::Undefined => Ok(Ordering::Equal),
        Value::Bool(true) => Ok(Ordering::Greater),
        Value::Bool(false) => Ok(Ordering::Equal),
        other => Err(ScriptError::Type(format!(
            "comparator returned {}, expected a number",
            other.type_name()
        ))),
    }
}

type Comparator<'a> = dyn FnMut(&Value, &Value) -> Result<Ordering> + 'a;

fn merge_sort(mut items: Vec<Value>, cmp: &mut Comparator<'_>) -> Result<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let next = if cmp(b, a)? == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// Removes `deleteCount` elements at `start`, inserts the remaining
/// arguments there, and returns the removed elements
pub fn splice(seq: &Sequence, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::sequence(Vec::new()));
    }
    let len = seq.len();
    let start = relative(int_arg(args, 0, "start")?.unwrap_or(0), len);
    let available = len.saturating_sub(start);
    let delete = match args.get(1) {
        None => available,
        Some(_) => clamp(int_arg(args, 1, "deleteCount")?.unwrap_or(0), available),
    };
    let inserted = args.get(2..).unwrap_or_default().to_vec();
    let removed: Vec<Value> =
        seq.with_mut(|items| items.splice(start..start + delete, inserted).collect());
    Ok(Value::sequence(removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(values: &[i64]) -> Sequence {
        Sequence::new(values.iter().copied().map(Value::Int).collect())
    }

    fn as_ints(value: &Value) -> Vec<i64> {
        match value {
            Value::Sequence(seq) => seq
                .snapshot()
                .iter()
                .map(|v| v.as_int().expect("int element"))
                .collect(),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_constructor() {
        let seq = Sequence::default();
        assert_eq!(as_ints(&constructor(&seq, &[Value::Int(1), Value::Int(2)]).unwrap()), [1, 2]);
        match constructor(&seq, &[Value::Int(3)]).unwrap() {
            Value::Sequence(made) => assert_eq!(made.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            constructor(&seq, &[Value::Int(-1)]),
            Err(ScriptError::Range(_))
        ));
    }

    #[test]
    fn test_push_pop_shift_unshift() {
        let seq = ints(&[2]);
        assert_eq!(push(&seq, &[Value::Int(3), Value::Int(4)]).unwrap(), Value::Int(3));
        assert_eq!(unshift(&seq, &[Value::Int(1)]).unwrap(), Value::Int(4));
        assert_eq!(pop(&seq, &[]).unwrap(), Value::Int(4));
        assert_eq!(shift(&seq, &[]).unwrap(), Value::Int(1));
        assert_eq!(as_ints(&Value::Sequence(seq.clone())), [2, 3]);

        let empty = Sequence::default();
        assert_eq!(pop(&empty, &[]).unwrap(), Value::Undefined);
        assert_eq!(shift(&empty, &[]).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_callbacks_receive_index() {
        let seq = ints(&[10, 20, 30]);
        let add_index = Value::function(|args: &[Value]| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0)))
        });
        assert_eq!(as_ints(&map(&seq, &[add_index]).unwrap()), [10, 21, 32]);

        let over_15 = Value::function(|args: &[Value]| Ok(Value::Bool(args[0].as_int() > Some(15))));
        assert_eq!(as_ints(&filter(&seq, std::slice::from_ref(&over_15)).unwrap()), [20, 30]);
        assert_eq!(find(&seq, std::slice::from_ref(&over_15)).unwrap(), Value::Int(20));
        assert_eq!(find_index(&seq, std::slice::from_ref(&over_15)).unwrap(), Value::Int(1));
        assert_eq!(every(&seq, &[over_15]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_callback_errors_propagate() {
        let seq = ints(&[1, 2]);
        let failing = Value::function(|_: &[Value]| Err(ScriptError::thrown("boom")));
        assert_eq!(
            for_each(&seq, &[failing]).unwrap_err(),
            ScriptError::thrown("boom")
        );
        assert!(matches!(map(&seq, &[Value::Int(1)]), Err(ScriptError::Type(_))));
    }

    #[test]
    fn test_search_methods_use_strict_equality() {
        let inner = Value::sequence(vec![]);
        let seq = Sequence::new(vec![Value::Int(1), Value::from("1"), inner.clone(), Value::Int(1)]);
        assert_eq!(index_of(&seq, &[Value::from("1")]).unwrap(), Value::Int(1));
        assert_eq!(index_of(&seq, &[inner.clone()]).unwrap(), Value::Int(2));
        assert_eq!(index_of(&seq, &[Value::sequence(vec![])]).unwrap(), Value::Int(-1));
        assert_eq!(last_index_of(&seq, &[Value::Int(1)]).unwrap(), Value::Int(3));
        assert_eq!(
            last_index_of(&seq, &[Value::Int(1), Value::Int(-2)]).unwrap(),
            Value::Int(0)
        );
        assert_eq!(includes(&seq, &[inner]).unwrap(), Value::Bool(true));
        assert_eq!(includes(&seq, &[Value::Int(1), Value::Int(-1)]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_join_and_to_string() {
        let seq = Sequence::new(vec![Value::Int(1), Value::Null, Value::from("a")]);
        assert_eq!(join(&seq, &[]).unwrap(), Value::from("1,,a"));
        assert_eq!(join(&seq, &[Value::from("-")]).unwrap(), Value::from("1--a"));
        assert_eq!(to_string(&seq, &[]).unwrap(), Value::from("1,,a"));
    }

    #[test]
    fn test_self_containing_sequence_renders() {
        let seq = ints(&[1]);
        push(&seq, &[Value::Sequence(seq.clone()), Value::Int(2)]).unwrap();
        assert_eq!(join(&seq, &[]).unwrap(), Value::from("1,,2"));
        assert_eq!(to_string(&seq, &[]).unwrap(), Value::from("1,,2"));
        assert_eq!(
            crate::text::concat("x", &[Value::Sequence(seq.clone())]).unwrap(),
            Value::from("x1,,2")
        );
        assert_eq!(format!("{:?}", Value::Sequence(seq)), "[Int(1), [..], Int(2)]");
    }

    #[test]
    fn test_deep_nesting_renders_empty_past_limit() {
        let mut value = Value::Int(7);
        for _ in 0..1_000 {
            value = Value::sequence(vec![value]);
        }
        assert_eq!(value.to_display_string(), "");

        let shallow = Value::sequence(vec![Value::sequence(vec![Value::Int(7)])]);
        assert_eq!(shallow.to_display_string(), "7");
    }

    #[test]
    fn test_slice_and_splice() {
        let seq = ints(&[1, 2, 3, 4, 5]);
        assert_eq!(as_ints(&slice(&seq, &[Value::Int(1), Value::Int(-1)]).unwrap()), [2, 3, 4]);

        let removed = splice(&seq, &[Value::Int(1), Value::Int(2), Value::Int(9)]).unwrap();
        assert_eq!(as_ints(&removed), [2, 3]);
        assert_eq!(as_ints(&Value::Sequence(seq.clone())), [1, 9, 4, 5]);

        let removed = splice(&seq, &[Value::Int(-1)]).unwrap();
        assert_eq!(as_ints(&removed), [5]);
        assert_eq!(as_ints(&splice(&seq, &[]).unwrap()), Vec::<i64>::new());
    }

    #[test]
    fn test_default_sort_is_textual() {
        let seq = Sequence::new(vec![
            Value::Int(10),
            Value::Undefined,
            Value::Int(9),
            Value::Int(1),
        ]);
        sort(&seq, &[]).unwrap();
        assert_eq!(
            seq.snapshot(),
            vec![Value::Int(1), Value::Int(10), Value::Int(9), Value::Undefined]
        );
    }

    #[test]
    fn test_sort_with_comparator_is_stable() {
        let pairs: Vec<Value> = [(2, "a"), (1, "b"), (2, "c"), (1, "d")]
            .iter()
            .map(|(k, tag)| Value::sequence(vec![Value::Int(*k), Value::from(*tag)]))
            .collect();
        let seq = Sequence::new(pairs);
        let by_key = Value::function(|args: &[Value]| {
            let key = |v: &Value| match v {
                Value::Sequence(s) => s.get(0).and_then(|k| k.as_int()).unwrap_or(0),
                _ => 0,
            };
            Ok(Value::Int(key(&args[0]) - key(&args[1])))
        });
        sort(&seq, &[by_key]).unwrap();
        let tags: Vec<String> = seq
            .snapshot()
            .iter()
            .map(|pair| match pair {
                Value::Sequence(s) => s.get(1).map(|t| t.to_display_string()).unwrap_or_default(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(tags, ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_sort_error_leaves_receiver_untouched() {
        let seq = ints(&[3, 1, 2]);
        let failing = Value::function(|_: &[Value]| Err(ScriptError::thrown("bad comparator")));
        assert!(sort(&seq, &[failing]).is_err());
        assert_eq!(as_ints(&Value::Sequence(seq)), [3, 1, 2]);
    }

    #[test]
    fn test_reverse_and_keys() {
        let seq = ints(&[1, 2, 3]);
        let result = reverse(&seq, &[]).unwrap();
        assert!(result.strict_equals(&Value::Sequence(seq.clone())));
        assert_eq!(as_ints(&result), [3, 2, 1]);
        assert_eq!(as_ints(&keys(&seq, &[]).unwrap()), [0, 1, 2]);
    }

    #[test]
    fn test_concat_flattens_one_level() {
        let seq = ints(&[1]);
        let nested = Value::sequence(vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(as_ints(&concat(&seq, &[nested, Value::Int(4)]).unwrap()), [1, 2, 3, 4]);
    }
}
