//! Script value model
//!
//! Values are single-threaded: sequences and objects are shared by handle
//! (`Rc<RefCell<..>>`) so a mutation through one handle is visible through
//! every other, matching how contract code expects containers to behave.
//! There is no binary floating point variant; fractional numbers only exist
//! as [`Decimal`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tos_sandbox_runtime::{Decimal, Integer};

use crate::capability::Family;
use crate::error::{Result, ScriptError};
use crate::json::MAX_DEPTH;

/// A script value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    /// Explicit null; also the "not found" sentinel of storage reads
    Null,
    /// Boolean
    Bool(bool),
    /// Small exact integer used for indices, lengths and counters
    Int(i64),
    /// Text
    Text(String),
    /// Ordered list
    Sequence(Sequence),
    /// Insertion-ordered key/value record
    Object(Object),
    /// Arbitrary precision decimal
    Decimal(Decimal),
    /// Arbitrary precision integer
    Integer(Integer),
    /// Callable supplied by contract code
    Function(Callback),
}

impl Value {
    /// Builds a sequence value from elements
    pub fn sequence(items: Vec<Value>) -> Self {
        Value::Sequence(Sequence::new(items))
    }

    /// Builds an object value from fields
    pub fn object(fields: IndexMap<String, Value>) -> Self {
        Value::Object(Object::new(fields))
    }

    /// Wraps a closure as a callable value
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Value::Function(Callback::new(f))
    }

    /// Name of the variant as shown in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "number",
            Value::Text(_) => "string",
            Value::Sequence(_) => "array",
            Value::Object(_) => "object",
            Value::Decimal(_) => "Decimal",
            Value::Integer(_) => "Integer",
            Value::Function(_) => "function",
        }
    }

    /// Prototype family used for method dispatch
    pub fn family(&self) -> Option<Family> {
        match self {
            Value::Text(_) => Some(Family::Text),
            Value::Sequence(_) => Some(Family::Sequence),
            Value::Decimal(_) => Some(Family::Decimal),
            Value::Integer(_) => Some(Family::Integer),
            _ => None,
        }
    }

    /// Truthiness used by sequence predicates
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Text(s) => !s.is_empty(),
            Value::Decimal(d) => !d.is_zero(),
            Value::Integer(i) => !i.is_zero(),
            Value::Sequence(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Returns true for `Undefined` and `Null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Borrows the text of a `Text` value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number of an `Int` value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean of a `Bool` value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Reads a field of an object value
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.get(key),
            _ => None,
        }
    }

    /// Identity for containers and callables, value equality otherwise
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// String conversion applied by `String(v)`, `concat` and `join`
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Text(s) => s.clone(),
            Value::Decimal(d) => d.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Sequence(seq) => seq.join_display(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) => "function () { [native code] }".to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Nested {
            value: self,
            open: Vec::new(),
        }
        .fmt(f)
    }
}

/// Debug view of a value below the containers in `open`
struct Nested<'a> {
    value: &'a Value,
    open: Vec<usize>,
}

impl Nested<'_> {
    /// `open` extended with `id`, or `None` when `id` would recurse
    fn enter(&self, id: usize) -> Option<Vec<usize>> {
        if self.open.len() >= MAX_DEPTH || self.open.contains(&id) {
            return None;
        }
        let mut open = self.open.clone();
        open.push(id);
        Some(open)
    }
}

impl fmt::Debug for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Sequence(seq) => match self.enter(seq.id()) {
                Some(open) => {
                    let items = seq.snapshot();
                    f.debug_list()
                        .entries(items.iter().map(|value| Nested {
                            value,
                            open: open.clone(),
                        }))
                        .finish()
                }
                None => write!(f, "[..]"),
            },
            Value::Object(obj) => match self.enter(obj.id()) {
                Some(open) => {
                    let fields = obj.snapshot();
                    f.debug_map()
                        .entries(fields.iter().map(|(key, value)| {
                            (
                                key,
                                Nested {
                                    value,
                                    open: open.clone(),
                                },
                            )
                        }))
                        .finish()
                }
                None => write!(f, "{{..}}"),
            },
            Value::Decimal(d) => write!(f, "Decimal({d})"),
            Value::Integer(i) => write!(f, "Integer({i})"),
            Value::Function(_) => write!(f, "Function"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Integer> for Value {
    fn from(i: Integer) -> Self {
        Value::Integer(i)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Shared handle to a list of values
#[derive(Clone, Default)]
pub struct Sequence(Rc<RefCell<Vec<Value>>>);

impl Sequence {
    /// Creates a new sequence owning `items`
    pub fn new(items: Vec<Value>) -> Self {
        Sequence(Rc::new(RefCell::new(items)))
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns true when there are no elements
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Clones the element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Copies the current elements out so callbacks can run without a borrow held
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Replaces all elements
    pub fn replace(&self, items: Vec<Value>) {
        *self.0.borrow_mut() = items;
    }

    /// Appends an element
    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    /// Runs `f` with mutable access to the elements
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Returns true when both handles refer to the same list
    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Elements rendered as text and joined with `separator`
    ///
    /// Nullish elements render empty, and so does a sequence reached again
    /// while it is being rendered or nested more than [`MAX_DEPTH`] deep.
    pub fn join_display(&self, separator: &str) -> String {
        self.join_within(separator, &mut Vec::new())
    }

    fn join_within(&self, separator: &str, open: &mut Vec<usize>) -> String {
        let id = self.id();
        if open.len() >= MAX_DEPTH || open.contains(&id) {
            return String::new();
        }
        open.push(id);
        let joined = self
            .snapshot()
            .iter()
            .map(|item| match item {
                Value::Undefined | Value::Null => String::new(),
                Value::Sequence(inner) => inner.join_within(",", open),
                other => other.to_display_string(),
            })
            .collect::<Vec<_>>()
            .join(separator);
        open.pop();
        joined
    }

    fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

/// Shared handle to an insertion-ordered record
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<IndexMap<String, Value>>>);

impl Object {
    /// Creates a new object owning `fields`
    pub fn new(fields: IndexMap<String, Value>) -> Self {
        Object(Rc::new(RefCell::new(fields)))
    }

    /// Clones the value stored under `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Stores `value` under `key`, keeping the original position of an existing key
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.0.borrow_mut().insert(key.into(), value);
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns true when there are no fields
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Copies the current fields out in insertion order
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns true when both handles refer to the same record
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

type CallbackFn = dyn Fn(&[Value]) -> Result<Value>;

/// Contract-supplied callable passed to sequence methods and `replace`
#[derive(Clone)]
pub struct Callback(Rc<CallbackFn>);

impl Callback {
    /// Wraps a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Callback(Rc::new(f))
    }

    /// Calls the closure
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }

    /// Returns true when both handles refer to the same closure
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Reads positional argument `index`, treating a missing one as `Undefined`
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    const UNDEFINED: &Value = &Value::Undefined;
    args.get(index).unwrap_or(UNDEFINED)
}

/// Reads an optional integer argument
///
/// Only `Int` and small `Integer` values are accepted; text is never coerced.
pub(crate) fn int_arg(args: &[Value], index: usize, what: &str) -> Result<Option<i64>> {
    match arg(args, index) {
        Value::Undefined => Ok(None),
        Value::Int(n) => Ok(Some(*n)),
        Value::Integer(i) => i
            .to_i64()
            .map(Some)
            .ok_or_else(|| ScriptError::Range(format!("{what} is out of range"))),
        other => Err(ScriptError::Type(format!(
            "{what} must be a number, got {}",
            other.type_name()
        ))),
    }
}

/// Converts a length or position to `i64`
pub(crate) fn len_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

/// Position counted from the end when negative, clamped to `0..=len`
pub(crate) fn relative(index: i64, len: usize) -> usize {
    let len = len_i64(len);
    let pos = if index < 0 {
        len.saturating_add(index).max(0)
    } else {
        index.min(len)
    };
    usize::try_from(pos).unwrap_or(0)
}

/// Position clamped to `0..=len`
pub(crate) fn clamp(index: i64, len: usize) -> usize {
    usize::try_from(index.clamp(0, len_i64(len))).unwrap_or(0)
}

/// Reads a required callback argument
pub(crate) fn callback_arg<'a>(args: &'a [Value], index: usize, what: &str) -> Result<&'a Callback> {
    match args.get(index) {
        Some(Value::Function(f)) => Ok(f),
        Some(other) => Err(ScriptError::Type(format!(
            "{} is not a function",
            other.to_display_string()
        ))),
        None => Err(ScriptError::Type(format!("{what} requires a callback"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_share_state() {
        let a = Sequence::new(vec![Value::Int(1)]);
        let b = a.clone();
        b.push(Value::Int(2));
        assert_eq!(a.len(), 2);
        assert!(Value::Sequence(a.clone()).strict_equals(&Value::Sequence(b)));
        assert!(!Value::Sequence(a).strict_equals(&Value::sequence(vec![Value::Int(1), Value::Int(2)])));
    }

    #[test]
    fn test_display_string() {
        let seq = Value::sequence(vec![Value::Int(1), Value::Null, Value::from("x")]);
        assert_eq!(seq.to_display_string(), "1,,x");
        assert_eq!(Value::Undefined.to_display_string(), "undefined");
        assert_eq!(Value::object(IndexMap::new()).to_display_string(), "[object Object]");
        let d: Decimal = "1.50".parse().unwrap();
        assert_eq!(Value::from(d).to_display_string(), "1.5");
    }

    #[test]
    fn test_debug_stops_at_cycles() {
        let obj = Object::default();
        obj.set("me", Value::Object(obj.clone()));
        obj.set("n", Value::Int(1));
        assert_eq!(format!("{:?}", Value::Object(obj)), r#"{"me": {..}, "n": Int(1)}"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::sequence(vec![]).is_truthy());
        assert!(!Value::from(Decimal::zero()).is_truthy());
    }

    #[test]
    fn test_option_into_null() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
    }

    #[test]
    fn test_int_arg() {
        let args = [Value::Int(3), Value::from("3"), Value::Integer(Integer::from(7i64))];
        assert_eq!(int_arg(&args, 0, "n").unwrap(), Some(3));
        assert!(matches!(int_arg(&args, 1, "n"), Err(ScriptError::Type(_))));
        assert_eq!(int_arg(&args, 2, "n").unwrap(), Some(7));
        assert_eq!(int_arg(&args, 5, "n").unwrap(), None);
    }
}
