//! Capability tables
//!
//! Every method name of the engine's default text and sequence prototypes is
//! listed here. A name is either allow-listed (bound to a pass-through
//! adapter) or denied (bound to an inert value). Names not listed at all are
//! simply absent from the environment. Tables are built once and never
//! change afterwards.

use std::collections::BTreeMap;
use std::fmt;

/// Prototype family a receiver dispatches through
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    /// Text values
    Text,
    /// Sequence values
    Sequence,
    /// Arbitrary precision decimals
    Decimal,
    /// Arbitrary precision integers
    Integer,
}

impl Family {
    /// Constructor name the family's prototype hangs off
    pub fn constructor_name(self) -> &'static str {
        match self {
            Family::Text => "String",
            Family::Sequence => "Array",
            Family::Decimal => "Decimal",
            Family::Integer => "Integer",
        }
    }

    /// Fully qualified name of a prototype method, e.g. `String.prototype.slice`
    pub fn qualify(self, method: &str) -> String {
        format!("{}.prototype.{}", self.constructor_name(), method)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.constructor_name())
    }
}

/// Whether a prototype method may be called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Bound to a pass-through adapter
    Allowed,
    /// Bound to an inert value
    Denied,
}

/// Own method names of the default text prototype
pub const TEXT_PROTOTYPE: &[&str] = &[
    "anchor",
    "at",
    "big",
    "blink",
    "bold",
    "charAt",
    "charCodeAt",
    "codePointAt",
    "concat",
    "constructor",
    "endsWith",
    "fixed",
    "fontcolor",
    "fontsize",
    "includes",
    "indexOf",
    "isWellFormed",
    "italics",
    "lastIndexOf",
    "length",
    "link",
    "localeCompare",
    "match",
    "matchAll",
    "normalize",
    "padEnd",
    "padStart",
    "repeat",
    "replace",
    "replaceAll",
    "search",
    "slice",
    "small",
    "split",
    "startsWith",
    "strike",
    "sub",
    "substr",
    "substring",
    "sup",
    "toLocaleLowerCase",
    "toLocaleUpperCase",
    "toLowerCase",
    "toString",
    "toUpperCase",
    "toWellFormed",
    "trim",
    "trimEnd",
    "trimLeft",
    "trimRight",
    "trimStart",
    "valueOf",
];

/// Text methods contract code may call
pub const TEXT_ALLOWED: &[&str] = &[
    "charCodeAt",
    "length",
    "constructor",
    "toString",
    "valueOf",
    "concat",
    "includes",
    "endsWith",
    "indexOf",
    "lastIndexOf",
    "replace",
    "search",
    "split",
    "startsWith",
    "slice",
    "substring",
    "toLowerCase",
    "toUpperCase",
    "trim",
    "trimLeft",
    "trimRight",
    "repeat",
];

/// Own method names of the default sequence prototype
///
/// `length` is an instance property of every sequence, not a prototype method.
pub const SEQUENCE_PROTOTYPE: &[&str] = &[
    "at",
    "concat",
    "constructor",
    "copyWithin",
    "entries",
    "every",
    "fill",
    "filter",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "flat",
    "flatMap",
    "forEach",
    "includes",
    "indexOf",
    "join",
    "keys",
    "lastIndexOf",
    "map",
    "pop",
    "push",
    "reduce",
    "reduceRight",
    "reverse",
    "shift",
    "slice",
    "some",
    "sort",
    "splice",
    "toLocaleString",
    "toReversed",
    "toSorted",
    "toSpliced",
    "toString",
    "unshift",
    "values",
    "with",
];

/// Sequence methods contract code may call
pub const SEQUENCE_ALLOWED: &[&str] = &[
    "constructor",
    "toString",
    "concat",
    "every",
    "filter",
    "find",
    "findIndex",
    "forEach",
    "includes",
    "indexOf",
    "join",
    "keys",
    "lastIndexOf",
    "map",
    "pop",
    "push",
    "reverse",
    "shift",
    "slice",
    "sort",
    "splice",
    "unshift",
];

/// Methods shared by both numeric families; all of them are allowed
pub const NUMERIC_METHODS: &[&str] = &[
    "plus",
    "minus",
    "multi",
    "div",
    "mod",
    "pow",
    "eq",
    "gt",
    "gte",
    "lt",
    "lte",
    "negated",
    "isZero",
    "isPositive",
    "isNegative",
    "toString",
    "toFixed",
];

/// Methods of the `JSON` namespace, each wrapped pass-through
pub const JSON_METHODS: &[&str] = &["parse", "stringify"];

/// Global names bound to an inert value
pub const DENIED_GLOBALS: &[&str] = &[
    // eval-adjacent parsers and dynamic code
    "eval",
    "Function",
    "parseFloat",
    "parseInt",
    "Number",
    "BigInt",
    "Boolean",
    // URI codec
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "escape",
    "unescape",
    // native errors
    "Error",
    "EvalError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "URIError",
    "AggregateError",
    // time, randomness, text matching
    "Date",
    "Math",
    "RegExp",
    "Intl",
    // typed and raw memory
    "ArrayBuffer",
    "SharedArrayBuffer",
    "DataView",
    "Int8Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "Int16Array",
    "Uint16Array",
    "Int32Array",
    "Uint32Array",
    "Float32Array",
    "Float64Array",
    "BigInt64Array",
    "BigUint64Array",
    // keyed and weak collections
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "WeakRef",
    "FinalizationRegistry",
    // concurrency and cloning
    "Atomics",
    "structuredClone",
    // async control
    "Promise",
    "Generator",
    "GeneratorFunction",
    "AsyncFunction",
    "AsyncGeneratorFunction",
    "setTimeout",
    "setInterval",
    "setImmediate",
    "queueMicrotask",
    // reflection
    "Reflect",
    "Proxy",
    "WebAssembly",
];

/// Allowed/denied mapping for one prototype family
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    family: Family,
    entries: BTreeMap<&'static str, Capability>,
}

impl CapabilityTable {
    /// Marks every prototype name as allowed or denied
    ///
    /// Allowed names that are not on the prototype are ignored so the allow
    /// list can never add surface the engine does not have.
    pub fn build(family: Family, prototype: &[&'static str], allowed: &[&str]) -> Self {
        let entries = prototype
            .iter()
            .map(|name| {
                let capability = if allowed.contains(name) {
                    Capability::Allowed
                } else {
                    Capability::Denied
                };
                (*name, capability)
            })
            .collect();
        Self { family, entries }
    }

    /// Table for text receivers
    pub fn text() -> Self {
        Self::build(Family::Text, TEXT_PROTOTYPE, TEXT_ALLOWED)
    }

    /// Table for sequence receivers
    pub fn sequence() -> Self {
        Self::build(Family::Sequence, SEQUENCE_PROTOTYPE, SEQUENCE_ALLOWED)
    }

    /// Table for one of the numeric families
    pub fn numeric(family: Family) -> Self {
        Self::build(family, NUMERIC_METHODS, NUMERIC_METHODS)
    }

    /// Family this table governs
    pub fn family(&self) -> Family {
        self.family
    }

    /// Looks up a method name; `None` when the prototype has no such name
    pub fn capability(&self, name: &str) -> Option<Capability> {
        self.entries.get(name).copied()
    }

    /// Allowed names in lexical order
    pub fn allowed(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names(Capability::Allowed)
    }

    /// Denied names in lexical order
    pub fn denied(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names(Capability::Denied)
    }

    fn names(&self, wanted: Capability) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(move |(_, c)| **c == wanted)
            .map(|(name, _)| *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_lists_are_on_prototypes() {
        for name in TEXT_ALLOWED {
            assert!(TEXT_PROTOTYPE.contains(name), "{name} missing from text prototype");
        }
        for name in SEQUENCE_ALLOWED {
            assert!(
                SEQUENCE_PROTOTYPE.contains(name),
                "{name} missing from sequence prototype"
            );
        }
    }

    #[test]
    fn test_text_table() {
        let table = CapabilityTable::text();
        assert_eq!(table.allowed().count(), TEXT_ALLOWED.len());
        assert_eq!(table.capability("slice"), Some(Capability::Allowed));
        assert_eq!(table.capability("match"), Some(Capability::Denied));
        assert_eq!(table.capability("padStart"), Some(Capability::Denied));
        assert_eq!(table.capability("nonexistent"), None);
    }

    #[test]
    fn test_sequence_table() {
        let table = CapabilityTable::sequence();
        assert_eq!(table.allowed().count(), SEQUENCE_ALLOWED.len());
        assert_eq!(table.capability("reduce"), Some(Capability::Denied));
        assert_eq!(table.capability("some"), Some(Capability::Denied));
        assert_eq!(table.capability("sort"), Some(Capability::Allowed));
        assert!(table.denied().all(|name| !SEQUENCE_ALLOWED.contains(&name)));
    }

    #[test]
    fn test_numeric_tables_allow_everything() {
        let table = CapabilityTable::numeric(Family::Decimal);
        assert_eq!(table.denied().count(), 0);
        assert_eq!(table.family(), Family::Decimal);
    }

    #[test]
    fn test_denied_globals_are_unique() {
        let mut names = DENIED_GLOBALS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DENIED_GLOBALS.len());
        assert_eq!(Family::Text.qualify("match"), "String.prototype.match");
    }
}
