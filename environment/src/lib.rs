//! TOS Sandbox Environment
//!
//! The capability-restricted global environment contract code runs in.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Isolate<C>                           │
//! │   harden(installer) ── once ──► Arc<GlobalEnvironment>   │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │
//! ┌───────────────────────────▼──────────────────────────────┐
//! │                 GlobalEnvironment<C>                     │
//! │  globals:    String, Array, Decimal, Integer, JSON,      │
//! │              host namespaces, inert denied names         │
//! │  prototypes: text, sequence, decimal, integer tables     │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │ PassThrough (CallHook seam)
//! ┌───────────────────────────▼──────────────────────────────┐
//! │  primitives: text, sequence, numeric, json, host natives │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Contract code only ever sees a [`Scope`]: names resolve against the
//! frozen environment and the invocation context `C` is reachable only
//! through host-registered natives.
//!
//! # Example
//!
//! ```
//! use tos_sandbox_environment::{Isolate, Scope, Value};
//!
//! let isolate = Isolate::<()>::new();
//! let env = isolate.harden(|_| Ok(())).unwrap();
//! let mut ctx = ();
//! let mut scope = Scope::new(&env, &mut ctx);
//!
//! let price = scope.decimal("12345.6789").unwrap();
//! let total = scope.invoke(&price, "minus", &[Value::from("100")]).unwrap();
//! assert_eq!(total.to_display_string(), "12245.6789");
//!
//! assert!(scope.call("Math", &[]).is_err());
//! ```

#![warn(missing_docs)]

/// Generates `native::<C>(name)`, the lookup from a prototype method name to
/// its unwrapped primitive, for a module whose primitives take a typed
/// receiver produced by `$receiver`.
macro_rules! natives {
    ($receiver:ident; $($name:literal => $func:ident),* $(,)?) => {
        /// Unwrapped primitive registered under `name`
        pub(crate) fn native<C>(name: &str) -> Option<NativeFn<C>> {
            let native: NativeFn<C> = match name {
                $(
                    $name => |_ctx: &mut C, this: &Value, args: &[Value]| -> Result<Value> {
                        $func($receiver(this, $name)?, args)
                    },
                )*
                _ => return None,
            };
            Some(native)
        }
    };
}

pub mod adapter;
pub mod capability;
pub mod error;
pub mod global;
pub mod isolate;
pub mod json;
pub mod numeric;
pub mod sequence;
pub mod text;
pub mod value;

pub use adapter::{CallHook, NativeFn, PassThrough, TraceHook};
pub use capability::{Capability, CapabilityTable, Family};
pub use error::{ErrorCategory, Result, ScriptError};
pub use global::{Binding, EnvironmentBuilder, GlobalEnvironment, Member, Namespace, Scope};
pub use isolate::Isolate;
pub use value::{Callback, Object, Sequence, Value};

// Re-export the numeric model so contracts need a single import
pub use tos_sandbox_runtime::{Decimal, Integer};

#[cfg(test)]
mod fidelity_tests {
    //! Calling an allowed method through the environment must give exactly
    //! what calling the primitive directly gives.

    use std::sync::Arc;

    use crate::adapter::TraceHook;
    use crate::capability::Family;
    use crate::global::EnvironmentBuilder;
    use crate::value::Value;
    use crate::{json, numeric, sequence, text};

    fn environment() -> crate::GlobalEnvironment<()> {
        EnvironmentBuilder::new(Arc::new(TraceHook)).build()
    }

    fn text_corpus() -> Vec<Vec<Value>> {
        vec![
            vec![],
            vec![Value::from("l")],
            vec![Value::from("l"), Value::Int(3)],
            vec![Value::from("o"), Value::Int(-2)],
            vec![Value::Int(1), Value::Int(3)],
            vec![Value::Int(-3)],
            vec![Value::from(""), Value::Int(2)],
            vec![Value::from("ll"), Value::from("LL")],
            vec![Value::Int(2)],
        ]
    }

    fn sequence_corpus() -> Vec<Vec<Value>> {
        let double = Value::function(|args: &[Value]| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
        });
        let odd = Value::function(|args: &[Value]| {
            Ok(Value::Bool(args[0].as_int().unwrap_or(0) % 2 == 1))
        });
        let desc = Value::function(|args: &[Value]| {
            Ok(Value::Int(args[1].as_int().unwrap_or(0) - args[0].as_int().unwrap_or(0)))
        });
        vec![
            vec![],
            vec![Value::Int(2)],
            vec![Value::Int(1), Value::Int(-1)],
            vec![Value::Int(1), Value::Int(1), Value::Int(9)],
            vec![Value::from("-")],
            vec![double],
            vec![odd],
            vec![desc],
        ]
    }

    fn fresh_sequence() -> Value {
        Value::sequence(vec![Value::Int(3), Value::Int(1), Value::Int(2), Value::Int(1)])
    }

    /// Renders results so fresh containers compare by content
    fn render(result: crate::Result<Value>) -> String {
        match result {
            Ok(value) => format!("ok {:?}", value),
            Err(err) => format!("err {}", err),
        }
    }

    #[test]
    fn test_text_pass_through_fidelity() {
        let env = environment();
        let table = env.capabilities(Family::Text).unwrap();
        for name in table.allowed() {
            let direct = text::native::<()>(name).unwrap();
            for args in text_corpus() {
                let receiver = Value::from("hello world");
                let wrapped = env.invoke(&mut (), &receiver, name, &args);
                let unwrapped = direct(&mut (), &receiver, &args);
                assert_eq!(render(wrapped), render(unwrapped), "{name} {args:?}");
            }
        }
    }

    #[test]
    fn test_sequence_pass_through_fidelity() {
        let env = environment();
        let table = env.capabilities(Family::Sequence).unwrap();
        for name in table.allowed() {
            let direct = sequence::native::<()>(name).unwrap();
            for args in sequence_corpus() {
                let left = fresh_sequence();
                let right = fresh_sequence();
                let wrapped = env.invoke(&mut (), &left, name, &args);
                let unwrapped = direct(&mut (), &right, &args);
                assert_eq!(render(wrapped), render(unwrapped), "{name} {args:?}");
                assert_eq!(format!("{left:?}"), format!("{right:?}"), "{name} receiver");
            }
        }
    }

    #[test]
    fn test_numeric_pass_through_fidelity() {
        let env = environment();
        let decimal = Value::Decimal("12345.6789".parse().unwrap());
        let integer = Value::Integer("1234500000".parse().unwrap());
        let corpus = [
            vec![],
            vec![Value::from("100")],
            vec![Value::Int(0)],
            vec![Value::Int(2)],
            vec![Value::from("-3")],
        ];
        for (receiver, family) in [(decimal, Family::Decimal), (integer, Family::Integer)] {
            let table = env.capabilities(family).unwrap();
            for name in table.allowed() {
                let direct = match family {
                    Family::Decimal => numeric::decimal::native::<()>(name),
                    _ => numeric::integer::native::<()>(name),
                }
                .unwrap();
                for args in &corpus {
                    let wrapped = env.invoke(&mut (), &receiver, name, args);
                    let unwrapped = direct(&mut (), &receiver, args);
                    assert_eq!(render(wrapped), render(unwrapped), "{family}.{name}");
                }
            }
        }
    }

    #[test]
    fn test_json_pass_through_fidelity() {
        let env = environment();
        let corpus = [
            vec![Value::from(r#"{"a":[1,2.5,"x"],"b":null}"#)],
            vec![Value::from("not json")],
            vec![Value::sequence(vec![Value::Int(1), Value::Undefined])],
        ];
        for name in ["parse", "stringify"] {
            let direct = json::native::<()>(name).unwrap();
            for args in &corpus {
                let wrapped = env.call_method(&mut (), "JSON", name, args);
                let unwrapped = direct(&mut (), &Value::Undefined, args);
                assert_eq!(render(wrapped), render(unwrapped), "JSON.{name}");
            }
        }
    }
}
