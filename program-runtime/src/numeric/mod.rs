//! Deterministic numeric model
//!
//! Contracts never see binary floating point. Instead they get two immutable
//! value types, [`Decimal`] and [`Integer`], whose arithmetic is defined purely
//! in terms of base-10 digit manipulation so every node derives bit-identical
//! results from the same inputs.
//!
//! Both types are parsed from text only. Accepted grammar:
//!
//! ```text
//! integer := [+-]? digit+
//! decimal := [+-]? ( digit+ ( "." digit* )? | "." digit+ )
//! ```
//!
//! Exponents, whitespace, `NaN` and `Infinity` are rejected with
//! [`NumericError::Malformed`].

mod decimal;
mod integer;
mod magnitude;

pub use decimal::{Decimal, DIVISION_PLACES};
pub use integer::Integer;

use thiserror::Error;

/// Errors raised by numeric operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    /// Divisor of a divide or modulo was zero
    #[error("Division by zero")]
    DivideByZero,

    /// Input text is not a valid numeric literal for the requested variant
    #[error("Malformed {kind} literal: {text:?}")]
    Malformed {
        /// `"decimal"` or `"integer"`
        kind: &'static str,
        /// The rejected input
        text: String,
    },
}

/// Sign and digit groups of a parsed literal.
struct Literal<'a> {
    negative: bool,
    whole: &'a [u8],
    fraction: &'a [u8],
}

fn parse_literal<'a>(
    text: &'a str,
    kind: &'static str,
    allow_fraction: bool,
) -> Result<Literal<'a>, NumericError> {
    let malformed = || NumericError::Malformed {
        kind,
        text: text.to_string(),
    };

    let bytes = text.as_bytes();
    let (negative, body) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let (whole, fraction) = match body.iter().position(|b| *b == b'.') {
        Some(_) if !allow_fraction => return Err(malformed()),
        Some(dot) => (&body[..dot], &body[dot.saturating_add(1)..]),
        None => (body, &body[body.len()..]),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }
    if !whole.iter().chain(fraction.iter()).all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    Ok(Literal {
        negative,
        whole,
        fraction,
    })
}
