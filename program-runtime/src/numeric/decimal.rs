use super::{
    integer::{signed_add, signed_cmp},
    magnitude::Magnitude,
    parse_literal, Integer, NumericError,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{cmp::Ordering, fmt, str::FromStr};

/// Fractional digits kept by [`Decimal::divide`].
///
/// Quotients are rounded half away from zero at this position, then trailing
/// zeros are stripped.
pub const DIVISION_PLACES: usize = 20;

/// Arbitrary precision signed decimal
///
/// Stored as `±magnitude / 10^scale` with the smallest scale that represents
/// the value exactly, so equal values always share one representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    magnitude: Magnitude,
    scale: usize,
}

impl Decimal {
    /// Parses a decimal literal such as `"12345.6789"`.
    pub fn parse(text: &str) -> Result<Self, NumericError> {
        let literal = parse_literal(text, "decimal", true)?;
        let mut ascii = literal.whole.to_vec();
        ascii.extend_from_slice(literal.fraction);
        Ok(Self::normalized(
            literal.negative,
            Magnitude::from_ascii(&ascii),
            literal.fraction.len(),
        ))
    }

    /// The value zero
    pub fn zero() -> Self {
        Self::normalized(false, Magnitude::zero(), 0)
    }

    fn normalized(negative: bool, magnitude: Magnitude, scale: usize) -> Self {
        if magnitude.is_zero() {
            return Self {
                negative: false,
                magnitude,
                scale: 0,
            };
        }
        let strip = magnitude.trailing_zeros().min(scale);
        let magnitude = magnitude.shr(strip);
        Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
            scale: scale.saturating_sub(strip),
        }
    }

    /// Both magnitudes rescaled to the larger of the two scales.
    fn aligned(&self, other: &Self) -> (Magnitude, Magnitude, usize) {
        let scale = self.scale.max(other.scale);
        (
            self.magnitude.shl(scale.saturating_sub(self.scale)),
            other.magnitude.shl(scale.saturating_sub(other.scale)),
            scale,
        )
    }

    /// Sum of two decimals
    pub fn add(&self, other: &Self) -> Self {
        let (a, b, scale) = self.aligned(other);
        let (negative, magnitude) = signed_add(self.negative, &a, other.negative, &b);
        Self::normalized(negative, magnitude, scale)
    }

    /// Difference of two decimals
    pub fn subtract(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Exact product
    pub fn multiply(&self, other: &Self) -> Self {
        Self::normalized(
            self.negative != other.negative,
            self.magnitude.mul(&other.magnitude),
            self.scale.saturating_add(other.scale),
        )
    }

    /// Quotient rounded half away from zero to [`DIVISION_PLACES`] digits
    pub fn divide(&self, other: &Self) -> Result<Self, NumericError> {
        if other.is_zero() {
            return Err(NumericError::DivideByZero);
        }
        // a / b == (ma * 10^sb) / (mb * 10^sa); scaled up by 10^places first.
        let numerator = self
            .magnitude
            .shl(DIVISION_PLACES.saturating_add(other.scale));
        let denominator = other.magnitude.shl(self.scale);
        let (mut quotient, remainder) = numerator.div_rem(&denominator);
        if Magnitude::rounds_up(&remainder, &denominator) {
            quotient = quotient.add(&Magnitude::one());
        }
        Ok(Self::normalized(
            self.negative != other.negative,
            quotient,
            DIVISION_PLACES,
        ))
    }

    /// Remainder of truncated division, signed like the dividend
    pub fn modulo(&self, other: &Self) -> Result<Self, NumericError> {
        if other.is_zero() {
            return Err(NumericError::DivideByZero);
        }
        let (a, b, scale) = self.aligned(other);
        let (_, remainder) = a.div_rem(&b);
        Ok(Self::normalized(self.negative, remainder, scale))
    }

    /// Raises to a non-negative power by repeated multiplication
    pub fn pow(&self, exponent: u32) -> Self {
        Self::normalized(
            self.negative && exponent % 2 == 1,
            self.magnitude.pow(exponent),
            self.scale.saturating_mul(exponent as usize),
        )
    }

    /// Additive inverse
    pub fn negate(&self) -> Self {
        Self::normalized(!self.negative, self.magnitude.clone(), self.scale)
    }

    /// `true` for zero
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    /// `true` when strictly greater than zero
    pub fn is_positive(&self) -> bool {
        !self.negative && !self.is_zero()
    }

    /// `true` when strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Equality
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }

    /// `self > other`
    pub fn greater_than(&self, other: &Self) -> bool {
        self > other
    }

    /// `self >= other`
    pub fn greater_or_equal(&self, other: &Self) -> bool {
        self >= other
    }

    /// `self < other`
    pub fn less_than(&self, other: &Self) -> bool {
        self < other
    }

    /// `self <= other`
    pub fn less_or_equal(&self, other: &Self) -> bool {
        self <= other
    }

    /// Renders with exactly `places` fractional digits, rounding half away
    /// from zero. A result that rounds to zero never carries a minus sign.
    pub fn to_fixed(&self, places: usize) -> String {
        if self.scale <= places {
            return render(self.negative, &self.magnitude, self.scale, places);
        }
        let dropped = self.scale.saturating_sub(places);
        let divisor = Magnitude::one().shl(dropped);
        let (mut kept, remainder) = self.magnitude.div_rem(&divisor);
        if Magnitude::rounds_up(&remainder, &divisor) {
            kept = kept.add(&Magnitude::one());
        }
        render(self.negative && !kept.is_zero(), &kept, places, places)
    }

    /// Number of fractional digits in the canonical representation
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Count of significant digits, fractional ones included (zero has none)
    pub fn digits(&self) -> usize {
        self.magnitude.len()
    }
}

/// Formats `±magnitude / 10^scale` padded to `places` fractional digits.
fn render(negative: bool, magnitude: &Magnitude, scale: usize, places: usize) -> String {
    let mut digits = magnitude.to_ascii();
    if digits.len() <= scale {
        let pad = scale.saturating_add(1).saturating_sub(digits.len());
        digits.insert_str(0, &"0".repeat(pad));
    }
    let split = digits.len().saturating_sub(scale);
    let mut text = String::with_capacity(digits.len().saturating_add(places).saturating_add(2));
    if negative {
        text.push('-');
    }
    text.push_str(&digits[..split]);
    if places > 0 {
        text.push('.');
        text.push_str(&digits[split..]);
        text.push_str(&"0".repeat(places.saturating_sub(scale)));
    }
    text
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = self.aligned(other);
        signed_cmp(self.negative, &a, other.negative, &b)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&Integer> for Decimal {
    fn from(value: &Integer) -> Self {
        Self::normalized(value.is_negative(), value.magnitude().clone(), 0)
    }
}

impl From<Integer> for Decimal {
    fn from(value: Integer) -> Self {
        Self::from(&value)
    }
}

impl FromStr for Decimal {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self.negative, &self.magnitude, self.scale, self.scale))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}
