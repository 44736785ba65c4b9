use super::{magnitude::Magnitude, parse_literal, NumericError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{cmp::Ordering, fmt, str::FromStr};

/// Arbitrary precision signed integer
///
/// Division truncates toward zero and the remainder takes the sign of the
/// dividend, so `a == a.divide(b)? * b + a.modulo(b)?` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Integer {
    negative: bool,
    magnitude: Magnitude,
}

impl Integer {
    /// Parses an integer literal such as `"-1234500000"`.
    pub fn parse(text: &str) -> Result<Self, NumericError> {
        let literal = parse_literal(text, "integer", false)?;
        Ok(Self::from_parts(literal.negative, Magnitude::from_ascii(literal.whole)))
    }

    /// The value zero
    pub fn zero() -> Self {
        Self::from_parts(false, Magnitude::zero())
    }

    pub(crate) fn from_parts(negative: bool, magnitude: Magnitude) -> Self {
        Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        }
    }

    pub(crate) fn magnitude(&self) -> &Magnitude {
        &self.magnitude
    }

    /// Count of decimal digits (zero has none)
    pub fn digits(&self) -> usize {
        self.magnitude.len()
    }

    /// Sum of two integers
    pub fn add(&self, other: &Self) -> Self {
        let (negative, magnitude) =
            signed_add(self.negative, &self.magnitude, other.negative, &other.magnitude);
        Self::from_parts(negative, magnitude)
    }

    /// Difference of two integers
    pub fn subtract(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Product of two integers
    pub fn multiply(&self, other: &Self) -> Self {
        Self::from_parts(
            self.negative != other.negative,
            self.magnitude.mul(&other.magnitude),
        )
    }

    /// Quotient truncated toward zero
    pub fn divide(&self, other: &Self) -> Result<Self, NumericError> {
        if other.is_zero() {
            return Err(NumericError::DivideByZero);
        }
        let (quotient, _) = self.magnitude.div_rem(&other.magnitude);
        Ok(Self::from_parts(self.negative != other.negative, quotient))
    }

    /// Remainder of truncated division, signed like the dividend
    pub fn modulo(&self, other: &Self) -> Result<Self, NumericError> {
        if other.is_zero() {
            return Err(NumericError::DivideByZero);
        }
        let (_, remainder) = self.magnitude.div_rem(&other.magnitude);
        Ok(Self::from_parts(self.negative, remainder))
    }

    /// Raises to a non-negative power by repeated multiplication
    pub fn pow(&self, exponent: u32) -> Self {
        Self::from_parts(
            self.negative && exponent % 2 == 1,
            self.magnitude.pow(exponent),
        )
    }

    /// Additive inverse
    pub fn negate(&self) -> Self {
        Self::from_parts(!self.negative, self.magnitude.clone())
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

    /// Renders with exactly `places` zero fractional digits
    pub fn to_fixed(&self, places: usize) -> String {
        let mut text = self.to_string();
        if places > 0 {
            text.push('.');
            text.extend(std::iter::repeat('0').take(places));
        }
        text
    }

    /// Converts to `i64` when the value fits.
    pub fn to_i64(&self) -> Option<i64> {
        self.to_string().parse().ok()
    }
}

/// Adds two signed magnitudes, returning the sign and magnitude of the sum.
pub(crate) fn signed_add(
    a_negative: bool,
    a: &Magnitude,
    b_negative: bool,
    b: &Magnitude,
) -> (bool, Magnitude) {
    if a_negative == b_negative {
        return (a_negative, a.add(b));
    }
    match a.cmp(b) {
        Ordering::Less => (b_negative, b.sub(a)),
        _ => (a_negative, a.sub(b)),
    }
}

/// Orders two signed magnitudes.
pub(crate) fn signed_cmp(
    a_negative: bool,
    a: &Magnitude,
    b_negative: bool,
    b: &Magnitude,
) -> Ordering {
    match (a_negative, b_negative) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (false, false) => a.cmp(b),
        (true, true) => b.cmp(a),
    }
}

impl Ord for Integer {
    fn cmp(&self, other: &Self) -> Ordering {
        signed_cmp(self.negative, &self.magnitude, other.negative, &other.magnitude)
    }
}

impl PartialOrd for Integer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Integer {
    fn from(value: i64) -> Self {
        Self::from_parts(value < 0, Magnitude::from_u64(value.unsigned_abs()))
    }
}

impl From<u64> for Integer {
    fn from(value: u64) -> Self {
        Self::from_parts(false, Magnitude::from_u64(value))
    }
}

impl FromStr for Integer {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str(&self.magnitude.to_ascii())
    }
}

impl Serialize for Integer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn int(s: &str) -> Integer {
        Integer::parse(s).unwrap()
    }

    #[test]
    fn test_subtract_is_exact() {
        assert_eq!(int("1234500000").subtract(&int("680")), int("1234499320"));
    }

    #[test]
    fn test_arithmetic_beyond_64_bits() {
        let number = int("1234500000");
        assert_eq!(number.multiply(&int("12")).to_string(), "14814000000");
        assert_eq!(number.divide(&int("12")).unwrap().to_string(), "102875000");
        assert_eq!(number.modulo(&int("12")).unwrap().to_string(), "0");
        assert_eq!(number.pow(2).to_string(), "1523990250000000000");
        assert_eq!(int("9223372036854775807").add(&int("1")).to_string(), "9223372036854775808");
    }

    #[rstest]
    #[case("7", "2", "3", "1")]
    #[case("-7", "2", "-3", "-1")]
    #[case("7", "-2", "-3", "1")]
    #[case("-7", "-2", "3", "-1")]
    fn test_truncated_division(
        #[case] a: &str,
        #[case] b: &str,
        #[case] quotient: &str,
        #[case] remainder: &str,
    ) {
        assert_eq!(int(a).divide(&int(b)).unwrap().to_string(), quotient);
        assert_eq!(int(a).modulo(&int(b)).unwrap().to_string(), remainder);
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(int("5").divide(&int("0")), Err(NumericError::DivideByZero));
        assert_eq!(int("5").modulo(&int("-0")), Err(NumericError::DivideByZero));
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("1.5")]
    #[case("1e3")]
    #[case(" 1")]
    #[case("0x10")]
    fn test_malformed(#[case] text: &str) {
        assert!(matches!(Integer::parse(text), Err(NumericError::Malformed { .. })));
    }

    #[test]
    fn test_sign_predicates() {
        assert!(int("-0").is_zero());
        assert!(!int("-0").is_negative());
        assert_eq!(int("-0").to_string(), "0");
        assert!(int("3").is_positive());
        assert!(int("-3").is_negative());
        assert_eq!(int("3").negate(), int("-3"));
        assert_eq!(int("-2").pow(3), int("-8"));
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(int("0").digits(), 0);
        assert_eq!(int("-1234500000").digits(), 10);
    }

    #[test]
    fn test_comparisons() {
        assert!(int("-10").less_than(&int("2")));
        assert!(int("10").greater_than(&int("9")));
        assert!(int("10").greater_or_equal(&int("10")));
        assert!(int("-11").less_or_equal(&int("-10")));
        assert!(int("+42").equals(&int("42")));
    }

    #[test]
    fn test_to_fixed_and_i64() {
        assert_eq!(int("12").to_fixed(2), "12.00");
        assert_eq!(int("-12").to_fixed(0), "-12");
        assert_eq!(int("-12").to_i64(), Some(-12));
        assert_eq!(int("99999999999999999999").to_i64(), None);
    }
}
