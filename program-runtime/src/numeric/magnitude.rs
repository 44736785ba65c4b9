//! Unsigned base-10 magnitudes.
//!
//! Digits are stored least significant first with no leading zeros, so the
//! empty vector is zero. Every operation here is plain schoolbook decimal
//! arithmetic: no binary floating point is involved anywhere.

// Digit loops only ever produce values in 0..=99 before carrying.
#![allow(clippy::arithmetic_side_effects)]

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct Magnitude {
    digits: Vec<u8>,
}

impl Magnitude {
    pub(crate) fn zero() -> Self {
        Self { digits: Vec::new() }
    }

    pub(crate) fn one() -> Self {
        Self { digits: vec![1] }
    }

    /// Builds a magnitude from ASCII digits, most significant first.
    /// The caller guarantees every byte is `b'0'..=b'9'`.
    pub(crate) fn from_ascii(ascii: &[u8]) -> Self {
        let digits = ascii.iter().rev().map(|b| b - b'0').collect();
        Self::normalized(digits)
    }

    pub(crate) fn from_u64(mut value: u64) -> Self {
        let mut digits = Vec::new();
        while value > 0 {
            digits.push((value % 10) as u8);
            value /= 10;
        }
        Self { digits }
    }

    fn normalized(mut digits: Vec<u8>) -> Self {
        while digits.last() == Some(&0) {
            digits.pop();
        }
        Self { digits }
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Number of significant digits (zero has none).
    pub(crate) fn len(&self) -> usize {
        self.digits.len()
    }

    /// Count of trailing decimal zeros.
    pub(crate) fn trailing_zeros(&self) -> usize {
        self.digits.iter().take_while(|d| **d == 0).count()
    }

    /// Multiplies by `10^places`.
    pub(crate) fn shl(&self, places: usize) -> Self {
        if self.is_zero() || places == 0 {
            return self.clone();
        }
        let mut digits = vec![0; places];
        digits.extend_from_slice(&self.digits);
        Self { digits }
    }

    /// Divides by `10^places`, discarding the remainder.
    pub(crate) fn shr(&self, places: usize) -> Self {
        if places >= self.digits.len() {
            return Self::zero();
        }
        Self {
            digits: self.digits[places..].to_vec(),
        }
    }

    pub(crate) fn add(&self, other: &Self) -> Self {
        let len = self.digits.len().max(other.digits.len());
        let mut digits = Vec::with_capacity(len + 1);
        let mut carry = 0u8;
        for i in 0..len {
            let a = self.digits.get(i).copied().unwrap_or(0);
            let b = other.digits.get(i).copied().unwrap_or(0);
            let sum = a + b + carry;
            digits.push(sum % 10);
            carry = sum / 10;
        }
        if carry > 0 {
            digits.push(carry);
        }
        Self::normalized(digits)
    }

    /// `self - other`; the caller guarantees `self >= other`.
    pub(crate) fn sub(&self, other: &Self) -> Self {
        debug_assert!(*self >= *other);
        let mut digits = Vec::with_capacity(self.digits.len());
        let mut borrow = 0u8;
        for (i, a) in self.digits.iter().enumerate() {
            let b = other.digits.get(i).copied().unwrap_or(0) + borrow;
            if *a >= b {
                digits.push(a - b);
                borrow = 0;
            } else {
                digits.push(a + 10 - b);
                borrow = 1;
            }
        }
        Self::normalized(digits)
    }

    pub(crate) fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let mut acc = vec![0u32; self.digits.len() + other.digits.len()];
        for (i, a) in self.digits.iter().enumerate() {
            for (j, b) in other.digits.iter().enumerate() {
                acc[i + j] += u32::from(*a) * u32::from(*b);
            }
        }
        let mut digits = Vec::with_capacity(acc.len() + 1);
        let mut carry = 0u32;
        for cell in acc {
            let value = cell + carry;
            digits.push((value % 10) as u8);
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
        Self::normalized(digits)
    }

    /// Long division. The caller guarantees `divisor` is non-zero.
    pub(crate) fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        debug_assert!(!divisor.is_zero());
        if *self < *divisor {
            return (Self::zero(), self.clone());
        }
        let mut quotient = vec![0u8; self.digits.len()];
        let mut remainder = Self::zero();
        for (i, digit) in self.digits.iter().enumerate().rev() {
            remainder = remainder.shl(1).add(&Self::from_u64(u64::from(*digit)));
            let mut count = 0u8;
            while remainder >= *divisor {
                remainder = remainder.sub(divisor);
                count += 1;
            }
            quotient[i] = count;
        }
        (Self::normalized(quotient), remainder)
    }

    pub(crate) fn pow(&self, mut exponent: u32) -> Self {
        let mut result = Self::one();
        let mut base = self.clone();
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.mul(&base);
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.mul(&base);
            }
        }
        result
    }

    /// `true` when `remainder` is at least half of `divisor`.
    pub(crate) fn rounds_up(remainder: &Self, divisor: &Self) -> bool {
        remainder.add(remainder) >= *divisor
    }

    /// Renders the digits most significant first, `"0"` for zero.
    pub(crate) fn to_ascii(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        self.digits.iter().rev().map(|d| char::from(b'0' + d)).collect()
    }
}

impl Ord for Magnitude {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.iter().rev().cmp(other.digits.iter().rev()))
    }
}

impl PartialOrd for Magnitude {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Magnitude {
        Magnitude::from_ascii(s.as_bytes())
    }

    #[test]
    fn test_leading_zeros_are_dropped() {
        assert_eq!(m("000120").to_ascii(), "120");
        assert!(m("0000").is_zero());
        assert_eq!(m("0").to_ascii(), "0");
    }

    #[test]
    fn test_add_and_sub_carry() {
        assert_eq!(m("999").add(&m("1")).to_ascii(), "1000");
        assert_eq!(m("1000").sub(&m("1")).to_ascii(), "999");
        assert_eq!(m("1234500000").sub(&m("680")).to_ascii(), "1234499320");
    }

    #[test]
    fn test_mul() {
        assert_eq!(m("12345").mul(&m("6789")).to_ascii(), "83810205");
        assert_eq!(m("0").mul(&m("6789")).to_ascii(), "0");
    }

    #[test]
    fn test_div_rem() {
        let (q, r) = m("1234500000").div_rem(&m("12"));
        assert_eq!(q.to_ascii(), "102875000");
        assert_eq!(r.to_ascii(), "0");

        let (q, r) = m("100").div_rem(&m("7"));
        assert_eq!(q.to_ascii(), "14");
        assert_eq!(r.to_ascii(), "2");

        let (q, r) = m("5").div_rem(&m("70"));
        assert!(q.is_zero());
        assert_eq!(r.to_ascii(), "5");
    }

    #[test]
    fn test_pow() {
        assert_eq!(m("2").pow(64).to_ascii(), "18446744073709551616");
        assert_eq!(m("7").pow(0).to_ascii(), "1");
    }

    #[test]
    fn test_ordering() {
        assert!(m("99") < m("100"));
        assert!(m("120") > m("119"));
        assert_eq!(m("042").cmp(&m("42")), Ordering::Equal);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(m("12").shl(3).to_ascii(), "12000");
        assert_eq!(m("12345").shr(2).to_ascii(), "123");
        assert!(m("12").shr(5).is_zero());
        assert_eq!(m("1200").trailing_zeros(), 2);
    }
}
