//! Fixed-point decimal with 18 fractional digits.
//!
//! Reward factors, reward indexes and vesting fractions are all [`Dec`]
//! values. The representation is an unsigned `u128` scaled by `10^18`, so
//! every value is non-negative and every operation is exact up to the final
//! truncation. Division and integer multiplication always round toward zero,
//! which guarantees that the sum of paid rewards never exceeds the emission
//! they were derived from.
//!
//! ## Encoding
//!
//! The canonical string form always carries all 18 fractional digits:
//!
//! ```text
//! 1.5  ->  "1.500000000000000000"
//! ```
//!
//! Serde uses the canonical string, which also keeps the SQLite column
//! lossless.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError};

/// Number of fractional decimal digits.
pub const DEC_PRECISION: u32 = 18;

/// `10^DEC_PRECISION`.
const SCALE: u128 = 10u128.pow(DEC_PRECISION);

/// Non-negative fixed-point decimal.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dec(u128);

impl Dec {
    /// The value `0`.
    pub const ZERO: Dec = Dec(0);

    /// The value `1`.
    pub const ONE: Dec = Dec(SCALE);

    /// Build a decimal from its scaled representation.
    pub const fn from_raw(raw: u128) -> Self {
        Dec(raw)
    }

    /// The scaled representation (`value * 10^18`).
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Whether the value is exactly zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Convert an integer.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Overflow`] if `n * 10^18` does not fit in `u128`
    pub fn from_int(n: u128) -> Result<Self> {
        n.checked_mul(SCALE).map(Dec).ok_or(TypesError::Overflow)
    }

    /// `numerator / denominator`, truncated at the 18th fractional digit.
    ///
    /// Uses schoolbook long division on the remainder so the numerator is
    /// never pre-scaled and cannot overflow for large amounts.
    ///
    /// # Errors
    ///
    /// - [`TypesError::DivisionByZero`] if `denominator` is zero
    /// - [`TypesError::Overflow`] if the integer part exceeds the representable range
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self> {
        if denominator == 0 {
            return Err(TypesError::DivisionByZero);
        }
        let whole = numerator / denominator;
        let mut rem = numerator % denominator;
        let mut frac: u128 = 0;
        for _ in 0..DEC_PRECISION {
            rem = rem.checked_mul(10).ok_or(TypesError::Overflow)?;
            frac = frac * 10 + rem / denominator;
            rem %= denominator;
        }
        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .map(Dec)
            .ok_or(TypesError::Overflow)
    }

    /// Checked addition.
    pub fn checked_add(self, other: Dec) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Dec)
            .ok_or(TypesError::Overflow)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Underflow`] if `other > self`
    pub fn checked_sub(self, other: Dec) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Dec)
            .ok_or(TypesError::Underflow)
    }

    /// Checked multiplication, truncated at the 18th fractional digit.
    pub fn checked_mul(self, other: Dec) -> Result<Self> {
        // (a1*S + a0) * (b1*S + b0) / S = a1*b1*S + a1*b0 + a0*b1 + a0*b0/S
        let (a1, a0) = (self.0 / SCALE, self.0 % SCALE);
        let (b1, b0) = (other.0 / SCALE, other.0 % SCALE);
        let high = a1
            .checked_mul(b1)
            .and_then(|v| v.checked_mul(SCALE))
            .ok_or(TypesError::Overflow)?;
        let cross_a = a1.checked_mul(b0).ok_or(TypesError::Overflow)?;
        let cross_b = a0.checked_mul(b1).ok_or(TypesError::Overflow)?;
        let low = a0 * b0 / SCALE;
        high.checked_add(cross_a)
            .and_then(|v| v.checked_add(cross_b))
            .and_then(|v| v.checked_add(low))
            .map(Dec)
            .ok_or(TypesError::Overflow)
    }

    /// Checked division, truncated at the 18th fractional digit.
    pub fn checked_div(self, other: Dec) -> Result<Self> {
        Dec::from_ratio(self.0, other.0)
    }

    /// Multiply by an integer amount and truncate the result to an integer.
    ///
    /// This is the conversion from a per-unit factor to an owed amount.
    /// Computed without ever forming `raw * n`, so large weights do not
    /// overflow as long as the result itself fits.
    pub fn mul_int_floor(self, n: u128) -> Result<u128> {
        // (d1*S + d0) * (w1*S + w0) / S = d1*n + d0*w1 + d0*w0/S
        let (d1, d0) = (self.0 / SCALE, self.0 % SCALE);
        let (w1, w0) = (n / SCALE, n % SCALE);
        let whole = d1.checked_mul(n).ok_or(TypesError::Overflow)?;
        let cross = d0.checked_mul(w1).ok_or(TypesError::Overflow)?;
        let low = d0 * w0 / SCALE;
        whole
            .checked_add(cross)
            .and_then(|v| v.checked_add(low))
            .ok_or(TypesError::Overflow)
    }

    /// Integer part, discarding the fraction.
    pub const fn truncate(self) -> u128 {
        self.0 / SCALE
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / SCALE,
            self.0 % SCALE,
            width = DEC_PRECISION as usize
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({self})")
    }
}

impl FromStr for Dec {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TypesError::InvalidDecimal(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((_, "")) => return Err(invalid()),
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac_part.len() > DEC_PRECISION as usize
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u128 = int_part.parse().map_err(|_| invalid())?;
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let digits: u128 = frac_part.parse().map_err(|_| invalid())?;
            digits * 10u128.pow(DEC_PRECISION - frac_part.len() as u32)
        };

        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .map(Dec)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Dec {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Dec> for String {
    fn from(value: Dec) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Dec {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(d("1.5").to_string(), "1.500000000000000000");
        assert_eq!(d("0").to_string(), "0.000000000000000000");
        assert_eq!(d("42").raw(), 42 * SCALE);
        assert_eq!(d("0.000000000000000001").raw(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", ".5", "1.", "-1", "1.2.3", "abc", "1.0000000000000000001", " 1"] {
            assert!(bad.parse::<Dec>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_from_ratio_truncates() {
        assert_eq!(Dec::from_ratio(1, 3).expect("ratio"), d("0.333333333333333333"));
        assert_eq!(Dec::from_ratio(2, 3).expect("ratio"), d("0.666666666666666666"));
        assert_eq!(Dec::from_ratio(400, 4).expect("ratio"), d("100"));
        assert_eq!(Dec::from_ratio(0, 7).expect("ratio"), Dec::ZERO);
    }

    #[test]
    fn test_from_ratio_large_numerator() {
        // 10^30 / 10^12 = 10^18 would overflow a naive `num * SCALE`.
        let ratio = Dec::from_ratio(10u128.pow(30), 10u128.pow(12)).expect("ratio");
        assert_eq!(ratio.truncate(), 10u128.pow(18));
    }

    #[test]
    fn test_from_ratio_zero_denominator() {
        assert_eq!(Dec::from_ratio(1, 0), Err(TypesError::DivisionByZero));
    }

    #[test]
    fn test_checked_mul() {
        assert_eq!(d("1.5").checked_mul(d("2")).expect("mul"), d("3"));
        assert_eq!(d("0.5").checked_mul(d("0.5")).expect("mul"), d("0.25"));
        assert_eq!(
            d("123456789.123456789").checked_mul(d("1000")).expect("mul"),
            d("123456789123.456789")
        );
        assert!(Dec::from_raw(u128::MAX).checked_mul(d("2")).is_err());
    }

    #[test]
    fn test_checked_div() {
        assert_eq!(d("3").checked_div(d("2")).expect("div"), d("1.5"));
        assert!(d("3").checked_div(Dec::ZERO).is_err());
    }

    #[test]
    fn test_checked_sub_underflow() {
        assert_eq!(d("1").checked_sub(d("2")), Err(TypesError::Underflow));
        assert_eq!(d("2").checked_sub(d("0.5")).expect("sub"), d("1.5"));
    }

    #[test]
    fn test_mul_int_floor() {
        assert_eq!(d("0.5").mul_int_floor(1000).expect("mul"), 500);
        assert_eq!(d("0.333333333333333333").mul_int_floor(3).expect("mul"), 0);
        assert_eq!(d("100").mul_int_floor(3).expect("mul"), 300);
        // Weight larger than 10^20 must not overflow the intermediate.
        let weight = 10u128.pow(24);
        assert_eq!(d("0.000001").mul_int_floor(weight).expect("mul"), 10u128.pow(18));
    }

    #[test]
    fn test_ordering() {
        assert!(d("0.1") < d("0.2"));
        assert!(d("10") > d("9.999999999999999999"));
    }

    #[test]
    fn test_serde_string() {
        let json = serde_json::to_string(&d("2.25")).expect("serialize");
        assert_eq!(json, "\"2.250000000000000000\"");
        let back: Dec = serde_json::from_str("\"2.25\"").expect("deserialize");
        assert_eq!(back, d("2.25"));
        assert!(serde_json::from_str::<Dec>("\"-1\"").is_err());
    }
}
