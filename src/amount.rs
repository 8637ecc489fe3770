//! Exact decimal money.
//!
//! `Amount` wraps an arbitrary-precision `BigDecimal` and keeps every value at
//! a fixed scale of two fractional digits. Extra digits are truncated toward
//! zero, both on parse and after each addition, so repeated additions over a
//! long history never drift.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Signed, Zero};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::{PurseError, Result};

/// Number of fractional digits carried by every money value.
pub const MONEY_SCALE: i64 = 2;

/// A signed money value with exactly [`MONEY_SCALE`] fractional digits.
///
/// Equality and ordering are numeric: `1.5` and `1.50` are the same amount.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigDecimal);

impl Amount {
    pub fn zero() -> Self {
        Self(BigDecimal::zero().with_scale(MONEY_SCALE))
    }

    /// Parses the decimal grammar `[+|-]digits[.digits]`.
    ///
    /// At least one digit is required; whitespace, thousands separators,
    /// currency symbols, exponents and a second `.` are all rejected. Digits
    /// past the money scale are truncated.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || PurseError::InvalidAmount(text.to_string());

        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let mantissa = BigInt::from_str(&format!("{int_part}{frac_part}")).map_err(|_| invalid())?;
        let mut value = BigDecimal::new(mantissa, frac_part.len() as i64);
        if negative {
            value = -value;
        }
        Ok(Self(value.with_scale(MONEY_SCALE)))
    }

    /// Exact addition truncated to `scale` fractional digits.
    pub fn add_scaled(&self, other: &Amount, scale: i64) -> Amount {
        Amount((&self.0 + &other.0).with_scale(scale))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Amount {
    type Err = PurseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Canonical form: optional `-`, integer digits, `.`, two fractional digits.
/// The output is always accepted by [`Amount::parse`].
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mantissa, scale) = self.0.with_scale(MONEY_SCALE).as_bigint_and_exponent();
        let scale = scale.max(0) as usize;
        let digits = mantissa.magnitude().to_string();
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        let sign = if mantissa.is_negative() { "-" } else { "" };
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        self.add_scaled(&other, MONEY_SCALE)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, other: &'a Amount) -> Amount {
        self.add_scaled(other, MONEY_SCALE)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| &acc + a)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => {
                let text = value.as_str()?;
                Amount::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            ValueRef::Integer(i) => Ok(Amount(BigDecimal::from(i).with_scale(MONEY_SCALE))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        Amount::parse(s).unwrap()
    }

    #[test]
    fn test_add_is_exact() {
        assert_eq!(amt("10.10").add_scaled(&amt("0.05"), 2).to_string(), "10.15");
        assert_eq!(amt("-5.00").add_scaled(&amt("5.00"), 2).to_string(), "0.00");
    }

    #[test]
    fn test_hundred_pennies_make_a_dollar() {
        let penny = amt("0.01");
        let mut total = amt("0.00");
        for _ in 0..100 {
            total = total.add_scaled(&penny, 2);
        }
        assert_eq!(total.to_string(), "1.00");
        assert_eq!(total, amt("1"));
    }

    #[test]
    fn test_parse_accepts_grammar() {
        assert_eq!(amt("42").to_string(), "42.00");
        assert_eq!(amt("+5").to_string(), "5.00");
        assert_eq!(amt("-0.5").to_string(), "-0.50");
        assert_eq!(amt(".75").to_string(), "0.75");
        assert_eq!(amt("5.").to_string(), "5.00");
        assert_eq!(amt("007.10").to_string(), "7.10");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "-", "+", ".", "1.2.3", "1,000.00", "$5", "5a", " 5", "--5", "1e3", "5-"] {
            assert!(Amount::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_truncates_extra_digits() {
        assert_eq!(amt("1.999").to_string(), "1.99");
        assert_eq!(amt("-1.999").to_string(), "-1.99");
        assert_eq!(amt("-0.001").to_string(), "0.00");
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let big = amt("99999999999999999999999999999999.99");
        let sum = &big + &amt("0.01");
        assert_eq!(sum.to_string(), "100000000000000000000000000000000.00");
    }

    #[test]
    fn test_compare() {
        use std::cmp::Ordering;
        assert_eq!(amt("1.5").cmp(&amt("1.50")), Ordering::Equal);
        assert_eq!(amt("-2").cmp(&amt("1")), Ordering::Less);
        assert_eq!(amt("10.01").cmp(&amt("10.00")), Ordering::Greater);
    }

    #[test]
    fn test_format_roundtrips_through_parse() {
        for s in ["0.00", "-12.34", "1000000.01"] {
            assert_eq!(amt(s).to_string(), s);
            assert_eq!(amt(&amt(s).to_string()), amt(s));
        }
    }

    #[test]
    fn test_sum() {
        let total: Amount = ["1.10", "2.20", "-0.30"].iter().map(|s| amt(s)).sum();
        assert_eq!(total.to_string(), "3.00");
        assert!(!total.is_negative());
        assert!(amt("-0.01").is_negative());
        assert!(Amount::zero().is_zero());
    }
}
