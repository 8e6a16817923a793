//! Monetary amount in minor currency units.
//!
//! # Invariants
//! - Values are stored as whole cents; no floating point is involved.
//! - Text form always carries exactly two fractional digits.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// Amount in the smallest currency unit (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Splits into `parts` shares that sum back to `self`.
    ///
    /// Every share but the last is `self / parts` rounded half-up to the
    /// cent; the last one absorbs the remainder. Returns an empty vector
    /// for zero parts.
    pub fn split(self, parts: u32) -> Vec<Amount> {
        if parts == 0 {
            return Vec::new();
        }
        let total = i128::from(self.0);
        let parts_wide = i128::from(parts);
        let base = (2 * total + parts_wide).div_euclid(2 * parts_wide);
        let last = total - base * (parts_wide - 1);

        let mut shares: Vec<Amount> = (1..parts).map(|_| Amount(base as i64)).collect();
        shares.push(Amount(last as i64));
        shares
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Error returned when decimal text cannot be read as an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAmountError {
    input: String,
}

impl Display for ParseAmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid amount `{}`; expected digits with at most two decimals",
            self.input
        )
    }
}

impl Error for ParseAmountError {}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Parses `123`, `123.4`, `123.45`, optionally signed.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseAmountError {
            input: value.to_string(),
        };

        let trimmed = value.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if unsigned.ends_with('.') {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction_cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|value| value.checked_add(fraction_cents))
            .ok_or_else(invalid)?;

        Ok(Amount(if negative { -cents } else { cents }))
    }
}
