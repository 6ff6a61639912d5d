//! Exact two-decimal monetary amounts.
//!
//! Amounts are held as integer cents so storage round-trips never lose
//! precision. Text form is `123.45`, with an optional leading `-`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Monetary amount in minor units (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Error returned when text is not a valid two-decimal amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoneyError(String);

impl Display for ParseMoneyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid amount `{}`", self.0)
    }
}

impl std::error::Error for ParseMoneyError {}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMoneyError(value.to_string());
        let trimmed = value.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (units_text, cents_text) = digits.split_once('.').unwrap_or((digits, ""));
        if units_text.is_empty()
            || cents_text.len() > 2
            || !units_text.bytes().all(|b| b.is_ascii_digit())
            || !cents_text.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: i64 = units_text.parse().map_err(|_| invalid())?;
        let cents: i64 = match cents_text.len() {
            0 => 0,
            1 => cents_text.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => cents_text.parse().map_err(|_| invalid())?,
        };
        let magnitude = units
            .checked_mul(100)
            .and_then(|value| value.checked_add(cents))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}
