// Monetary amounts kept as integer cents.
//
// Revenue sums must not depend on the order reports come back in, so amounts
// never touch floating point. Parsing accepts "150", "150.5", "150.50" and the
// comma form "150,50" that sellers type on Brazilian keyboards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    #[error("Amount is empty")]
    Empty,
    #[error("Amount '{0}' is not a number")]
    Invalid(String),
    #[error("Amount '{0}' has more than two decimal places")]
    TooPrecise(String),
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Mean of `count` amounts summing to `self`, rounded half away from zero.
    /// Zero when `count` is zero.
    pub fn average_over(self, count: u64) -> Money {
        if count == 0 {
            return Money::ZERO;
        }
        let count = count as i64;
        let half = count / 2;
        let rounded = if self.0 >= 0 {
            (self.0 + half) / count
        } else {
            (self.0 - half) / count
        };
        Money(rounded)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let normalized = digits.replace(',', ".");
        let mut parts = normalized.splitn(2, '.');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next().unwrap_or_default();

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(MoneyParseError::Invalid(trimmed.to_string()));
        }
        if fraction.len() > 2 {
            return Err(MoneyParseError::TooPrecise(trimmed.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| MoneyParseError::Invalid(trimmed.to_string()))?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().unwrap_or(0) * 10,
            _ => fraction.parse::<i64>().unwrap_or(0),
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(|| MoneyParseError::Invalid(trimmed.to_string()))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_forms() {
        assert_eq!("150".parse::<Money>().unwrap(), Money::from_cents(15000));
        assert_eq!("150.5".parse::<Money>().unwrap(), Money::from_cents(15050));
        assert_eq!("150,50".parse::<Money>().unwrap(), Money::from_cents(15050));
        assert_eq!(" 0.99 ".parse::<Money>().unwrap(), Money::from_cents(99));
        assert_eq!("-2.00".parse::<Money>().unwrap(), Money::from_cents(-200));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Money>(), Err(MoneyParseError::Empty));
        assert!(matches!(
            "12a".parse::<Money>(),
            Err(MoneyParseError::Invalid(_))
        ));
        assert!(matches!(
            "1.234".parse::<Money>(),
            Err(MoneyParseError::TooPrecise(_))
        ));
        assert!(matches!(".".parse::<Money>(), Err(MoneyParseError::Invalid(_))));
    }

    #[test]
    fn test_display_pads_cents() {
        assert_eq!(Money::from_cents(15000).to_string(), "150.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_average_rounds_half_up() {
        assert_eq!(Money::from_cents(1000).average_over(3), Money::from_cents(333));
        assert_eq!(Money::from_cents(1001).average_over(2), Money::from_cents(501));
        assert_eq!(Money::from_cents(1000).average_over(0), Money::ZERO);
    }
}
