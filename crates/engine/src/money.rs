use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as integer **minor units** (hundredths).
///
/// Every monetary value in the ledger (balances, transaction amounts, budget
/// limits) goes through this type, so applying and reversing a delta is exact.
/// The currency is carried by the wallet, never by the amount.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more than 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole major units (`Money::major(5)` is `5.00`).
    #[must_use]
    pub const fn major(units: i64) -> Self {
        Self(units * 100)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Magnitude of the amount, `None` for the one value without a positive
    /// counterpart (`i64::MIN` minor units).
    #[must_use]
    pub const fn checked_abs(self) -> Option<Money> {
        match self.0.checked_abs() {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    #[must_use]
    pub const fn checked_neg(self) -> Option<Money> {
        match self.0.checked_neg() {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Like `Display`, but positive amounts carry an explicit `+`.
    #[must_use]
    pub fn to_signed_string(self) -> String {
        if self.is_positive() {
            format!("+{self}")
        } else {
            self.to_string()
        }
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    /// At most 2 fractional digits are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::Validation(format!("{reason}: '{s}'"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let digits = digits.trim_start();
        if digits.is_empty() {
            return Err(invalid("empty amount"));
        }

        let (units, frac) = digits.split_once(['.', ',']).unwrap_or((digits, ""));
        if units.is_empty()
            || !units.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("invalid amount"));
        }
        if frac.len() > 2 {
            return Err(invalid("too many decimals"));
        }

        // "12.3" reads as the digit string "1230"
        let minor = units
            .bytes()
            .chain(frac.bytes())
            .chain(std::iter::repeat_n(b'0', 2 - frac.len()))
            .try_fold(0i64, |acc, b| {
                acc.checked_mul(10)?.checked_add(i64::from(b - b'0'))
            })
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -minor } else { minor }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_exact() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(7).to_string(), "0.07");
        assert_eq!(Money::major(100_000).to_string(), "100000.00");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("+1.00".parse::<Money>().unwrap().minor(), 100);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
        assert_eq!("3.".parse::<Money>().unwrap().minor(), 300);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".5".parse::<Money>().is_err());
        assert!(matches!(
            "99999999999999999999".parse::<Money>(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn extremes_have_no_magnitude() {
        let min = Money::new(i64::MIN);
        assert_eq!(min.checked_abs(), None);
        assert_eq!(min.checked_neg(), None);
        assert_eq!(Money::new(-2_050).checked_abs(), Some(Money::new(2_050)));
        assert_eq!(Money::new(i64::MAX).checked_neg(), Some(Money::new(-i64::MAX)));
    }

    #[test]
    fn signed_string_marks_gains() {
        assert_eq!(Money::major(150).to_signed_string(), "+150.00");
        assert_eq!(Money::new(-2_050).to_signed_string(), "-20.50");
        assert_eq!(Money::ZERO.to_signed_string(), "0.00");
    }

    #[test]
    fn apply_then_reverse_is_exact() {
        let start = "100000.10".parse::<Money>().unwrap();
        let delta = "0.07".parse::<Money>().unwrap();
        let mut balance = start;
        for _ in 0..1000 {
            balance += delta;
        }
        for _ in 0..1000 {
            balance += -delta;
        }
        assert_eq!(balance, start);
    }
}
