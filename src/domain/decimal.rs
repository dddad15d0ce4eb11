//! Lossless decimal money type backed by rust_decimal.
//!
//! Provides canonical parsing from strings, lenient parsing of spreadsheet
//! cells and formatting for chat messages.

use rust_decimal::prelude::RoundingStrategy;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal numeric type for money and ratios.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Parse a spreadsheet cell: whitespace is dropped and a decimal comma is
    /// accepted (`"1 234,5"` is 1234.5). Returns `None` for empty or
    /// unparseable input.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        RustDecimal::from_str(&cleaned)
            .or_else(|_| RustDecimal::from_scientific(&cleaned))
            .ok()
            .map(Decimal)
    }

    /// [`Decimal::parse_lenient`] limited to `±max_amount()`.
    pub fn parse_amount(raw: &str) -> Option<Self> {
        Self::parse_lenient(raw).filter(Decimal::is_within_amount_bound)
    }

    /// Parse an amount typed by a person (`"$1 000"`, `"250,5 USDT"`).
    ///
    /// Everything except digits, separators and the minus sign is stripped.
    /// Amounts beyond `max_amount()` are rejected.
    pub fn parse_money(raw: &str) -> Option<Self> {
        let kept: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
            .collect();
        Self::parse_amount(&kept)
    }

    /// Largest magnitude accepted for an amount from the event log or a chat
    /// command (10^15). Products of two such amounts stay representable.
    pub fn max_amount() -> Self {
        Decimal(RustDecimal::new(1_000_000_000_000_000, 0))
    }

    pub fn is_within_amount_bound(&self) -> bool {
        self.abs() <= Self::max_amount()
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Format with a fixed number of fractional digits, rounding half away from zero.
    pub fn to_fixed(&self, dp: u32) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        format!("{:.*}", dp as usize, rounded)
    }

    /// Like [`Decimal::to_fixed`] but always carries a sign (`+1.50`, `-0.25`).
    pub fn to_signed_fixed(&self, dp: u32) -> String {
        let body = self.to_fixed(dp);
        if body.starts_with('-') {
            body
        } else {
            format!("+{}", body)
        }
    }

    /// Dollar amount with two decimals and space-grouped thousands (`1 234.56`).
    pub fn to_usd_string(&self) -> String {
        let fixed = self.abs().to_fixed(2);
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }

        let negative = self.is_negative() && fixed != "0.00";
        format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac_part)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Returns the value 100.
    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn from_i64(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Division that yields `None` instead of panicking on a zero divisor
    /// or overflow.
    pub fn checked_div(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// Addition that yields `None` on overflow.
    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    /// Multiplication that yields `None` on overflow.
    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// `max(self, 0)`.
    pub fn clamp_non_negative(self) -> Decimal {
        std::cmp::max(self, Decimal::zero())
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_canonical_no_exponent() {
        let decimal = d("123.4500");
        assert_eq!(decimal.to_canonical_string(), "123.45");
    }

    #[test]
    fn test_parse_lenient_spreadsheet_cells() {
        assert_eq!(Decimal::parse_lenient("1 234,5"), Some(d("1234.5")));
        assert_eq!(Decimal::parse_lenient(" 200 "), Some(d("200")));
        assert_eq!(Decimal::parse_lenient("-12.75"), Some(d("-12.75")));
        assert_eq!(Decimal::parse_lenient(""), None);
        assert_eq!(Decimal::parse_lenient("n/a"), None);
    }

    #[test]
    fn test_parse_money_strips_symbols() {
        assert_eq!(Decimal::parse_money("$1 000"), Some(d("1000")));
        assert_eq!(Decimal::parse_money("250,5 USDT"), Some(d("250.5")));
        assert_eq!(Decimal::parse_money("all"), None);
    }

    #[test]
    fn test_usd_formatting() {
        assert_eq!(d("0").to_usd_string(), "0.00");
        assert_eq!(d("9").to_usd_string(), "9.00");
        assert_eq!(d("1234.567").to_usd_string(), "1 234.57");
        assert_eq!(d("1234567.1").to_usd_string(), "1 234 567.10");
        assert_eq!(d("-1500").to_usd_string(), "-1 500.00");
        assert_eq!(d("-0.001").to_usd_string(), "0.00");
    }

    #[test]
    fn test_fixed_and_signed() {
        assert_eq!(d("20").to_fixed(1), "20.0");
        assert_eq!(d("12.345").to_signed_fixed(2), "+12.35");
        assert_eq!(d("-3.1").to_signed_fixed(2), "-3.10");
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert_eq!(d("10").checked_div(Decimal::zero()), None);
        assert_eq!(d("10").checked_div(d("4")), Some(d("2.5")));
    }

    #[test]
    fn test_checked_ops_report_overflow() {
        let max = Decimal::new(RustDecimal::MAX);
        assert_eq!(max.checked_add(d("1")), None);
        assert_eq!(max.checked_mul(d("100")), None);
        assert_eq!(d("2").checked_add(d("3")), Some(d("5")));
        assert_eq!(d("2").checked_mul(d("3.5")), Some(d("7")));
    }

    #[test]
    fn test_amounts_beyond_bound_are_rejected() {
        assert_eq!(Decimal::parse_amount("1e15"), Some(d("1000000000000000")));
        assert_eq!(Decimal::parse_amount("1e27"), None);
        assert_eq!(Decimal::parse_amount("-2e15"), None);
        assert_eq!(
            Decimal::parse_money("79228162514264337593543950335"),
            None
        );
        assert_eq!(Decimal::parse_money("$1 000"), Some(d("1000")));
        // Unbounded lenient parsing is still available for ratios.
        assert!(Decimal::parse_lenient("1e27").is_some());
    }

    #[test]
    fn test_clamp_and_sum() {
        assert_eq!(d("-5").clamp_non_negative(), Decimal::zero());
        assert_eq!(d("5").clamp_non_negative(), d("5"));
        let total: Decimal = vec![d("1.5"), d("2.5"), d("-1")].into_iter().sum();
        assert_eq!(total, d("3"));
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = d("123.456");
        let json = serde_json::to_value(decimal).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }
}
