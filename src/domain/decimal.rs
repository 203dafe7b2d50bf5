//! Lossless decimal numeric type backed by rust_decimal.
//!
//! All shares/cost/amount arithmetic in the ledger goes through this type.
//! Decimals are persisted as canonical strings so SQLite never coerces them
//! to REAL.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Share counts with absolute value below this threshold are treated as
/// exactly zero. Absorbs rounding residue left by partial redemptions.
pub const DUST_THRESHOLD: &str = "0.0001";

/// Lossless decimal numeric type for financial calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
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

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

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

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// The dust threshold for share counts.
    pub fn dust_threshold() -> Self {
        Decimal(RustDecimal::from_str(DUST_THRESHOLD).expect("dust threshold is a valid decimal"))
    }

    /// Returns true if the absolute value is below the dust threshold.
    pub fn is_dust(&self) -> bool {
        self.abs() < Self::dust_threshold()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parse_roundtrip() {
        let test_cases = vec!["2.2222", "0.0001", "1000", "-36.67", "0", "999999999.999999999"];

        for s in test_cases {
            let decimal = Decimal::from_str_canonical(s).expect("parse failed");
            let formatted = decimal.to_canonical_string();
            let reparsed = Decimal::from_str_canonical(&formatted).expect("reparse failed");
            assert_eq!(decimal, reparsed, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn test_decimal_canonical_no_exponent() {
        let decimal = Decimal::from_str_canonical("1000").expect("parse failed");
        let formatted = decimal.to_canonical_string();
        assert!(!formatted.contains('e'));
        assert_eq!(formatted, "1000");
    }

    #[test]
    fn test_decimal_arithmetic_is_exact() {
        // 0.1 + 0.2 drifts under f64; must be exact here.
        let a = Decimal::from_str_canonical("0.1").unwrap();
        let b = Decimal::from_str_canonical("0.2").unwrap();
        assert_eq!((a + b).to_canonical_string(), "0.3");

        let amount = Decimal::from_str_canonical("1000").unwrap();
        let nav = Decimal::from_str_canonical("2.5").unwrap();
        assert_eq!((amount / nav).to_canonical_string(), "400");
    }

    #[test]
    fn test_dust_threshold() {
        assert!(Decimal::from_str_canonical("0.00009").unwrap().is_dust());
        assert!(Decimal::from_str_canonical("-0.00005").unwrap().is_dust());
        assert!(Decimal::zero().is_dust());
        assert!(!Decimal::from_str_canonical("0.0001").unwrap().is_dust());
        assert!(!Decimal::from_str_canonical("1").unwrap().is_dust());
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = Decimal::from_str_canonical("2.2222").unwrap();
        let json = serde_json::to_value(decimal).unwrap();
        // Serializes as a JSON number, not a string.
        assert!(json.is_number());
        assert_eq!(json.to_string(), "2.2222");
    }

    #[test]
    fn test_decimal_ordering() {
        let a = Decimal::from_str_canonical("1.5").unwrap();
        let b = Decimal::from_str_canonical("2.5").unwrap();
        assert!(a < b);
        assert_eq!(a, a);
    }
}
