//! Fund metadata and the append-only daily NAV ledger.

use crate::domain::{Decimal, FundCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A fund (instrument) known to the ledger.
///
/// Created lazily on first reference; metadata is refreshed by the external
/// daily NAV sync and the realtime estimate sync. Never deleted while a
/// position references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub code: FundCode,
    pub name: Option<String>,
    /// Last confirmed daily NAV.
    pub yesterday_nav: Option<Decimal>,
    /// Realtime intraday estimate, absent outside trading hours.
    pub today_estimate_nav: Option<Decimal>,
    /// Change of the last confirmed NAV vs the one before it, in percent.
    pub percentage_change: Option<Decimal>,
}

/// One confirmed daily NAV print. Unique per (fund_code, nav_date),
/// append-only, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavRecord {
    pub fund_code: FundCode,
    pub nav_date: NaiveDate,
    /// Per-unit price; must be > 0.
    pub nav: Decimal,
}

impl NavRecord {
    pub fn new(fund_code: FundCode, nav_date: NaiveDate, nav: Decimal) -> Self {
        NavRecord {
            fund_code,
            nav_date,
            nav,
        }
    }

    /// A NAV at or below zero is never a valid print.
    pub fn is_valid(&self) -> bool {
        self.nav.is_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_nav_record_validity() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let good = NavRecord::new(FundCode::new("110022"), date, Decimal::from_str("2.5").unwrap());
        assert!(good.is_valid());

        let zero = NavRecord::new(FundCode::new("110022"), date, Decimal::zero());
        assert!(!zero.is_valid());

        let negative =
            NavRecord::new(FundCode::new("110022"), date, Decimal::from_str("-1").unwrap());
        assert!(!negative.is_valid());
    }
}
