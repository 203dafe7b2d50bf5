//! Derived profit-analysis output types.
//!
//! These are recomputed on demand by the replay engine and never persisted.

use crate::domain::Decimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One day of the reconstructed portfolio series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProfitPoint {
    pub date: NaiveDate,
    pub total_assets: Decimal,
    pub day_profit: Decimal,
    pub day_profit_rate: Decimal,
    pub total_profit: Decimal,
    pub total_profit_rate: Decimal,
}

/// Headline numbers derived from the series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSummary {
    /// Day profit for the calendar day before `as_of`; zero if that day has
    /// no point (e.g. before the first transaction).
    pub yesterday_profit: Decimal,
    /// Cumulative profit now minus cumulative profit at the first point on or
    /// after Jan 1 of the current year.
    pub ytd_profit: Decimal,
    pub total_profit: Decimal,
    pub total_profit_rate: Decimal,
    pub total_assets: Decimal,
}

impl ProfitSummary {
    pub fn zero() -> Self {
        ProfitSummary {
            yesterday_profit: Decimal::zero(),
            ytd_profit: Decimal::zero(),
            total_profit: Decimal::zero(),
            total_profit_rate: Decimal::zero(),
            total_assets: Decimal::zero(),
        }
    }
}

/// Full replay output: summary, day-by-day history, and the day-profit
/// calendar used for heat-maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitAnalysis {
    pub summary: ProfitSummary,
    pub history: Vec<DailyProfitPoint>,
    pub calendar: BTreeMap<NaiveDate, Decimal>,
}

impl ProfitAnalysis {
    /// The trivial result for a user with no confirmed transactions.
    pub fn empty() -> Self {
        ProfitAnalysis {
            summary: ProfitSummary::zero(),
            history: Vec::new(),
            calendar: BTreeMap::new(),
        }
    }
}
