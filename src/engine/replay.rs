//! P&L replay engine: reconstructs a user's daily portfolio series from
//! confirmed transaction history and the NAV ledger.
//!
//! The replay is a pure function of (history, navs, as-of date). It never
//! reads or writes the live position ledger; point-in-time average cost must
//! be rebuilt from the transaction sequence, which the current ledger no
//! longer reflects.

use crate::db::{NavHistory, Repository};
use crate::domain::{
    DailyProfitPoint, Decimal, FundCode, HoldingState, ProfitAnalysis, ProfitSummary, Transaction,
    TxStatus, UserId,
};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// Replay a confirmed transaction history day by day up to `as_of` inclusive.
///
/// Transactions must be confirmed and ordered by order date ascending (the
/// repository query guarantees both); rows in any other state are ignored.
pub fn replay(transactions: &[Transaction], navs: &NavHistory, as_of: NaiveDate) -> ProfitAnalysis {
    let confirmed: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.status == TxStatus::Confirmed)
        .collect();

    let Some(first_date) = confirmed.iter().map(|t| t.order_date).min() else {
        return ProfitAnalysis::empty();
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<&Transaction>> = BTreeMap::new();
    for tx in &confirmed {
        by_date.entry(tx.order_date).or_default().push(tx);
    }

    // Replay-local arena; never shared with or persisted to the ledger.
    let mut holdings: HashMap<FundCode, HoldingState> = HashMap::new();
    let mut last_known_nav: HashMap<FundCode, Decimal> = HashMap::new();
    let mut total_realized_profit = Decimal::zero();
    let mut last_day_total_assets = Decimal::zero();

    let mut history = Vec::new();
    let mut calendar = BTreeMap::new();

    let mut day = first_date;
    let mut is_first_day = true;
    while day <= as_of {
        let mut daily_net_inflow = Decimal::zero();

        if let Some(day_txs) = by_date.get(&day) {
            for tx in day_txs {
                apply_transaction(
                    tx,
                    &mut holdings,
                    &mut total_realized_profit,
                    &mut daily_net_inflow,
                );
            }
        }

        // Value today's holdings. Prefer today's NAV, else the last known
        // one; a position opened before its first NAV print falls back to
        // its own average cost.
        let mut total_assets = Decimal::zero();
        let mut total_holding_cost = Decimal::zero();
        for (fund, holding) in &holdings {
            if let Some(nav) = navs.get(fund).and_then(|h| h.get(&day)) {
                last_known_nav.insert(fund.clone(), *nav);
            }
            if !holding.shares.is_positive() {
                continue;
            }
            let price = last_known_nav
                .get(fund)
                .copied()
                .unwrap_or(holding.average_cost);
            total_assets = total_assets + holding.market_value(price);
            total_holding_cost = total_holding_cost + holding.cost_value();
        }

        let total_profit = (total_assets - total_holding_cost) + total_realized_profit;
        // Policy: an all-cash state after full liquidation reports 0%, not an
        // undefined rate.
        let total_profit_rate = if total_holding_cost.is_positive() {
            total_profit / total_holding_cost
        } else {
            Decimal::zero()
        };

        let day_profit = if is_first_day {
            total_assets - daily_net_inflow
        } else {
            total_assets - last_day_total_assets - daily_net_inflow
        };
        let denominator = if last_day_total_assets.is_positive() {
            last_day_total_assets
        } else {
            daily_net_inflow
        };
        let day_profit_rate = if denominator.is_positive() {
            day_profit / denominator
        } else {
            Decimal::zero()
        };

        history.push(DailyProfitPoint {
            date: day,
            total_assets,
            day_profit,
            day_profit_rate,
            total_profit,
            total_profit_rate,
        });
        calendar.insert(day, day_profit);

        last_day_total_assets = total_assets;
        is_first_day = false;
        let Some(next) = day.checked_add_days(Days::new(1)) else {
            break;
        };
        day = next;
    }

    let summary = summarize(&history, &calendar, as_of);
    ProfitAnalysis {
        summary,
        history,
        calendar,
    }
}

/// Apply one confirmed transaction to the replay arena.
fn apply_transaction(
    tx: &Transaction,
    holdings: &mut HashMap<FundCode, HoldingState>,
    total_realized_profit: &mut Decimal,
    daily_net_inflow: &mut Decimal,
) {
    let (Some(amount), Some(nav)) = (tx.confirmed_amount, tx.confirmed_nav) else {
        warn!(tx_id = %tx.id, "confirmed transaction missing settlement fields, ignoring");
        return;
    };

    let holding = holdings.entry(tx.fund_code.clone()).or_default();

    if tx.tx_type.is_subscription() {
        holding.apply_buy(amount, nav);
        *daily_net_inflow = *daily_net_inflow + amount;
    } else {
        let Some(shares) = tx.confirmed_shares else {
            warn!(tx_id = %tx.id, "confirmed redemption missing share count, ignoring");
            return;
        };
        match holding.apply_sell(shares, nav) {
            Ok(outcome) => {
                *total_realized_profit = *total_realized_profit + outcome.realized_profit;
                *daily_net_inflow = *daily_net_inflow - outcome.proceeds;
            }
            Err(e) => {
                // Self-consistent histories cannot hit this; degrade rather
                // than fail the whole analysis.
                warn!(tx_id = %tx.id, fund = %tx.fund_code, %e, "inconsistent redemption in history, ignoring");
            }
        }
    }
}

fn summarize(
    history: &[DailyProfitPoint],
    calendar: &BTreeMap<NaiveDate, Decimal>,
    as_of: NaiveDate,
) -> ProfitSummary {
    let Some(last) = history.last() else {
        return ProfitSummary::zero();
    };

    // Exact calendar lookup, not "second to last point": the day before may
    // simply have no point yet.
    let yesterday_profit = as_of
        .checked_sub_days(Days::new(1))
        .and_then(|d| calendar.get(&d).copied())
        .unwrap_or_else(Decimal::zero);

    let jan_first = NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of);
    let ytd_profit = history
        .iter()
        .find(|p| p.date >= jan_first)
        .map(|baseline| last.total_profit - baseline.total_profit)
        .unwrap_or_else(Decimal::zero);

    ProfitSummary {
        yesterday_profit,
        ytd_profit,
        total_profit: last.total_profit,
        total_profit_rate: last.total_profit_rate,
        total_assets: last.total_assets,
    }
}

/// Loads a user's confirmed history and NAV data, then runs the pure replay.
///
/// Read-only and re-entrant: a timed-out caller can simply retry.
pub struct ProfitAnalyzer {
    repo: Arc<Repository>,
}

impl ProfitAnalyzer {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    pub async fn compute(
        &self,
        user: &UserId,
        as_of: NaiveDate,
    ) -> Result<ProfitAnalysis, sqlx::Error> {
        let transactions = self.repo.list_confirmed_transactions(user).await?;
        if transactions.is_empty() {
            return Ok(ProfitAnalysis::empty());
        }

        let codes = self.repo.distinct_fund_codes_for_user(user).await?;
        let navs = self.repo.nav_history_for_funds(&codes).await?;

        Ok(replay(&transactions, &navs, as_of))
    }
}
