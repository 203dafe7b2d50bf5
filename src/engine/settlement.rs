//! Settlement engine: converts pending transactions into confirmed or failed
//! ones against the daily NAV ledger, and updates the position ledger.

use crate::db::Repository;
use crate::domain::{Decimal, FundCode, HoldingState, Transaction, TxType, UserId};
use crate::engine::events::PositionEventSink;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Aggregate result of one settlement run.
///
/// `processed` counts transactions that reached a final state (confirmed or
/// failed); `skipped` ones remain pending and will be retried next run.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub processed: usize,
    pub skipped: usize,
    pub skipped_reasons: Vec<String>,
}

enum Outcome {
    /// Reached confirmed; the position ledger was updated.
    Confirmed,
    /// Reached failed (terminal, user-visible note recorded).
    Failed,
    /// Left pending for a later run.
    Skipped(String),
}

/// One instance per database: the scheduled loop and the on-demand endpoint
/// must share it so `run_lock` covers every caller.
pub struct SettlementEngine {
    repo: Arc<Repository>,
    events: Arc<dyn PositionEventSink>,
    run_lock: Mutex<()>,
}

impl SettlementEngine {
    pub fn new(repo: Arc<Repository>, events: Arc<dyn PositionEventSink>) -> Self {
        Self {
            repo,
            events,
            run_lock: Mutex::new(()),
        }
    }

    /// Settle every currently pending transaction.
    ///
    /// Two-phase invariant: ALL sell-type transactions (sell, convert_out)
    /// settle before ANY buy-type transaction (buy, convert_in) is attempted,
    /// globally across users. A convert_in's order amount is produced by its
    /// paired convert_out in phase 1, so this ordering lets a convert pair
    /// submitted together settle in a single run. Do not collapse the two
    /// loops into one generic pass.
    pub async fn run(&self) -> Result<SettlementReport, sqlx::Error> {
        // The per-transaction get_position/mark_confirmed/upsert_position
        // sequence is not atomic in SQLite; overlapping runs would read stale
        // positions and lose updates. One run at a time.
        let _guard = self.run_lock.lock().await;

        let pending = self.repo.list_pending_transactions().await?;

        let mut redemptions = Vec::new();
        let mut subscriptions = Vec::new();
        for tx in pending {
            if tx.tx_type.is_redemption() {
                redemptions.push(tx);
            } else {
                subscriptions.push(tx);
            }
        }

        let mut report = SettlementReport::default();
        let mut affected: BTreeSet<UserId> = BTreeSet::new();

        for tx in &redemptions {
            let outcome = self.settle_redemption(tx, &mut subscriptions).await;
            self.record(tx, outcome, &mut report, &mut affected);
        }

        for tx in &subscriptions {
            let outcome = self.settle_subscription(tx).await;
            self.record(tx, outcome, &mut report, &mut affected);
        }

        if !affected.is_empty() {
            let users: Vec<UserId> = affected.into_iter().collect();
            self.events.positions_changed(&users).await;
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            "settlement run complete"
        );
        Ok(report)
    }

    /// Fold one per-transaction result into the run report. Unexpected errors
    /// are isolated here: one bad transaction never aborts the batch.
    fn record(
        &self,
        tx: &Transaction,
        outcome: Result<Outcome, sqlx::Error>,
        report: &mut SettlementReport,
        affected: &mut BTreeSet<UserId>,
    ) {
        match outcome {
            Ok(Outcome::Confirmed) => {
                report.processed += 1;
                affected.insert(tx.user_id.clone());
            }
            Ok(Outcome::Failed) => {
                report.processed += 1;
            }
            Ok(Outcome::Skipped(reason)) => {
                report.skipped += 1;
                report.skipped_reasons.push(reason);
            }
            Err(e) => {
                warn!(tx_id = %tx.id, fund = %tx.fund_code, error = %e, "settlement error for transaction");
                report.skipped += 1;
                report
                    .skipped_reasons
                    .push(format!("{}: unexpected error: {}", tx.id, e));
            }
        }
    }

    /// Phase 1: sells and convert_out legs.
    async fn settle_redemption(
        &self,
        tx: &Transaction,
        subscriptions: &mut [Transaction],
    ) -> Result<Outcome, sqlx::Error> {
        let Some(order_shares) = tx.order_shares else {
            return Ok(Outcome::Skipped(format!(
                "{}: redemption without order shares",
                tx.id
            )));
        };

        let Some(nav) = self.resolve_nav(&tx.fund_code, tx).await? else {
            return Ok(Outcome::Skipped(format!(
                "{}: missing NAV for {} on {}",
                tx.id, tx.fund_code, tx.order_date
            )));
        };

        let mut holding = self
            .repo
            .get_position(&tx.user_id, &tx.fund_code)
            .await?
            .map(|p| p.holding())
            .unwrap_or_else(HoldingState::empty);

        let outcome = match holding.apply_sell(order_shares, nav) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(tx_id = %tx.id, fund = %tx.fund_code, %e, "redemption failed");
                self.repo.mark_failed(&tx.id, "insufficient position").await?;
                return Ok(Outcome::Failed);
            }
        };

        // Mark first: if the row is no longer pending the run that got there
        // first already owns the position update.
        let transitioned = self
            .repo
            .mark_confirmed(&tx.id, outcome.proceeds, order_shares, nav)
            .await?;
        if !transitioned {
            return Ok(Outcome::Skipped(format!("{}: already settled", tx.id)));
        }

        self.repo
            .upsert_position(&tx.user_id, &tx.fund_code, holding.shares, holding.average_cost)
            .await?;

        // Still within phase 1: hand the proceeds to the paired convert_in so
        // phase 2 can settle it in this same run.
        if tx.tx_type == TxType::ConvertOut {
            self.repo
                .set_linked_order_amount(&tx.id, outcome.proceeds)
                .await?;
            for sub in subscriptions.iter_mut() {
                if sub.related_id.as_deref() == Some(tx.id.as_str()) {
                    sub.order_amount = Some(outcome.proceeds);
                }
            }
        }

        Ok(Outcome::Confirmed)
    }

    /// Phase 2: buys and convert_in legs.
    async fn settle_subscription(&self, tx: &Transaction) -> Result<Outcome, sqlx::Error> {
        let Some(order_amount) = tx.order_amount else {
            // The paired convert_out has not settled yet (earlier run skipped
            // it); retry once it has.
            return Ok(Outcome::Skipped(format!(
                "{}: awaiting linked redemption proceeds",
                tx.id
            )));
        };

        let Some(nav) = self.resolve_nav(&tx.fund_code, tx).await? else {
            return Ok(Outcome::Skipped(format!(
                "{}: missing NAV for {} on {}",
                tx.id, tx.fund_code, tx.order_date
            )));
        };

        let mut holding = self
            .repo
            .get_position(&tx.user_id, &tx.fund_code)
            .await?
            .map(|p| p.holding())
            .unwrap_or_else(HoldingState::empty);

        let confirmed_shares = holding.apply_buy(order_amount, nav);

        let transitioned = self
            .repo
            .mark_confirmed(&tx.id, order_amount, confirmed_shares, nav)
            .await?;
        if !transitioned {
            return Ok(Outcome::Skipped(format!("{}: already settled", tx.id)));
        }

        self.repo
            .upsert_position(&tx.user_id, &tx.fund_code, holding.shares, holding.average_cost)
            .await?;

        Ok(Outcome::Confirmed)
    }

    /// A usable NAV for the order date, or None if absent or non-positive.
    async fn resolve_nav(
        &self,
        fund: &FundCode,
        tx: &Transaction,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        let nav = self.repo.get_nav(fund, tx.order_date).await?;
        Ok(nav.filter(|n| n.is_positive()))
    }
}
