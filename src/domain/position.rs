//! Position ledger rows and the pure holding-state arithmetic shared by the
//! settlement and replay engines.

use crate::domain::{Decimal, FundCode, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current state of a (user, fund) position as persisted in the ledger.
///
/// `shares == None` means watch-only (the user tracks the fund without a
/// position). Invariant: shares == 0 implies average_cost == 0 or None.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub user_id: UserId,
    pub fund_code: FundCode,
    pub shares: Option<Decimal>,
    pub average_cost: Option<Decimal>,
}

impl Position {
    /// View the row as a holding state, treating watch-only as flat.
    pub fn holding(&self) -> HoldingState {
        HoldingState {
            shares: self.shares.unwrap_or_else(Decimal::zero),
            average_cost: self.average_cost.unwrap_or_else(Decimal::zero),
        }
    }
}

/// Attempt to redeem more shares than the position holds.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("insufficient position: requested {requested}, held {held}")]
pub struct InsufficientShares {
    pub requested: Decimal,
    pub held: Decimal,
}

/// Result of a settled redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellOutcome {
    /// Cash received: shares x nav.
    pub proceeds: Decimal,
    /// Cost basis of the shares sold: shares x average_cost.
    pub cost_of_sold: Decimal,
    /// Realized profit: proceeds - cost_of_sold.
    pub realized_profit: Decimal,
}

/// Mutable {shares, average_cost} record.
///
/// The settlement engine applies it to live ledger rows; the replay engine
/// keeps a replay-local arena of these to reconstruct point-in-time cost
/// basis. Invariant: shares >= 0, and shares == 0 implies average_cost == 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoldingState {
    pub shares: Decimal,
    pub average_cost: Decimal,
}

impl HoldingState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.shares.is_zero()
    }

    /// shares x price.
    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.shares * price
    }

    /// shares x average_cost.
    pub fn cost_value(&self) -> Decimal {
        self.shares * self.average_cost
    }

    /// Apply a settled subscription of `amount` cash at `nav`.
    ///
    /// Returns the shares credited (amount / nav). On a first buy the average
    /// cost is the nav itself; otherwise it is the shares-weighted blend of
    /// old cost and new cash.
    pub fn apply_buy(&mut self, amount: Decimal, nav: Decimal) -> Decimal {
        let bought = amount / nav;
        if self.shares.is_zero() {
            self.shares = bought;
            self.average_cost = nav;
        } else {
            let new_shares = self.shares + bought;
            self.average_cost = (self.shares * self.average_cost + amount) / new_shares;
            self.shares = new_shares;
        }
        bought
    }

    /// Apply a settled redemption of `shares` at `nav`.
    ///
    /// The average cost of whatever remains is untouched; only buys move it.
    /// A remainder below the dust threshold collapses to an exactly-zero
    /// position.
    pub fn apply_sell(
        &mut self,
        shares: Decimal,
        nav: Decimal,
    ) -> Result<SellOutcome, InsufficientShares> {
        if shares > self.shares {
            return Err(InsufficientShares {
                requested: shares,
                held: self.shares,
            });
        }

        let proceeds = shares * nav;
        let cost_of_sold = shares * self.average_cost;

        let remaining = self.shares - shares;
        if remaining.is_dust() {
            self.shares = Decimal::zero();
            self.average_cost = Decimal::zero();
        } else {
            self.shares = remaining;
        }

        Ok(SellOutcome {
            proceeds,
            cost_of_sold,
            realized_profit: proceeds - cost_of_sold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_first_buy_sets_cost_to_nav() {
        // 1000 cash at nav 2.00 -> 500 shares at cost 2.00.
        let mut h = HoldingState::empty();
        let bought = h.apply_buy(d("1000"), d("2.00"));
        assert_eq!(bought, d("500"));
        assert_eq!(h.shares, d("500"));
        assert_eq!(h.average_cost, d("2.00"));
    }

    #[test]
    fn test_second_buy_blends_weighted_average() {
        // 500 shares at 2.00, then 1000 cash at 2.50 -> 900 shares at 2000/900.
        let mut h = HoldingState::empty();
        h.apply_buy(d("1000"), d("2.00"));
        let bought = h.apply_buy(d("1000"), d("2.50"));
        assert_eq!(bought, d("400"));
        assert_eq!(h.shares, d("900"));
        assert_eq!(h.average_cost, d("2000") / d("900"));
    }

    #[test]
    fn test_sell_preserves_average_cost() {
        let mut h = HoldingState::empty();
        h.apply_buy(d("1000"), d("2.00"));
        h.apply_buy(d("1000"), d("2.50"));
        let cost_before = h.average_cost;

        let outcome = h.apply_sell(d("300"), d("2.10")).unwrap();
        assert_eq!(outcome.proceeds, d("630"));
        assert_eq!(outcome.cost_of_sold, d("300") * cost_before);
        assert_eq!(outcome.realized_profit, d("630") - d("300") * cost_before);
        assert_eq!(h.shares, d("600"));
        assert_eq!(h.average_cost, cost_before);
    }

    #[test]
    fn test_sell_more_than_held_is_rejected() {
        let mut h = HoldingState::empty();
        h.apply_buy(d("1000"), d("2.00"));
        let err = h.apply_sell(d("501"), d("2.00")).unwrap_err();
        assert_eq!(err.requested, d("501"));
        assert_eq!(err.held, d("500"));
        // State untouched on failure.
        assert_eq!(h.shares, d("500"));
    }

    #[test]
    fn test_dust_remainder_collapses_to_zero() {
        let mut h = HoldingState::empty();
        h.apply_buy(d("1000"), d("2.00"));
        h.apply_sell(d("499.99995"), d("2.00")).unwrap();
        assert!(h.is_flat());
        assert_eq!(h.shares, Decimal::zero());
        assert_eq!(h.average_cost, Decimal::zero());
    }

    #[test]
    fn test_buy_only_sequence_matches_total_cost_over_total_shares() {
        // Weighted-average invariance: any buy-only sequence ends at
        // total invested / total shares.
        let buys = [("1000", "2.00"), ("500", "2.50"), ("2500", "1.60"), ("10", "3.33")];

        let mut h = HoldingState::empty();
        let mut total_cost = Decimal::zero();
        let mut total_shares = Decimal::zero();
        for (amount, nav) in buys {
            let bought = h.apply_buy(d(amount), d(nav));
            total_cost = total_cost + d(amount);
            total_shares = total_shares + bought;
        }

        assert_eq!(h.shares, total_shares);
        assert_eq!(h.average_cost, total_cost / total_shares);
    }

    #[test]
    fn test_full_liquidation_resets_cost() {
        let mut h = HoldingState::empty();
        h.apply_buy(d("1000"), d("2.00"));
        let outcome = h.apply_sell(d("500"), d("2.50")).unwrap();
        assert_eq!(outcome.realized_profit, d("250"));
        assert!(h.is_flat());
        assert_eq!(h.average_cost, Decimal::zero());
    }

    #[test]
    fn test_position_holding_treats_watch_only_as_flat() {
        let p = Position {
            user_id: UserId::new("u1"),
            fund_code: FundCode::new("110022"),
            shares: None,
            average_cost: None,
        };
        assert!(p.holding().is_flat());
    }
}
