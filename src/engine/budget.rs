//! Budget guard: clamps proposed buy amounts to a hard cash ceiling.
//!
//! Automated order producers are untrusted input; this runs before any of
//! their proposals become pending transactions.

use crate::domain::{Decimal, FundCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Below this headroom a proposal is dropped instead of shrunk; a residual
/// buy of a few currency units is not worth placing.
pub const MIN_ALLOCATION: &str = "10";

/// One proposed buy from an automated producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyProposal {
    pub fund_code: FundCode,
    pub amount: Decimal,
}

/// Walk proposals in order, never letting the committed total exceed
/// `ceiling`. A proposal that would overshoot is shrunk to the remaining
/// headroom if that headroom is worth allocating, otherwise dropped.
/// Non-positive amounts are dropped outright.
pub fn clamp_buy_proposals(proposals: Vec<BuyProposal>, ceiling: Decimal) -> Vec<BuyProposal> {
    let min_allocation =
        Decimal::from_str_canonical(MIN_ALLOCATION).expect("min allocation is a valid decimal");

    let mut committed = Decimal::zero();
    let mut accepted = Vec::new();

    for mut proposal in proposals {
        if !proposal.amount.is_positive() {
            warn!(fund = %proposal.fund_code, amount = %proposal.amount, "dropping non-positive buy proposal");
            continue;
        }

        let headroom = ceiling - committed;
        if proposal.amount <= headroom {
            committed = committed + proposal.amount;
            accepted.push(proposal);
        } else if headroom > min_allocation {
            warn!(
                fund = %proposal.fund_code,
                requested = %proposal.amount,
                clamped = %headroom,
                "shrinking buy proposal to remaining headroom"
            );
            proposal.amount = headroom;
            committed = ceiling;
            accepted.push(proposal);
        } else {
            warn!(
                fund = %proposal.fund_code,
                requested = %proposal.amount,
                headroom = %headroom,
                "dropping buy proposal over budget"
            );
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn proposal(fund: &str, amount: &str) -> BuyProposal {
        BuyProposal {
            fund_code: FundCode::new(fund),
            amount: d(amount),
        }
    }

    fn total(proposals: &[BuyProposal]) -> Decimal {
        proposals
            .iter()
            .fold(Decimal::zero(), |acc, p| acc + p.amount)
    }

    #[test]
    fn test_under_budget_passes_through() {
        let result = clamp_buy_proposals(
            vec![proposal("A", "300"), proposal("B", "200")],
            d("1000"),
        );
        assert_eq!(result.len(), 2);
        assert_eq!(total(&result), d("500"));
    }

    #[test]
    fn test_overshooting_proposal_is_shrunk_to_headroom() {
        let result = clamp_buy_proposals(
            vec![proposal("A", "800"), proposal("B", "500")],
            d("1000"),
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].amount, d("200"));
        assert_eq!(total(&result), d("1000"));
    }

    #[test]
    fn test_tiny_headroom_drops_instead_of_shrinking() {
        // Headroom of 5 is below the minimum allocation.
        let result = clamp_buy_proposals(
            vec![proposal("A", "995"), proposal("B", "500")],
            d("1000"),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(total(&result), d("995"));
    }

    #[test]
    fn test_nothing_accepted_after_ceiling_reached() {
        let result = clamp_buy_proposals(
            vec![proposal("A", "1000"), proposal("B", "50"), proposal("C", "50")],
            d("1000"),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(total(&result), d("1000"));
    }

    #[test]
    fn test_non_positive_amounts_dropped() {
        let result = clamp_buy_proposals(
            vec![proposal("A", "0"), proposal("B", "-20"), proposal("C", "100")],
            d("1000"),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].fund_code, FundCode::new("C"));
    }

    #[test]
    fn test_total_never_exceeds_ceiling() {
        let proposals = vec![
            proposal("A", "333.33"),
            proposal("B", "333.33"),
            proposal("C", "333.33"),
            proposal("D", "333.33"),
        ];
        let result = clamp_buy_proposals(proposals, d("1000"));
        assert!(total(&result) <= d("1000"));
    }

    #[test]
    fn test_zero_ceiling_accepts_nothing() {
        let result = clamp_buy_proposals(vec![proposal("A", "100")], d("0"));
        assert!(result.is_empty());
    }
}
