//! Transaction log entries and the boundary-validated order request type.

use crate::domain::{Decimal, FundCode, TxStatus, TxType, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One entry in the append-only transaction log.
///
/// Created `pending`; the settlement engine transitions it exactly once to
/// `confirmed` or `failed`, after which it is a historical fact the replay
/// engine consumes and nothing mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: UserId,
    pub fund_code: FundCode,
    pub tx_type: TxType,
    pub status: TxStatus,
    /// The date whose NAV prices this order.
    pub order_date: NaiveDate,
    /// Cash amount for buy/convert_in. A convert_in starts with `None` until
    /// its paired convert_out settles.
    pub order_amount: Option<Decimal>,
    /// Share count for sell/convert_out.
    pub order_shares: Option<Decimal>,
    /// For a convert_in, the id of its paired convert_out leg.
    pub related_id: Option<String>,
    pub confirmed_amount: Option<Decimal>,
    pub confirmed_shares: Option<Decimal>,
    pub confirmed_nav: Option<Decimal>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validation failures for incoming order requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("order shares must be positive, got {0}")]
    NonPositiveShares(Decimal),
    #[error("convert legs must reference different funds")]
    ConvertSameFund,
}

/// A validated order request, the only way pending transactions are created.
///
/// Untyped upstream payloads (user input, automated decision output) are
/// parsed into this sum type at the boundary; the settlement engine never
/// sees unvalidated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderRequest {
    #[serde(rename_all = "camelCase")]
    Buy {
        user_id: UserId,
        fund_code: FundCode,
        order_date: NaiveDate,
        amount: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Sell {
        user_id: UserId,
        fund_code: FundCode,
        order_date: NaiveDate,
        shares: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Convert {
        user_id: UserId,
        from_fund: FundCode,
        to_fund: FundCode,
        order_date: NaiveDate,
        shares: Decimal,
    },
}

impl OrderRequest {
    /// Validate the request and build the pending transaction row(s).
    ///
    /// A convert produces two linked rows: the out leg carrying the shares,
    /// and the in leg with no amount yet, pointing back at the out leg via
    /// `related_id`.
    pub fn into_pending(self) -> Result<Vec<Transaction>, OrderError> {
        let now = Utc::now();
        match self {
            OrderRequest::Buy {
                user_id,
                fund_code,
                order_date,
                amount,
            } => {
                if !amount.is_positive() {
                    return Err(OrderError::NonPositiveAmount(amount));
                }
                Ok(vec![Transaction {
                    id: Uuid::new_v4().to_string(),
                    user_id,
                    fund_code,
                    tx_type: TxType::Buy,
                    status: TxStatus::Pending,
                    order_date,
                    order_amount: Some(amount),
                    order_shares: None,
                    related_id: None,
                    confirmed_amount: None,
                    confirmed_shares: None,
                    confirmed_nav: None,
                    confirmed_at: None,
                    note: None,
                    created_at: now,
                }])
            }
            OrderRequest::Sell {
                user_id,
                fund_code,
                order_date,
                shares,
            } => {
                if !shares.is_positive() {
                    return Err(OrderError::NonPositiveShares(shares));
                }
                Ok(vec![Transaction {
                    id: Uuid::new_v4().to_string(),
                    user_id,
                    fund_code,
                    tx_type: TxType::Sell,
                    status: TxStatus::Pending,
                    order_date,
                    order_amount: None,
                    order_shares: Some(shares),
                    related_id: None,
                    confirmed_amount: None,
                    confirmed_shares: None,
                    confirmed_nav: None,
                    confirmed_at: None,
                    note: None,
                    created_at: now,
                }])
            }
            OrderRequest::Convert {
                user_id,
                from_fund,
                to_fund,
                order_date,
                shares,
            } => {
                if !shares.is_positive() {
                    return Err(OrderError::NonPositiveShares(shares));
                }
                if from_fund == to_fund {
                    return Err(OrderError::ConvertSameFund);
                }
                let out_id = Uuid::new_v4().to_string();
                let out_leg = Transaction {
                    id: out_id.clone(),
                    user_id: user_id.clone(),
                    fund_code: from_fund,
                    tx_type: TxType::ConvertOut,
                    status: TxStatus::Pending,
                    order_date,
                    order_amount: None,
                    order_shares: Some(shares),
                    related_id: None,
                    confirmed_amount: None,
                    confirmed_shares: None,
                    confirmed_nav: None,
                    confirmed_at: None,
                    note: None,
                    created_at: now,
                };
                let in_leg = Transaction {
                    id: Uuid::new_v4().to_string(),
                    user_id,
                    fund_code: to_fund,
                    tx_type: TxType::ConvertIn,
                    status: TxStatus::Pending,
                    order_date,
                    // Filled in when the out leg settles.
                    order_amount: None,
                    order_shares: None,
                    related_id: Some(out_id),
                    confirmed_amount: None,
                    confirmed_shares: None,
                    confirmed_nav: None,
                    confirmed_at: None,
                    note: None,
                    created_at: now,
                };
                Ok(vec![out_leg, in_leg])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn test_buy_request_populates_amount_only() {
        let txs = OrderRequest::Buy {
            user_id: UserId::new("u1"),
            fund_code: FundCode::new("110022"),
            order_date: date("2024-03-01"),
            amount: d("1000"),
        }
        .into_pending()
        .unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_type, TxType::Buy);
        assert_eq!(txs[0].status, TxStatus::Pending);
        assert_eq!(txs[0].order_amount, Some(d("1000")));
        assert_eq!(txs[0].order_shares, None);
    }

    #[test]
    fn test_sell_request_populates_shares_only() {
        let txs = OrderRequest::Sell {
            user_id: UserId::new("u1"),
            fund_code: FundCode::new("110022"),
            order_date: date("2024-03-01"),
            shares: d("300"),
        }
        .into_pending()
        .unwrap();

        assert_eq!(txs[0].tx_type, TxType::Sell);
        assert_eq!(txs[0].order_shares, Some(d("300")));
        assert_eq!(txs[0].order_amount, None);
    }

    #[test]
    fn test_convert_request_creates_linked_pair() {
        let txs = OrderRequest::Convert {
            user_id: UserId::new("u1"),
            from_fund: FundCode::new("110022"),
            to_fund: FundCode::new("161725"),
            order_date: date("2024-03-01"),
            shares: d("200"),
        }
        .into_pending()
        .unwrap();

        assert_eq!(txs.len(), 2);
        let out = &txs[0];
        let inn = &txs[1];
        assert_eq!(out.tx_type, TxType::ConvertOut);
        assert_eq!(out.order_shares, Some(d("200")));
        assert_eq!(inn.tx_type, TxType::ConvertIn);
        assert_eq!(inn.order_amount, None);
        assert_eq!(inn.related_id, Some(out.id.clone()));
        assert_eq!(inn.order_date, out.order_date);
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let err = OrderRequest::Buy {
            user_id: UserId::new("u1"),
            fund_code: FundCode::new("110022"),
            order_date: date("2024-03-01"),
            amount: d("0"),
        }
        .into_pending()
        .unwrap_err();
        assert_eq!(err, OrderError::NonPositiveAmount(d("0")));

        let err = OrderRequest::Sell {
            user_id: UserId::new("u1"),
            fund_code: FundCode::new("110022"),
            order_date: date("2024-03-01"),
            shares: d("-5"),
        }
        .into_pending()
        .unwrap_err();
        assert_eq!(err, OrderError::NonPositiveShares(d("-5")));
    }

    #[test]
    fn test_rejects_convert_to_same_fund() {
        let err = OrderRequest::Convert {
            user_id: UserId::new("u1"),
            from_fund: FundCode::new("110022"),
            to_fund: FundCode::new("110022"),
            order_date: date("2024-03-01"),
            shares: d("100"),
        }
        .into_pending()
        .unwrap_err();
        assert_eq!(err, OrderError::ConvertSameFund);
    }

    #[test]
    fn test_order_request_tagged_deserialization() {
        let json = r#"{
            "type": "convert",
            "userId": "u1",
            "fromFund": "110022",
            "toFund": "161725",
            "orderDate": "2024-03-01",
            "shares": 200
        }"#;
        let req: OrderRequest = serde_json::from_str(json).unwrap();
        match req {
            OrderRequest::Convert { shares, .. } => assert_eq!(shares, d("200")),
            other => panic!("expected convert, got {:?}", other),
        }
    }
}
