//! Order creation and transaction log queries.

use crate::api::AppState;
use crate::domain::{Decimal, OrderRequest, Transaction, TxStatus, TxType, UserId};
use crate::engine::{clamp_buy_proposals, BuyProposal};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub user_id: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
}

pub async fn get_transactions(
    Query(params): Query<TransactionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    if params.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("userId must not be empty".into()));
    }
    let user = UserId::new(params.user_id);

    let status = match params.status.as_deref() {
        None => None,
        Some(s) => Some(
            TxStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", s)))?,
        ),
    };

    let transactions = state.repo.list_transactions(&user, status).await?;
    Ok(Json(TransactionsResponse { transactions }))
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub transactions: Vec<Transaction>,
}

/// Create pending transaction(s) from a validated order request.
///
/// A convert request creates both legs atomically.
pub async fn post_transaction(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<CreatedResponse>, AppError> {
    let transactions = request.into_pending()?;
    state.repo.insert_transactions_batch(&transactions).await?;
    Ok(Json(CreatedResponse { transactions }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalsRequest {
    pub user_id: String,
    pub order_date: NaiveDate,
    /// Hard cash ceiling the accepted proposals may not exceed in total.
    pub cash_ceiling: Decimal,
    pub proposals: Vec<BuyProposal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalsResponse {
    pub accepted: Vec<BuyProposal>,
    pub transactions: Vec<Transaction>,
}

/// Automated-producer boundary: clamp proposed buys to the cash ceiling,
/// then insert the survivors as pending buy orders.
pub async fn post_proposals(
    State(state): State<AppState>,
    Json(request): Json<ProposalsRequest>,
) -> Result<Json<ProposalsResponse>, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("userId must not be empty".into()));
    }
    if request.cash_ceiling.is_negative() {
        return Err(AppError::BadRequest("cashCeiling must not be negative".into()));
    }
    let user = UserId::new(request.user_id);

    let accepted = clamp_buy_proposals(request.proposals, request.cash_ceiling);

    let mut transactions = Vec::with_capacity(accepted.len());
    for proposal in &accepted {
        let mut txs = OrderRequest::Buy {
            user_id: user.clone(),
            fund_code: proposal.fund_code.clone(),
            order_date: request.order_date,
            amount: proposal.amount,
        }
        .into_pending()?;
        transactions.append(&mut txs);
    }
    debug_assert!(transactions.iter().all(|t| t.tx_type == TxType::Buy));

    state.repo.insert_transactions_batch(&transactions).await?;

    Ok(Json(ProposalsResponse {
        accepted,
        transactions,
    }))
}
