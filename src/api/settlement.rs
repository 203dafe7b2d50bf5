use crate::api::AppState;
use crate::engine::SettlementReport;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;

/// Run one settlement pass over all pending transactions.
pub async fn run_settlement(
    State(state): State<AppState>,
) -> Result<Json<SettlementReport>, AppError> {
    let report = state.settlement.run().await?;
    Ok(Json(report))
}
