use crate::api::AppState;
use crate::domain::{ProfitAnalysis, UserId};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitQuery {
    pub user_id: String,
}

/// Rebuild the user's daily profit series from confirmed history, as of today.
pub async fn get_profit_analysis(
    Query(params): Query<ProfitQuery>,
    State(state): State<AppState>,
) -> Result<Json<ProfitAnalysis>, AppError> {
    if params.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("userId must not be empty".into()));
    }
    let user = UserId::new(params.user_id);

    let analysis = state
        .analyzer
        .compute(&user, Utc::now().date_naive())
        .await?;
    Ok(Json(analysis))
}
