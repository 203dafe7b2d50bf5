//! External NAV sync boundary and fund metadata queries.

use crate::api::AppState;
use crate::domain::{Decimal, Fund, FundCode, NavRecord};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavUpload {
    pub fund_code: String,
    pub nav_date: NaiveDate,
    pub nav: Decimal,
    pub name: Option<String>,
    pub estimate_nav: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct NavSyncRequest {
    pub records: Vec<NavUpload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavSyncResponse {
    pub inserted: usize,
}

/// Ingest a batch of daily NAV prints and refresh fund metadata.
///
/// The NAV ledger is append-only; re-uploading an existing (fund, date)
/// print is a no-op. Fund metadata (last NAV, day change, estimate) follows
/// the newest record per fund in the batch.
pub async fn post_navs(
    State(state): State<AppState>,
    Json(request): Json<NavSyncRequest>,
) -> Result<Json<NavSyncResponse>, AppError> {
    let mut records = Vec::with_capacity(request.records.len());
    let mut per_fund: BTreeMap<FundCode, Vec<&NavUpload>> = BTreeMap::new();

    for upload in &request.records {
        if !upload.nav.is_positive() {
            return Err(AppError::BadRequest(format!(
                "nav must be positive for {} on {}",
                upload.fund_code, upload.nav_date
            )));
        }
        let code = FundCode::new(upload.fund_code.clone());
        records.push(NavRecord::new(code.clone(), upload.nav_date, upload.nav));
        per_fund.entry(code).or_default().push(upload);
    }

    let inserted = state.repo.insert_nav_records_batch(&records).await?;

    for (code, mut uploads) in per_fund {
        uploads.sort_by_key(|u| u.nav_date);
        let latest = uploads.last().expect("per_fund groups are non-empty");

        // Day change against the prior print: previous batch entry if the
        // batch has one, else whatever the fund last recorded.
        let previous_nav = if uploads.len() >= 2 {
            Some(uploads[uploads.len() - 2].nav)
        } else {
            state
                .repo
                .get_fund(&code)
                .await?
                .and_then(|f| f.yesterday_nav)
        };
        let percentage_change = previous_nav
            .filter(|prev| prev.is_positive())
            .map(|prev| {
                (latest.nav - prev) / prev * Decimal::from_str_canonical("100").expect("100 is a valid decimal")
            });

        state
            .repo
            .upsert_fund(&Fund {
                code,
                name: latest.name.clone(),
                yesterday_nav: Some(latest.nav),
                today_estimate_nav: latest.estimate_nav,
                percentage_change,
            })
            .await?;
    }

    Ok(Json(NavSyncResponse { inserted }))
}

#[derive(Debug, Serialize)]
pub struct FundsResponse {
    pub funds: Vec<Fund>,
}

pub async fn get_funds(State(state): State<AppState>) -> Result<Json<FundsResponse>, AppError> {
    let funds = state.repo.list_funds().await?;
    Ok(Json(FundsResponse { funds }))
}
