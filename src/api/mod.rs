pub mod funds;
pub mod health;
pub mod positions;
pub mod profit;
pub mod settlement;
pub mod transactions;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::{ProfitAnalyzer, SettlementEngine};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub settlement: Arc<SettlementEngine>,
    pub analyzer: Arc<ProfitAnalyzer>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        settlement: Arc<SettlementEngine>,
        analyzer: Arc<ProfitAnalyzer>,
    ) -> Self {
        Self {
            repo,
            config,
            settlement,
            analyzer,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/navs", post(funds::post_navs))
        .route("/v1/funds", get(funds::get_funds))
        .route("/v1/positions", get(positions::get_positions))
        .route(
            "/v1/transactions",
            get(transactions::get_transactions).post(transactions::post_transaction),
        )
        .route(
            "/v1/transactions/proposals",
            post(transactions::post_proposals),
        )
        .route("/v1/settlement/run", post(settlement::run_settlement))
        .route("/v1/profit/analysis", get(profit::get_profit_analysis))
        .layer(cors)
        .with_state(state)
}
