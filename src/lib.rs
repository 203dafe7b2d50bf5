pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::Config;
pub use db::{init_db, NavHistory, Repository};
pub use domain::{
    DailyProfitPoint, Decimal, Fund, FundCode, HoldingState, NavRecord, OrderRequest, Position,
    ProfitAnalysis, ProfitSummary, Transaction, TxStatus, TxType, UserId,
};
pub use engine::{
    clamp_buy_proposals, BuyProposal, LogEventSink, PositionEventSink, ProfitAnalyzer,
    SettlementEngine, SettlementReport,
};
pub use error::AppError;
