//! Domain types for the fund ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: UserId, FundCode, TxType, TxStatus
//! - Fund metadata and the append-only NAV record
//! - Transaction log entries and boundary-validated order requests
//! - Position rows and the pure holding-state arithmetic
//! - Derived profit-analysis output types

pub mod decimal;
pub mod fund;
pub mod position;
pub mod primitives;
pub mod profit;
pub mod transaction;

pub use decimal::{Decimal, DUST_THRESHOLD};
pub use fund::{Fund, NavRecord};
pub use position::{HoldingState, InsufficientShares, Position, SellOutcome};
pub use primitives::{FundCode, TxStatus, TxType, UserId};
pub use profit::{DailyProfitPoint, ProfitAnalysis, ProfitSummary};
pub use transaction::{OrderError, OrderRequest, Transaction};
