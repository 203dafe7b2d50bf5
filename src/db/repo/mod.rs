//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `navs.rs` - Fund metadata and NAV ledger operations
//! - `transactions.rs` - Transaction log operations
//! - `positions.rs` - Position ledger operations

mod navs;
mod positions;
mod transactions;

pub use navs::NavHistory;

use crate::domain::Decimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse a stored decimal string, logging and defaulting to zero on
/// corruption rather than failing the whole query.
pub(crate) fn parse_decimal(field: &str, raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!(field, raw, error = %e, "Failed to parse stored decimal, using zero");
        Decimal::default()
    })
}

pub(crate) fn parse_opt_decimal(field: &str, raw: Option<String>) -> Option<Decimal> {
    raw.map(|s| parse_decimal(field, &s))
}

pub(crate) fn parse_date(field: &str, raw: &str) -> NaiveDate {
    NaiveDate::from_str(raw).unwrap_or_else(|e| {
        warn!(field, raw, error = %e, "Failed to parse stored date, using epoch");
        NaiveDate::default()
    })
}

pub(crate) fn parse_datetime(field: &str, raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!(field, raw, error = %e, "Failed to parse stored timestamp, using epoch");
            DateTime::<Utc>::UNIX_EPOCH
        })
}
