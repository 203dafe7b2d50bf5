//! Position ledger operations for the repository.
//!
//! Positions are written only by the settlement engine; everything else
//! treats this table as read-only.

use crate::domain::{Decimal, FundCode, Position, UserId};
use chrono::Utc;
use sqlx::Row;

use super::{parse_opt_decimal, Repository};

impl Repository {
    /// Fetch the position for a (user, fund) pair.
    pub async fn get_position(
        &self,
        user: &UserId,
        fund: &FundCode,
    ) -> Result<Option<Position>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT user_id, fund_code, shares, average_cost FROM positions WHERE user_id = ? AND fund_code = ?",
        )
        .bind(user.as_str())
        .bind(fund.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(position_from_row))
    }

    /// Create or update a position row with the settled shares and cost.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_position(
        &self,
        user: &UserId,
        fund: &FundCode,
        shares: Decimal,
        average_cost: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO positions (user_id, fund_code, shares, average_cost, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, fund_code) DO UPDATE SET
                shares = excluded.shares,
                average_cost = excluded.average_cost,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user.as_str())
        .bind(fund.as_str())
        .bind(shares.to_canonical_string())
        .bind(average_cost.to_canonical_string())
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// All positions for a user, including watch-only rows.
    pub async fn list_positions(&self, user: &UserId) -> Result<Vec<Position>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT user_id, fund_code, shares, average_cost FROM positions WHERE user_id = ? ORDER BY fund_code ASC",
        )
        .bind(user.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(position_from_row).collect())
    }
}

fn position_from_row(row: sqlx::sqlite::SqliteRow) -> Position {
    let user_id: String = row.get("user_id");
    let fund_code: String = row.get("fund_code");
    Position {
        user_id: UserId::new(user_id),
        fund_code: FundCode::new(fund_code),
        shares: parse_opt_decimal("shares", row.get("shares")),
        average_cost: parse_opt_decimal("average_cost", row.get("average_cost")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let (repo, _temp) = setup_test_db().await;

        let user = UserId::new("u1");
        let fund = FundCode::new("110022");

        assert!(repo.get_position(&user, &fund).await.unwrap().is_none());

        repo.upsert_position(&user, &fund, d("500"), d("2.00")).await.unwrap();
        let p = repo.get_position(&user, &fund).await.unwrap().unwrap();
        assert_eq!(p.shares, Some(d("500")));
        assert_eq!(p.average_cost, Some(d("2.00")));

        repo.upsert_position(&user, &fund, d("900"), d("2.2222")).await.unwrap();
        let p = repo.get_position(&user, &fund).await.unwrap().unwrap();
        assert_eq!(p.shares, Some(d("900")));
        assert_eq!(p.average_cost, Some(d("2.2222")));
    }

    #[tokio::test]
    async fn test_list_positions_scoped_to_user() {
        let (repo, _temp) = setup_test_db().await;

        repo.upsert_position(&UserId::new("u1"), &FundCode::new("110022"), d("500"), d("2.00"))
            .await
            .unwrap();
        repo.upsert_position(&UserId::new("u1"), &FundCode::new("161725"), d("100"), d("3.00"))
            .await
            .unwrap();
        repo.upsert_position(&UserId::new("u2"), &FundCode::new("110022"), d("7"), d("1.00"))
            .await
            .unwrap();

        let positions = repo.list_positions(&UserId::new("u1")).await.unwrap();
        assert_eq!(positions.len(), 2);
        assert!(positions.iter().all(|p| p.user_id == UserId::new("u1")));
    }
}
