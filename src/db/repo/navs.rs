//! Fund metadata and NAV ledger operations for the repository.

use crate::domain::{Decimal, Fund, FundCode, NavRecord};
use chrono::{NaiveDate, Utc};
use sqlx::Row;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use super::{parse_date, parse_decimal, parse_opt_decimal, Repository};

/// NAV history per fund, keyed by date. Input to the replay engine.
pub type NavHistory = HashMap<FundCode, BTreeMap<NaiveDate, Decimal>>;

impl Repository {
    /// Insert or refresh fund metadata.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_fund(&self, fund: &Fund) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO funds (code, name, yesterday_nav, today_estimate_nav, percentage_change, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(code) DO UPDATE SET
                name = COALESCE(excluded.name, funds.name),
                yesterday_nav = COALESCE(excluded.yesterday_nav, funds.yesterday_nav),
                today_estimate_nav = excluded.today_estimate_nav,
                percentage_change = COALESCE(excluded.percentage_change, funds.percentage_change),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(fund.code.as_str())
        .bind(fund.name.as_deref())
        .bind(fund.yesterday_nav.map(|d| d.to_canonical_string()))
        .bind(fund.today_estimate_nav.map(|d| d.to_canonical_string()))
        .bind(fund.percentage_change.map(|d| d.to_canonical_string()))
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Fetch a fund by code.
    pub async fn get_fund(&self, code: &FundCode) -> Result<Option<Fund>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT code, name, yesterday_nav, today_estimate_nav, percentage_change FROM funds WHERE code = ?",
        )
        .bind(code.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(fund_from_row))
    }

    /// List all funds known to the ledger.
    pub async fn list_funds(&self) -> Result<Vec<Fund>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT code, name, yesterday_nav, today_estimate_nav, percentage_change FROM funds ORDER BY code ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(fund_from_row).collect())
    }

    /// Insert a batch of daily NAV prints in a single transaction.
    ///
    /// The ledger is append-only: an existing (fund, date) print is left
    /// untouched. Records with nav <= 0 are skipped with a warning.
    /// Returns the number of newly inserted records.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_nav_records_batch(
        &self,
        records: &[NavRecord],
    ) -> Result<usize, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut total_inserted = 0usize;
        let mut tx = self.pool().begin().await?;

        for record in records {
            if !record.is_valid() {
                warn!(
                    fund = %record.fund_code,
                    nav_date = %record.nav_date,
                    nav = %record.nav,
                    "Skipping NAV record with non-positive nav"
                );
                continue;
            }

            let result = sqlx::query(
                r#"
                INSERT INTO nav_records (fund_code, nav_date, nav)
                VALUES (?, ?, ?)
                ON CONFLICT(fund_code, nav_date) DO NOTHING
                "#,
            )
            .bind(record.fund_code.as_str())
            .bind(record.nav_date.to_string())
            .bind(record.nav.to_canonical_string())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                total_inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    /// Look up the NAV for a fund on an exact date.
    pub async fn get_nav(
        &self,
        code: &FundCode,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        let row = sqlx::query("SELECT nav FROM nav_records WHERE fund_code = ? AND nav_date = ?")
            .bind(code.as_str())
            .bind(date.to_string())
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|r| {
            let nav_str: String = r.get("nav");
            parse_decimal("nav", &nav_str)
        }))
    }

    /// List all NAV prints for a fund, oldest first.
    pub async fn list_nav_records(&self, code: &FundCode) -> Result<Vec<NavRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT fund_code, nav_date, nav FROM nav_records WHERE fund_code = ? ORDER BY nav_date ASC",
        )
        .bind(code.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let fund_code: String = r.get("fund_code");
                let nav_date: String = r.get("nav_date");
                let nav: String = r.get("nav");
                NavRecord {
                    fund_code: FundCode::new(fund_code),
                    nav_date: parse_date("nav_date", &nav_date),
                    nav: parse_decimal("nav", &nav),
                }
            })
            .collect())
    }

    /// Load the full NAV history for a set of funds, for replay valuation.
    pub async fn nav_history_for_funds(
        &self,
        codes: &[FundCode],
    ) -> Result<NavHistory, sqlx::Error> {
        let mut history: NavHistory = HashMap::new();
        for code in codes {
            let records = self.list_nav_records(code).await?;
            let by_date = history.entry(code.clone()).or_default();
            for record in records {
                by_date.insert(record.nav_date, record.nav);
            }
        }
        Ok(history)
    }
}

fn fund_from_row(row: sqlx::sqlite::SqliteRow) -> Fund {
    let code: String = row.get("code");
    let name: Option<String> = row.get("name");
    let yesterday_nav: Option<String> = row.get("yesterday_nav");
    let today_estimate_nav: Option<String> = row.get("today_estimate_nav");
    let percentage_change: Option<String> = row.get("percentage_change");

    Fund {
        code: FundCode::new(code),
        name,
        yesterday_nav: parse_opt_decimal("yesterday_nav", yesterday_nav),
        today_estimate_nav: parse_opt_decimal("today_estimate_nav", today_estimate_nav),
        percentage_change: parse_opt_decimal("percentage_change", percentage_change),
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

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_nav_batch_insert_and_lookup() {
        let (repo, _temp) = setup_test_db().await;

        let code = FundCode::new("110022");
        let inserted = repo
            .insert_nav_records_batch(&[
                NavRecord::new(code.clone(), date("2024-03-01"), d("2.00")),
                NavRecord::new(code.clone(), date("2024-03-04"), d("2.50")),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let nav = repo.get_nav(&code, date("2024-03-01")).await.unwrap();
        assert_eq!(nav, Some(d("2.00")));

        let missing = repo.get_nav(&code, date("2024-03-02")).await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_nav_ledger_is_append_only() {
        let (repo, _temp) = setup_test_db().await;

        let code = FundCode::new("110022");
        let day = date("2024-03-01");
        repo.insert_nav_records_batch(&[NavRecord::new(code.clone(), day, d("2.00"))])
            .await
            .unwrap();

        // A second print for the same date does not overwrite the first.
        let inserted = repo
            .insert_nav_records_batch(&[NavRecord::new(code.clone(), day, d("9.99"))])
            .await
            .unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(repo.get_nav(&code, day).await.unwrap(), Some(d("2.00")));
    }

    #[tokio::test]
    async fn test_non_positive_nav_is_skipped() {
        let (repo, _temp) = setup_test_db().await;

        let code = FundCode::new("110022");
        let inserted = repo
            .insert_nav_records_batch(&[
                NavRecord::new(code.clone(), date("2024-03-01"), d("0")),
                NavRecord::new(code.clone(), date("2024-03-04"), d("1.5")),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(repo.get_nav(&code, date("2024-03-01")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_fund_refreshes_metadata() {
        let (repo, _temp) = setup_test_db().await;

        let code = FundCode::new("110022");
        repo.upsert_fund(&Fund {
            code: code.clone(),
            name: Some("Test Growth Fund".to_string()),
            yesterday_nav: Some(d("2.00")),
            today_estimate_nav: None,
            percentage_change: None,
        })
        .await
        .unwrap();

        repo.upsert_fund(&Fund {
            code: code.clone(),
            name: None,
            yesterday_nav: Some(d("2.50")),
            today_estimate_nav: Some(d("2.52")),
            percentage_change: Some(d("25")),
        })
        .await
        .unwrap();

        let fund = repo.get_fund(&code).await.unwrap().unwrap();
        // Name survives a metadata-only refresh.
        assert_eq!(fund.name.as_deref(), Some("Test Growth Fund"));
        assert_eq!(fund.yesterday_nav, Some(d("2.50")));
        assert_eq!(fund.today_estimate_nav, Some(d("2.52")));
        assert_eq!(fund.percentage_change, Some(d("25")));
    }

    #[tokio::test]
    async fn test_nav_history_for_funds() {
        let (repo, _temp) = setup_test_db().await;

        let x = FundCode::new("X");
        let y = FundCode::new("Y");
        repo.insert_nav_records_batch(&[
            NavRecord::new(x.clone(), date("2024-03-01"), d("2.00")),
            NavRecord::new(x.clone(), date("2024-03-04"), d("2.50")),
            NavRecord::new(y.clone(), date("2024-03-01"), d("1.50")),
        ])
        .await
        .unwrap();

        let history = repo
            .nav_history_for_funds(&[x.clone(), y.clone()])
            .await
            .unwrap();
        assert_eq!(history[&x].len(), 2);
        assert_eq!(history[&y][&date("2024-03-01")], d("1.50"));
    }
}
