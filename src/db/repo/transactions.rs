//! Transaction log operations for the repository.

use crate::domain::{Decimal, FundCode, Transaction, TxStatus, TxType, UserId};
use chrono::Utc;
use sqlx::Row;
use tracing::warn;

use super::{parse_date, parse_datetime, parse_opt_decimal, Repository};

const TX_COLUMNS: &str = "id, user_id, fund_code, tx_type, status, order_date, order_amount, \
     order_shares, related_id, confirmed_amount, confirmed_shares, confirmed_nav, confirmed_at, \
     note, created_at";

impl Repository {
    /// Insert a single pending transaction.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_transaction(&self, tx: &Transaction) -> Result<(), sqlx::Error> {
        let mut db_tx = self.pool().begin().await?;
        insert_one(&mut db_tx, tx).await?;
        db_tx.commit().await?;
        Ok(())
    }

    /// Insert several transactions atomically.
    ///
    /// Used for convert pairs (both legs or neither) and clamped proposal
    /// batches.
    pub async fn insert_transactions_batch(
        &self,
        txs: &[Transaction],
    ) -> Result<(), sqlx::Error> {
        if txs.is_empty() {
            return Ok(());
        }

        let mut db_tx = self.pool().begin().await?;
        for tx in txs {
            insert_one(&mut db_tx, tx).await?;
        }
        db_tx.commit().await?;
        Ok(())
    }

    /// All pending transactions across users, in creation order.
    pub async fn list_pending_transactions(&self) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE status = 'pending' ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().filter_map(tx_from_row).collect())
    }

    /// A user's confirmed history, ordered by order date ascending.
    /// This is the replay engine's source of truth.
    pub async fn list_confirmed_transactions(
        &self,
        user: &UserId,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE user_id = ? AND status = 'confirmed' \
             ORDER BY order_date ASC, created_at ASC, id ASC"
        ))
        .bind(user.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().filter_map(tx_from_row).collect())
    }

    /// A user's transactions, optionally filtered by status, newest first.
    pub async fn list_transactions(
        &self,
        user: &UserId,
        status: Option<TxStatus>,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {TX_COLUMNS} FROM transactions WHERE user_id = ? AND status = ? \
                     ORDER BY order_date DESC, created_at DESC"
                ))
                .bind(user.as_str())
                .bind(status.as_str())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {TX_COLUMNS} FROM transactions WHERE user_id = ? \
                     ORDER BY order_date DESC, created_at DESC"
                ))
                .bind(user.as_str())
                .fetch_all(self.pool())
                .await?
            }
        };

        Ok(rows.into_iter().filter_map(tx_from_row).collect())
    }

    /// Fetch one transaction by id.
    pub async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {TX_COLUMNS} FROM transactions WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.and_then(tx_from_row))
    }

    /// Transition a pending transaction to confirmed, stamping the settled
    /// amount, shares, nav and confirmation time.
    ///
    /// The status guard makes settlement idempotent: a row that is already
    /// confirmed or failed is never touched again. Returns whether a row
    /// transitioned.
    pub async fn mark_confirmed(
        &self,
        id: &str,
        amount: Decimal,
        shares: Decimal,
        nav: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'confirmed', confirmed_amount = ?, confirmed_shares = ?,
                confirmed_nav = ?, confirmed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(amount.to_canonical_string())
        .bind(shares.to_canonical_string())
        .bind(nav.to_canonical_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition a pending transaction to failed with a user-visible note.
    /// Terminal; failed rows are never retried.
    pub async fn mark_failed(&self, id: &str, note: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'failed', note = ?, confirmed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(note)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Propagate a settled convert_out's proceeds into its paired pending
    /// convert_in's order amount.
    pub async fn set_linked_order_amount(
        &self,
        convert_out_id: &str,
        amount: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET order_amount = ?
            WHERE related_id = ? AND tx_type = 'convert_in' AND status = 'pending'
            "#,
        )
        .bind(amount.to_canonical_string())
        .bind(convert_out_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fund codes appearing anywhere in a user's confirmed history.
    pub async fn distinct_fund_codes_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<FundCode>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT DISTINCT fund_code FROM transactions WHERE user_id = ? AND status = 'confirmed' ORDER BY fund_code ASC",
        )
        .bind(user.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let code: String = r.get("fund_code");
                FundCode::new(code)
            })
            .collect())
    }
}

async fn insert_one(
    db_tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    tx: &Transaction,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transactions
        (id, user_id, fund_code, tx_type, status, order_date, order_amount, order_shares,
         related_id, confirmed_amount, confirmed_shares, confirmed_nav, confirmed_at, note, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&tx.id)
    .bind(tx.user_id.as_str())
    .bind(tx.fund_code.as_str())
    .bind(tx.tx_type.as_str())
    .bind(tx.status.as_str())
    .bind(tx.order_date.to_string())
    .bind(tx.order_amount.map(|d| d.to_canonical_string()))
    .bind(tx.order_shares.map(|d| d.to_canonical_string()))
    .bind(tx.related_id.as_deref())
    .bind(tx.confirmed_amount.map(|d| d.to_canonical_string()))
    .bind(tx.confirmed_shares.map(|d| d.to_canonical_string()))
    .bind(tx.confirmed_nav.map(|d| d.to_canonical_string()))
    .bind(tx.confirmed_at.map(|t| t.to_rfc3339()))
    .bind(tx.note.as_deref())
    .bind(tx.created_at.to_rfc3339())
    .execute(&mut **db_tx)
    .await?;

    Ok(())
}

fn tx_from_row(row: sqlx::sqlite::SqliteRow) -> Option<Transaction> {
    let id: String = row.get("id");
    let tx_type_str: String = row.get("tx_type");
    let status_str: String = row.get("status");

    let Some(tx_type) = TxType::parse(&tx_type_str) else {
        warn!(id, tx_type = tx_type_str, "Skipping transaction with unknown type");
        return None;
    };
    let Some(status) = TxStatus::parse(&status_str) else {
        warn!(id, status = status_str, "Skipping transaction with unknown status");
        return None;
    };

    let user_id: String = row.get("user_id");
    let fund_code: String = row.get("fund_code");
    let order_date: String = row.get("order_date");
    let confirmed_at: Option<String> = row.get("confirmed_at");
    let created_at: String = row.get("created_at");

    Some(Transaction {
        id,
        user_id: UserId::new(user_id),
        fund_code: FundCode::new(fund_code),
        tx_type,
        status,
        order_date: parse_date("order_date", &order_date),
        order_amount: parse_opt_decimal("order_amount", row.get("order_amount")),
        order_shares: parse_opt_decimal("order_shares", row.get("order_shares")),
        related_id: row.get("related_id"),
        confirmed_amount: parse_opt_decimal("confirmed_amount", row.get("confirmed_amount")),
        confirmed_shares: parse_opt_decimal("confirmed_shares", row.get("confirmed_shares")),
        confirmed_nav: parse_opt_decimal("confirmed_nav", row.get("confirmed_nav")),
        confirmed_at: confirmed_at.map(|s| parse_datetime("confirmed_at", &s)),
        note: row.get("note"),
        created_at: parse_datetime("created_at", &created_at),
    })
}
