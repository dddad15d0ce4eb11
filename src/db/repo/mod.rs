//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `mod.rs` - Investor roster
//! - `state.rs` - Poll cursor, aggregate counter and cohort book
//! - `requests.rs` - Investor requests and the audit ledger

mod requests;
mod state;

pub use requests::StoredLedgerEntry;
pub use state::{BatchCommit, PollState};

use crate::domain::{ChatId, Decimal, Investor};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Executor, Row, Sqlite};
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

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Investor operations
    // =========================================================================

    /// Fetch one investor by chat id.
    pub async fn get_investor(&self, chat_id: ChatId) -> Result<Option<Investor>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT chat_id, name, deposit, pending_deposit, bonus_accrued, bonus_paid,
                   bonus_to_deposit, wallet, network, active, updated_at
            FROM investors
            WHERE chat_id = ?
            "#,
        )
        .bind(chat_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(investor_from_row))
    }

    /// All investors ordered by chat id, optionally only active ones.
    pub async fn list_investors(&self, active_only: bool) -> Result<Vec<Investor>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT chat_id, name, deposit, pending_deposit, bonus_accrued, bonus_paid,
                   bonus_to_deposit, wallet, network, active, updated_at
            FROM investors
            WHERE (? = 0 OR active = 1)
            ORDER BY chat_id ASC
            "#,
        )
        .bind(active_only as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(investor_from_row).collect())
    }

    /// Insert or fully overwrite an investor record.
    pub async fn upsert_investor(&self, investor: &Investor) -> Result<(), sqlx::Error> {
        write_investor(&self.pool, investor).await
    }

    /// Existing record, or a new active one named `name` (not yet stored).
    pub async fn investor_or_new(
        &self,
        chat_id: ChatId,
        name: &str,
    ) -> Result<Investor, sqlx::Error> {
        Ok(self
            .get_investor(chat_id)
            .await?
            .unwrap_or_else(|| Investor::new(chat_id, name)))
    }

    /// Sum of deposits of active investors.
    pub async fn total_active_deposit(&self) -> Result<Decimal, sqlx::Error> {
        Ok(self
            .list_investors(true)
            .await?
            .iter()
            .map(|inv| inv.deposit)
            .sum())
    }
}

pub(crate) async fn write_investor<'e, E>(executor: E, investor: &Investor) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO investors (
            chat_id, name, deposit, pending_deposit, bonus_accrued, bonus_paid,
            bonus_to_deposit, wallet, network, active, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(chat_id) DO UPDATE SET
            name = excluded.name,
            deposit = excluded.deposit,
            pending_deposit = excluded.pending_deposit,
            bonus_accrued = excluded.bonus_accrued,
            bonus_paid = excluded.bonus_paid,
            bonus_to_deposit = excluded.bonus_to_deposit,
            wallet = excluded.wallet,
            network = excluded.network,
            active = excluded.active,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(investor.chat_id.as_i64())
    .bind(&investor.name)
    .bind(investor.deposit.to_canonical_string())
    .bind(investor.pending_deposit.to_canonical_string())
    .bind(investor.bonus_accrued.to_canonical_string())
    .bind(investor.bonus_paid.to_canonical_string())
    .bind(investor.bonus_to_deposit.to_canonical_string())
    .bind(&investor.wallet)
    .bind(&investor.network)
    .bind(investor.active)
    .bind(investor.updated_at.timestamp_millis())
    .execute(executor)
    .await?;
    Ok(())
}

fn investor_from_row(row: &SqliteRow) -> Investor {
    let chat_id: i64 = row.get("chat_id");
    let active: i64 = row.get("active");
    let updated_at: i64 = row.get("updated_at");

    Investor {
        chat_id: ChatId::new(chat_id),
        name: row.get("name"),
        deposit: decimal_column(row, "deposit"),
        pending_deposit: decimal_column(row, "pending_deposit"),
        bonus_accrued: decimal_column(row, "bonus_accrued"),
        bonus_paid: decimal_column(row, "bonus_paid"),
        bonus_to_deposit: decimal_column(row, "bonus_to_deposit"),
        wallet: row.get("wallet"),
        network: row.get("network"),
        active: active != 0,
        updated_at: time_from_ms(updated_at),
    }
}

/// Read a TEXT decimal column, falling back to zero on corrupt data.
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Decimal {
    let raw: String = row.get(column);
    Decimal::from_str(&raw).unwrap_or_else(|e| {
        warn!(
            column = column,
            value = %raw,
            error = %e,
            "Failed to parse stored decimal, using zero"
        );
        Decimal::zero()
    })
}

pub(crate) fn time_from_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup_repo() -> (Repository, TempDir) {
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
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get_investor() {
        let (repo, _temp) = setup_repo().await;
        let mut inv = Investor::new(ChatId::new(10), "Alice");
        inv.deposit = d("600.50");
        inv.wallet = "TXYZ".to_string();
        repo.upsert_investor(&inv).await.unwrap();

        let loaded = repo.get_investor(ChatId::new(10)).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Alice");
        assert_eq!(loaded.deposit, d("600.5"));
        assert_eq!(loaded.wallet, "TXYZ");
        assert!(loaded.active);

        inv.name = "Alice B".to_string();
        inv.active = false;
        repo.upsert_investor(&inv).await.unwrap();
        let loaded = repo.get_investor(ChatId::new(10)).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Alice B");
        assert!(!loaded.active);
    }

    #[tokio::test]
    async fn test_list_investors_active_filter() {
        let (repo, _temp) = setup_repo().await;
        let mut a = Investor::new(ChatId::new(2), "A");
        a.deposit = d("100");
        let mut b = Investor::new(ChatId::new(1), "B");
        b.deposit = d("50");
        b.active = false;
        repo.upsert_investor(&a).await.unwrap();
        repo.upsert_investor(&b).await.unwrap();

        let all = repo.list_investors(false).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].chat_id, ChatId::new(1));

        let active = repo.list_investors(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].chat_id, ChatId::new(2));

        assert_eq!(repo.total_active_deposit().await.unwrap(), d("100"));
    }

    #[tokio::test]
    async fn test_investor_or_new_does_not_store() {
        let (repo, _temp) = setup_repo().await;
        let inv = repo.investor_or_new(ChatId::new(5), "New").await.unwrap();
        assert_eq!(inv.name, "New");
        assert!(repo.get_investor(ChatId::new(5)).await.unwrap().is_none());
    }
}
