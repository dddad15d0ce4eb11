//! Investor requests and the append-only audit ledger.

use super::{decimal_column, time_from_ms, write_investor, Repository};
use crate::domain::{
    ChatId, Decimal, Investor, LedgerEntry, LedgerKind, Request, RequestKind, RequestStatus,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use tracing::warn;

/// Ledger row as stored (kind kept as text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLedgerEntry {
    pub id: i64,
    pub at: chrono::DateTime<Utc>,
    pub chat_id: ChatId,
    pub name: String,
    pub kind: String,
    pub amount: Decimal,
    pub note: String,
}

impl Repository {
    // =========================================================================
    // Requests
    // =========================================================================

    /// File a new request and its ledger row. Returns the request id.
    pub async fn create_request(
        &self,
        investor: &Investor,
        kind: RequestKind,
        amount: Decimal,
    ) -> Result<i64, sqlx::Error> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO requests (chat_id, kind, amount, status, created_at)
            VALUES (?, ?, ?, 'new', ?)
            "#,
        )
        .bind(investor.chat_id.as_i64())
        .bind(kind.as_str())
        .bind(amount.to_canonical_string())
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        let entry = LedgerEntry::new(
            investor.chat_id,
            investor.name.clone(),
            LedgerKind::for_request(kind),
            amount,
            format!("request #{}", id),
        );
        insert_ledger_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(id)
    }

    pub async fn get_request(&self, id: i64) -> Result<Option<Request>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, chat_id, kind, amount, status, created_at, resolved_at
            FROM requests
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(request_from_row))
    }

    /// Requests with the given status, oldest first.
    pub async fn list_requests(&self, status: RequestStatus) -> Result<Vec<Request>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, kind, amount, status, created_at, resolved_at
            FROM requests
            WHERE status = ?
            ORDER BY id ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(request_from_row).collect())
    }

    /// Close a `new` request and store the resulting investor record in one
    /// transaction.
    ///
    /// Returns `false` (and writes nothing) if the request was already
    /// resolved.
    pub async fn resolve_request(
        &self,
        id: i64,
        status: RequestStatus,
        investor: Option<&Investor>,
        ledger: &[LedgerEntry],
    ) -> Result<bool, sqlx::Error> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE requests
            SET status = ?, resolved_at = ?
            WHERE id = ? AND status = 'new'
            "#,
        )
        .bind(status.as_str())
        .bind(now_ms)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(investor) = investor {
            write_investor(&mut *tx, investor).await?;
        }
        for entry in ledger {
            insert_ledger_tx(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    pub async fn insert_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        insert_ledger_tx(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Most recent ledger rows for one investor, newest first.
    pub async fn list_ledger(
        &self,
        chat_id: ChatId,
        limit: i64,
    ) -> Result<Vec<StoredLedgerEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, at, chat_id, name, kind, amount, note
            FROM ledger
            WHERE chat_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(chat_id.as_i64())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("id");
                let at: i64 = row.get("at");
                let chat_id: i64 = row.get("chat_id");
                StoredLedgerEntry {
                    id,
                    at: time_from_ms(at),
                    chat_id: ChatId::new(chat_id),
                    name: row.get("name"),
                    kind: row.get("kind"),
                    amount: decimal_column(row, "amount"),
                    note: row.get("note"),
                }
            })
            .collect())
    }
}

pub(super) async fn insert_ledger_tx(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &LedgerEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO ledger (at, chat_id, name, kind, amount, note)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.at.timestamp_millis())
    .bind(entry.chat_id.as_i64())
    .bind(&entry.name)
    .bind(entry.kind.as_str())
    .bind(entry.amount.to_canonical_string())
    .bind(&entry.note)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn request_from_row(row: &SqliteRow) -> Option<Request> {
    let id: i64 = row.get("id");
    let chat_id: i64 = row.get("chat_id");
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    let created_at: i64 = row.get("created_at");
    let resolved_at: Option<i64> = row.get("resolved_at");

    let (kind, status) = match (RequestKind::from_str(&kind), RequestStatus::from_str(&status)) {
        (Ok(kind), Ok(status)) => (kind, status),
        (kind, status) => {
            warn!(
                request_id = id,
                kind = ?kind.err(),
                status = ?status.err(),
                "Skipping request with unknown kind or status"
            );
            return None;
        }
    };

    Some(Request {
        id,
        chat_id: ChatId::new(chat_id),
        kind,
        amount: decimal_column(row, "amount"),
        status,
        created_at: time_from_ms(created_at),
        resolved_at: resolved_at.map(time_from_ms),
    })
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
    async fn test_create_and_list_requests() {
        let (repo, _temp) = setup_repo().await;
        let inv = Investor::new(ChatId::new(7), "Bob");
        repo.upsert_investor(&inv).await.unwrap();

        let id = repo
            .create_request(&inv, RequestKind::AddDeposit, d("250"))
            .await
            .unwrap();

        let req = repo.get_request(id).await.unwrap().unwrap();
        assert_eq!(req.kind, RequestKind::AddDeposit);
        assert_eq!(req.amount, d("250"));
        assert_eq!(req.status, RequestStatus::New);
        assert!(req.resolved_at.is_none());

        let open = repo.list_requests(RequestStatus::New).await.unwrap();
        assert_eq!(open.len(), 1);

        let ledger = repo.list_ledger(ChatId::new(7), 10).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, "REQUEST_ADD_DEPOSIT");
        assert_eq!(ledger[0].note, format!("request #{}", id));
    }

    #[tokio::test]
    async fn test_resolve_request_only_once() {
        let (repo, _temp) = setup_repo().await;
        let mut inv = Investor::new(ChatId::new(7), "Bob");
        repo.upsert_investor(&inv).await.unwrap();
        let id = repo
            .create_request(&inv, RequestKind::AddDeposit, d("100"))
            .await
            .unwrap();

        inv.pending_deposit = d("100");
        let entry = LedgerEntry::new(
            inv.chat_id,
            "Bob",
            LedgerKind::RequestApproved,
            d("100"),
            "",
        );
        assert!(repo
            .resolve_request(id, RequestStatus::Approved, Some(&inv), &[entry.clone()])
            .await
            .unwrap());

        let stored = repo.get_investor(ChatId::new(7)).await.unwrap().unwrap();
        assert_eq!(stored.pending_deposit, d("100"));

        inv.pending_deposit = d("999");
        assert!(!repo
            .resolve_request(id, RequestStatus::Approved, Some(&inv), &[entry])
            .await
            .unwrap());
        let stored = repo.get_investor(ChatId::new(7)).await.unwrap().unwrap();
        assert_eq!(stored.pending_deposit, d("100"));

        let req = repo.get_request(id).await.unwrap().unwrap();
        assert_eq!(req.status, RequestStatus::Approved);
        assert!(req.resolved_at.is_some());
        assert!(repo
            .list_requests(RequestStatus::New)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_ledger_newest_first() {
        let (repo, _temp) = setup_repo().await;
        for amount in ["1", "2", "3"] {
            repo.insert_ledger_entry(&LedgerEntry::new(
                ChatId::new(3),
                "C",
                LedgerKind::BonusAccrued,
                d(amount),
                "",
            ))
            .await
            .unwrap();
        }
        let entries = repo.list_ledger(ChatId::new(3), 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, d("3"));
    }
}
