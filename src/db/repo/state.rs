//! Poll cursor, aggregate counter and cohort book persistence.
//!
//! The cursor, the cohort book, the profit counter and the roster changes of
//! one replayed batch are written in a single transaction.

use super::{decimal_column, time_from_ms, Repository};
use crate::domain::{ChatId, Decimal, LedgerEntry, SignalId};
use crate::engine::{CohortBook, CohortMember, OpenPosition, RosterChange};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, Sqlite, Transaction};
use tracing::warn;

/// Singleton poll-state record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollState {
    /// Sheet rows consumed, header included. Zero means never initialised.
    pub last_row: u64,
    /// Accounting start.
    pub start_at: DateTime<Utc>,
    /// Running total of profit-share pools.
    pub profit_total: Decimal,
    /// Fingerprint of the row at `last_row`, if any.
    pub last_fingerprint: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PollState {
    pub fn is_initialized(&self) -> bool {
        self.last_row > 0
    }
}

/// Everything one poll cycle persists.
#[derive(Debug)]
pub struct BatchCommit<'a> {
    pub last_row: u64,
    pub last_fingerprint: Option<String>,
    pub profit_total: Decimal,
    pub changes: &'a [RosterChange],
    pub book: &'a CohortBook,
    pub ledger: &'a [LedgerEntry],
    pub now: DateTime<Utc>,
}

impl Repository {
    // =========================================================================
    // Poll state
    // =========================================================================

    /// Load the poll state, creating it (start = now) on first use.
    pub async fn load_poll_state(&self) -> Result<PollState, sqlx::Error> {
        let now_ms = Utc::now().timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO poll_state (id, last_row, start_at, profit_total, updated_at)
            VALUES (1, 0, ?, '0', ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT last_row, start_at, profit_total, last_fingerprint, updated_at
            FROM poll_state
            WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let last_row: i64 = row.get("last_row");
        let start_at: i64 = row.get("start_at");
        let updated_at: i64 = row.get("updated_at");
        Ok(PollState {
            last_row: last_row.max(0) as u64,
            start_at: time_from_ms(start_at),
            profit_total: decimal_column(&row, "profit_total"),
            last_fingerprint: row.get("last_fingerprint"),
            updated_at: time_from_ms(updated_at),
        })
    }

    /// First-run initialisation: skip history up to `last_row` and reset the
    /// profit counter.
    pub async fn initialize_cursor(
        &self,
        last_row: u64,
        last_fingerprint: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE poll_state
            SET last_row = ?, profit_total = '0', last_fingerprint = ?, updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(last_row as i64)
        .bind(last_fingerprint)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist the result of one replayed batch atomically.
    pub async fn commit_batch(&self, batch: &BatchCommit<'_>) -> Result<(), sqlx::Error> {
        let now_ms = batch.now.timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for change in batch.changes {
            apply_change(&mut tx, change, now_ms).await?;
        }

        replace_book(&mut tx, batch.book).await?;

        for entry in batch.ledger {
            super::requests::insert_ledger_tx(&mut tx, entry).await?;
        }

        sqlx::query(
            r#"
            UPDATE poll_state
            SET last_row = ?, profit_total = ?, last_fingerprint = ?, updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(batch.last_row as i64)
        .bind(batch.profit_total.to_canonical_string())
        .bind(batch.last_fingerprint.as_deref())
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Cohort book
    // =========================================================================

    /// Load every open position with its members in entry order.
    pub async fn load_cohort_book(&self) -> Result<CohortBook, sqlx::Error> {
        let position_rows = sqlx::query(
            r#"
            SELECT signal_id, cum_margin, opened_row, recovered
            FROM open_positions
            ORDER BY signal_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let member_rows = sqlx::query(
            r#"
            SELECT signal_id, chat_id, entry_deposit
            FROM open_position_members
            ORDER BY signal_id ASC, position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut positions: Vec<OpenPosition> = position_rows
            .iter()
            .map(|row| {
                let signal_id: String = row.get("signal_id");
                let opened_row: i64 = row.get("opened_row");
                let recovered: i64 = row.get("recovered");
                OpenPosition {
                    signal_id: SignalId::new(signal_id),
                    cum_margin: decimal_column(row, "cum_margin"),
                    opened_row: opened_row.max(0) as u64,
                    members: Vec::new(),
                    recovered: recovered != 0,
                }
            })
            .collect();

        for row in &member_rows {
            let signal_id: String = row.get("signal_id");
            let chat_id: i64 = row.get("chat_id");
            if let Some(position) = positions
                .iter_mut()
                .find(|p| p.signal_id.as_str() == signal_id)
            {
                position.members.push(CohortMember {
                    chat_id: ChatId::new(chat_id),
                    entry_deposit: decimal_column(row, "entry_deposit"),
                });
            }
        }

        Ok(CohortBook::from_positions(positions))
    }
}

async fn apply_change(
    tx: &mut Transaction<'_, Sqlite>,
    change: &RosterChange,
    now_ms: i64,
) -> Result<(), sqlx::Error> {
    match change {
        RosterChange::CommitPending { chat_id, deposit } => {
            sqlx::query(
                r#"
                UPDATE investors
                SET deposit = ?, pending_deposit = '0', updated_at = ?
                WHERE chat_id = ?
                "#,
            )
            .bind(deposit.to_canonical_string())
            .bind(now_ms)
            .bind(chat_id.as_i64())
            .execute(&mut **tx)
            .await?;
        }
        RosterChange::AccrueBonus { chat_id, amount } => {
            let row = sqlx::query("SELECT bonus_accrued FROM investors WHERE chat_id = ?")
                .bind(chat_id.as_i64())
                .fetch_optional(&mut **tx)
                .await?;
            let Some(row) = row else {
                return Ok(());
            };
            let current = decimal_column(&row, "bonus_accrued");
            let Some(accrued) = current.checked_add(*amount) else {
                warn!(chat_id = %chat_id, "Bonus total overflows, accrual skipped");
                return Ok(());
            };
            sqlx::query(
                r#"
                UPDATE investors
                SET bonus_accrued = ?, updated_at = ?
                WHERE chat_id = ?
                "#,
            )
            .bind(accrued.to_canonical_string())
            .bind(now_ms)
            .bind(chat_id.as_i64())
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

async fn replace_book(
    tx: &mut Transaction<'_, Sqlite>,
    book: &CohortBook,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM open_position_members")
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM open_positions")
        .execute(&mut **tx)
        .await?;

    for position in book.iter() {
        sqlx::query(
            r#"
            INSERT INTO open_positions (signal_id, cum_margin, opened_row, recovered)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(position.signal_id.as_str())
        .bind(position.cum_margin.to_canonical_string())
        .bind(position.opened_row as i64)
        .bind(position.recovered)
        .execute(&mut **tx)
        .await?;

        for (idx, member) in position.members.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO open_position_members (signal_id, position, chat_id, entry_deposit)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(position.signal_id.as_str())
            .bind(idx as i64)
            .bind(member.chat_id.as_i64())
            .bind(member.entry_deposit.to_canonical_string())
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}
