use crate::datasource::{EventLog, EventLogError, EventLogSource};
use crate::db::{BatchCommit, Repository};
use crate::domain::Decimal;
use crate::engine::{replay, ReplaySettings};
use crate::notify::{send_all, Notifier};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Parameters of the attribution model.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub reference_bank: Decimal,
    pub share_fraction: Decimal,
    /// Replay the whole log on the very first poll instead of skipping it.
    pub replay_history: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Cursor after the cycle.
    pub last_row: u64,
    /// First poll: cursor set without replaying history.
    pub initialized: bool,
    pub rows_applied: usize,
    pub closes: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    EventLog(#[from] EventLogError),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Consumes new event-log rows and applies them to the roster.
pub struct Poller {
    repo: Arc<Repository>,
    source: Arc<dyn EventLogSource>,
    notifier: Arc<dyn Notifier>,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(
        repo: Arc<Repository>,
        source: Arc<dyn EventLogSource>,
        notifier: Arc<dyn Notifier>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            repo,
            source,
            notifier,
            settings,
        }
    }

    /// Run one poll cycle.
    ///
    /// Everything the batch changes is committed in one transaction before any
    /// message is sent. On error nothing is committed and the next cycle
    /// retries from the same cursor.
    pub async fn poll_once(&self) -> Result<PollReport, PollError> {
        let state = self.repo.load_poll_state().await?;
        let log = self.source.fetch_log().await?;
        let total_rows = log.total_rows();

        let cursor = if state.is_initialized() {
            state.last_row
        } else if self.settings.replay_history {
            info!(rows = total_rows, "First poll, replaying event log history");
            1
        } else {
            let fingerprint = fingerprint_at(&log, total_rows);
            self.repo
                .initialize_cursor(total_rows, fingerprint.as_deref())
                .await?;
            info!(last_row = total_rows, "First poll, skipping event log history");
            return Ok(PollReport {
                last_row: total_rows,
                initialized: true,
                ..Default::default()
            });
        };

        if total_rows < cursor {
            warn!(
                last_row = cursor,
                total_rows = total_rows,
                "Event log is shorter than the cursor, waiting"
            );
            return Ok(PollReport {
                last_row: cursor,
                ..Default::default()
            });
        }

        if let Some(stored) = state.last_fingerprint.as_deref() {
            match fingerprint_at(&log, cursor) {
                Some(current) if current != stored => warn!(
                    last_row = cursor,
                    stored = %stored,
                    current = %current,
                    "Last consumed row changed, event log was rewritten"
                ),
                _ => {}
            }
        }

        let rows = log.rows_after(cursor);
        if rows.is_empty() {
            if !state.is_initialized() {
                self.repo.initialize_cursor(total_rows, None).await?;
            }
            debug!(last_row = cursor, "No new event log rows");
            return Ok(PollReport {
                last_row: total_rows,
                ..Default::default()
            });
        }

        let roster = self.repo.list_investors(false).await?;
        let book = self.repo.load_cohort_book().await?;
        let now = Utc::now();
        let outcome = replay(
            ReplaySettings {
                reference_bank: self.settings.reference_bank,
                share_fraction: self.settings.share_fraction,
                start_at: state.start_at,
                now,
            },
            roster,
            book,
            state.profit_total,
            rows,
        );

        let fingerprint = fingerprint_at(&log, total_rows);
        self.repo
            .commit_batch(&BatchCommit {
                last_row: total_rows,
                last_fingerprint: fingerprint,
                profit_total: outcome.profit_total,
                changes: &outcome.changes,
                book: &outcome.book,
                ledger: &outcome.ledger,
                now,
            })
            .await?;

        for close in &outcome.closes {
            info!(
                row = close.row_number,
                signal_id = %close.signal_id,
                pnl = %close.pnl,
                pool = %close.pool,
                distributed = %close.distributed,
                recovered = close.recovered,
                "Position closed"
            );
        }

        let recipients = outcome.outbox.recipients();
        let sent = send_all(self.notifier.as_ref(), outcome.outbox.into_messages()).await;

        info!(
            rows = rows.len(),
            applied = outcome.rows_applied,
            last_row = total_rows,
            open_positions = outcome.book.len(),
            recipients = recipients,
            failed = sent.failed,
            "Event log batch committed"
        );

        Ok(PollReport {
            last_row: total_rows,
            initialized: false,
            rows_applied: outcome.rows_applied,
            closes: outcome.closes.len(),
            messages_sent: sent.sent,
            messages_failed: sent.failed,
        })
    }
}

fn fingerprint_at(log: &EventLog, row_number: u64) -> Option<String> {
    log.row(row_number).map(|row| row.fingerprint())
}
