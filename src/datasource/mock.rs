//! Mock event log for testing without network calls.

use super::{EventLog, EventLogError, EventLogSource};
use crate::domain::{Decimal, EventKind, LogRow, SignalId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory log that tests can append to between polls.
#[derive(Debug, Default)]
pub struct MockEventLog {
    rows: Mutex<Vec<LogRow>>,
    fail_next: AtomicBool,
}

impl MockEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn with_event(self, kind: &str, signal_id: &str, cum_margin: &str, pnl: &str) -> Self {
        self.push(kind, signal_id, cum_margin, pnl);
        self
    }

    /// Append a row; row numbers continue from the current end of the log.
    pub fn push(&self, kind: &str, signal_id: &str, cum_margin: &str, pnl: &str) {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let row_number = rows.len() as u64 + 2;
        rows.push(LogRow {
            row_number,
            kind: EventKind::parse(kind),
            signal_id: SignalId::new(signal_id),
            cum_margin: Decimal::parse_amount(cum_margin).unwrap_or_default(),
            pnl: Decimal::parse_amount(pnl).unwrap_or_default(),
            pair: String::new(),
        });
    }

    /// Make the next fetch fail with a network error.
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventLogSource for MockEventLog {
    async fn fetch_log(&self) -> Result<EventLog, EventLogError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EventLogError::Network("mock outage".to_string()));
        }
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(EventLog::new(rows))
    }
}
