//! Event-log sources: where the trading system's append-only log is read from.

use crate::domain::{Decimal, EventKind, LogRow, SignalId};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::warn;

pub mod file;
pub mod mock;
pub mod sheet;

pub use file::FileEventLog;
pub use mock::MockEventLog;
pub use sheet::SheetCsvSource;

pub const COL_EVENT: &str = "Event";
pub const COL_SIGNAL_ID: &str = "Signal_ID";
pub const COL_CUM_MARGIN: &str = "Cum_Margin_USDT";
pub const COL_PNL: &str = "PNL_Realized_USDT";
pub const COL_PAIR: &str = "Pair";

/// Source of the full event log.
///
/// Implementations return every row currently in the log; the poller slices
/// off what it has already consumed.
#[async_trait]
pub trait EventLogSource: Send + Sync + fmt::Debug {
    async fn fetch_log(&self) -> Result<EventLog, EventLogError>;
}

/// Snapshot of the event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    /// Data rows in log order; `rows[i].row_number == i + 2`.
    pub rows: Vec<LogRow>,
}

impl EventLog {
    pub fn new(rows: Vec<LogRow>) -> Self {
        Self { rows }
    }

    /// Sheet row count including the header row.
    pub fn total_rows(&self) -> u64 {
        self.rows.len() as u64 + 1
    }

    /// Rows not yet consumed by a cursor of `last_row` sheet rows.
    pub fn rows_after(&self, last_row: u64) -> &[LogRow] {
        let consumed = last_row.saturating_sub(1) as usize;
        self.rows.get(consumed..).unwrap_or(&[])
    }

    /// Row with the given 1-based sheet number.
    pub fn row(&self, row_number: u64) -> Option<&LogRow> {
        if row_number < 2 {
            return None;
        }
        self.rows.get((row_number - 2) as usize)
    }
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse CSV text with a header row into an [`EventLog`].
///
/// Columns are located by header name; extra columns are ignored. Numeric
/// cells that cannot be parsed count as zero.
pub fn parse_csv(text: &str) -> Result<EventLog, EventLogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| EventLogError::Parse(e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let event_col = column(COL_EVENT)
        .ok_or_else(|| EventLogError::Parse(format!("missing column {}", COL_EVENT)))?;
    let signal_col = column(COL_SIGNAL_ID)
        .ok_or_else(|| EventLogError::Parse(format!("missing column {}", COL_SIGNAL_ID)))?;
    let margin_col = column(COL_CUM_MARGIN);
    let pnl_col = column(COL_PNL);
    let pair_col = column(COL_PAIR);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| EventLogError::Parse(e.to_string()))?;
        let row_number = idx as u64 + 2;
        let cell = |col: Option<usize>| col.and_then(|c| record.get(c)).unwrap_or("").trim();

        rows.push(LogRow {
            row_number,
            kind: EventKind::parse(cell(Some(event_col))),
            signal_id: SignalId::new(cell(Some(signal_col))),
            cum_margin: money_cell(cell(margin_col), row_number, COL_CUM_MARGIN),
            pnl: money_cell(cell(pnl_col), row_number, COL_PNL),
            pair: cell(pair_col).to_string(),
        });
    }

    Ok(EventLog { rows })
}

fn money_cell(raw: &str, row_number: u64, column: &str) -> Decimal {
    if raw.is_empty() {
        return Decimal::zero();
    }
    match Decimal::parse_lenient(raw) {
        Some(value) if value.is_within_amount_bound() => value,
        Some(_) => {
            warn!(
                row = row_number,
                column = column,
                value = raw,
                "Number out of range in event log, using zero"
            );
            Decimal::zero()
        }
        None => {
            warn!(
                row = row_number,
                column = column,
                value = raw,
                "Unparseable number in event log, using zero"
            );
            Decimal::zero()
        }
    }
}
