//! Domain types for the profit-share ledger.
//!
//! This module provides:
//! - Lossless money handling via Decimal wrapper
//! - Domain primitives: ChatId, SignalId
//! - Investor records, event-log rows, requests and ledger entries

pub mod decimal;
pub mod event;
pub mod investor;
pub mod primitives;
pub mod request;

pub use decimal::Decimal;
pub use event::{EventKind, LogRow};
pub use investor::Investor;
pub use primitives::{ChatId, SignalId};
pub use request::{LedgerEntry, LedgerKind, Request, RequestKind, RequestStatus};
