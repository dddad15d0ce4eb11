pub mod api;
pub mod commands;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod notify;
pub mod orchestration;

pub use config::{Config, EventLogLocation};
pub use datasource::{EventLog, EventLogError, EventLogSource, FileEventLog, MockEventLog, SheetCsvSource};
pub use db::{init_db, Repository};
pub use domain::{ChatId, Decimal, Investor, LogRow, Request, SignalId};
pub use error::AppError;
pub use notify::{Notifier, RecordingNotifier, TelegramClient, UpdateSource};
pub use orchestration::{Poller, PollerSettings, Runtime, RuntimeSettings};
