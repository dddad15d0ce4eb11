//! Event log read from a local CSV file.

use super::{parse_csv, EventLog, EventLogError, EventLogSource};
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FileEventLog {
    path: PathBuf,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventLogSource for FileEventLog {
    async fn fetch_log(&self) -> Result<EventLog, EventLogError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        parse_csv(&text)
    }
}
