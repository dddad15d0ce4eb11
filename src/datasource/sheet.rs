//! Event log published as CSV over HTTP (e.g. a spreadsheet CSV export link).

use super::{parse_csv, EventLog, EventLogError, EventLogSource};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SheetCsvSource {
    client: Client,
    url: String,
}

impl SheetCsvSource {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    /// CSV export URL of one worksheet of a Google spreadsheet.
    pub fn google_sheet(sheet_id: &str, worksheet: &str) -> Self {
        Self::new(format!(
            "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv&sheet={}",
            sheet_id, worksheet
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_text(&self) -> Result<String, EventLogError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                backoff::Error::transient(EventLogError::Network(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(EventLogError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(EventLogError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .text()
                .await
                .map_err(|e| backoff::Error::transient(EventLogError::Network(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl EventLogSource for SheetCsvSource {
    async fn fetch_log(&self) -> Result<EventLog, EventLogError> {
        debug!(url = %self.url, "Fetching event log");
        let text = self.fetch_text().await?;
        parse_csv(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_sheet_url() {
        let source = SheetCsvSource::google_sheet("abc123", "BMR_DCA_Log");
        assert_eq!(
            source.url(),
            "https://docs.google.com/spreadsheets/d/abc123/gviz/tq?tqx=out:csv&sheet=BMR_DCA_Log"
        );
    }
}
