//! Client for the capture component that records camera video.
//!
//! Each upload cycle starts by commanding the capture component to persist
//! its most recent recording window to local disk. The component is
//! addressed by logical name and accepts a JSON save command with the
//! window bounds formatted as local timestamps.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Timestamp format the capture component expects in save commands.
pub const SEGMENT_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Recording window handed to the capture component.
///
/// The window covers the stretch of footage the component should persist,
/// normally the full interval since the previous cycle fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentWindow {
    /// Start of the window (inclusive)
    pub from: DateTime<Local>,
    /// End of the window (inclusive)
    pub to: DateTime<Local>,
}

impl SegmentWindow {
    /// Window of the given length ending at `end`.
    pub fn ending_at(end: DateTime<Local>, length: Duration) -> Self {
        let length = chrono::Duration::seconds(length.as_secs() as i64);
        Self {
            from: end - length,
            to: end,
        }
    }

    /// Window of the given length ending at the current wall-clock time.
    pub fn ending_now(length: Duration) -> Self {
        Self::ending_at(Local::now(), length)
    }

    /// Window bounds formatted for the save command, `(from, to)`.
    pub fn bounds(&self) -> (String, String) {
        (
            self.from.format(SEGMENT_TIME_FORMAT).to_string(),
            self.to.format(SEGMENT_TIME_FORMAT).to_string(),
        )
    }
}

/// Capture components that can persist a recording window to local disk.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Command the component to save the given window. With `asynchronous`
    /// set, the component acknowledges the command before the files hit
    /// disk, which is why callers wait a settle delay before scanning.
    async fn save_segment(
        &self,
        window: SegmentWindow,
        asynchronous: bool,
    ) -> Result<(), VideoStoreError>;
}

/// Errors from the capture component client.
#[derive(Debug, thiserror::Error)]
pub enum VideoStoreError {
    #[error("Failed to send save command: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Save command rejected with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// HTTP client for a capture component exposing a JSON command endpoint.
#[derive(Debug, Clone)]
pub struct HttpVideoStore {
    client: reqwest::Client,
    endpoint: String,
    store_name: String,
}

impl HttpVideoStore {
    /// Create a client for the component named `store_name` behind `endpoint`.
    pub fn new(
        endpoint: &str,
        store_name: &str,
        request_timeout: Duration,
    ) -> Result<Self, VideoStoreError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            store_name: store_name.to_string(),
        })
    }
}

fn command_payload(window: &SegmentWindow, asynchronous: bool) -> serde_json::Value {
    let (from, to) = window.bounds();
    json!({
        "command": "save",
        "from": from,
        "to": to,
        "async": asynchronous,
    })
}

#[async_trait]
impl VideoStore for HttpVideoStore {
    async fn save_segment(
        &self,
        window: SegmentWindow,
        asynchronous: bool,
    ) -> Result<(), VideoStoreError> {
        let url = format!("{}/components/{}/command", self.endpoint, self.store_name);
        let payload = command_payload(&window, asynchronous);

        debug!(store = %self.store_name, %url, "sending save command");

        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VideoStoreError::Rejected { status, body });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_end() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 10, 5, 0).unwrap()
    }

    #[test]
    fn test_window_spans_interval() {
        let window = SegmentWindow::ending_at(fixed_end(), Duration::from_secs(300));
        assert_eq!(window.to - window.from, chrono::Duration::minutes(5));
        assert_eq!(window.to, fixed_end());
    }

    #[test]
    fn test_window_bounds_format() {
        let window = SegmentWindow::ending_at(fixed_end(), Duration::from_secs(300));
        let (from, to) = window.bounds();
        assert_eq!(from, "2024-03-01_10-00-00");
        assert_eq!(to, "2024-03-01_10-05-00");
    }

    #[test]
    fn test_ending_now_spans_interval() {
        let window = SegmentWindow::ending_now(Duration::from_secs(60));
        assert_eq!(window.to - window.from, chrono::Duration::seconds(60));
    }

    #[test]
    fn test_command_payload_shape() {
        let window = SegmentWindow::ending_at(fixed_end(), Duration::from_secs(300));
        let payload = command_payload(&window, true);
        assert_eq!(
            payload,
            json!({
                "command": "save",
                "from": "2024-03-01_10-00-00",
                "to": "2024-03-01_10-05-00",
                "async": true,
            })
        );
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let store =
            HttpVideoStore::new("http://camera:8085/", "cam-1", Duration::from_secs(5)).unwrap();
        assert_eq!(store.endpoint, "http://camera:8085");
    }
}
