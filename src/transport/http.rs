/// HTTP publish bridge.
///
/// Forwards zone messages to a broker that exposes an HTTP publish endpoint.
/// One POST per message to `{base_url}/{topic}` with the JSON payload as the
/// body. No retries: a failed forward is reported to the caller, which logs
/// it and moves on.

use std::time::Duration;

use crate::model::TransportError;

/// Default request timeout for a single forward.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

pub struct HttpBridge {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpBridge {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client, base_url: base_url.to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs `payload` to the topic's endpoint.
    pub fn forward(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let url = build_publish_url(&self.base_url, topic);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(payload.to_vec())
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Http(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Joins base URL and topic with exactly one slash between them.
pub fn build_publish_url(base_url: &str, topic: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        topic.trim_start_matches('/')
    )
}
