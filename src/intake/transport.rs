//! Submission transport — one JSON POST to the meal-plan service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::config::SubmitConfig;
use crate::error::{ConfigError, SubmitError};

/// A decoded, successful response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Sends a serialized payload and classifies the outcome.
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Where requests go, for logging.
    fn endpoint(&self) -> &str;

    /// POST an already-encoded JSON document.
    async fn post_json(&self, body: Vec<u8>) -> Result<TransportResponse, SubmitError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &SubmitConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            timeout: config.timeout,
            client,
        })
    }
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_json(&self, body: Vec<u8>) -> Result<TransportResponse, SubmitError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = serde_json::from_str(&text).map_err(|e| SubmitError::Decode {
            reason: e.to_string(),
        })?;

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

impl HttpTransport {
    fn classify(&self, err: reqwest::Error) -> SubmitError {
        if err.is_timeout() {
            SubmitError::Timeout {
                endpoint: self.endpoint.clone(),
                timeout: self.timeout,
            }
        } else {
            SubmitError::Transport {
                endpoint: self.endpoint.clone(),
                reason: err.to_string(),
            }
        }
    }
}
