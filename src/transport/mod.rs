//! HTTP transport to the gateway
//!
//! Provides:
//! - The [`Transport`] seam the account and lifecycle code talk to
//! - A reqwest-backed implementation with timeout and bounded retry
//! - Cancellation tokens honoured by in-flight requests and retry sleeps

mod cancel;
mod retry;

pub use cancel::{CancelHandle, CancelToken};
pub use retry::{classify_status, with_retry, RetryPolicy};

use crate::config::ClientConfig;
use crate::error::{NotaryError, NotaryResult, TransportError};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Longest response excerpt carried in an error message
const ERROR_BODY_LIMIT: usize = 256;

/// JSON-over-HTTP executor shared by every account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        cancel: &CancelToken,
    ) -> Result<Value, TransportError>;

    async fn get_json(&self, url: &str, cancel: &CancelToken) -> Result<Value, TransportError>;
}

/// reqwest client with per-request timeout and fixed-delay retry on 5xx or
/// connection failures
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> NotaryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotaryError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, policy })
    }

    pub fn from_config(config: &ClientConfig) -> NotaryResult<Self> {
        Self::new(
            Duration::from_millis(config.timeout_ms),
            RetryPolicy::new(config.max_retries, Duration::from_millis(config.retry_delay_ms)),
        )
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn execute(
        &self,
        url: &str,
        attempt: u32,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, TransportError> {
        debug!(url, attempt, "Sending gateway request");

        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::retryable(url, Some(status), e.to_string()))?;

        if let Some(kind) = classify_status(status) {
            let mut err = TransportError::terminal(url, Some(status), excerpt(&body));
            err.kind = kind;
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            TransportError::terminal(url, Some(status), format!("invalid JSON body: {}", e))
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        cancel: &CancelToken,
    ) -> Result<Value, TransportError> {
        with_retry(self.policy, url, cancel, |attempt| {
            self.execute(url, attempt, self.client.post(url).json(body))
        })
        .await
    }

    async fn get_json(&self, url: &str, cancel: &CancelToken) -> Result<Value, TransportError> {
        with_retry(self.policy, url, cancel, |attempt| {
            self.execute(url, attempt, self.client.get(url))
        })
        .await
    }
}

fn request_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_builder() {
        TransportError::terminal(url, None, e.to_string())
    } else {
        // connect, timeout and mid-body failures are all worth another try
        TransportError::retryable(url, e.status().map(|s| s.as_u16()), e.to_string())
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
