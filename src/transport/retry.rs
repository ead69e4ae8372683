//! Bounded retry with a fixed inter-attempt delay

use super::cancel::CancelToken;
use crate::error::{TransportError, TransportErrorKind};

use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Map an HTTP status to a failure class; `None` means success
pub fn classify_status(status: u16) -> Option<TransportErrorKind> {
    match status {
        200..=299 => None,
        500..=599 => Some(TransportErrorKind::Retryable),
        _ => Some(TransportErrorKind::Terminal),
    }
}

/// Run `op` until it succeeds, fails terminally, runs out of attempts or
/// `cancel` fires. Cancellation is checked during the sleep and while `op`
/// is in flight; the in-flight future is dropped.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    url: &str,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, TransportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(TransportError::cancelled(url).with_attempts(attempt));
            }
            result = op(attempt) => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e.with_attempts(attempt)),
            Err(e) => e,
        };

        if attempt >= max_attempts {
            return Err(err.with_attempts(attempt));
        }

        warn!(
            url,
            attempt,
            max_attempts,
            error = %err.message,
            "Gateway request failed, retrying in {:?}",
            policy.delay
        );
        crate::metrics::record_transport_retry();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(TransportError::cancelled(url).with_attempts(attempt));
            }
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}
