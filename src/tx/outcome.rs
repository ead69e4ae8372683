//! Outcome polling
//!
//! Repeatedly queries a transaction until its status leaves `Pending`, the
//! timeout elapses, or the caller cancels. Retrying a failed query is the
//! transport's job; the poller surfaces query errors immediately.

use crate::error::{NotaryError, NotaryResult};
use crate::gateway::GatewayResponse;
use crate::transport::CancelToken;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Range passed on every poll
pub const POLL_RANGE: (i64, i64) = (0, 10);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_OUTCOME_TIMEOUT: Duration = Duration::from_secs(30);

/// Transaction status as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Executed,
    Failed,
    Unknown(String),
}

impl From<&str> for TxStatus {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => TxStatus::Pending,
            "Executed" => TxStatus::Executed,
            "Failed" => TxStatus::Failed,
            other => TxStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "Pending"),
            TxStatus::Executed => write!(f, "Executed"),
            TxStatus::Failed => write!(f, "Failed"),
            TxStatus::Unknown(s) => write!(f, "{}", s),
        }
    }
}

impl TxStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TxStatus::Pending)
    }

    /// Bounded label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Executed => "executed",
            TxStatus::Failed => "failed",
            TxStatus::Unknown(_) => "unknown",
        }
    }
}

/// Final transaction record returned by [`OutcomePoller::wait`]
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    pub id: String,
    pub status: TxStatus,
    pub block_id: Option<String>,
    pub broadcast_fee: Option<f64>,
    pub developer_fee: Option<f64>,
    pub nag_fee: Option<f64>,
    pub processing_fee: Option<f64>,
    pub protocol_fee: Option<f64>,
    /// The `Response` object as received
    pub raw: Value,
}

impl TransactionOutcome {
    /// Read an outcome from a query reply. `None` means keep polling: the
    /// reply is not a 200, carries no `Status` string, or reads `Pending`.
    pub fn from_response(tx_id: &str, reply: &GatewayResponse) -> Option<Self> {
        if !reply.is_success() {
            return None;
        }
        let record = &reply.response;
        let status = TxStatus::from(record.get("Status").and_then(Value::as_str)?);
        if status.is_pending() {
            return None;
        }

        let id = record
            .get("ID")
            .and_then(Value::as_str)
            .unwrap_or(tx_id)
            .to_string();

        Some(Self {
            id,
            status,
            block_id: record
                .get("BlockID")
                .and_then(Value::as_str)
                .map(str::to_string),
            broadcast_fee: fee(record, "BroadcastFee"),
            developer_fee: fee(record, "DeveloperFee"),
            nag_fee: fee(record, "NagFee"),
            processing_fee: fee(record, "ProcessingFee"),
            protocol_fee: fee(record, "ProtocolFee"),
            raw: record.clone(),
        })
    }
}

fn fee(record: &Value, field: &str) -> Option<f64> {
    match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Anything that can look up a transaction by ID
#[async_trait]
pub trait TransactionQuery: Send + Sync {
    async fn query(
        &self,
        tx_id: &str,
        range_start: i64,
        range_end: i64,
        cancel: &CancelToken,
    ) -> NotaryResult<GatewayResponse>;
}

/// Polls a [`TransactionQuery`] until the transaction settles
pub struct OutcomePoller<'a, Q: TransactionQuery + ?Sized> {
    source: &'a Q,
    interval: Duration,
    timeout: Duration,
}

impl<'a, Q: TransactionQuery + ?Sized> OutcomePoller<'a, Q> {
    pub fn new(source: &'a Q) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_OUTCOME_TIMEOUT,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        // zero would make `interval_at` panic
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for a non-pending status. The first query is issued one interval
    /// after the call; cancellation takes priority over the timer and the
    /// next tick.
    pub async fn wait(&self, tx_id: &str, cancel: &CancelToken) -> NotaryResult<TransactionOutcome> {
        let started = Instant::now();
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);

        let mut ticker = interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut polls: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(tx_id)),
                _ = &mut deadline => return Err(self.timed_out(tx_id, started)),
                _ = ticker.tick() => {}
            }

            polls += 1;
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(tx_id)),
                _ = &mut deadline => return Err(self.timed_out(tx_id, started)),
                reply = self.source.query(tx_id, POLL_RANGE.0, POLL_RANGE.1, cancel) => reply?,
            };

            match TransactionOutcome::from_response(tx_id, &reply) {
                Some(outcome) => {
                    crate::metrics::record_outcome(&outcome.status);
                    info!(
                        tx_id,
                        status = %outcome.status,
                        block_id = ?outcome.block_id,
                        polls,
                        "Transaction settled"
                    );
                    return Ok(outcome);
                }
                None => debug!(tx_id, polls, result = ?reply.result, "Transaction still pending"),
            }
        }
    }

    fn cancelled(&self, tx_id: &str) -> NotaryError {
        NotaryError::Cancelled(format!("waiting for transaction {}", tx_id))
    }

    fn timed_out(&self, tx_id: &str, started: Instant) -> NotaryError {
        crate::metrics::record_outcome_timeout();
        NotaryError::Timeout {
            operation: format!("outcome of transaction {}", tx_id),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}
