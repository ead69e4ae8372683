//! Error types for the notary client

use std::fmt;
use thiserror::Error;

/// How the transport classified a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection failures, request timeouts and 5xx responses
    Retryable,
    /// 4xx responses and malformed response bodies
    Terminal,
    /// The caller's cancel token fired while the request was in flight
    Cancelled,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Retryable => write!(f, "retryable"),
            TransportErrorKind::Terminal => write!(f, "terminal"),
            TransportErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Failure reported by a [`Transport`](crate::transport::Transport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} transport failure for {url} after {attempts} attempt(s){}: {message}", status_suffix(.status))]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub url: String,
    /// HTTP status, when the server answered at all
    pub status: Option<u16>,
    pub message: String,
    pub attempts: u32,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl TransportError {
    pub fn retryable(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Retryable,
            url: url.into(),
            status,
            message: message.into(),
            attempts: 1,
        }
    }

    pub fn terminal(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Terminal,
            url: url.into(),
            status,
            message: message.into(),
            attempts: 1,
        }
    }

    pub fn cancelled(url: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Cancelled,
            url: url.into(),
            status: None,
            message: "request cancelled".to_string(),
            attempts: 1,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == TransportErrorKind::Retryable
    }
}

/// Main error type for the notary client
#[derive(Error, Debug)]
pub enum NotaryError {
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Account is not open")]
    AccountNotOpen,

    #[error("Failed to resolve network {network}: {message}")]
    NetworkResolution { network: String, message: String },

    #[error("Invalid response format or missing Nonce field: {0}")]
    NonceFormat(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Timeout waiting for {operation} after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NotaryError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            NotaryError::Transport(e) => e.is_retryable(),
            NotaryError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Local validation failures that never reached the network
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            NotaryError::InvalidAddress(_)
                | NotaryError::AccountNotOpen
                | NotaryError::InvalidKey(_)
                | NotaryError::Signing(_)
                | NotaryError::Decode(_)
        )
    }
}

/// Result type for notary operations
pub type NotaryResult<T> = Result<T, NotaryError>;
