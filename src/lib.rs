//! certnotary - certificate notarization client for Circular Network Access Gateways
//!
//! Opens a wallet account, resolves its gateway, keeps the nonce in step with
//! the chain, submits signed certificate transactions and polls for their
//! outcome.

pub mod account;
pub mod certificate;
pub mod clock;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod transport;
pub mod tx;

/// Version tag sent with every gateway call and stored in certificates
pub const LIB_VERSION: &str = "1.0.13";

pub use account::{Account, AccountBuilder, AccountInfo, AccountState};
pub use certificate::Certificate;
pub use error::{NotaryError, NotaryResult, TransportError, TransportErrorKind};
pub use gateway::GatewayResponse;
pub use transport::{CancelHandle, CancelToken, HttpTransport, RetryPolicy, Transport};
pub use tx::{Submission, TransactionOutcome, TransactionRequest, TxStatus};
