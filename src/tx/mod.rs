//! Certificate transaction lifecycle: ID derivation, signing, submission,
//! nonce sequencing and outcome polling

mod nonce;
mod outcome;
mod request;
mod sender;

pub use nonce::{NonceLease, NonceManager};
pub use outcome::{
    OutcomePoller, TransactionOutcome, TransactionQuery, TxStatus, DEFAULT_OUTCOME_TIMEOUT,
    DEFAULT_POLL_INTERVAL, POLL_RANGE,
};
pub use request::{
    compute_id, decode_payload, encode_payload, TransactionRequest, UnsignedTransaction,
    CERTIFICATE_ACTION, CERTIFICATE_TX_TYPE,
};
pub use sender::{Submission, TransactionSender};
