//! Transaction signing
//!
//! The lifecycle only depends on the [`Signer`] trait. The shipped
//! implementation is deterministic ECDSA over secp256k1 with DER output; one
//! deployment must stick to one scheme or the gateway cannot verify.

mod signer;

pub use signer::{public_key_hex, verify, Secp256k1Signer};

use crate::error::NotaryResult;

/// Produces a hex signature over `message` with a hex-encoded private key
pub trait Signer: Send + Sync {
    /// `message` is hashed with SHA-256 before signing; implementations must
    /// not retain the key material past the call.
    fn sign(&self, message: &[u8], private_key_hex: &str) -> NotaryResult<String>;
}
