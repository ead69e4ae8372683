//! secp256k1 ECDSA signer

use super::Signer;
use crate::codec::{hex_fix, hex_to_bytes};
use crate::error::{NotaryError, NotaryResult};

use ethers::core::k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use ethers::core::k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use tracing::debug;

const PRIVATE_KEY_LEN: usize = 32;

/// Deterministic (RFC 6979) ECDSA over secp256k1, DER-encoded, low-S
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Signer;

impl Secp256k1Signer {
    pub fn new() -> Self {
        Self
    }
}

impl Signer for Secp256k1Signer {
    fn sign(&self, message: &[u8], private_key_hex: &str) -> NotaryResult<String> {
        let key = signing_key(private_key_hex)?;
        let digest = Sha256::digest(message);

        let signature: Signature = key
            .sign_prehash(&digest)
            .map_err(|e| NotaryError::Signing(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        debug!(digest = %hex::encode(digest), "Signed message digest");
        Ok(hex::encode(signature.to_der().as_bytes()))
    }
}

/// Parse a hex private key; the intermediate byte buffer is wiped
fn signing_key(private_key_hex: &str) -> NotaryResult<SigningKey> {
    let mut bytes = hex_to_bytes(private_key_hex)
        .map_err(|_| NotaryError::InvalidKey("private key is not valid hex".to_string()))?;

    let result = if bytes.len() != PRIVATE_KEY_LEN {
        Err(NotaryError::InvalidKey(format!(
            "expected {} bytes, got {}",
            PRIVATE_KEY_LEN,
            bytes.len()
        )))
    } else {
        SigningKey::from_slice(&bytes)
            .map_err(|_| NotaryError::InvalidKey("scalar out of range".to_string()))
    };

    bytes.iter_mut().for_each(|b| *b = 0);
    result
}

/// Uncompressed SEC1 public key (65 bytes) for a hex private key
pub fn public_key_hex(private_key_hex: &str) -> NotaryResult<String> {
    let key = signing_key(private_key_hex)?;
    let point = key.verifying_key().to_encoded_point(false);
    Ok(hex::encode(point.as_bytes()))
}

/// Check a DER signature produced by [`Secp256k1Signer`]
pub fn verify(public_key_hex: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(hex_fix(public_key_hex)) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(hex_fix(signature_hex)) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_sec1_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(&sig_bytes) else {
        return false;
    };

    key.verify_prehash(&Sha256::digest(message), &signature).is_ok()
}
