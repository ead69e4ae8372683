//! Transaction request construction and canonical ID derivation
//!
//! The ID is `sha256(chain ++ from ++ to ++ payload_hex ++ nonce ++ timestamp)`
//! over prefix-stripped hex and a decimal nonce, with no separators. The
//! gateway recomputes it to verify the signature, so the order and the set
//! of components are fixed.

use crate::codec::{hex_fix, hex_to_bytes, hex_to_string, sha256_hex, string_to_hex};
use crate::error::{NotaryError, NotaryResult};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Envelope action for notarized data
pub const CERTIFICATE_ACTION: &str = "CERTIFICATE";
/// Transaction type tag the gateway expects for certificates
pub const CERTIFICATE_TX_TYPE: &str = "C_TYPE_CERTIFICATE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PayloadEnvelope {
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "Data")]
    data: String,
}

/// Wrap `data` as `{"Action":"CERTIFICATE","Data":hex(data)}` and hex-encode
/// the JSON text, giving the hex-of-hex transaction payload
pub fn encode_payload(data: &[u8]) -> NotaryResult<String> {
    let envelope = PayloadEnvelope {
        action: CERTIFICATE_ACTION.to_string(),
        data: hex::encode(data),
    };
    let json = serde_json::to_string(&envelope)?;
    Ok(string_to_hex(&json))
}

/// Reverse of [`encode_payload`]
pub fn decode_payload(payload_hex: &str) -> NotaryResult<Vec<u8>> {
    let json = hex_to_string(payload_hex)?;
    let envelope: PayloadEnvelope = serde_json::from_str(&json)
        .map_err(|e| NotaryError::Decode(format!("payload envelope: {}", e)))?;
    hex_to_bytes(&envelope.data)
}

/// Canonical transaction ID; pure
pub fn compute_id(
    chain_id: &str,
    from: &str,
    to: &str,
    payload_hex: &str,
    nonce: u64,
    timestamp: &str,
) -> String {
    let preimage = format!(
        "{}{}{}{}{}{}",
        hex_fix(chain_id),
        hex_fix(from),
        hex_fix(to),
        payload_hex,
        nonce,
        timestamp
    );
    sha256_hex(preimage.as_bytes())
}

/// Body of an `AddTransaction` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionRequest {
    #[serde(rename = "ID")]
    pub id: String,
    pub from: String,
    pub to: String,
    pub timestamp: String,
    pub payload: String,
    #[serde(
        serialize_with = "serialize_nonce",
        deserialize_with = "deserialize_nonce"
    )]
    pub nonce: u64,
    pub signature: String,
    #[serde(rename = "Blockchain")]
    pub chain_id: String,
    #[serde(rename = "Type")]
    pub tx_type: String,
    pub version: String,
}

/// Everything needed to derive a request except the signature
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub chain_id: String,
    pub address: String,
    pub payload: String,
    pub nonce: u64,
    pub timestamp: String,
    pub version: String,
}

impl UnsignedTransaction {
    /// Self-addressed certificate transaction
    pub fn certificate(
        chain_id: &str,
        address: &str,
        data: &[u8],
        nonce: u64,
        timestamp: String,
        version: &str,
    ) -> NotaryResult<Self> {
        Ok(Self {
            chain_id: hex_fix(chain_id).to_string(),
            address: hex_fix(address).to_string(),
            payload: encode_payload(data)?,
            nonce,
            timestamp,
            version: version.to_string(),
        })
    }

    pub fn id(&self) -> String {
        compute_id(
            &self.chain_id,
            &self.address,
            &self.address,
            &self.payload,
            self.nonce,
            &self.timestamp,
        )
    }

    pub fn into_signed(self, id: String, signature: String) -> TransactionRequest {
        TransactionRequest {
            id,
            from: self.address.clone(),
            to: self.address,
            timestamp: self.timestamp,
            payload: self.payload,
            nonce: self.nonce,
            signature,
            chain_id: self.chain_id,
            tx_type: CERTIFICATE_TX_TYPE.to_string(),
            version: self.version,
        }
    }
}

impl TransactionRequest {
    /// Recompute the ID from the request's own fields
    pub fn recompute_id(&self) -> String {
        compute_id(
            &self.chain_id,
            &self.from,
            &self.to,
            &self.payload,
            self.nonce,
            &self.timestamp,
        )
    }

    pub fn data(&self) -> NotaryResult<Vec<u8>> {
        decode_payload(&self.payload)
    }
}

fn serialize_nonce<S: Serializer>(nonce: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&nonce.to_string())
}

fn deserialize_nonce<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
