//! Certificate record submitted as transaction payload

use crate::codec::{bytes_to_hex, hex_to_bytes, hex_to_string};
use crate::error::NotaryResult;

use serde::{Deserialize, Serialize};

/// A notarized data record; field order is part of the serialized form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Hex of the certified content
    pub data: String,
    #[serde(rename = "previousTxID", default)]
    pub previous_tx_id: String,
    #[serde(rename = "previousBlock", default)]
    pub previous_block: String,
    pub version: String,
}

impl Default for Certificate {
    fn default() -> Self {
        Self {
            data: String::new(),
            previous_tx_id: String::new(),
            previous_block: String::new(),
            version: crate::LIB_VERSION.to_string(),
        }
    }
}

impl Certificate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` hex encoded; any bytes, text or not
    pub fn set_data(&mut self, data: impl AsRef<[u8]>) {
        self.data = bytes_to_hex(data.as_ref());
    }

    /// Decoded content as text
    pub fn data(&self) -> NotaryResult<String> {
        hex_to_string(&self.data)
    }

    pub fn data_bytes(&self) -> NotaryResult<Vec<u8>> {
        hex_to_bytes(&self.data)
    }

    /// Chain this certificate to an earlier one
    pub fn with_previous(mut self, tx_id: impl Into<String>, block: impl Into<String>) -> Self {
        self.previous_tx_id = tx_id.into();
        self.previous_block = block.into();
        self
    }

    pub fn to_json(&self) -> NotaryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> NotaryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Byte length of the JSON record
    pub fn size(&self) -> NotaryResult<usize> {
        Ok(self.to_json()?.len())
    }
}
