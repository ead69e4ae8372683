//! Network Access Gateway wire contract
//!
//! Function endpoints are `{gateway_url}Circular_{Function}_{network_node}`
//! and every reply is an envelope `{Result, Response, Node?, Message?}`. A
//! non-200 `Result` is application data, never a transport error.

mod discovery;

pub use discovery::{DiscoveryResolver, NetworkResolver, StaticResolver};

use serde_json::Value;

pub const DEFAULT_NAG_URL: &str = "https://nag.circularlabs.io/NAG.php?cep=";
pub const DEFAULT_CHAIN_ID: &str =
    "0x8a20baa40c45dc5055aeb26197c203e576ef389d9acb171bd62da11dc5ad72b2";
pub const DEFAULT_DISCOVERY_URL: &str = "https://circularlabs.io/network/getNAG";

/// `Result` value the gateway uses for success
pub const RESULT_OK: i64 = 200;

/// Gateway functions used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NagFunction {
    GetWalletNonce,
    AddTransaction,
    GetTransactionById,
    GetPendingTransaction,
    CheckWallet,
    GetWallet,
}

impl NagFunction {
    pub fn name(&self) -> &'static str {
        match self {
            NagFunction::GetWalletNonce => "Circular_GetWalletNonce_",
            NagFunction::AddTransaction => "Circular_AddTransaction_",
            NagFunction::GetTransactionById => "Circular_GetTransactionbyID_",
            NagFunction::GetPendingTransaction => "Circular_GetPendingTransaction_",
            NagFunction::CheckWallet => "Circular_CheckWallet_",
            NagFunction::GetWallet => "Circular_GetWallet_",
        }
    }

    pub fn endpoint(&self, gateway_url: &str, network_node: &str) -> String {
        format!("{}{}{}", gateway_url, self.name(), network_node)
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        self.name()
            .trim_start_matches("Circular_")
            .trim_end_matches('_')
    }
}

/// Decoded gateway reply; `raw` keeps the full body for callers that need
/// fields this type does not model
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub result: Option<i64>,
    pub response: Value,
    pub node: Option<String>,
    pub message: Option<String>,
    pub raw: Value,
}

impl GatewayResponse {
    pub fn from_value(raw: Value) -> Self {
        let result = raw.get("Result").and_then(as_i64);
        let response = raw.get("Response").cloned().unwrap_or(Value::Null);
        let node = raw.get("Node").and_then(Value::as_str).map(str::to_string);
        let message = raw
            .get("Message")
            .or_else(|| raw.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            result,
            response,
            node,
            message,
            raw,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == Some(RESULT_OK)
    }

    /// Best-effort reason for a non-200 reply
    pub fn error_message(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        self.message
            .clone()
            .or_else(|| self.response.as_str().map(str::to_string))
            .or_else(|| Some(format!("gateway result {:?}", self.result)))
    }
}

/// Integers sometimes arrive as numbers, floats or numeric strings
pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_naming() {
        assert_eq!(
            NagFunction::GetWalletNonce.endpoint("https://nag/NAG.php?cep=", ""),
            "https://nag/NAG.php?cep=Circular_GetWalletNonce_"
        );
        assert_eq!(
            NagFunction::GetTransactionById.endpoint("http://h/", "node1"),
            "http://h/Circular_GetTransactionbyID_node1"
        );
        assert_eq!(NagFunction::AddTransaction.label(), "AddTransaction");
    }

    #[test]
    fn test_response_envelope() {
        let ok = GatewayResponse::from_value(json!({
            "Result": 200,
            "Response": {"TxID": "abc"},
            "Node": "n1"
        }));
        assert!(ok.is_success());
        assert_eq!(ok.response["TxID"], "abc");
        assert_eq!(ok.node.as_deref(), Some("n1"));
        assert_eq!(ok.error_message(), None);

        let rejected = GatewayResponse::from_value(json!({
            "Result": "118",
            "Response": "Duplicate Nonce"
        }));
        assert!(!rejected.is_success());
        assert_eq!(rejected.result, Some(118));
        assert_eq!(rejected.error_message().as_deref(), Some("Duplicate Nonce"));
    }

    #[test]
    fn test_as_i64_variants() {
        assert_eq!(as_i64(&json!(7)), Some(7));
        assert_eq!(as_i64(&json!(7.0)), Some(7));
        assert_eq!(as_i64(&json!(7.5)), None);
        assert_eq!(as_i64(&json!(" 42 ")), Some(42));
        assert_eq!(as_i64(&json!("x")), None);
        assert_eq!(as_i64(&json!(null)), None);
    }
}
