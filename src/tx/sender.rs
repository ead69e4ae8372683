//! Transaction lifecycle: derive the ID, sign it, submit, query

use super::nonce::NonceManager;
use super::request::{TransactionRequest, UnsignedTransaction};
use crate::account::AccountInfo;
use crate::clock::Clock;
use crate::codec::{formatted_timestamp, hex_fix};
use crate::crypto::Signer;
use crate::error::{NotaryError, NotaryResult};
use crate::gateway::{as_i64, GatewayResponse, NagFunction};
use crate::transport::{CancelToken, Transport};

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A submitted request together with the gateway's reply
#[derive(Debug, Clone)]
pub struct Submission {
    pub request: TransactionRequest,
    pub response: GatewayResponse,
}

impl Submission {
    /// Whether the gateway accepted the transaction (`Result == 200`)
    pub fn accepted(&self) -> bool {
        self.response.is_success()
    }

    pub fn tx_id(&self) -> &str {
        &self.request.id
    }
}

/// Composes codec, signer and transport into the submission protocol
#[derive(Clone)]
pub struct TransactionSender {
    transport: Arc<dyn Transport>,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
}

impl TransactionSender {
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: Arc<dyn Signer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            signer,
            clock,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// POST `body` to a gateway function; non-200 results come back as data
    pub async fn call(
        &self,
        account: &AccountInfo,
        function: NagFunction,
        body: &Value,
        cancel: &CancelToken,
    ) -> NotaryResult<GatewayResponse> {
        let url = function.endpoint(&account.gateway_url, &account.network_node);
        crate::metrics::record_gateway_request(function);

        let raw = self.transport.post_json(&url, body, cancel).await?;
        let response = GatewayResponse::from_value(raw);

        debug!(
            function = function.label(),
            result = ?response.result,
            "Gateway replied"
        );
        Ok(response)
    }

    /// Last nonce the gateway has seen for the account
    pub async fn fetch_nonce(
        &self,
        account: &AccountInfo,
        cancel: &CancelToken,
    ) -> NotaryResult<u64> {
        if account.address.is_empty() {
            return Err(NotaryError::AccountNotOpen);
        }

        let body = json!({
            "Blockchain": hex_fix(&account.chain_id),
            "Address": hex_fix(&account.address),
            "Version": account.code_version,
        });
        let response = self
            .call(account, NagFunction::GetWalletNonce, &body, cancel)
            .await?;

        if !response.is_success() {
            return Err(NotaryError::NonceFormat(
                response
                    .error_message()
                    .unwrap_or_else(|| "gateway rejected nonce query".to_string()),
            ));
        }

        response
            .response
            .get("Nonce")
            .and_then(as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| NotaryError::NonceFormat(format!("Response: {}", response.response)))
    }

    /// Build and sign a certificate transaction without sending it
    pub fn prepare(
        &self,
        account: &AccountInfo,
        nonce: u64,
        data: &[u8],
        private_key_hex: &str,
    ) -> NotaryResult<TransactionRequest> {
        let timestamp = formatted_timestamp(self.clock.as_ref());
        let unsigned = UnsignedTransaction::certificate(
            &account.chain_id,
            &account.address,
            data,
            nonce,
            timestamp,
            &account.code_version,
        )?;

        let id = unsigned.id();
        let signature = self.signer.sign(id.as_bytes(), private_key_hex)?;
        Ok(unsigned.into_signed(id, signature))
    }

    /// Sign and submit `data` as a certificate using the account's next
    /// nonce. The nonce advances only when the gateway answers `Result == 200`.
    pub async fn submit(
        &self,
        account: &AccountInfo,
        nonces: &NonceManager,
        data: &[u8],
        private_key_hex: &str,
        cancel: &CancelToken,
    ) -> NotaryResult<Submission> {
        if account.address.is_empty() {
            return Err(NotaryError::AccountNotOpen);
        }

        let lease = nonces.lease().await;
        let request = self.prepare(account, lease.nonce(), data, private_key_hex)?;
        let body = serde_json::to_value(&request)?;

        let response = self
            .call(account, NagFunction::AddTransaction, &body, cancel)
            .await?;

        if response.is_success() {
            let next = lease.commit();
            crate::metrics::record_tx_submitted();
            info!(
                tx_id = %request.id,
                nonce = request.nonce,
                next_nonce = next,
                "Transaction accepted"
            );
        } else {
            crate::metrics::record_tx_rejected();
            warn!(
                tx_id = %request.id,
                nonce = request.nonce,
                result = ?response.result,
                reason = ?response.error_message(),
                "Gateway rejected transaction"
            );
        }

        Ok(Submission { request, response })
    }

    /// Look up a transaction; `range_start`/`range_end` are passed through
    pub async fn query(
        &self,
        account: &AccountInfo,
        tx_id: &str,
        range_start: i64,
        range_end: i64,
        cancel: &CancelToken,
    ) -> NotaryResult<GatewayResponse> {
        let body = json!({
            "Blockchain": hex_fix(&account.chain_id),
            "ID": hex_fix(tx_id),
            "Start": range_start.to_string(),
            "End": range_end.to_string(),
            "Version": account.code_version,
        });
        self.call(account, NagFunction::GetTransactionById, &body, cancel)
            .await
    }
}
