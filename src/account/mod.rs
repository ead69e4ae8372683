//! Wallet session state
//!
//! An [`Account`] moves through `Closed -> Open -> NetworkConfigured ->
//! NonceKnown`. Configuration setters take `&mut self`; network operations
//! take `&self` so a shared `Arc<Account>` can submit from several tasks
//! while the nonce lock keeps submissions in order.

use crate::certificate::Certificate;
use crate::clock::{Clock, SystemClock};
use crate::codec::{hex_fix, is_hex};
use crate::crypto::{Secp256k1Signer, Signer};
use crate::error::{NotaryError, NotaryResult};
use crate::gateway::{
    DiscoveryResolver, GatewayResponse, NagFunction, NetworkResolver, DEFAULT_CHAIN_ID,
    DEFAULT_DISCOVERY_URL, DEFAULT_NAG_URL,
};
use crate::transport::{CancelToken, Transport};
use crate::tx::{
    NonceManager, OutcomePoller, Submission, TransactionOutcome, TransactionQuery,
    TransactionSender, DEFAULT_POLL_INTERVAL,
};

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle position of an [`Account`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Closed,
    Open,
    NetworkConfigured,
    NonceKnown,
}

/// Addressing details sent with every gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: String,
    pub network: String,
    pub network_node: String,
    pub gateway_url: String,
    pub chain_id: String,
    pub code_version: String,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            address: String::new(),
            network: String::new(),
            network_node: String::new(),
            gateway_url: DEFAULT_NAG_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            code_version: crate::LIB_VERSION.to_string(),
        }
    }
}

pub struct AccountBuilder {
    transport: Arc<dyn Transport>,
    resolver: Option<Arc<dyn NetworkResolver>>,
    signer: Option<Arc<dyn Signer>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AccountBuilder {
    pub fn resolver(mut self, resolver: Arc<dyn NetworkResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Account {
        let resolver = self.resolver.unwrap_or_else(|| {
            Arc::new(DiscoveryResolver::new(
                self.transport.clone(),
                DEFAULT_DISCOVERY_URL,
            ))
        });
        let signer = self
            .signer
            .unwrap_or_else(|| Arc::new(Secp256k1Signer::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Account {
            info: AccountInfo::default(),
            network_configured: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            nonces: NonceManager::new(),
            latest_tx_id: RwLock::new(None),
            sender: TransactionSender::new(self.transport, signer, clock),
            resolver,
        }
    }
}

/// One wallet session against a Network Access Gateway
pub struct Account {
    info: AccountInfo,
    network_configured: bool,
    poll_interval: Duration,
    nonces: NonceManager,
    latest_tx_id: RwLock<Option<String>>,
    sender: TransactionSender,
    resolver: Arc<dyn NetworkResolver>,
}

impl Account {
    /// Closed account using the default discovery service, signer and clock
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> AccountBuilder {
        AccountBuilder {
            transport,
            resolver: None,
            signer: None,
            clock: None,
        }
    }

    pub fn state(&self) -> AccountState {
        if self.info.address.is_empty() {
            AccountState::Closed
        } else if self.nonces.is_known() {
            AccountState::NonceKnown
        } else if self.network_configured {
            AccountState::NetworkConfigured
        } else {
            AccountState::Open
        }
    }

    pub fn info(&self) -> &AccountInfo {
        &self.info
    }

    pub fn address(&self) -> &str {
        &self.info.address
    }

    pub fn network(&self) -> &str {
        &self.info.network
    }

    pub fn gateway_url(&self) -> &str {
        &self.info.gateway_url
    }

    pub fn chain_id(&self) -> &str {
        &self.info.chain_id
    }

    pub fn network_node(&self) -> &str {
        &self.info.network_node
    }

    pub fn code_version(&self) -> &str {
        &self.info.code_version
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Next nonce a submission will use
    pub fn nonce(&self) -> u64 {
        self.nonces.current()
    }

    /// ID of the last transaction the gateway accepted
    pub fn latest_tx_id(&self) -> Option<String> {
        self.latest_tx_id
            .read()
            .map(|id| id.clone())
            .unwrap_or_default()
    }

    /// Open the session for `address`. Switching to a different address
    /// drops the nonce, the last transaction ID and the resolved network, so
    /// the new wallet starts again from `Open`.
    pub fn open(&mut self, address: &str) -> NotaryResult<()> {
        if !is_hex(address) {
            return Err(NotaryError::InvalidAddress(address.to_string()));
        }
        if self.info.address != address {
            if !self.info.address.is_empty() {
                debug!(previous = %self.info.address, address, "Switching account address");
            }
            let defaults = AccountInfo::default();
            self.info.network = defaults.network;
            self.info.gateway_url = defaults.gateway_url;
            self.network_configured = false;
            self.nonces.reset();
            if let Ok(latest) = self.latest_tx_id.get_mut() {
                *latest = None;
            }
        }
        self.info.address = address.to_string();
        info!(address, "Account opened");
        Ok(())
    }

    /// Resolve `network` to its gateway URL; on failure nothing changes
    pub async fn set_network(&mut self, network: &str, cancel: &CancelToken) -> NotaryResult<()> {
        let url = self.resolver.resolve(network, cancel).await?;
        self.info.network = network.to_string();
        self.info.gateway_url = url;
        self.network_configured = true;
        info!(network, gateway = %self.info.gateway_url, "Network configured");
        Ok(())
    }

    /// Use a known gateway URL directly, skipping discovery
    pub fn set_gateway_url(&mut self, url: impl Into<String>) {
        self.info.gateway_url = url.into();
        self.network_configured = true;
    }

    pub fn set_blockchain(&mut self, chain_id: &str) -> NotaryResult<()> {
        if !is_hex(chain_id) {
            return Err(NotaryError::InvalidAddress(chain_id.to_string()));
        }
        self.info.chain_id = chain_id.to_string();
        debug!(chain = chain_id, "Blockchain set");
        Ok(())
    }

    pub fn set_network_node(&mut self, node: impl Into<String>) {
        self.info.network_node = node.into();
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// Sync the local nonce with the gateway; returns the next nonce to use.
    /// The local nonce is untouched on any error.
    pub async fn refresh_nonce(&self, cancel: &CancelToken) -> NotaryResult<u64> {
        let last_used = self.sender.fetch_nonce(&self.info, cancel).await?;
        let next = self.nonces.sync(last_used).await;
        info!(
            address = %self.info.address,
            chain = %self.info.chain_id,
            nonce = next,
            "Nonce refreshed"
        );
        Ok(next)
    }

    /// Sign and submit `payload` as a certificate transaction
    pub async fn submit(
        &self,
        payload: &[u8],
        private_key_hex: &str,
        cancel: &CancelToken,
    ) -> NotaryResult<Submission> {
        if !self.nonces.is_known() && !self.info.address.is_empty() {
            warn!(
                address = %self.info.address,
                nonce = self.nonces.current(),
                "Submitting before the nonce was refreshed"
            );
        }

        let submission = self
            .sender
            .submit(&self.info, &self.nonces, payload, private_key_hex, cancel)
            .await?;

        if submission.accepted() {
            if let Ok(mut latest) = self.latest_tx_id.write() {
                *latest = Some(submission.request.id.clone());
            }
        }
        Ok(submission)
    }

    /// Submit the certificate's JSON record as the payload
    pub async fn submit_certificate(
        &self,
        certificate: &Certificate,
        private_key_hex: &str,
        cancel: &CancelToken,
    ) -> NotaryResult<Submission> {
        let record = certificate.to_json()?;
        self.submit(record.as_bytes(), private_key_hex, cancel).await
    }

    /// Look up a transaction; "pending" and "not found" are returned as data
    pub async fn query(
        &self,
        tx_id: &str,
        range_start: i64,
        range_end: i64,
        cancel: &CancelToken,
    ) -> NotaryResult<GatewayResponse> {
        self.sender
            .query(&self.info, tx_id, range_start, range_end, cancel)
            .await
    }

    /// Poll until the transaction leaves `Pending`, using the account's
    /// poll interval
    pub async fn wait_for_outcome(
        &self,
        tx_id: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> NotaryResult<TransactionOutcome> {
        OutcomePoller::new(self)
            .interval(self.poll_interval)
            .timeout(timeout)
            .wait(tx_id, cancel)
            .await
    }

    pub async fn check_wallet(&self, cancel: &CancelToken) -> NotaryResult<GatewayResponse> {
        self.wallet_call(NagFunction::CheckWallet, cancel).await
    }

    pub async fn get_wallet(&self, cancel: &CancelToken) -> NotaryResult<GatewayResponse> {
        self.wallet_call(NagFunction::GetWallet, cancel).await
    }

    pub async fn pending_transaction(
        &self,
        tx_id: &str,
        cancel: &CancelToken,
    ) -> NotaryResult<GatewayResponse> {
        let body = json!({
            "Blockchain": hex_fix(&self.info.chain_id),
            "ID": hex_fix(tx_id),
            "Version": self.info.code_version,
        });
        self.sender
            .call(&self.info, NagFunction::GetPendingTransaction, &body, cancel)
            .await
    }

    async fn wallet_call(
        &self,
        function: NagFunction,
        cancel: &CancelToken,
    ) -> NotaryResult<GatewayResponse> {
        if self.info.address.is_empty() {
            return Err(NotaryError::AccountNotOpen);
        }
        let body = json!({
            "Blockchain": hex_fix(&self.info.chain_id),
            "Address": hex_fix(&self.info.address),
            "Version": self.info.code_version,
        });
        self.sender.call(&self.info, function, &body, cancel).await
    }

    /// Back to `Closed` with default gateway, chain and poll interval
    pub fn close(&mut self) {
        self.info = AccountInfo::default();
        self.network_configured = false;
        self.poll_interval = DEFAULT_POLL_INTERVAL;
        self.nonces.reset();
        if let Ok(latest) = self.latest_tx_id.get_mut() {
            *latest = None;
        }
        debug!("Account closed");
    }
}

#[async_trait]
impl TransactionQuery for Account {
    async fn query(
        &self,
        tx_id: &str,
        range_start: i64,
        range_end: i64,
        cancel: &CancelToken,
    ) -> NotaryResult<GatewayResponse> {
        Account::query(self, tx_id, range_start, range_end, cancel).await
    }
}
