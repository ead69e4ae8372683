//! Network name to gateway URL resolution

use crate::error::{NotaryError, NotaryResult, TransportErrorKind};
use crate::transport::{CancelToken, Transport};

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves a network name such as `testnet` to its gateway URL
#[async_trait]
pub trait NetworkResolver: Send + Sync {
    async fn resolve(&self, network: &str, cancel: &CancelToken) -> NotaryResult<String>;
}

#[derive(Debug, Deserialize)]
struct DiscoveryReply {
    #[serde(default)]
    status: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    message: String,
}

/// Asks the discovery endpoint (`{url}?network={name}`), falling back to
/// configured gateway URLs when the endpoint cannot be reached
pub struct DiscoveryResolver {
    transport: Arc<dyn Transport>,
    url: String,
    fallback: HashMap<String, String>,
}

impl DiscoveryResolver {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            fallback: HashMap::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: HashMap<String, String>) -> Self {
        self.fallback = fallback;
        self
    }

    fn lookup_url(&self, network: &str) -> NotaryResult<String> {
        reqwest::Url::parse_with_params(&self.url, &[("network", network)])
            .map(String::from)
            .map_err(|e| NotaryError::NetworkResolution {
                network: network.to_string(),
                message: format!("invalid discovery URL {:?}: {}", self.url, e),
            })
    }
}

#[async_trait]
impl NetworkResolver for DiscoveryResolver {
    async fn resolve(&self, network: &str, cancel: &CancelToken) -> NotaryResult<String> {
        let lookup = self.lookup_url(network)?;
        debug!(network, url = %lookup, "Resolving gateway URL");

        let body = match self.transport.get_json(&lookup, cancel).await {
            Ok(body) => body,
            Err(e) if e.kind == TransportErrorKind::Cancelled => {
                return Err(NotaryError::Cancelled(format!("resolving network {}", network)));
            }
            Err(e) => {
                if let Some(url) = self.fallback.get(network) {
                    warn!(network, error = %e, "Discovery unreachable, using configured gateway");
                    return Ok(url.clone());
                }
                return Err(NotaryError::NetworkResolution {
                    network: network.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let reply: DiscoveryReply =
            serde_json::from_value(body).map_err(|e| NotaryError::NetworkResolution {
                network: network.to_string(),
                message: format!("malformed discovery reply: {}", e),
            })?;

        if reply.status == "success" && !reply.url.is_empty() {
            info!(network, gateway = %reply.url, "Resolved gateway");
            return Ok(reply.url);
        }

        let message = if reply.message.is_empty() {
            "failed to get URL".to_string()
        } else {
            reply.message
        };
        Err(NotaryError::NetworkResolution {
            network: network.to_string(),
            message,
        })
    }
}

/// Fixed name to URL table, for tests and offline setups
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    gateways: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new(gateways: HashMap<String, String>) -> Self {
        Self { gateways }
    }

    pub fn with(mut self, network: impl Into<String>, url: impl Into<String>) -> Self {
        self.gateways.insert(network.into(), url.into());
        self
    }
}

#[async_trait]
impl NetworkResolver for StaticResolver {
    async fn resolve(&self, network: &str, _cancel: &CancelToken) -> NotaryResult<String> {
        self.gateways
            .get(network)
            .cloned()
            .ok_or_else(|| NotaryError::NetworkResolution {
                network: network.to_string(),
                message: "unknown network".to_string(),
            })
    }
}
