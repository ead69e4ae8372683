//! Configuration management for the notary client
//!
//! Loads settings from TOML files with environment variable substitution, and
//! per-network credentials from the external JSON credential file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_ENV: &str = "CERTNOTARY_CONFIG";
pub const PRIVATE_KEY_ENV: &str = "CERTNOTARY_PRIVATE_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client: ClientConfig,
    pub account: AccountConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub address: Option<String>,
    pub network: String,
    pub network_node: String,
    pub chain_id: Option<String>,
    pub poll_interval_ms: u64,
    pub outcome_timeout_secs: u64,
    pub credentials_path: Option<String>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            address: None,
            network: "testnet".to_string(),
            network_node: String::new(),
            chain_id: None,
            poll_interval_ms: 2_000,
            outcome_timeout_secs: 30,
            credentials_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub url: String,
    /// Gateway URLs used when discovery is unreachable
    pub fallback: HashMap<String, String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: crate::gateway::DEFAULT_DISCOVERY_URL.to_string(),
            fallback: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from the file named by `CERTNOTARY_CONFIG`, falling
    /// back to defaults when the default path does not exist
    pub fn load() -> Result<Self> {
        match env::var(CONFIG_ENV) {
            Ok(path) => Self::load_from(path),
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    tracing::debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.client.timeout_ms == 0 {
            anyhow::bail!("client.timeout_ms must be greater than zero");
        }
        if self.account.poll_interval_ms == 0 {
            anyhow::bail!("account.poll_interval_ms must be greater than zero");
        }
        if self.account.network.is_empty() {
            anyhow::bail!("account.network must not be empty");
        }
        if let Some(chain) = &self.account.chain_id {
            if !crate::codec::is_hex(chain) {
                anyhow::bail!("account.chain_id {:?} is not hex", chain);
            }
        }
        if self.discovery.url.is_empty() && self.discovery.fallback.is_empty() {
            tracing::warn!("No discovery URL or fallback gateways configured");
        }

        Ok(())
    }
}

/// A key pair entry in the credential file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountCredentials {
    pub private_key: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkCredentials {
    pub main_account: AccountCredentials,
    pub secondary_account: AccountCredentials,
    pub network: String,
    pub nag_urls: HashMap<String, String>,
}

/// Per-network credentials, keyed by network name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    pub networks: HashMap<String, NetworkCredentials>,
}

impl Credentials {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file: {:?}", path))?;
        serde_json::from_str(&data).with_context(|| "Failed to parse credentials file")
    }

    pub fn network(&self, name: &str) -> Option<&NetworkCredentials> {
        self.networks.get(name)
    }

    /// Gateway URL recorded for `name`, if any
    pub fn nag_url(&self, name: &str) -> Option<&str> {
        self.network(name)
            .and_then(|n| n.nag_urls.get(name))
            .map(String::as_str)
    }
}

/// Private key from the environment, then the credential file
pub fn resolve_private_key(credentials: Option<&Credentials>, network: &str) -> Option<String> {
    if let Ok(key) = env::var(PRIVATE_KEY_ENV) {
        return Some(key);
    }
    credentials
        .and_then(|c| c.network(network))
        .map(|n| n.main_account.private_key.clone())
        .filter(|k| !k.is_empty())
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");
    }

    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
