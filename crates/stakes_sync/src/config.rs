//! Read-side configuration.

use crate::client::RetryPolicy;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use stakes_ledger::Identity;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Env var overriding [`SyncConfig::api_url`].
pub const ENV_API_URL: &str = "STAKES_API_URL";
/// Env var overriding [`SyncConfig::contract_address`].
pub const ENV_CONTRACT_ADDRESS: &str = "STAKES_CONTRACT_ADDRESS";
/// Env var overriding [`SyncConfig::contract_name`].
pub const ENV_CONTRACT_NAME: &str = "STAKES_CONTRACT_NAME";

/// Where the contract lives and how reads against it behave.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Node API base URL.
    #[serde(default = "default_api_url")]
    api_url: String,

    /// Deployer address of the contract.
    #[serde(default = "default_contract_address")]
    contract_address: String,

    /// Contract name under the deployer.
    #[serde(default = "default_contract_name")]
    contract_name: String,

    /// Sender for read-only calls. Defaults to the contract address.
    #[serde(default)]
    sender: Option<String>,

    /// Retries after a rate-limited read.
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    /// First backoff delay; doubles per retry.
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,

    /// Lifetime of cached reads.
    #[serde(default = "default_cache_ttl_secs")]
    cache_ttl_secs: u64,

    /// How many of the newest games the list view fetches.
    #[serde(default = "default_recent_window")]
    recent_window: u32,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://stacks-node-api.testnet.stacks.co".to_string()
}

fn default_contract_address() -> String {
    "ST2HYQ0YP5YK1DF7HF859G5HDQ4JKRRFFBT48SM0M".to_string()
}

fn default_contract_name() -> String {
    "tic-tac-toe".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    400
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_recent_window() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            contract_address: default_contract_address(),
            contract_name: default_contract_name(),
            sender: None,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            recent_window: default_recent_window(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(api_url = %config.api_url, contract = %config.contract_name, "Config loaded successfully");
        Ok(config)
    }

    /// Defaults, or the file when given, then environment overrides.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `STAKES_*` overrides from a variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL) {
            debug!(%url, "Overriding API URL");
            self.api_url = url;
        }
        if let Some(address) = lookup(ENV_CONTRACT_ADDRESS) {
            debug!(%address, "Overriding contract address");
            self.contract_address = address;
        }
        if let Some(name) = lookup(ENV_CONTRACT_NAME) {
            debug!(%name, "Overriding contract name");
            self.contract_name = name;
        }
    }

    /// Checks that addresses parse and limits are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.contract()?;
        self.sender_identity()?;
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::new("api_url must not be empty".to_string()));
        }
        if self.recent_window == 0 {
            return Err(ConfigError::new("recent_window must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Contract principal (`address.name`).
    pub fn contract(&self) -> Result<Identity, ConfigError> {
        self.contract_address
            .parse::<Identity>()
            .and_then(|who| who.with_contract(self.contract_name.clone()))
            .map_err(|e| {
                ConfigError::new(format!(
                    "Invalid contract '{}.{}': {}",
                    self.contract_address, self.contract_name, e
                ))
            })
    }

    /// Sender principal for read-only calls.
    pub fn sender_identity(&self) -> Result<Identity, ConfigError> {
        let sender = self.sender.as_deref().unwrap_or(&self.contract_address);
        sender
            .parse::<Identity>()
            .map_err(|e| ConfigError::new(format!("Invalid sender '{}': {}", sender, e)))
    }

    /// Backoff settings for rate-limited reads.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }

    /// Lifetime of cached reads.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// HTTP timeout per request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
