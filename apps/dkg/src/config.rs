//! # Client Configuration
//!
//! Settings are read from an optional TOML file and then overridden from the
//! environment:
//!
//! | Variable       | Overrides          |
//! |----------------|--------------------|
//! | `DKG_CONFIG`   | config file path   |
//! | `DKG_NODE_URL` | `node.url`         |
//! | `DKG_API_KEY`  | `node.api_key`     |
//!
//! ```toml
//! [node]
//! url = "http://localhost:8900"
//!
//! [polling]
//! frequency_secs = 5
//! max_retries = 5
//!
//! [blockchains.ganache]
//! wallet = "0x..."
//! private_key = "0x..."
//! ```
//!
//! `[blockchains.<name>]` entries are laid over the built-in table; a chain
//! not in the built-in table must give `rpc` and `hub_contract`.

use crate::chain::RetryPolicy;
use crate::operation::{PollOptions, SearchOptions};
use dkg_core::{BlockchainConfig, BlockchainTable, DEFAULT_GAS_PRICE, DkgError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "DKG_CONFIG";
const NODE_URL_ENV: &str = "DKG_NODE_URL";
const API_KEY_ENV: &str = "DKG_API_KEY";

// =============================================================================
// SECTIONS
// =============================================================================

/// Node endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: default_node_url(),
            api_key: None,
        }
    }
}

fn default_node_url() -> String {
    "http://localhost:8900".to_string()
}

/// Operation result polling.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_frequency_secs")]
    pub frequency_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            frequency_secs: default_frequency_secs(),
            max_retries: default_max_retries(),
        }
    }
}

const fn default_frequency_secs() -> u64 {
    5
}

const fn default_max_retries() -> u32 {
    5
}

/// Streaming search limits.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_number_of_results")]
    pub number_of_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            number_of_results: default_number_of_results(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    25
}

const fn default_number_of_results() -> usize {
    2000
}

/// Retry policy for chain reads and writes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChainRetryConfig {
    /// Attempts including the first; 0 retries transient errors forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
}

impl Default for ChainRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

const fn default_backoff_factor() -> u32 {
    2
}

/// Partial chain record from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainOverride {
    pub title: Option<String>,
    pub rpc: Option<String>,
    pub hub_contract: Option<String>,
    pub wallet: Option<String>,
    pub private_key: Option<String>,
    pub gas_price: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    node: NodeConfig,
    #[serde(default)]
    polling: PollingConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    chain_retry: ChainRetryConfig,
    #[serde(default)]
    blockchains: BTreeMap<String, ChainOverride>,
}

// =============================================================================
// CLIENT CONFIG
// =============================================================================

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub node: NodeConfig,
    pub polling: PollingConfig,
    pub search: SearchConfig,
    pub chain_retry: ChainRetryConfig,
    pub blockchains: BlockchainTable,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            polling: PollingConfig::default(),
            search: SearchConfig::default(),
            chain_retry: ChainRetryConfig::default(),
            blockchains: BlockchainTable::builtin(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DkgError> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| DkgError::Configuration(format!("Invalid config: {e}")))?;

        let mut blockchains = BlockchainTable::builtin();
        let mut overrides = BlockchainTable::new();
        for (name, chain) in raw.blockchains {
            let base = blockchains.select_for_reads(&name).ok();
            overrides.insert(&name, apply_override(&name, base, chain)?);
        }
        blockchains.merge(overrides);

        Ok(Self {
            node: raw.node,
            polling: raw.polling,
            search: raw.search,
            chain_retry: raw.chain_retry,
            blockchains,
        })
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DkgError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DkgError::Io(format!("Cannot read config {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Load from `path` (or `$DKG_CONFIG`), then apply environment overrides.
    ///
    /// `lookup` reads environment variables; pass `|k| std::env::var(k).ok()`.
    pub fn load(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DkgError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Apply `DKG_NODE_URL` and `DKG_API_KEY`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(NODE_URL_ENV) {
            self.node.url = url;
        }
        if let Some(key) = lookup(API_KEY_ENV) {
            self.node.api_key = Some(key);
        }
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            frequency: Duration::from_secs(self.polling.frequency_secs),
            max_retries: self.polling.max_retries,
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            frequency: Duration::from_secs(self.polling.frequency_secs),
            timeout: Duration::from_secs(self.search.timeout_secs),
            number_of_results: self.search.number_of_results,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = &self.chain_retry;
        RetryPolicy::new(
            (retry.max_attempts > 0).then_some(retry.max_attempts),
            Duration::from_millis(retry.initial_backoff_ms),
            Duration::from_millis(retry.max_backoff_ms),
            retry.backoff_factor,
        )
    }
}

fn apply_override(
    name: &str,
    base: Option<BlockchainConfig>,
    chain: ChainOverride,
) -> Result<BlockchainConfig, DkgError> {
    let missing = |field: &str| {
        DkgError::Configuration(format!("Chain '{name}' needs '{field}' in the config file"))
    };

    let (rpc, hub_contract, title, wallet, private_key, gas_price) = match base {
        Some(base) => (
            chain.rpc.unwrap_or(base.rpc),
            chain.hub_contract.unwrap_or(base.hub_contract),
            chain.title.unwrap_or(base.title),
            chain.wallet.or(base.wallet),
            chain.private_key.or(base.private_key),
            chain.gas_price.unwrap_or(base.gas_price),
        ),
        None => (
            chain.rpc.ok_or_else(|| missing("rpc"))?,
            chain.hub_contract.ok_or_else(|| missing("hub_contract"))?,
            chain.title.unwrap_or_default(),
            chain.wallet,
            chain.private_key,
            chain.gas_price.unwrap_or(DEFAULT_GAS_PRICE),
        ),
    };

    Ok(BlockchainConfig {
        name: String::new(),
        title,
        rpc,
        hub_contract,
        wallet,
        private_key,
        gas_price,
    })
}
