//! # Blockchain Configuration
//!
//! Per-chain records and the contract bindings derived from them.
//!
//! A [`BlockchainTable`] is the static configuration table keyed by chain
//! name. Operations never hold a reference into the table: [`BlockchainTable::select`]
//! hands out an owned snapshot, so two in-flight operations against different
//! chains never share mutable state.

use crate::DkgError;
use crate::ual::normalize_chain;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Gas price used when a chain does not override it (20 gwei).
pub const DEFAULT_GAS_PRICE: u64 = 20_000_000_000;

/// Gas limit used when estimation reports zero.
pub const GAS_LIMIT_FLOOR: u64 = 1_000_000;

// =============================================================================
// BLOCKCHAIN CONFIGURATION
// =============================================================================

/// Connection and signing settings for one chain.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainConfig {
    /// Table key, lower-case.
    #[serde(default)]
    pub name: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// JSON-RPC endpoint.
    pub rpc: String,
    /// Static address of the hub contract.
    pub hub_contract: String,
    /// Wallet that signs and pays for transactions.
    #[serde(default)]
    pub wallet: Option<String>,
    /// Private key of `wallet`.
    #[serde(default)]
    pub private_key: Option<String>,
    /// Fixed gas price in wei.
    #[serde(default = "default_gas_price")]
    pub gas_price: u64,
}

fn default_gas_price() -> u64 {
    DEFAULT_GAS_PRICE
}

impl BlockchainConfig {
    /// Wallet address, or a configuration error naming the chain.
    pub fn wallet(&self) -> Result<&str, DkgError> {
        self.wallet.as_deref().ok_or_else(|| {
            DkgError::Configuration(format!("No wallet configured for chain '{}'", self.name))
        })
    }

    /// Private key, or a configuration error naming the chain.
    pub fn private_key(&self) -> Result<&str, DkgError> {
        self.private_key.as_deref().ok_or_else(|| {
            DkgError::Configuration(format!(
                "No private key configured for chain '{}'",
                self.name
            ))
        })
    }
}

// Keeps the private key out of logs.
impl fmt::Debug for BlockchainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockchainConfig")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("rpc", &self.rpc)
            .field("hub_contract", &self.hub_contract)
            .field("wallet", &self.wallet)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("gas_price", &self.gas_price)
            .finish()
    }
}

// =============================================================================
// CONFIGURATION TABLE
// =============================================================================

/// Chain name → configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockchainTable {
    chains: BTreeMap<String, BlockchainConfig>,
}

impl BlockchainTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table of known public deployments. Wallets and keys are left empty.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "ganache",
            known("Ganache", "http://localhost:7545", "0x209679fA3B658Cd0fC74473aF28243bfe78a9b12"),
        );
        table.insert(
            "polygon",
            known(
                "Polygon",
                "https://matic-mumbai.chainstacklabs.com",
                "0xdaa16AC171CfE8Df6F79C06E7EEAb2249E2C9Ec8",
            ),
        );
        table.insert(
            "otp",
            known(
                "OriginTrail Parachain",
                "https://lofar-tm-rpc.origin-trail.network",
                "0x7585a99C5C150a08f5CDeFD16465C6De8D41Ebb2",
            ),
        );
        table
    }

    /// Insert or replace a chain. The key is lower-cased and copied into `name`.
    pub fn insert(&mut self, name: &str, mut config: BlockchainConfig) {
        let key = name.to_lowercase();
        config.name.clone_from(&key);
        if config.title.is_empty() {
            config.title.clone_from(&key);
        }
        self.chains.insert(key, config);
    }

    /// Overlay `other` on top of this table.
    ///
    /// Fields missing in an override (wallet, key) are kept from the existing entry.
    pub fn merge(&mut self, other: Self) {
        for (name, mut config) in other.chains {
            if let Some(existing) = self.chains.get(&name) {
                if config.wallet.is_none() {
                    config.wallet.clone_from(&existing.wallet);
                }
                if config.private_key.is_none() {
                    config.private_key.clone_from(&existing.private_key);
                }
            }
            self.insert(&name, config);
        }
    }

    /// Configured chain names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    fn lookup(&self, name: &str) -> Result<&BlockchainConfig, DkgError> {
        let lower = name.to_lowercase();
        self.chains
            .get(&lower)
            .or_else(|| self.chains.get(&normalize_chain(&lower)))
            .ok_or_else(|| DkgError::Configuration(format!("Unknown blockchain '{name}'")))
    }

    /// Snapshot of a chain able to sign transactions.
    pub fn select(&self, name: &str) -> Result<BlockchainConfig, DkgError> {
        let config = self.lookup(name)?;
        config.wallet()?;
        config.private_key()?;
        Ok(config.clone())
    }

    /// Snapshot of a chain for read-only calls; no signer required.
    pub fn select_for_reads(&self, name: &str) -> Result<BlockchainConfig, DkgError> {
        self.lookup(name).cloned()
    }
}

fn known(title: &str, rpc: &str, hub: &str) -> BlockchainConfig {
    BlockchainConfig {
        name: String::new(),
        title: title.to_string(),
        rpc: rpc.to_string(),
        hub_contract: hub.to_string(),
        wallet: None,
        private_key: None,
        gas_price: DEFAULT_GAS_PRICE,
    }
}

// =============================================================================
// CONTRACTS
// =============================================================================

/// Contracts the client binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractName {
    Hub,
    AssetRegistry,
    UaiRegistry,
    Token,
}

impl ContractName {
    /// Name the hub knows this contract by.
    #[must_use]
    pub const fn hub_key(self) -> &'static str {
        match self {
            Self::Hub => "Hub",
            Self::AssetRegistry => "AssetRegistry",
            Self::UaiRegistry => "UAIRegistry",
            Self::Token => "Token",
        }
    }

    /// Minimal ABI covering the functions the client calls.
    #[must_use]
    pub const fn abi(self) -> &'static str {
        match self {
            Self::Hub => HUB_ABI,
            Self::AssetRegistry => ASSET_REGISTRY_ABI,
            Self::UaiRegistry => UAI_REGISTRY_ABI,
            Self::Token => TOKEN_ABI,
        }
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hub_key())
    }
}

const HUB_ABI: &str = r#"[{"type":"function","name":"getContractAddress","stateMutability":"view","inputs":[{"name":"contractName","type":"string"}],"outputs":[{"name":"","type":"address"}]}]"#;

const ASSET_REGISTRY_ABI: &str = r#"[{"type":"function","name":"createAsset","stateMutability":"nonpayable","inputs":[{"name":"assertionId","type":"bytes32"},{"name":"rootHash","type":"bytes32"},{"name":"size","type":"uint256"},{"name":"triplesNumber","type":"uint256"},{"name":"epochsNumber","type":"uint16"},{"name":"tokenAmount","type":"uint96"}],"outputs":[]},{"type":"function","name":"updateAsset","stateMutability":"nonpayable","inputs":[{"name":"tokenId","type":"uint256"},{"name":"assertionId","type":"bytes32"},{"name":"rootHash","type":"bytes32"},{"name":"size","type":"uint256"},{"name":"triplesNumber","type":"uint256"},{"name":"epochsNumber","type":"uint16"},{"name":"tokenAmount","type":"uint96"}],"outputs":[]},{"type":"function","name":"getCommitHash","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"},{"name":"offset","type":"uint256"}],"outputs":[{"name":"","type":"bytes32"}]},{"type":"event","name":"AssetCreated","inputs":[{"name":"tokenId","type":"uint256","indexed":true}]}]"#;

const UAI_REGISTRY_ABI: &str = r#"[{"type":"function","name":"ownerOf","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"","type":"address"}]},{"type":"function","name":"transferFrom","stateMutability":"nonpayable","inputs":[{"name":"from","type":"address"},{"name":"to","type":"address"},{"name":"tokenId","type":"uint256"}],"outputs":[]}]"#;

const TOKEN_ABI: &str = r#"[{"type":"function","name":"increaseAllowance","stateMutability":"nonpayable","inputs":[{"name":"spender","type":"address"},{"name":"addedValue","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]}]"#;

/// A contract bound to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    pub name: ContractName,
    pub address: String,
    pub abi: &'static str,
}

impl ContractHandle {
    #[must_use]
    pub fn new(name: ContractName, address: impl Into<String>) -> Self {
        Self {
            name,
            address: address.into(),
            abi: name.abi(),
        }
    }
}

/// Everything an asset operation binds to on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSet {
    pub hub: ContractHandle,
    pub asset_registry: ContractHandle,
    pub token_registry: ContractHandle,
    pub token: ContractHandle,
}

impl ContractSet {
    /// Handle bound for `name`.
    #[must_use]
    pub fn get(&self, name: ContractName) -> &ContractHandle {
        match name {
            ContractName::Hub => &self.hub,
            ContractName::AssetRegistry => &self.asset_registry,
            ContractName::UaiRegistry => &self.token_registry,
            ContractName::Token => &self.token,
        }
    }
}

/// How a failed chain call should be treated by a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainErrorKind {
    /// Network hiccup, nonce race, underpriced replacement: worth retrying.
    Transient,
    /// Revert, bad arguments, insufficient funds: retrying cannot help.
    Fatal,
    /// The bound contract was replaced in the hub; re-resolve and retry.
    StaleContract,
}

// =============================================================================
// TESTS
// =============================================================================
