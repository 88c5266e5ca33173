//! # Chain Provider
//!
//! The seam between the client and a blockchain node.
//!
//! Gas estimation, ABI encoding, ECDSA signing and broadcasting are not
//! implemented here. An implementation of [`ChainProvider`] supplies them,
//! keyed by contract address, ABI, function name and arguments. Every
//! provider error is tagged with a [`ChainErrorKind`] so retry policies can
//! tell a dropped connection from a reverted call.

use async_trait::async_trait;
use dkg_core::{BlockchainConfig, ChainErrorKind, ContractHandle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// CALLS
// =============================================================================

/// One ABI-typed call argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CallArg {
    Address(String),
    Uint(u128),
    Bytes32(String),
    String(String),
}

/// A contract function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: ContractHandle,
    pub function: String,
    pub args: Vec<CallArg>,
}

impl ContractCall {
    pub fn new(contract: &ContractHandle, function: &str, args: Vec<CallArg>) -> Self {
        Self {
            contract: contract.clone(),
            function: function.to_string(),
            args,
        }
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Transaction envelope before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub from: String,
    pub to: String,
    /// ABI-encoded call data, hex.
    pub data: String,
    pub gas_limit: u64,
    pub gas_price: u64,
}

/// Raw signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: String,
}

/// A decoded event emitted by a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    pub event: String,
    pub args: BTreeMap<String, String>,
}

/// Result of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
}

impl TransactionReceipt {
    /// First value of `arg` in an `event` log.
    pub fn event_arg(&self, event: &str, arg: &str) -> Option<&str> {
        self.logs
            .iter()
            .filter(|log| log.event == event)
            .find_map(|log| log.args.get(arg).map(String::as_str))
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failure reported by a chain provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct ChainError {
    pub kind: ChainErrorKind,
    pub message: String,
}

impl ChainError {
    pub fn new(kind: ChainErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ChainErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ChainErrorKind::Fatal, message)
    }

    pub fn stale_contract(message: impl Into<String>) -> Self {
        Self::new(ChainErrorKind::StaleContract, message)
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Chain RPC and signing primitives.
///
/// `chain` carries the RPC endpoint the call is bound to; implementations
/// must not cache it across calls, since each operation binds its own
/// snapshot.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Gas needed for `call` when sent from `from`.
    async fn estimate_gas(
        &self,
        chain: &BlockchainConfig,
        call: &ContractCall,
        from: &str,
    ) -> Result<u64, ChainError>;

    /// ABI-encode `call` into transaction data.
    fn encode_call(&self, call: &ContractCall) -> Result<String, ChainError>;

    /// Sign `tx` with `private_key`.
    async fn sign(
        &self,
        chain: &BlockchainConfig,
        tx: &UnsignedTransaction,
        private_key: &str,
    ) -> Result<SignedTransaction, ChainError>;

    /// Broadcast and wait for the receipt.
    async fn broadcast(
        &self,
        chain: &BlockchainConfig,
        tx: &SignedTransaction,
    ) -> Result<TransactionReceipt, ChainError>;

    /// Execute a view/pure function and return its decoded output.
    async fn call(&self, chain: &BlockchainConfig, call: &ContractCall) -> Result<String, ChainError>;
}
