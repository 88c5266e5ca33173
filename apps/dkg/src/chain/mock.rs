//! In-memory chain provider for unit tests.

use crate::chain::provider::{
    CallArg, ChainError, ChainProvider, ContractCall, ReceiptLog, SignedTransaction,
    TransactionReceipt, UnsignedTransaction,
};
use async_trait::async_trait;
use dkg_core::{BlockchainConfig, DEFAULT_GAS_PRICE};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// A chain with a configured signer.
pub(crate) fn signer_chain() -> BlockchainConfig {
    BlockchainConfig {
        name: "ganache".to_string(),
        title: "Ganache".to_string(),
        rpc: "http://localhost:7545".to_string(),
        hub_contract: "0xhub".to_string(),
        wallet: Some("0xwallet".to_string()),
        private_key: Some("0xkey".to_string()),
        gas_price: DEFAULT_GAS_PRICE,
    }
}

fn render(arg: &CallArg) -> String {
    match arg {
        CallArg::Address(v) | CallArg::Bytes32(v) | CallArg::String(v) => v.clone(),
        CallArg::Uint(v) => v.to_string(),
    }
}

#[derive(Default)]
pub(crate) struct MockProvider {
    gas: u64,
    estimate_failures: AtomicU32,
    read_failures: AtomicU32,
    estimates: AtomicU32,
    reads: AtomicU32,
    broadcasts: AtomicU32,
    contracts: Mutex<HashMap<String, String>>,
    stale: Mutex<HashSet<String>>,
    signed: Mutex<Vec<UnsignedTransaction>>,
    calls: Mutex<Vec<ContractCall>>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self {
            gas: 21_000,
            ..Self::default()
        }
    }

    pub(crate) fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    /// Hub entry returned by `getContractAddress(key)`.
    pub(crate) fn with_contract(self, key: &str, address: &str) -> Self {
        self.set_contract(key, address);
        self
    }

    pub(crate) fn set_contract(&self, key: &str, address: &str) {
        self.contracts
            .lock()
            .expect("lock")
            .insert(key.to_string(), address.to_string());
    }

    /// Calls to `address` fail with a stale-contract error.
    pub(crate) fn mark_stale(&self, address: &str) {
        self.stale.lock().expect("lock").insert(address.to_string());
    }

    pub(crate) fn fail_estimates(self, count: u32) -> Self {
        self.estimate_failures.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn fail_reads(self, count: u32) -> Self {
        self.read_failures.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn estimate_count(&self) -> u32 {
        self.estimates.load(Ordering::SeqCst)
    }

    pub(crate) fn read_count(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn broadcast_count(&self) -> u32 {
        self.broadcasts.load(Ordering::SeqCst)
    }

    pub(crate) fn signed_transactions(&self) -> Vec<UnsignedTransaction> {
        self.signed.lock().expect("lock").clone()
    }

    /// Every view call seen, in order.
    pub(crate) fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().expect("lock").clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_stale(&self, address: &str) -> Result<(), ChainError> {
        if self.stale.lock().expect("lock").contains(address) {
            return Err(ChainError::stale_contract(format!("{address} was replaced")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn estimate_gas(
        &self,
        _chain: &BlockchainConfig,
        call: &ContractCall,
        _from: &str,
    ) -> Result<u64, ChainError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.estimate_failures) {
            return Err(ChainError::transient("estimate timed out"));
        }
        self.check_stale(&call.contract.address)?;
        Ok(self.gas)
    }

    fn encode_call(&self, call: &ContractCall) -> Result<String, ChainError> {
        let args: Vec<String> = call.args.iter().map(render).collect();
        Ok(format!("{}({})", call.function, args.join(",")))
    }

    async fn sign(
        &self,
        _chain: &BlockchainConfig,
        tx: &UnsignedTransaction,
        _private_key: &str,
    ) -> Result<SignedTransaction, ChainError> {
        self.signed.lock().expect("lock").push(tx.clone());
        Ok(SignedTransaction {
            raw: format!("signed:{}", tx.data),
        })
    }

    async fn broadcast(
        &self,
        _chain: &BlockchainConfig,
        tx: &SignedTransaction,
    ) -> Result<TransactionReceipt, ChainError> {
        let n = self.broadcasts.fetch_add(1, Ordering::SeqCst) + 1;
        let mut logs = Vec::new();
        if tx.raw.starts_with("signed:createAsset(") {
            logs.push(ReceiptLog {
                event: "AssetCreated".to_string(),
                args: BTreeMap::from([("tokenId".to_string(), "42".to_string())]),
            });
        }
        Ok(TransactionReceipt {
            transaction_hash: format!("0xtx{n}"),
            block_number: u64::from(n),
            logs,
        })
    }

    async fn call(&self, _chain: &BlockchainConfig, call: &ContractCall) -> Result<String, ChainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().expect("lock").push(call.clone());
        if Self::take_failure(&self.read_failures) {
            return Err(ChainError::transient("rpc unavailable"));
        }
        self.check_stale(&call.contract.address)?;
        match (call.function.as_str(), call.args.first()) {
            ("getContractAddress", Some(CallArg::String(key))) => self
                .contracts
                .lock()
                .expect("lock")
                .get(key)
                .cloned()
                .ok_or_else(|| ChainError::fatal(format!("no contract named {key}"))),
            ("ownerOf", _) => Ok("0xowner".to_string()),
            (function, _) => Ok(format!("{}:{}", call.contract.address, function)),
        }
    }
}
