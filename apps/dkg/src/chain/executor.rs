//! # Contract Call Executors
//!
//! [`TransactionExecutor`] runs one state-changing call as a five-step
//! sequence: estimate gas, encode, build the envelope, sign, broadcast.
//! A failure at any step restarts the whole sequence under the retry policy.
//!
//! [`ReadExecutor`] runs view calls under the same policy.

use crate::chain::provider::{
    CallArg, ChainProvider, ContractCall, TransactionReceipt, UnsignedTransaction,
};
use crate::chain::retry::RetryPolicy;
use dkg_core::{BlockchainConfig, ContractHandle, DkgError, GAS_LIMIT_FLOOR};

/// Gas limit for an estimate; zero falls back to the floor.
fn gas_limit(estimate: u64) -> u64 {
    if estimate == 0 { GAS_LIMIT_FLOOR } else { estimate }
}

// =============================================================================
// TRANSACTION EXECUTOR
// =============================================================================

/// Executes state-changing calls on one chain.
pub struct TransactionExecutor<'a> {
    provider: &'a dyn ChainProvider,
    chain: &'a BlockchainConfig,
    policy: &'a RetryPolicy,
}

impl<'a> TransactionExecutor<'a> {
    pub fn new(
        provider: &'a dyn ChainProvider,
        chain: &'a BlockchainConfig,
        policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            provider,
            chain,
            policy,
        }
    }

    /// Execute `function` on `contract` and return the mined receipt.
    ///
    /// Missing wallet or key is reported before anything is sent.
    pub async fn execute(
        &self,
        contract: &ContractHandle,
        function: &str,
        args: Vec<CallArg>,
    ) -> Result<TransactionReceipt, DkgError> {
        let wallet = self.chain.wallet()?;
        let private_key = self.chain.private_key()?;
        let call = ContractCall::new(contract, function, args);

        let receipt = self
            .policy
            .execute(function, || async {
                let estimate = self.provider.estimate_gas(self.chain, &call, wallet).await?;
                let data = self.provider.encode_call(&call)?;
                let tx = UnsignedTransaction {
                    from: wallet.to_string(),
                    to: contract.address.clone(),
                    data,
                    gas_limit: gas_limit(estimate),
                    gas_price: self.chain.gas_price,
                };
                tracing::debug!(
                    chain = %self.chain.name,
                    contract = %contract.name,
                    function,
                    gas_limit = tx.gas_limit,
                    "Sending transaction"
                );
                let signed = self.provider.sign(self.chain, &tx, private_key).await?;
                self.provider.broadcast(self.chain, &signed).await
            })
            .await?;

        tracing::info!(
            chain = %self.chain.name,
            function,
            tx = %receipt.transaction_hash,
            block = receipt.block_number,
            "Transaction mined"
        );
        Ok(receipt)
    }
}

// =============================================================================
// READ EXECUTOR
// =============================================================================

/// Executes view calls on one chain.
pub struct ReadExecutor<'a> {
    provider: &'a dyn ChainProvider,
    chain: &'a BlockchainConfig,
    policy: &'a RetryPolicy,
}

impl<'a> ReadExecutor<'a> {
    pub fn new(
        provider: &'a dyn ChainProvider,
        chain: &'a BlockchainConfig,
        policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            provider,
            chain,
            policy,
        }
    }

    /// Call `function` on `contract` and return its decoded output.
    pub async fn call(
        &self,
        contract: &ContractHandle,
        function: &str,
        args: Vec<CallArg>,
    ) -> Result<String, DkgError> {
        let call = ContractCall::new(contract, function, args);
        tracing::debug!(chain = %self.chain.name, contract = %contract.name, function, "Reading");
        self.policy
            .execute(function, || self.provider.call(self.chain, &call))
            .await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockProvider, signer_chain};
    use dkg_core::{ChainErrorKind, ContractName};
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(Some(max_attempts), Duration::ZERO, Duration::ZERO, 1)
    }

    #[tokio::test]
    async fn estimate_failing_twice_takes_three_attempts() {
        let provider = MockProvider::new().fail_estimates(2);
        let chain = signer_chain();
        let policy = fast_policy(5);
        let token = ContractHandle::new(ContractName::Token, "0xtoken");

        let receipt = TransactionExecutor::new(&provider, &chain, &policy)
            .execute(
                &token,
                "increaseAllowance",
                vec![CallArg::Address("0xasset".to_string()), CallArg::Uint(10)],
            )
            .await
            .expect("third attempt succeeds");

        assert_eq!(provider.estimate_count(), 3);
        assert_eq!(provider.broadcast_count(), 1);
        assert_eq!(receipt.transaction_hash, "0xtx1");
    }

    #[tokio::test]
    async fn envelope_uses_fixed_price_and_estimate() {
        let provider = MockProvider::new().with_gas(84_000);
        let chain = signer_chain();
        let policy = fast_policy(1);
        let token = ContractHandle::new(ContractName::Token, "0xtoken");

        TransactionExecutor::new(&provider, &chain, &policy)
            .execute(&token, "increaseAllowance", Vec::new())
            .await
            .expect("execute");

        let signed = provider.signed_transactions();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].gas_limit, 84_000);
        assert_eq!(signed[0].gas_price, chain.gas_price);
        assert_eq!(signed[0].from, "0xwallet");
        assert_eq!(signed[0].to, "0xtoken");
        assert_eq!(signed[0].data, "increaseAllowance()");
    }

    #[tokio::test]
    async fn zero_estimate_falls_back_to_floor() {
        let provider = MockProvider::new().with_gas(0);
        let chain = signer_chain();
        let policy = fast_policy(1);
        let token = ContractHandle::new(ContractName::Token, "0xtoken");

        TransactionExecutor::new(&provider, &chain, &policy)
            .execute(&token, "increaseAllowance", Vec::new())
            .await
            .expect("execute");

        assert_eq!(provider.signed_transactions()[0].gas_limit, GAS_LIMIT_FLOOR);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_call() {
        let provider = MockProvider::new();
        let mut chain = signer_chain();
        chain.private_key = None;
        let policy = fast_policy(3);
        let token = ContractHandle::new(ContractName::Token, "0xtoken");

        let result = TransactionExecutor::new(&provider, &chain, &policy)
            .execute(&token, "increaseAllowance", Vec::new())
            .await;

        assert!(matches!(result, Err(DkgError::Configuration(_))));
        assert_eq!(provider.estimate_count(), 0);
    }

    #[tokio::test]
    async fn exhausted_policy_surfaces_terminal_error() {
        let provider = MockProvider::new().fail_estimates(10);
        let chain = signer_chain();
        let policy = fast_policy(2);
        let token = ContractHandle::new(ContractName::Token, "0xtoken");

        let result = TransactionExecutor::new(&provider, &chain, &policy)
            .execute(&token, "increaseAllowance", Vec::new())
            .await;

        assert!(matches!(
            result,
            Err(DkgError::ChainCallFailed {
                attempts: 2,
                kind: ChainErrorKind::Transient,
                ..
            })
        ));
        assert_eq!(provider.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn read_retries_then_returns_output() {
        let provider = MockProvider::new()
            .with_contract("AssetRegistry", "0xasset")
            .fail_reads(1);
        let chain = signer_chain();
        let policy = fast_policy(3);
        let hub = ContractHandle::new(ContractName::Hub, "0xhub");

        let address = ReadExecutor::new(&provider, &chain, &policy)
            .call(
                &hub,
                "getContractAddress",
                vec![CallArg::String("AssetRegistry".to_string())],
            )
            .await
            .expect("read");

        assert_eq!(address, "0xasset");
        assert_eq!(provider.read_count(), 2);
    }
}
