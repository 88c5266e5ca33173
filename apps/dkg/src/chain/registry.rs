//! # Contract Registry Resolver
//!
//! Binds the contracts an asset operation needs on one chain.
//!
//! The hub lives at a static address per chain. Every other address is read
//! from the hub at runtime, once per operation, so a redeployed registry is
//! picked up on the next call without any cache to invalidate.

use crate::chain::executor::ReadExecutor;
use crate::chain::provider::{CallArg, ChainProvider};
use crate::chain::retry::RetryPolicy;
use dkg_core::{BlockchainConfig, ContractHandle, ContractName, ContractSet, DkgError};
use std::future::Future;
use std::sync::Arc;

/// Resolves [`ContractSet`]s through the hub contract.
#[derive(Clone)]
pub struct ContractRegistryResolver {
    provider: Arc<dyn ChainProvider>,
    policy: RetryPolicy,
}

impl ContractRegistryResolver {
    pub fn new(provider: Arc<dyn ChainProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    /// Bind hub, asset registry, token registry and token for `chain`.
    ///
    /// The three hub lookups run concurrently; the first terminal read
    /// error aborts the others.
    pub async fn resolve(&self, chain: &BlockchainConfig) -> Result<ContractSet, DkgError> {
        let hub = ContractHandle::new(ContractName::Hub, chain.hub_contract.clone());
        let reader = ReadExecutor::new(self.provider.as_ref(), chain, &self.policy);

        let (asset_registry, token_registry, token) = futures::try_join!(
            lookup(&reader, &hub, ContractName::AssetRegistry),
            lookup(&reader, &hub, ContractName::UaiRegistry),
            lookup(&reader, &hub, ContractName::Token),
        )?;

        tracing::debug!(
            chain = %chain.name,
            asset_registry = %asset_registry.address,
            token_registry = %token_registry.address,
            token = %token.address,
            "Resolved contracts"
        );

        Ok(ContractSet {
            hub,
            asset_registry,
            token_registry,
            token,
        })
    }

    /// Run `op` against `contracts`, re-resolving once if it reports a stale contract.
    ///
    /// On a refresh `contracts` is replaced with the new bindings.
    pub async fn call_with_refresh<T, F, Fut>(
        &self,
        chain: &BlockchainConfig,
        contracts: &mut ContractSet,
        mut op: F,
    ) -> Result<T, DkgError>
    where
        F: FnMut(ContractSet) -> Fut,
        Fut: Future<Output = Result<T, DkgError>>,
    {
        match op(contracts.clone()).await {
            Err(err) if err.is_stale_contract() => {
                tracing::info!(chain = %chain.name, error = %err, "Contract outdated, re-resolving");
                *contracts = self.resolve(chain).await?;
                op(contracts.clone()).await
            }
            result => result,
        }
    }
}

async fn lookup(
    reader: &ReadExecutor<'_>,
    hub: &ContractHandle,
    name: ContractName,
) -> Result<ContractHandle, DkgError> {
    let address = reader
        .call(
            hub,
            "getContractAddress",
            vec![CallArg::String(name.hub_key().to_string())],
        )
        .await?;
    Ok(ContractHandle::new(name, address))
}
