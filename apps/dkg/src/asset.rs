//! # Asset Service
//!
//! On-chain lifecycle of knowledge assets.
//!
//! ## Create
//!
//! ```text
//! content ─▶ canonical triples ─▶ assertion id + root hash
//!         ─▶ resolve contracts ─▶ token.increaseAllowance
//!         ─▶ assetRegistry.createAsset ─▶ AssetCreated.tokenId ─▶ UAL
//!         ─▶ publish to node with UAL ─▶ wait for result
//! ```
//!
//! Each operation binds its own chain snapshot and resolves its own contract
//! set. A call that fails on an outdated contract re-resolves the set once.

use crate::chain::{
    CallArg, ChainProvider, ContractRegistryResolver, ReadExecutor, RetryPolicy,
    TransactionExecutor, TransactionReceipt,
};
use crate::client::DkgClient;
use crate::node::{PublishRequest, Visibility};
use dkg_core::{
    BlockchainConfig, ChainErrorKind, ContractName, ContractSet, DkgError, Ual, assertion_id,
    parse_token_id, to_hex, triples_root,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Per-operation settings for create and update.
#[derive(Debug, Clone)]
pub struct AssetOptions {
    /// Chain to create on; update uses the chain in the UAL.
    pub blockchain: String,
    pub epochs: u16,
    /// Tokens approved and locked for the asset, in the token's base unit.
    pub token_amount: u128,
    pub keywords: Vec<String>,
    pub visibility: Visibility,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            blockchain: "ganache".to_string(),
            epochs: 5,
            token_amount: 10,
            keywords: Vec::new(),
            visibility: Visibility::Public,
        }
    }
}

/// Outcome of a create or update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResult {
    pub ual: String,
    pub assertion_id: String,
    pub root_hash: String,
    pub transaction_hash: String,
    /// Node result of the publish/update operation.
    pub operation: Value,
}

/// What gets anchored on chain for one assertion.
struct Anchor {
    triples: Vec<String>,
    assertion_id: String,
    root_hash: String,
    size: u128,
}

impl Anchor {
    fn args(&self, options: &AssetOptions) -> Vec<CallArg> {
        vec![
            CallArg::Bytes32(self.assertion_id.clone()),
            CallArg::Bytes32(self.root_hash.clone()),
            CallArg::Uint(self.size),
            CallArg::Uint(self.triples.len() as u128),
            CallArg::Uint(u128::from(options.epochs)),
            CallArg::Uint(options.token_amount),
        ]
    }
}

/// Asset operations for one client and chain provider.
pub struct AssetService<'a> {
    client: &'a DkgClient,
    provider: Arc<dyn ChainProvider>,
    registry: ContractRegistryResolver,
    policy: RetryPolicy,
}

impl<'a> AssetService<'a> {
    pub fn new(client: &'a DkgClient, provider: Arc<dyn ChainProvider>) -> Self {
        let policy = client.config().retry_policy();
        let registry = ContractRegistryResolver::new(provider.clone(), policy.clone());
        Self {
            client,
            provider,
            registry,
            policy,
        }
    }

    /// Use `policy` for every chain call instead of the configured one.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.registry = ContractRegistryResolver::new(self.provider.clone(), policy.clone());
        self.policy = policy;
        self
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Anchor `content` on chain, then publish it under the new UAL.
    pub async fn create(&self, content: &str, options: &AssetOptions) -> Result<AssetResult, DkgError> {
        let chain = self.client.config().blockchains.select(&options.blockchain)?;
        let anchor = self.anchor(content)?;
        let mut contracts = self.registry.resolve(&chain).await?;

        let receipt = self
            .approve_and_send(
                &chain,
                &mut contracts,
                options.token_amount,
                "createAsset",
                anchor.args(options),
            )
            .await?;

        let token_id = created_token_id(&receipt)?;
        let ual = Ual::new(&chain.name, &contracts.asset_registry.address, token_id).to_string();
        tracing::info!(ual = %ual, tx = %receipt.transaction_hash, "Asset created");

        let request = self.publish_request(&anchor, &ual, options);
        let operation = self.client.publish(&request, None).await?;

        Ok(AssetResult {
            ual,
            assertion_id: anchor.assertion_id,
            root_hash: anchor.root_hash,
            transaction_hash: receipt.transaction_hash,
            operation,
        })
    }

    /// Replace the assertion anchored for `ual`.
    pub async fn update(
        &self,
        ual: &str,
        content: &str,
        options: &AssetOptions,
    ) -> Result<AssetResult, DkgError> {
        let parsed = Ual::parse(ual)?;
        let chain = self.client.config().blockchains.select(&parsed.chain)?;
        let anchor = self.anchor(content)?;
        let mut contracts = self.registry.resolve(&chain).await?;

        let mut args = vec![CallArg::Uint(u128::from(parsed.token_id))];
        args.extend(anchor.args(options));
        let receipt = self
            .approve_and_send(&chain, &mut contracts, options.token_amount, "updateAsset", args)
            .await?;
        tracing::info!(ual = %parsed, tx = %receipt.transaction_hash, "Asset updated");

        let ual = parsed.to_string();
        let request = self.publish_request(&anchor, &ual, options);
        let operation = self.client.update(&request, None).await?;

        Ok(AssetResult {
            ual,
            assertion_id: anchor.assertion_id,
            root_hash: anchor.root_hash,
            transaction_hash: receipt.transaction_hash,
            operation,
        })
    }

    /// Transfer the asset token from the configured wallet to `new_owner`.
    pub async fn transfer(&self, ual: &str, new_owner: &str) -> Result<TransactionReceipt, DkgError> {
        let parsed = Ual::parse(ual)?;
        let chain = self.client.config().blockchains.select(&parsed.chain)?;
        let wallet = chain.wallet()?.to_string();
        let mut contracts = self.registry.resolve(&chain).await?;

        let receipt = self
            .transact(&chain, &mut contracts, ContractName::UaiRegistry, "transferFrom", |_| {
                vec![
                    CallArg::Address(wallet.clone()),
                    CallArg::Address(new_owner.to_string()),
                    CallArg::Uint(u128::from(parsed.token_id)),
                ]
            })
            .await?;
        tracing::info!(ual = %parsed, to = new_owner, "Asset transferred");
        Ok(receipt)
    }

    /// Current owner of the asset token.
    pub async fn owner(&self, ual: &str) -> Result<String, DkgError> {
        let parsed = Ual::parse(ual)?;
        let chain = self.client.config().blockchains.select_for_reads(&parsed.chain)?;
        let args = vec![CallArg::Uint(u128::from(parsed.token_id))];
        self.read(&chain, ContractName::UaiRegistry, "ownerOf", args)
            .await
    }

    /// Commit hash of the asset at `offset` (0 is the latest).
    pub async fn commit_hash(&self, ual: &str, offset: u64) -> Result<String, DkgError> {
        let parsed = Ual::parse(ual)?;
        let chain = self.client.config().blockchains.select_for_reads(&parsed.chain)?;
        let args = vec![
            CallArg::Uint(u128::from(parsed.token_id)),
            CallArg::Uint(u128::from(offset)),
        ];
        self.read(&chain, ContractName::AssetRegistry, "getCommitHash", args)
            .await
    }

    /// Resolve the asset through the node.
    pub async fn get(&self, ual: &str) -> Result<Value, DkgError> {
        self.client.get(ual, None).await
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn anchor(&self, content: &str) -> Result<Anchor, DkgError> {
        let triples = self.client.canonicalizer().to_canonical_triples(content)?;
        if triples.is_empty() {
            return Err(DkgError::Format("Asset content has no triples".to_string()));
        }
        let size = triples.join("\n").len() as u128;
        Ok(Anchor {
            assertion_id: to_hex(&assertion_id(&triples)),
            root_hash: to_hex(&triples_root(&triples)),
            size,
            triples,
        })
    }

    fn publish_request(&self, anchor: &Anchor, ual: &str, options: &AssetOptions) -> PublishRequest {
        PublishRequest {
            content: anchor.triples.join("\n"),
            assets: vec![ual.to_string()],
            keywords: options.keywords.clone(),
            visibility: options.visibility,
            ual: Some(ual.to_string()),
        }
    }

    /// Approve `amount` for the asset registry, then send `function` to it.
    ///
    /// Both transactions run against the same contract set. A stale contract
    /// re-resolves the set and repeats both, so the allowance always names
    /// the registry that receives the call.
    async fn approve_and_send(
        &self,
        chain: &BlockchainConfig,
        contracts: &mut ContractSet,
        amount: u128,
        function: &str,
        args: Vec<CallArg>,
    ) -> Result<TransactionReceipt, DkgError> {
        let provider = self.provider.as_ref();
        let policy = &self.policy;
        let args = &args;
        self.registry
            .call_with_refresh(chain, contracts, move |set| async move {
                let executor = TransactionExecutor::new(provider, chain, policy);
                let allowance = vec![
                    CallArg::Address(set.asset_registry.address.clone()),
                    CallArg::Uint(amount),
                ];
                executor
                    .execute(&set.token, "increaseAllowance", allowance)
                    .await?;
                executor
                    .execute(&set.asset_registry, function, args.clone())
                    .await
            })
            .await
    }

    /// Send `function` to the `target` contract, re-resolving once if it is stale.
    async fn transact<A>(
        &self,
        chain: &BlockchainConfig,
        contracts: &mut ContractSet,
        target: ContractName,
        function: &str,
        args: A,
    ) -> Result<TransactionReceipt, DkgError>
    where
        A: Fn(&ContractSet) -> Vec<CallArg>,
    {
        let provider = self.provider.as_ref();
        let policy = &self.policy;
        let args = &args;
        self.registry
            .call_with_refresh(chain, contracts, move |set| async move {
                TransactionExecutor::new(provider, chain, policy)
                    .execute(set.get(target), function, args(&set))
                    .await
            })
            .await
    }

    async fn read(
        &self,
        chain: &BlockchainConfig,
        target: ContractName,
        function: &str,
        args: Vec<CallArg>,
    ) -> Result<String, DkgError> {
        let mut contracts = self.registry.resolve(chain).await?;
        let provider = self.provider.as_ref();
        let policy = &self.policy;
        let args = &args;
        self.registry
            .call_with_refresh(chain, &mut contracts, move |set| async move {
                ReadExecutor::new(provider, chain, policy)
                    .call(set.get(target), function, args.clone())
                    .await
            })
            .await
    }
}

/// Token id from the `AssetCreated` event of a create receipt.
///
/// The event carries a `uint256`; ids above `u64::MAX` cannot be expressed
/// in a UAL here and fail before the assertion is published.
fn created_token_id(receipt: &TransactionReceipt) -> Result<u64, DkgError> {
    let fail = |message: String| DkgError::ChainCallFailed {
        function: "createAsset".to_string(),
        attempts: 1,
        kind: ChainErrorKind::Fatal,
        message,
    };
    let raw = receipt
        .event_arg("AssetCreated", "tokenId")
        .ok_or_else(|| fail(format!("No AssetCreated event in {}", receipt.transaction_hash)))?;
    parse_token_id(raw).map_err(|e| fail(format!("Invalid tokenId in AssetCreated event: {e}")))
}
