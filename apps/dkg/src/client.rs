//! # DKG Client
//!
//! Entry point tying the node client, pollers, proof validation and the
//! asset service together. Every method submits one node operation and waits
//! for its result with the configured poll settings unless a per-call
//! override is given.

use crate::asset::AssetService;
use crate::canon::{Canonicalizer, NQuadsCanonicalizer};
use crate::chain::ChainProvider;
use crate::config::ClientConfig;
use crate::node::{NodeClient, NodeInfo, ProofsRequest, PublishRequest, QueryRequest, SearchRequest};
use crate::operation::{OperationResultResolver, PollOptions, SearchOptions, SearchPoller};
use crate::proof::{AssertionProofs, ProofValidation, RootHashSource, validate_proofs};
use async_trait::async_trait;
use dkg_core::{DkgError, Hash32, OperationHandle, OperationKind, Ual, parse_hash};
use serde_json::Value;
use std::sync::Arc;

/// High-level client for one DKG node.
#[derive(Clone)]
pub struct DkgClient {
    node: NodeClient,
    config: ClientConfig,
    canonicalizer: Arc<dyn Canonicalizer>,
}

impl DkgClient {
    /// Create a client from a resolved configuration.
    pub fn new(config: ClientConfig) -> Self {
        let node = NodeClient::new(config.node.url.clone(), config.node.api_key.clone());
        Self {
            node,
            config,
            canonicalizer: Arc::new(NQuadsCanonicalizer),
        }
    }

    /// Replace the N-Quads pass-through with another canonicalizer.
    pub fn with_canonicalizer(mut self, canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn node(&self) -> &NodeClient {
        &self.node
    }

    pub fn canonicalizer(&self) -> &dyn Canonicalizer {
        self.canonicalizer.as_ref()
    }

    /// Asset lifecycle operations signed through `provider`.
    pub fn assets(&self, provider: Arc<dyn ChainProvider>) -> AssetService<'_> {
        AssetService::new(self, provider)
    }

    /// Wait for a submitted operation to finish.
    pub async fn wait_for(
        &self,
        kind: OperationKind,
        handle: &OperationHandle,
        options: Option<PollOptions>,
    ) -> Result<Value, DkgError> {
        let options = options.unwrap_or_else(|| self.config.poll_options());
        OperationResultResolver::new(&self.node, options)
            .resolve(kind, handle)
            .await
    }

    // =========================================================================
    // NODE OPERATIONS
    // =========================================================================

    /// Node version and settings.
    pub async fn node_info(&self) -> Result<NodeInfo, DkgError> {
        self.node.info().await
    }

    /// Publish an assertion and wait for the node to accept it.
    pub async fn publish(
        &self,
        request: &PublishRequest,
        options: Option<PollOptions>,
    ) -> Result<Value, DkgError> {
        let handle = self.node.publish(OperationKind::Publish, request).await?;
        self.wait_for(OperationKind::Publish, &handle, options).await
    }

    /// Replace the assertion of an existing asset.
    pub async fn update(
        &self,
        request: &PublishRequest,
        options: Option<PollOptions>,
    ) -> Result<Value, DkgError> {
        if request.ual.is_none() {
            return Err(DkgError::Format("Update requires a UAL".to_string()));
        }
        let handle = self.node.publish(OperationKind::Update, request).await?;
        self.wait_for(OperationKind::Update, &handle, options).await
    }

    /// Resolve assertion ids or UALs.
    pub async fn resolve(
        &self,
        ids: &[String],
        options: Option<PollOptions>,
    ) -> Result<Value, DkgError> {
        let handle = self.node.resolve(ids).await?;
        self.wait_for(OperationKind::Resolve, &handle, options).await
    }

    /// Resolve one asset by UAL.
    pub async fn get(&self, ual: &str, options: Option<PollOptions>) -> Result<Value, DkgError> {
        let ual = Ual::parse(ual)?;
        self.resolve(&[ual.to_string()], options).await
    }

    /// Resolve one asset and return its assertion grouped by subject.
    pub async fn get_graph(&self, ual: &str, options: Option<PollOptions>) -> Result<Value, DkgError> {
        let payload = self.get(ual, options).await?;
        let lines = assertion_from_resolve(&payload)?;
        let triples = self.canonicalizer.to_canonical_triples(&lines.join("\n"))?;
        self.canonicalizer.to_graph(&triples)
    }

    /// Entity search, streaming intermediate payloads to `on_results`.
    pub async fn search_entities<F>(
        &self,
        request: &SearchRequest,
        options: Option<SearchOptions>,
        on_results: F,
    ) -> Result<Value, DkgError>
    where
        F: FnMut(&Value),
    {
        self.search(OperationKind::EntitySearch, request, options, on_results)
            .await
    }

    /// Assertion search, streaming intermediate payloads to `on_results`.
    pub async fn search_assertions<F>(
        &self,
        request: &SearchRequest,
        options: Option<SearchOptions>,
        on_results: F,
    ) -> Result<Value, DkgError>
    where
        F: FnMut(&Value),
    {
        self.search(OperationKind::AssertionSearch, request, options, on_results)
            .await
    }

    async fn search<F>(
        &self,
        kind: OperationKind,
        request: &SearchRequest,
        options: Option<SearchOptions>,
        on_results: F,
    ) -> Result<Value, DkgError>
    where
        F: FnMut(&Value),
    {
        let handle = self.node.search(kind, request).await?;
        let options = options.unwrap_or_else(|| self.config.search_options());
        SearchPoller::new(&self.node, options)
            .poll(kind, &handle, on_results)
            .await
    }

    /// Run a SPARQL query.
    pub async fn query(
        &self,
        request: &QueryRequest,
        options: Option<PollOptions>,
    ) -> Result<Value, DkgError> {
        let handle = self.node.query(request).await?;
        self.wait_for(OperationKind::Query, &handle, options).await
    }

    /// Fetch inclusion proofs for triples.
    pub async fn get_proofs(
        &self,
        request: &ProofsRequest,
        options: Option<PollOptions>,
    ) -> Result<Vec<AssertionProofs>, DkgError> {
        let handle = self.node.proofs(request).await?;
        let payload = self.wait_for(OperationKind::Proofs, &handle, options).await?;
        AssertionProofs::from_payload(&payload)
    }

    /// Fetch proofs for `content` and check each against its assertion root.
    pub async fn validate(
        &self,
        content: &str,
        assertions: Vec<String>,
    ) -> Result<Vec<ProofValidation>, DkgError> {
        let nquads = self.canonicalizer.to_canonical_triples(content)?;
        let request = ProofsRequest { nquads, assertions };
        let proofs = self.get_proofs(&request, None).await?;
        validate_proofs(self, &proofs).await
    }
}

/// Root hash recorded in a resolve payload for one assertion.
pub fn root_hash_from_resolve(payload: &Value) -> Result<Hash32, DkgError> {
    let value = payload
        .pointer("/0/result/metadata/rootHash")
        .and_then(Value::as_str)
        .ok_or_else(|| DkgError::Serialization("Resolve result carries no rootHash".to_string()))?;
    parse_hash(value)
}

/// N-Quads lines of the first assertion in a resolve payload.
pub fn assertion_from_resolve(payload: &Value) -> Result<Vec<String>, DkgError> {
    let lines = payload
        .pointer("/0/result/assertion")
        .and_then(Value::as_array)
        .ok_or_else(|| DkgError::Serialization("Resolve result carries no assertion".to_string()))?;
    lines
        .iter()
        .map(|line| {
            line.as_str().map(str::to_string).ok_or_else(|| {
                DkgError::Serialization(format!("Assertion line is not a string: {line}"))
            })
        })
        .collect()
}

#[async_trait]
impl RootHashSource for DkgClient {
    async fn root_hash(&self, assertion_id: &str) -> Result<Hash32, DkgError> {
        let payload = self.resolve(&[assertion_id.to_string()], None).await?;
        root_hash_from_resolve(&payload)
    }
}
