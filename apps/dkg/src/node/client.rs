//! # Node HTTP Client
//!
//! Wrapper around the DKG node REST API.
//!
//! Submitting an operation returns an [`OperationHandle`]; its result is
//! fetched separately with [`NodeClient::result`]. Every failure is reported
//! as [`DkgError::Transport`] and is never retried here.

use crate::node::types::{
    HandleResponse, NodeInfo, OperationResponse, ProofsRequest, PublishRequest, QueryRequest,
    SearchRequest,
};
use dkg_core::{DkgError, OperationHandle, OperationKind};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

/// HTTP client for one DKG node.
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl NodeClient {
    /// Create a client for the node at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional Bearer auth.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Send a request and handle connection errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, DkgError> {
        req.send()
            .await
            .map_err(|e| DkgError::Transport(format!("Cannot connect to node at {}: {e}", self.base_url)))
    }

    /// Check status codes and parse the JSON body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, DkgError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DkgError::Transport("unauthorized".to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DkgError::Transport("rate limited".to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DkgError::Transport(format!(
                "Node returned {}: {body}",
                status.as_u16()
            )));
        }
        resp.json::<T>()
            .await
            .map_err(|e| DkgError::Transport(format!("Invalid response body: {e}")))
    }

    async fn submit(&self, req: reqwest::RequestBuilder) -> Result<OperationHandle, DkgError> {
        let resp = self.send(req).await?;
        let body: HandleResponse = self.handle_response(resp).await?;
        Ok(body.handler_id)
    }

    // =========================================================================
    // SYNCHRONOUS ENDPOINTS
    // =========================================================================

    /// GET /info
    pub async fn info(&self) -> Result<NodeInfo, DkgError> {
        let req = self.request(reqwest::Method::GET, "/info");
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    // =========================================================================
    // OPERATION SUBMISSION
    // =========================================================================

    /// POST /publish or POST /update (multipart).
    pub async fn publish(
        &self,
        kind: OperationKind,
        request: &PublishRequest,
    ) -> Result<OperationHandle, DkgError> {
        if !matches!(kind, OperationKind::Publish | OperationKind::Update) {
            return Err(DkgError::Format(format!("{kind} is not a publish route")));
        }
        request.validate()?;

        let assets = serde_json::to_string(&request.assets)
            .map_err(|e| DkgError::Serialization(e.to_string()))?;
        let keywords = serde_json::to_string(&request.keywords)
            .map_err(|e| DkgError::Serialization(e.to_string()))?;

        let mut form = Form::new()
            .part(
                "file",
                Part::text(request.content.clone()).file_name("assertion.nq"),
            )
            .text("assets", assets)
            .text("keywords", keywords)
            .text("visibility", request.visibility.to_string());
        if let Some(ual) = &request.ual {
            form = form.text("ual", ual.clone());
        }

        let req = self
            .request(reqwest::Method::POST, &format!("/{}", kind.route()))
            .multipart(form);
        self.submit(req).await
    }

    /// GET /resolve?ids=..
    pub async fn resolve(&self, ids: &[String]) -> Result<OperationHandle, DkgError> {
        if ids.is_empty() {
            return Err(DkgError::Format("Nothing to resolve".to_string()));
        }
        let params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        let req = self.request(reqwest::Method::GET, "/resolve").query(&params);
        self.submit(req).await
    }

    /// GET /entities:search or GET /assertions:search
    pub async fn search(
        &self,
        kind: OperationKind,
        request: &SearchRequest,
    ) -> Result<OperationHandle, DkgError> {
        if !kind.is_search() {
            return Err(DkgError::Format(format!("{kind} is not a search route")));
        }
        request.validate()?;

        let limit = request.limit.to_string();
        let mut params = vec![("query", request.query.as_str()), ("limit", limit.as_str())];
        if kind == OperationKind::EntitySearch {
            if let Some(result_type) = &request.result_type {
                params.push(("resultType", result_type.as_str()));
            }
        }

        let req = self
            .request(reqwest::Method::GET, &format!("/{}", kind.route()))
            .query(&params);
        self.submit(req).await
    }

    /// POST /query?type=..
    pub async fn query(&self, request: &QueryRequest) -> Result<OperationHandle, DkgError> {
        if request.sparql.trim().is_empty() {
            return Err(DkgError::Format("Query is empty".to_string()));
        }
        let req = self
            .request(reqwest::Method::POST, "/query")
            .query(&[("type", request.query_type.as_str())])
            .form(&[("query", request.sparql.as_str())]);
        self.submit(req).await
    }

    /// POST /proofs:get
    pub async fn proofs(&self, request: &ProofsRequest) -> Result<OperationHandle, DkgError> {
        request.validate()?;
        let nquads = serde_json::to_string(&request.nquads)
            .map_err(|e| DkgError::Serialization(e.to_string()))?;
        let mut fields = vec![("nquads", nquads)];
        if !request.assertions.is_empty() {
            let assertions = serde_json::to_string(&request.assertions)
                .map_err(|e| DkgError::Serialization(e.to_string()))?;
            fields.push(("assertions", assertions));
        }
        let req = self.request(reqwest::Method::POST, "/proofs:get").form(&fields);
        self.submit(req).await
    }

    // =========================================================================
    // RESULT POLLING
    // =========================================================================

    /// GET /{route}/result/{handle}
    pub async fn result(
        &self,
        kind: OperationKind,
        handle: &OperationHandle,
    ) -> Result<OperationResponse, DkgError> {
        let path = format!("/{}/result/{}", kind.route(), handle);
        tracing::debug!(operation = %kind, handle = %handle, "Polling result");
        let req = self.request(reqwest::Method::GET, &path);
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }
}
