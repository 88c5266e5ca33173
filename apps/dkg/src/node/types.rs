//! # Node Request/Response Types
//!
//! JSON and form structures exchanged with a DKG node.

use dkg_core::{DkgError, OperationHandle, OperationStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// RESPONSES
// =============================================================================

/// Body returned when an operation is submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleResponse {
    pub handler_id: OperationHandle,
}

/// Body returned when polling an operation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub status: OperationStatus,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationResponse {
    /// Server-supplied failure text.
    ///
    /// Falls back to `data.errorMessage` when the top-level message is absent.
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|d| d.get("errorMessage"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "no message from node".to_string())
    }
}

/// `GET /info` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub version: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

// =============================================================================
// PUBLISH / UPDATE
// =============================================================================

/// Who may read a published assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Private => f.write_str("private"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = DkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(DkgError::Format(format!("Unknown visibility '{other}'"))),
        }
    }
}

/// Multipart body for `POST /publish` and `POST /update`.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    /// Assertion content (N-Quads or JSON-LD).
    pub content: String,
    pub assets: Vec<String>,
    pub keywords: Vec<String>,
    pub visibility: Visibility,
    /// UAL of the on-chain asset this assertion belongs to.
    pub ual: Option<String>,
}

impl PublishRequest {
    pub fn validate(&self) -> Result<(), DkgError> {
        if self.content.trim().is_empty() {
            return Err(DkgError::Format("Publish content is empty".to_string()));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(DkgError::Format("Keywords must not be blank".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Query string for entity and assertion search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// Entity search only; ignored for assertions.
    pub result_type: Option<String>,
    pub limit: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            result_type: None,
            limit: 20,
        }
    }

    pub fn validate(&self) -> Result<(), DkgError> {
        if self.query.trim().is_empty() {
            return Err(DkgError::Format("Search query is empty".to_string()));
        }
        if self.limit == 0 {
            return Err(DkgError::Format("Search limit must be positive".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// QUERY
// =============================================================================

/// SPARQL query form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Construct,
    Select,
}

impl QueryType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Construct => "construct",
            Self::Select => "select",
        }
    }
}

impl std::str::FromStr for QueryType {
    type Err = DkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "construct" => Ok(Self::Construct),
            "select" => Ok(Self::Select),
            other => Err(DkgError::Format(format!("Unknown query type '{other}'"))),
        }
    }
}

/// Body for `POST /query`.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sparql: String,
    pub query_type: QueryType,
}

// =============================================================================
// PROOFS
// =============================================================================

/// Body for `POST /proofs:get`.
#[derive(Debug, Clone, Default)]
pub struct ProofsRequest {
    /// Canonical triples to prove.
    pub nquads: Vec<String>,
    /// Restrict proofs to these assertion ids.
    pub assertions: Vec<String>,
}

impl ProofsRequest {
    pub fn validate(&self) -> Result<(), DkgError> {
        if self.nquads.is_empty() {
            return Err(DkgError::Format("No triples to prove".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_response_parses_failed() {
        let resp: OperationResponse = serde_json::from_value(json!({
            "status": "FAILED",
            "data": null,
            "message": "bad request"
        }))
        .expect("parse");
        assert_eq!(resp.status, OperationStatus::Failed);
        assert_eq!(resp.failure_message(), "bad request");
    }

    #[test]
    fn failure_message_falls_back_to_data() {
        let resp: OperationResponse = serde_json::from_value(json!({
            "status": "FAILED",
            "data": {"errorMessage": "invalid assertion"}
        }))
        .expect("parse");
        assert_eq!(resp.failure_message(), "invalid assertion");
    }

    #[test]
    fn node_info_keeps_extra_fields() {
        let info: NodeInfo =
            serde_json::from_value(json!({"version": "6.0.1", "auto_update": false}))
                .expect("parse");
        assert_eq!(info.version, "6.0.1");
        assert_eq!(info.details.get("auto_update"), Some(&json!(false)));
    }

    #[test]
    fn request_validation() {
        assert!(SearchRequest::new("  ").validate().is_err());
        let mut search = SearchRequest::new("Alice");
        assert!(search.validate().is_ok());
        search.limit = 0;
        assert!(matches!(search.validate(), Err(DkgError::Format(_))));

        assert!(PublishRequest::default().validate().is_err());
        assert!(ProofsRequest::default().validate().is_err());
    }

    #[test]
    fn query_type_parses_case_insensitively() {
        assert_eq!("SELECT".parse::<QueryType>().expect("parse"), QueryType::Select);
        assert!("ask".parse::<QueryType>().is_err());
        assert_eq!(Visibility::Private.to_string(), "private");
        assert_eq!("Public".parse::<Visibility>().expect("parse"), Visibility::Public);
        assert!("secret".parse::<Visibility>().is_err());
    }
}
