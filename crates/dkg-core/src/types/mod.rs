//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the DKG client:
//! - Operation identifiers (`OperationHandle`, `OperationKind`)
//! - Operation lifecycle (`OperationStatus`)
//! - Error types (`DkgError`)
//!
//! ## Status Monotonicity
//!
//! A handle moves from `Pending` to exactly one of `Completed` or `Failed`
//! and never back. Pollers rely on this: a terminal status ends the loop.

use crate::blockchain::ChainErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// OPERATION HANDLE
// =============================================================================

/// Opaque identifier issued by a node for a submitted request.
///
/// The node returns it as `handler_id`; it is only meaningful for polling
/// the result of the operation it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    /// Wrap a node-issued handle.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// OPERATION KIND
// =============================================================================

/// Asynchronous operations a node accepts.
///
/// Each kind maps to a route prefix on the node; results are polled at
/// `/{route}/result/{handle}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Publish,
    Update,
    Resolve,
    EntitySearch,
    AssertionSearch,
    Query,
    Proofs,
}

impl OperationKind {
    /// Route segment used by the node for this operation.
    #[must_use]
    pub const fn route(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Update => "update",
            Self::Resolve => "resolve",
            Self::EntitySearch => "entities:search",
            Self::AssertionSearch => "assertions:search",
            Self::Query => "query",
            Self::Proofs => "proofs:get",
        }
    }

    /// Search operations are polled by the streaming poller, not the resolver.
    #[must_use]
    pub const fn is_search(self) -> bool {
        matches!(self, Self::EntitySearch | Self::AssertionSearch)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

// =============================================================================
// OPERATION STATUS
// =============================================================================

/// Server-reported status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationStatus {
    Pending,
    Completed,
    Failed,
}

impl OperationStatus {
    /// True once the operation can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Completed => f.write_str("COMPLETED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the DKG client.
///
/// - Configuration and format errors are raised before any network call
/// - Transport errors are never retried by the polling layer
/// - Chain calls surface `ChainCallFailed` once their retry policy gives up
#[derive(Debug, Error)]
pub enum DkgError {
    /// Missing or unknown chain configuration, invalid config file.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed UAL, hash or request options.
    #[error("Format error: {0}")]
    Format(String),

    /// Network or HTTP failure talking to the node.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node reported a terminal failure for the operation.
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// The operation was still pending after the poll budget was spent.
    #[error("Operation {handle} still pending after {polls} polls")]
    RetriesExhausted { handle: OperationHandle, polls: u32 },

    /// A contract call gave up after its retry policy was spent or a fatal error.
    #[error("Contract call {function} failed after {attempts} attempt(s): {message}")]
    ChainCallFailed {
        function: String,
        attempts: u32,
        kind: ChainErrorKind,
        message: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl DkgError {
    /// True when a chain call failed because the bound contract is outdated.
    #[must_use]
    pub fn is_stale_contract(&self) -> bool {
        matches!(
            self,
            Self::ChainCallFailed {
                kind: ChainErrorKind::StaleContract,
                ..
            }
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
