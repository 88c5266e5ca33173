//! # Operation Module
//!
//! Waiting for asynchronous node operations to finish.
//!
//! - [`OperationResultResolver`] polls until a terminal status, bounded by a
//!   retry budget
//! - [`SearchPoller`] polls growing search results until a count target or
//!   a wall-clock deadline is reached

mod resolver;
mod search;

#[cfg(test)]
mod scripted;

use crate::node::{NodeClient, OperationResponse};
use async_trait::async_trait;
use dkg_core::{DkgError, OperationHandle, OperationKind};

pub use resolver::{OperationResultResolver, PollOptions, PollState, SETTLE_DELAY};
pub use search::{SearchOptions, SearchPoller, result_count};

/// Anything that can report the current result of an operation.
#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn fetch_result(
        &self,
        kind: OperationKind,
        handle: &OperationHandle,
    ) -> Result<OperationResponse, DkgError>;
}

#[async_trait]
impl ResultSource for NodeClient {
    async fn fetch_result(
        &self,
        kind: OperationKind,
        handle: &OperationHandle,
    ) -> Result<OperationResponse, DkgError> {
        self.result(kind, handle).await
    }
}
