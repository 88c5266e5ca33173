//! # Operation Result Resolver
//!
//! Polls an operation handle until the node reports a terminal status.
//!
//! ## State Machine
//!
//! ```text
//!             PENDING (attempts <= max)
//!             ┌──────┐
//!             ▼      │
//!  handle ─▶ POLLING ─┼─ COMPLETED ─▶ return data
//!                    ├─ FAILED ────▶ OperationFailed(message)
//!                    └─ PENDING (attempts > max) ─▶ RetriesExhausted
//! ```
//!
//! Transport errors on a poll leave the machine immediately; they are not
//! retried here.

use super::ResultSource;
use crate::node::OperationResponse;
use dkg_core::{DkgError, OperationHandle, OperationKind, OperationStatus};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

/// Pause between submitting an operation and the first poll.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Poll cadence and budget for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub frequency: Duration,
    /// Pending polls tolerated before giving up.
    pub max_retries: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            frequency: Duration::from_secs(5),
            max_retries: 5,
        }
    }
}

/// Resolver state after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling { attempts: u32 },
    Completed,
    Failed,
    RetriesExhausted,
}

impl PollState {
    /// Transition on one observed status.
    pub fn next(self, status: OperationStatus, max_retries: u32) -> Self {
        match (self, status) {
            (Self::Polling { attempts }, OperationStatus::Pending) => {
                let attempts = attempts.saturating_add(1);
                if attempts > max_retries {
                    Self::RetriesExhausted
                } else {
                    Self::Polling { attempts }
                }
            }
            (Self::Polling { .. }, OperationStatus::Completed) => Self::Completed,
            (Self::Polling { .. }, OperationStatus::Failed) => Self::Failed,
            (terminal, _) => terminal,
        }
    }
}

/// Drives one operation handle to a terminal result.
pub struct OperationResultResolver<'a> {
    source: &'a dyn ResultSource,
    options: PollOptions,
}

impl<'a> OperationResultResolver<'a> {
    pub fn new(source: &'a dyn ResultSource, options: PollOptions) -> Self {
        Self { source, options }
    }

    /// Poll `handle` until it completes; returns the result payload.
    ///
    /// Never returns while the operation is still pending.
    pub async fn resolve(
        &self,
        kind: OperationKind,
        handle: &OperationHandle,
    ) -> Result<Value, DkgError> {
        sleep(SETTLE_DELAY).await;

        let mut state = PollState::Polling { attempts: 0 };
        let mut polls: u32 = 0;

        loop {
            let response: OperationResponse = self.source.fetch_result(kind, handle).await?;
            polls = polls.saturating_add(1);
            state = state.next(response.status, self.options.max_retries);

            tracing::debug!(
                operation = %kind,
                handle = %handle,
                status = %response.status,
                polls,
                "Polled operation"
            );

            match state {
                PollState::Completed => {
                    tracing::info!(operation = %kind, handle = %handle, polls, "Operation completed");
                    return Ok(response.data.unwrap_or(Value::Null));
                }
                PollState::Failed => {
                    return Err(DkgError::OperationFailed(response.failure_message()));
                }
                PollState::RetriesExhausted => {
                    return Err(DkgError::RetriesExhausted {
                        handle: handle.clone(),
                        polls,
                    });
                }
                PollState::Polling { .. } => sleep(self.options.frequency).await,
            }
        }
    }
}
