//! Result source replaying a fixed script of responses.

use super::ResultSource;
use crate::node::OperationResponse;
use async_trait::async_trait;
use dkg_core::{DkgError, OperationHandle, OperationKind, OperationStatus};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<Result<OperationResponse, DkgError>>>,
    polls: AtomicU32,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Result<OperationResponse, DkgError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            polls: AtomicU32::new(0),
        }
    }

    pub(crate) fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

pub(crate) fn response(status: OperationStatus, data: Option<Value>) -> Result<OperationResponse, DkgError> {
    Ok(OperationResponse {
        status,
        data,
        message: None,
    })
}

pub(crate) fn pending() -> Result<OperationResponse, DkgError> {
    response(OperationStatus::Pending, None)
}

/// A search tick carrying `count` items.
pub(crate) fn items(status: OperationStatus, count: usize) -> Result<OperationResponse, DkgError> {
    let list: Vec<Value> = (0..count).map(|i| json!({"id": i})).collect();
    response(status, Some(json!({ "itemListElement": list })))
}

#[async_trait]
impl ResultSource for ScriptedSource {
    async fn fetch_result(
        &self,
        _kind: OperationKind,
        _handle: &OperationHandle,
    ) -> Result<OperationResponse, DkgError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(DkgError::Transport("script exhausted".to_string())))
    }
}
