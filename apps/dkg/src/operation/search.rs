//! # Streaming Search Poller
//!
//! Search results grow while the node collects them from the network. The
//! poller hands every intermediate payload to a callback and stops when
//! enough results arrived, the deadline passed, or the node finished.
//!
//! The deadline is fixed when polling starts and is only checked after a
//! tick, so the loop may run up to one interval past it.

use super::ResultSource;
use dkg_core::{DkgError, OperationHandle, OperationKind, OperationStatus};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Cadence, deadline and count target for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub frequency: Duration,
    pub timeout: Duration,
    pub number_of_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            frequency: Duration::from_secs(5),
            timeout: Duration::from_secs(25),
            number_of_results: 2000,
        }
    }
}

/// Number of entries in a search payload's `itemListElement`.
pub fn result_count(payload: &Value) -> usize {
    payload
        .get("itemListElement")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

/// Streams partial results of a search operation.
pub struct SearchPoller<'a> {
    source: &'a dyn ResultSource,
    options: SearchOptions,
}

impl<'a> SearchPoller<'a> {
    pub fn new(source: &'a dyn ResultSource, options: SearchOptions) -> Self {
        Self { source, options }
    }

    /// Poll `handle`, calling `on_results` with the full payload after every tick.
    ///
    /// Returns the last payload fetched. A transport error aborts without
    /// returning partial results.
    pub async fn poll<F>(
        &self,
        kind: OperationKind,
        handle: &OperationHandle,
        mut on_results: F,
    ) -> Result<Value, DkgError>
    where
        F: FnMut(&Value),
    {
        let deadline = Instant::now() + self.options.timeout;
        let mut ticks: u32 = 0;

        loop {
            sleep(self.options.frequency).await;
            let response = self.source.fetch_result(kind, handle).await?;
            ticks = ticks.saturating_add(1);

            if response.status == OperationStatus::Failed {
                return Err(DkgError::OperationFailed(response.failure_message()));
            }

            let payload = response.data.unwrap_or(Value::Null);
            on_results(&payload);
            let count = result_count(&payload);

            tracing::debug!(operation = %kind, handle = %handle, ticks, count, "Search tick");

            let timed_out = Instant::now() >= deadline;
            let enough = count >= self.options.number_of_results;
            if timed_out || enough || response.status == OperationStatus::Completed {
                tracing::info!(
                    operation = %kind,
                    handle = %handle,
                    ticks,
                    count,
                    timed_out,
                    "Search finished"
                );
                return Ok(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::scripted::{ScriptedSource, items};
    use serde_json::json;

    fn handle() -> OperationHandle {
        OperationHandle::new("search-1")
    }

    #[test]
    fn counts_item_list() {
        assert_eq!(result_count(&json!({"itemListElement": [1, 2, 3]})), 3);
        assert_eq!(result_count(&json!({"other": []})), 0);
        assert_eq!(result_count(&Value::Null), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_target_count_reached() {
        let source = ScriptedSource::new(vec![
            items(OperationStatus::Pending, 5),
            items(OperationStatus::Pending, 50),
            items(OperationStatus::Pending, 2000),
            items(OperationStatus::Pending, 2500),
        ]);
        let mut seen = Vec::new();

        let payload = SearchPoller::new(&source, SearchOptions::default())
            .poll(OperationKind::EntitySearch, &handle(), |p| {
                seen.push(result_count(p));
            })
            .await
            .expect("search");

        assert_eq!(source.polls(), 3);
        assert_eq!(seen, vec![5, 50, 2000]);
        assert_eq!(result_count(&payload), 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_returns_last_payload() {
        let source = ScriptedSource::new(vec![
            items(OperationStatus::Pending, 5),
            items(OperationStatus::Pending, 50),
            items(OperationStatus::Pending, 100),
            items(OperationStatus::Pending, 150),
        ]);
        let options = SearchOptions {
            frequency: Duration::from_secs(5),
            timeout: Duration::from_secs(12),
            number_of_results: 2000,
        };
        let started = Instant::now();

        let payload = SearchPoller::new(&source, options)
            .poll(OperationKind::AssertionSearch, &handle(), |_| {})
            .await
            .expect("search");

        // ticks at 5s, 10s, 15s; the deadline at 12s is seen after the third
        assert_eq!(source.polls(), 3);
        assert_eq!(result_count(&payload), 100);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_status_ends_search() {
        let source = ScriptedSource::new(vec![
            items(OperationStatus::Pending, 1),
            items(OperationStatus::Completed, 4),
        ]);

        let payload = SearchPoller::new(&source, SearchOptions::default())
            .poll(OperationKind::EntitySearch, &handle(), |_| {})
            .await
            .expect("search");

        assert_eq!(source.polls(), 2);
        assert_eq!(result_count(&payload), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_aborts_search() {
        let source = ScriptedSource::new(vec![
            items(OperationStatus::Pending, 5),
            Err(DkgError::Transport("reset".to_string())),
        ]);
        let mut calls = 0;

        let result = SearchPoller::new(&source, SearchOptions::default())
            .poll(OperationKind::EntitySearch, &handle(), |_| calls += 1)
            .await;

        assert!(matches!(result, Err(DkgError::Transport(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_operation_failure() {
        let source = ScriptedSource::new(vec![Ok(crate::node::OperationResponse {
            status: OperationStatus::Failed,
            data: None,
            message: Some("invalid query".to_string()),
        })]);

        let result = SearchPoller::new(&source, SearchOptions::default())
            .poll(OperationKind::EntitySearch, &handle(), |_| {})
            .await;

        assert!(matches!(result, Err(DkgError::OperationFailed(m)) if m == "invalid query"));
    }
}
