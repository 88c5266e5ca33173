//! Retry policy for contract calls
//!
//! Every chain read and write goes through a [`RetryPolicy`]. The policy
//! decides, per failure, whether to run the whole call again: a classifier
//! maps each [`ChainError`] to retry or stop, attempts are capped, and
//! retries back off exponentially. When the policy gives up the caller gets
//! a [`DkgError::ChainCallFailed`] carrying the last error.

use crate::chain::provider::ChainError;
use dkg_core::{ChainErrorKind, DkgError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Stop,
}

/// Maps a chain error to a retry decision.
pub type Classifier = Arc<dyn Fn(&ChainError) -> RetryDecision + Send + Sync>;

/// Retries transient errors, stops on everything else.
pub fn retry_transient(err: &ChainError) -> RetryDecision {
    match err.kind {
        ChainErrorKind::Transient => RetryDecision::Retry,
        ChainErrorKind::Fatal | ChainErrorKind::StaleContract => RetryDecision::Stop,
    }
}

/// Retry policy configuration
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first; `None` retries forever.
    pub max_attempts: Option<u32>,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier applied after each failed attempt
    pub backoff_factor: u32,

    /// Decides which errors are worth another attempt
    pub classifier: Classifier,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("backoff_factor", &self.backoff_factor)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(5),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_factor: 2,
            classifier: Arc::new(retry_transient),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with the transient-only classifier.
    pub fn new(
        max_attempts: Option<u32>,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_factor: u32,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_factor,
            classifier: Arc::new(retry_transient),
        }
    }

    /// Creates a policy with no retries (fail on the first error).
    pub fn no_retry() -> Self {
        Self::new(Some(1), Duration::ZERO, Duration::ZERO, 1)
    }

    /// Retries every error immediately and never gives up.
    ///
    /// A call that can never succeed blocks forever under this policy.
    pub fn unbounded() -> Self {
        Self::new(None, Duration::ZERO, Duration::ZERO, 1)
            .with_classifier(Arc::new(|_: &ChainError| RetryDecision::Retry))
    }

    /// Replace the error classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current
            .checked_mul(self.backoff_factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds or the policy gives up.
    ///
    /// `function` names the contract function in logs and in the terminal error.
    pub async fn execute<F, Fut, T>(&self, function: &str, mut operation: F) -> Result<T, DkgError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut attempts: u32 = 0;
        let mut backoff = self.initial_backoff;

        loop {
            attempts = attempts.saturating_add(1);
            match operation().await {
                Ok(result) => {
                    if attempts > 1 {
                        tracing::info!(
                            target: "dkg::chain::retry",
                            "{} succeeded after {} attempt(s)",
                            function,
                            attempts
                        );
                    }
                    return Ok(result);
                }
                Err(err) => {
                    let decision = (self.classifier)(&err);
                    let exhausted = self.max_attempts.is_some_and(|max| attempts >= max);

                    if decision == RetryDecision::Stop || exhausted {
                        tracing::error!(
                            target: "dkg::chain::retry",
                            "{} failed after {} attempt(s): {}",
                            function,
                            attempts,
                            err
                        );
                        return Err(DkgError::ChainCallFailed {
                            function: function.to_string(),
                            attempts,
                            kind: err.kind,
                            message: err.message,
                        });
                    }

                    tracing::warn!(
                        target: "dkg::chain::retry",
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        function,
                        attempts,
                        self.max_attempts
                            .map_or_else(|| "unbounded".to_string(), |m| m.to_string()),
                        err,
                        backoff
                    );

                    if !backoff.is_zero() {
                        sleep(backoff).await;
                    }
                    backoff = self.next_backoff(backoff);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> ChainError {
        ChainError::transient("connection reset")
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute("getContractAddress", || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ChainError>(42)
                }
            })
            .await
            .expect("success");

        assert_eq!(result, 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let policy = RetryPolicy::new(
            Some(3),
            Duration::from_millis(10),
            Duration::from_millis(50),
            2,
        );
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute("createAsset", || {
                let c = counter_clone.clone();
                async move {
                    let count = c.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        return Err(transient());
                    }
                    Ok(42)
                }
            })
            .await
            .expect("success");

        assert_eq!(result, 42);
        // 2 failures + 1 success
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let policy = RetryPolicy::new(Some(3), Duration::from_millis(5), Duration::from_millis(20), 2);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), DkgError> = policy
            .execute("transferFrom", || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        match result {
            Err(DkgError::ChainCallFailed {
                function, attempts, ..
            }) => {
                assert_eq!(function, "transferFrom");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_immediately() {
        let policy = RetryPolicy::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), DkgError> = policy
            .execute("createAsset", || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(ChainError::fatal("execution reverted"))
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(DkgError::ChainCallFailed {
                kind: ChainErrorKind::Fatal,
                attempts: 1,
                ..
            })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbounded_policy_retries_everything() {
        let policy = RetryPolicy::unbounded();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute("createAsset", || {
                let c = counter_clone.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 20 {
                        return Err(ChainError::fatal("insufficient funds"));
                    }
                    Ok("0xabc")
                }
            })
            .await
            .expect("eventually succeeds");

        assert_eq!(result, "0xabc");
        assert_eq!(counter.load(Ordering::SeqCst), 21);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(Some(10), Duration::from_secs(1), Duration::from_secs(5), 4);
        assert_eq!(policy.next_backoff(Duration::from_secs(1)), Duration::from_secs(4));
        assert_eq!(policy.next_backoff(Duration::from_secs(4)), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let policy = RetryPolicy::no_retry();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), DkgError> = policy
            .execute("ownerOf", || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
