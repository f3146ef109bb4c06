// ── Retrying store decorator ──
//
// Retries transient storage failures with exponential backoff before
// handing the error back to the engine.

use std::future::Future;

use tracing::warn;

use super::KeyValueStore;
use crate::config::RetryPolicy;
use crate::error::StorageError;

/// Wraps a [`KeyValueStore`], retrying transient failures per [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: KeyValueStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn with_retry<T, F, Fut>(
        &self,
        op: &'static str,
        key: &str,
        mut call: F,
    ) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        op,
                        key,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "storage call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: KeyValueStore> KeyValueStore for RetryingStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_retry("get", key, || self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.with_retry("set", key, || self.inner.set(key, value.clone()))
            .await
    }
}
