use std::future::Future;
use std::time::Duration;
use tracing::warn;

use ragdb_core::config::BuildConfig;
use ragdb_core::error::Result;

/// Bounded retry with doubling backoff for transient build failures.
///
/// Only errors with `is_transient()` (provider or source faults) are retried;
/// configuration and shape errors return on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff: Duration::from_millis(500) }
    }
}

impl From<&BuildConfig> for RetryPolicy {
    fn from(build: &BuildConfig) -> Self {
        Self { max_attempts: build.max_attempts.max(1), initial_backoff: Duration::from_millis(build.initial_backoff_ms) }
    }
}

impl RetryPolicy {
    pub fn once() -> Self {
        Self { max_attempts: 1, initial_backoff: Duration::ZERO }
    }

    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        let mut backoff = self.initial_backoff;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(attempt, max = self.max_attempts, "{what} failed, retrying in {backoff:?}: {e}");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_core::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, initial_backoff: Duration::from_millis(1) }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let out = fast(3)
            .run("build", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Provider(anyhow::anyhow!("503")))
                } else {
                    Ok(7)
                }
            })
            .await
            .expect("third attempt");
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let res: Result<()> = fast(2)
            .run("build", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Source(anyhow::anyhow!("timeout")))
            })
            .await;
        assert!(matches!(res, Err(Error::Source(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let res: Result<()> = fast(5)
            .run("build", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::EmptyCorpus)
            })
            .await;
        assert!(matches!(res, Err(Error::EmptyCorpus)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
