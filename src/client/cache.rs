//! Per-run issue lookup cache.
//!
//! Each key is fetched at most once per run, even when several entries are
//! classified concurrently. Failures are not cached. Fetches share one
//! permit pool, so the limit holds across every member of the run.

use crate::client::IssueLookup;
use crate::error::ClientError;
use crate::models::IssueMetadata;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, Semaphore};

pub struct CachedLookup<L> {
    inner: L,
    entries: Mutex<HashMap<String, Arc<OnceCell<IssueMetadata>>>>,
    permits: Semaphore,
}

impl<L> CachedLookup<L> {
    /// Cache allowing at most `limit` fetches in flight. Cache hits never wait.
    pub fn new(inner: L, limit: usize) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            permits: Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS)),
        }
    }

    /// Number of issues fetched successfully so far.
    pub async fn cached(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}

#[async_trait]
impl<L: IssueLookup> IssueLookup for CachedLookup<L> {
    async fn issue(&self, key: &str) -> Result<IssueMetadata, ClientError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(key.to_string()).or_default().clone()
        };
        let issue = cell
            .get_or_try_init(|| async {
                let _permit = self.permits.acquire().await.map_err(|_| {
                    ClientError::Unreachable("issue lookup limiter closed".to_string())
                })?;
                self.inner.issue(key).await
            })
            .await?;
        Ok(issue.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeLookup;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Lookup that records how many fetches overlap.
    #[derive(Default)]
    struct SlowLookup {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl IssueLookup for SlowLookup {
        async fn issue(&self, key: &str) -> Result<IssueMetadata, ClientError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(IssueMetadata {
                key: key.to_string(),
                project_key: "SQ".to_string(),
                squad_affiliation: None,
            })
        }
    }

    #[tokio::test]
    async fn test_repeated_keys_fetch_once() {
        let fake = FakeLookup::new().with_issue("SQ-1", Some("Rocket"));
        let calls = fake.calls();
        let cache = CachedLookup::new(fake, 4);

        for _ in 0..3 {
            let issue = cache.issue("SQ-1").await.unwrap();
            assert!(issue.belongs_to("Rocket"));
        }

        assert_eq!(calls.count("SQ-1"), 1);
        assert_eq!(cache.cached().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let fake = FakeLookup::new().with_issue("SQ-1", Some("Rocket"));
        let calls = fake.calls();
        let cache = CachedLookup::new(fake, 4);

        let results = futures::future::join_all((0..8).map(|_| cache.issue("SQ-1"))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(calls.count("SQ-1"), 1);
    }

    #[tokio::test]
    async fn test_failures_are_retried() {
        let fake = FakeLookup::new().with_failure(
            "SQ-2",
            ClientError::Unreachable("connection refused".to_string()),
        );
        let calls = fake.calls();
        let cache = CachedLookup::new(fake, 4);

        assert!(cache.issue("SQ-2").await.is_err());
        assert!(cache.issue("SQ-2").await.is_err());

        assert_eq!(calls.count("SQ-2"), 2);
        assert_eq!(cache.cached().await, 0);
    }

    #[tokio::test]
    async fn test_limit_bounds_in_flight_fetches() {
        let cache = CachedLookup::new(SlowLookup::default(), 2);
        let keys: Vec<String> = (0..8).map(|i| format!("SQ-{}", i)).collect();

        let results = futures::future::join_all(keys.iter().map(|key| cache.issue(key))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(cache.cached().await, 8);
        let peak = cache.inner.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 2, "peak was {}", peak);
    }
}
