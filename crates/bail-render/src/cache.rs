//! Version-keyed render cache using moka
//!
//! A render is a pure function of (state version, schema), so a session's
//! document is computed once per version and shared afterwards.

use crate::renderer::RenderResult;
use bail_schema::ContentDigest;
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Identity of one render
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderKey {
    session: String,
    state_version: u64,
    schema: ContentDigest,
}

impl RenderKey {
    /// Key for `session` at `state_version` under schema `schema`
    #[inline]
    #[must_use]
    pub fn new(session: impl Into<String>, state_version: u64, schema: ContentDigest) -> Self {
        Self {
            session: session.into(),
            state_version,
            schema,
        }
    }

    #[inline]
    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }

    #[inline]
    #[must_use]
    pub fn state_version(&self) -> u64 {
        self.state_version
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> ContentDigest {
        self.schema
    }
}

/// Render cache
///
/// Entries never go stale: a new state version is a new key. Old versions
/// age out through LRU eviction or the optional TTL.
#[derive(Debug, Clone)]
pub struct RenderCache {
    inner: Cache<RenderKey, Arc<RenderResult>>,
}

impl RenderCache {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    #[inline]
    pub async fn insert(&self, key: RenderKey, result: Arc<RenderResult>) {
        self.inner.insert(key, result).await;
    }

    #[inline]
    pub async fn get(&self, key: &RenderKey) -> Option<Arc<RenderResult>> {
        self.inner.get(key).await
    }

    /// Get or compute a render
    ///
    /// # Errors
    /// Propagates the error of `f`; nothing is cached then
    pub async fn try_get_or_insert_with<E, F, Fut>(
        &self,
        key: RenderKey,
        f: F,
    ) -> Result<Arc<RenderResult>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RenderResult, E>>,
    {
        if let Some(cached) = self.get(&key).await {
            return Ok(cached);
        }
        let result = Arc::new(f().await?);
        self.insert(key, Arc::clone(&result)).await;
        Ok(result)
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for RenderCache {
    /// Create cache with default capacity (1,000 renders)
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result(version: u64) -> RenderResult {
        let document = format!("<p>v{version}</p>");
        RenderResult {
            digest: ContentDigest::compute(document.as_bytes()),
            document,
            unresolved: Vec::new(),
            complete: true,
            state_version: version,
            schema_fingerprint: ContentDigest::compute(b"schema"),
        }
    }

    fn key(version: u64) -> RenderKey {
        RenderKey::new("s1", version, ContentDigest::compute(b"schema"))
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache = RenderCache::new(10);
        cache.insert(key(1), Arc::new(result(1))).await;
        let hit = cache.get(&key(1)).await.unwrap();
        assert_eq!(hit.state_version, 1);
        assert!(cache.get(&key(2)).await.is_none());
    }

    #[tokio::test]
    async fn computes_once_per_key() {
        let cache = RenderCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let hit = cache
                .try_get_or_insert_with(key(4), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(result(4))
                })
                .await
                .unwrap();
            assert_eq!(hit.document, "<p>v4</p>");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = RenderCache::new(10);
        let failed = cache
            .try_get_or_insert_with(key(1), || async { Err::<RenderResult, _>("boom") })
            .await;
        assert!(failed.is_err());
        assert!(cache.get(&key(1)).await.is_none());
    }

    #[test]
    fn keys_differ_by_schema() {
        let a = RenderKey::new("s1", 3, ContentDigest::compute(b"a"));
        let b = RenderKey::new("s1", 3, ContentDigest::compute(b"b"));
        assert_ne!(a, b);
        assert_eq!(a.session(), "s1");
        assert_eq!(a.state_version(), 3);
    }
}
