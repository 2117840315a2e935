//! Memoized access token.

use crate::AuthResult;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Fetches a fresh access token from the identity provider.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// `Ok(None)` means the provider has no token for the current credential.
    async fn fetch_token(&self) -> AuthResult<Option<String>>;
}

/// Caches the access token between backend requests.
///
/// The cache is cleared when the reconciler sees a new session identity, when a
/// caller forces a refresh, and when a fetch fails. A fetch that was already in
/// flight when the cache was invalidated hands its token to its caller but
/// never stores it.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    /// Bumped by every invalidation.
    generation: u64,
    token: Option<String>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Return the cached token, or fetch one when there is none or
    /// `force_refresh` is set.
    ///
    /// Never fails: any fetch error clears the cache and yields `None`.
    pub async fn fetch_token(&self, force_refresh: bool) -> Option<String> {
        let generation = {
            let slot = self.slot.lock().expect("lock poisoned");
            if !force_refresh {
                if let Some(token) = &slot.token {
                    return Some(token.clone());
                }
            }
            slot.generation
        };

        let result = self.source.fetch_token().await;

        let mut slot = self.slot.lock().expect("lock poisoned");
        let current = slot.generation == generation;
        match result {
            Ok(token) => {
                let token = token.filter(|t| !t.is_empty());
                debug!(
                    present = token.is_some(),
                    force_refresh,
                    stored = current,
                    "Fetched access token"
                );
                if current {
                    slot.token = token.clone();
                }
                token
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Access token fetch failed");
                if current {
                    slot.token = None;
                }
                None
            }
        }
    }

    /// The cached token, if any.
    pub fn cached(&self) -> Option<String> {
        self.slot.lock().expect("lock poisoned").token.clone()
    }

    /// Drop the cached token and disown fetches still in flight. Idempotent.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().expect("lock poisoned");
        slot.generation = slot.generation.wrapping_add(1);
        slot.token = None;
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("cached", &self.cached().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Hands out `token-1`, `token-2`, ... and fails while `failing` is set.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        failing: std::sync::atomic::AtomicBool,
        empty: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> AuthResult<Option<String>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(AuthError::NetworkUnavailable);
            }
            if self.empty.load(Ordering::SeqCst) {
                return Ok(Some(String::new()));
            }
            Ok(Some(format!("token-{}", n)))
        }
    }

    fn cache() -> (TokenCache, Arc<CountingSource>) {
        let source = Arc::new(CountingSource::default());
        (TokenCache::new(source.clone()), source)
    }

    #[tokio::test]
    async fn reuses_cached_token() {
        let (cache, source) = cache();

        assert_eq!(cache.fetch_token(false).await.as_deref(), Some("token-1"));
        assert_eq!(cache.fetch_token(false).await.as_deref(), Some("token-1"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_refresh_fetches_again() {
        let (cache, source) = cache();

        cache.fetch_token(false).await;
        assert_eq!(cache.fetch_token(true).await.as_deref(), Some("token-2"));
        assert_eq!(cache.cached().as_deref(), Some("token-2"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_clears_cache_and_returns_none() {
        let (cache, source) = cache();
        cache.fetch_token(false).await;

        source.failing.store(true, Ordering::SeqCst);
        assert_eq!(cache.fetch_token(true).await, None);
        assert_eq!(cache.cached(), None);
    }

    #[tokio::test]
    async fn empty_token_is_no_token() {
        let (cache, source) = cache();
        source.empty.store(true, Ordering::SeqCst);

        assert_eq!(cache.fetch_token(false).await, None);
        assert_eq!(cache.cached(), None);
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let (cache, source) = cache();
        cache.fetch_token(false).await;

        cache.invalidate();
        cache.invalidate();
        assert_eq!(cache.cached(), None);

        assert_eq!(cache.fetch_token(false).await.as_deref(), Some("token-2"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    /// Holds its first fetch until `release` is notified.
    #[derive(Default)]
    struct GatedSource {
        calls: AtomicUsize,
        started: Notify,
        release: Notify,
        fail_first: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl TokenSource for GatedSource {
        async fn fetch_token(&self) -> AuthResult<Option<String>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                self.started.notify_one();
                self.release.notified().await;
                if self.fail_first.load(Ordering::SeqCst) {
                    return Err(AuthError::NetworkUnavailable);
                }
            }
            Ok(Some(format!("token-{}", n)))
        }
    }

    #[tokio::test]
    async fn fetch_in_flight_during_invalidate_is_not_cached() {
        let source = Arc::new(GatedSource::default());
        let cache = Arc::new(TokenCache::new(source.clone()));

        let in_flight = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch_token(false).await }
        });
        source.started.notified().await;

        cache.invalidate();
        source.release.notify_one();

        assert_eq!(in_flight.await.unwrap().as_deref(), Some("token-1"));
        assert_eq!(cache.cached(), None);

        assert_eq!(cache.fetch_token(false).await.as_deref(), Some("token-2"));
        assert_eq!(cache.cached().as_deref(), Some("token-2"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_failure_keeps_newer_token() {
        let source = Arc::new(GatedSource::default());
        source.fail_first.store(true, Ordering::SeqCst);
        let cache = Arc::new(TokenCache::new(source.clone()));

        let in_flight = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch_token(false).await }
        });
        source.started.notified().await;

        cache.invalidate();
        assert_eq!(cache.fetch_token(false).await.as_deref(), Some("token-2"));

        source.release.notify_one();
        assert_eq!(in_flight.await.unwrap(), None);
        assert_eq!(cache.cached().as_deref(), Some("token-2"));
    }
}
