//! The backend connection's auth slot.

use crate::TokenCache;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Called by the backend when its authenticated state changes.
pub type AuthChangeCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// What the backend connection uses to authenticate its requests.
#[derive(Clone)]
pub enum AuthProvider {
    /// Ask the token cache for a token per request; report auth changes back.
    Refreshable {
        tokens: Arc<TokenCache>,
        on_change: AuthChangeCallback,
    },
    /// A fixed token obtained during a render pass.
    Static(String),
    /// Always unauthenticated.
    Null,
}

impl AuthProvider {
    /// The token the backend should send, if any.
    pub async fn token(&self, force_refresh: bool) -> Option<String> {
        match self {
            AuthProvider::Refreshable { tokens, .. } => tokens.fetch_token(force_refresh).await,
            AuthProvider::Static(token) => Some(token.clone()),
            AuthProvider::Null => None,
        }
    }

    /// Forward an auth-state change from the backend.
    pub fn notify(&self, authenticated: bool) {
        if let AuthProvider::Refreshable { on_change, .. } = self {
            on_change(authenticated);
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            AuthProvider::Refreshable { .. } => ProviderKind::Refreshable,
            AuthProvider::Static(_) => ProviderKind::Static,
            AuthProvider::Null => ProviderKind::Null,
        }
    }
}

impl fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthProvider::{:?}", self.kind())
    }
}

/// Shape of an [`AuthProvider`] without its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Refreshable,
    Static,
    Null,
}

/// The backend connection, as far as authentication is concerned.
///
/// The slot holds one provider; each call replaces the previous one.
pub trait BackendAuth: Send + Sync {
    fn set_auth(&self, provider: AuthProvider);
}

impl<T: BackendAuth + ?Sized> BackendAuth for Arc<T> {
    fn set_auth(&self, provider: AuthProvider) {
        (**self).set_auth(provider)
    }
}

/// A backend that records every provider it is given.
#[derive(Default)]
pub struct RecordingBackend {
    providers: Mutex<Vec<AuthProvider>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All providers installed so far, oldest first.
    pub fn providers(&self) -> Vec<AuthProvider> {
        self.providers.lock().expect("lock poisoned").clone()
    }

    /// Kinds of all providers installed so far.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(AuthProvider::kind)
            .collect()
    }

    /// The provider currently in the slot.
    pub fn current(&self) -> Option<AuthProvider> {
        self.providers.lock().expect("lock poisoned").last().cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackendAuth for RecordingBackend {
    fn set_auth(&self, provider: AuthProvider) {
        self.providers.lock().expect("lock poisoned").push(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn static_and_null_tokens() {
        assert_eq!(
            AuthProvider::Static("abc".into()).token(false).await.as_deref(),
            Some("abc")
        );
        assert_eq!(AuthProvider::Null.token(true).await, None);
    }

    #[test]
    fn notify_reaches_refreshable_callback_only() {
        struct NoTokens;

        #[async_trait::async_trait]
        impl crate::TokenSource for NoTokens {
            async fn fetch_token(&self) -> crate::AuthResult<Option<String>> {
                Ok(None)
            }
        }

        let seen = Arc::new(AtomicBool::new(false));
        let flag = seen.clone();
        let provider = AuthProvider::Refreshable {
            tokens: Arc::new(TokenCache::new(Arc::new(NoTokens))),
            on_change: Arc::new(move |ready: bool| flag.store(ready, Ordering::SeqCst)),
        };

        provider.notify(true);
        assert!(seen.load(Ordering::SeqCst));

        AuthProvider::Null.notify(false);
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn recording_backend_records_in_order() {
        let backend = RecordingBackend::new();
        assert!(backend.is_empty());

        backend.set_auth(AuthProvider::Static("t".into()));
        backend.set_auth(AuthProvider::Null);

        assert_eq!(backend.kinds(), vec![ProviderKind::Static, ProviderKind::Null]);
        assert_eq!(backend.current().map(|p| p.kind()), Some(ProviderKind::Null));
        assert_eq!(backend.len(), 2);
    }
}
