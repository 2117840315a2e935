//! Render-time session prefetch.
//!
//! A render pass has no live session observable. It resolves the session once
//! from the forwarded credential, seeds the [`AuthSessionStore`] with the
//! result and, when a token comes back, hands it straight to the backend as a
//! static credential. Nothing here fails the render: every fetch error is
//! logged and the pass continues unauthenticated.

use crate::backend::{AuthProvider, BackendAuth};
use crate::identity::SessionEndpoints;
use crate::store::AuthSessionStore;
use crate::types::AuthSessionData;
use tracing::{debug, info, warn};

/// Response headers for a rendered page.
pub const NO_STORE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "private, no-store, no-cache, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// Resolve the session for a render pass.
///
/// `endpoints` is `None` when no identity provider URL is configured. With no
/// endpoints or an empty `credential_header` no request is made. Returns the
/// snapshot left in `store`.
pub async fn prefetch_session(
    endpoints: Option<&dyn SessionEndpoints>,
    credential_header: &str,
    store: &AuthSessionStore,
    backend: &dyn BackendAuth,
) -> AuthSessionData {
    let Some(endpoints) = endpoints else {
        debug!("No identity provider configured, skipping session prefetch");
        return store.get();
    };
    if credential_header.is_empty() {
        debug!("No forwarded credential, skipping session prefetch");
        return store.get();
    }

    let (token, session) = tokio::join!(
        endpoints.token(credential_header),
        endpoints.session(credential_header)
    );

    let token = token.unwrap_or_else(|e| {
        warn!(error = %e, "Render-time token fetch failed");
        None
    });
    let session = session.unwrap_or_else(|e| {
        warn!(error = %e, "Render-time session fetch failed");
        None
    });

    if let Some(data) = session {
        let snapshot = AuthSessionData::from(data);
        info!(session_id = ?snapshot.session_id(), "Render-time session resolved");
        store.set(snapshot);
    }

    if let Some(token) = token {
        backend.set_auth(AuthProvider::Static(token));
    }

    store.get()
}

/// Headers that keep an authenticated page out of shared caches. Empty for an
/// unauthenticated snapshot.
pub fn no_store_headers(snapshot: &AuthSessionData) -> Vec<(&'static str, &'static str)> {
    if snapshot.is_authenticated() {
        NO_STORE_HEADERS.to_vec()
    } else {
        Vec::new()
    }
}
