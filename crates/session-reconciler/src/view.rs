//! Application-facing auth accessors.

use crate::store::AuthSessionStore;
use crate::types::{SessionEmission, SessionRecord, UserRecord};
use live_cell::CellReader;

/// Read-only view of the current auth state.
///
/// Prefers the identity provider's live data and falls back to the stored
/// snapshot. None of the accessors can fail.
#[derive(Clone)]
pub struct AuthView {
    store: AuthSessionStore,
    live: Option<CellReader<SessionEmission>>,
}

impl AuthView {
    /// View for an interactive client following the live session observable.
    pub fn interactive(store: AuthSessionStore, live: CellReader<SessionEmission>) -> Self {
        Self {
            store,
            live: Some(live),
        }
    }

    /// View for a render pass: the stored snapshot only.
    pub fn render(store: AuthSessionStore) -> Self {
        Self { store, live: None }
    }

    pub fn session(&self) -> Option<SessionRecord> {
        let live = self.live.as_ref().and_then(|live| {
            live.with(|emission| {
                emission
                    .data
                    .as_ref()
                    .map(|data| data.session.clone().strip_credential())
            })
        });
        live.or_else(|| self.store.session())
    }

    pub fn user(&self) -> Option<UserRecord> {
        let live = self.live.as_ref().and_then(|live| {
            live.with(|emission| emission.data.as_ref().map(|data| data.user.clone()))
        });
        live.or_else(|| self.store.user())
    }

    /// True while the identity provider is still resolving and no session is
    /// known. Always false in a render pass.
    pub fn is_loading(&self) -> bool {
        let Some(live) = &self.live else {
            return false;
        };
        if self.store.is_authenticated() {
            return false;
        }
        live.with(|emission| emission.is_pending)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }
}
