//! Process-wide auth session cells.

use crate::types::{AuthSessionData, SessionRecord, UserRecord};
use live_cell::{CellReader, LiveCell};
use std::sync::Arc;

/// The current [`AuthSessionData`] plus the backend's auth-ready flag.
///
/// Clones share the same cells. Only the reconciler and the render-time path
/// write; everyone else reads.
#[derive(Clone, Default)]
pub struct AuthSessionStore {
    data: Arc<LiveCell<AuthSessionData>>,
    auth_ready: Arc<LiveCell<bool>>,
}

impl AuthSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with a render-time snapshot.
    pub fn hydrated(snapshot: AuthSessionData) -> Self {
        Self {
            data: Arc::new(LiveCell::new(snapshot)),
            auth_ready: Arc::new(LiveCell::new(false)),
        }
    }

    pub fn get(&self) -> AuthSessionData {
        self.data.get()
    }

    pub fn reader(&self) -> CellReader<AuthSessionData> {
        self.data.reader()
    }

    pub fn session(&self) -> Option<SessionRecord> {
        self.data.with(|data| data.session().cloned())
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.data.with(|data| data.user().cloned())
    }

    pub fn session_id(&self) -> Option<String> {
        self.data.with(|data| data.session_id().map(str::to_string))
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.with(AuthSessionData::is_authenticated)
    }

    /// Whether the backend reports itself authenticated.
    pub fn auth_ready(&self) -> bool {
        self.auth_ready.get()
    }

    pub fn auth_ready_reader(&self) -> CellReader<bool> {
        self.auth_ready.reader()
    }

    pub(crate) fn set(&self, data: AuthSessionData) -> bool {
        self.data.set_if_changed(data)
    }

    pub(crate) fn clear(&self) -> bool {
        self.data.set_if_changed(AuthSessionData::empty())
    }

    pub(crate) fn set_auth_ready(&self, ready: bool) {
        self.auth_ready.set_if_changed(ready);
    }
}

impl std::fmt::Debug for AuthSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionStore")
            .field("session_id", &self.session_id())
            .field("auth_ready", &self.auth_ready())
            .finish()
    }
}
