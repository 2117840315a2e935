//! Session reconciliation.
//!
//! Folds the identity provider's live session emissions (and an optional
//! render-time snapshot) into the [`AuthSessionStore`], and keeps the backend's
//! auth slot wired to the [`TokenCache`] for exactly the current session.
//!
//! The backend is rewired only on the first observed session or when the
//! session id changes; repeated emissions for the same session leave both the
//! slot and the token cache alone.

use crate::auth_fsm::{ReconcileInput, ReconcileMachine, ReconcileMachineState, ReconcileState};
use crate::backend::{AuthProvider, BackendAuth};
use crate::identity::SignOut;
use crate::store::AuthSessionStore;
use crate::token_cache::TokenCache;
use crate::types::{AuthSessionData, SessionEmission};
use crate::{AuthError, AuthResult};
use live_cell::CellReader;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Wiring {
    fsm: ReconcileMachine,
    /// The backend slot currently holds our refreshable provider.
    wired: bool,
    last_session_id: Option<String>,
}

/// Sole writer of the [`AuthSessionStore`] once the client is interactive.
pub struct SessionReconciler {
    store: AuthSessionStore,
    tokens: Arc<TokenCache>,
    backend: Arc<dyn BackendAuth>,
    wiring: Mutex<Wiring>,
}

impl SessionReconciler {
    /// Create a reconciler over `store`.
    ///
    /// If the store already holds a session (hydrated from a render pass), the
    /// backend is wired immediately and that session counts as the last one
    /// observed, so the first live emission for it does not rewire.
    pub fn new(
        store: AuthSessionStore,
        tokens: Arc<TokenCache>,
        backend: Arc<dyn BackendAuth>,
    ) -> Self {
        let this = Self {
            store,
            tokens,
            backend,
            wiring: Mutex::new(Wiring {
                fsm: ReconcileMachine::new(),
                wired: false,
                last_session_id: None,
            }),
        };

        if let Some(session_id) = this.store.session_id() {
            let mut wiring = this.wiring.lock().expect("lock poisoned");
            this.backend.set_auth(this.refreshable_provider());
            wiring.wired = true;
            wiring.last_session_id = Some(session_id.clone());
            if let Err(e) = Self::transition(&mut wiring, &ReconcileInput::SessionObserved) {
                warn!(error = %e, "Hydration transition rejected");
            }
            info!(session_id = %session_id, "Hydrated render-time session, token provider wired");
        }

        this
    }

    /// Apply one emission from the identity provider's session observable.
    pub fn observe(&self, emission: &SessionEmission) {
        let mut wiring = self.wiring.lock().expect("lock poisoned");

        let input = match &emission.data {
            Some(data) => {
                let session_id = data.session.id.clone();
                self.store.set(AuthSessionData::from(data.clone()));

                if !wiring.wired || wiring.last_session_id.as_deref() != Some(session_id.as_str()) {
                    self.tokens.invalidate();
                    self.backend.set_auth(self.refreshable_provider());
                    info!(
                        session_id = %session_id,
                        previous_session_id = ?wiring.last_session_id,
                        "Session identity changed, token provider wired"
                    );
                    wiring.wired = true;
                }
                wiring.last_session_id = Some(session_id);
                ReconcileInput::SessionObserved
            }
            None if !emission.is_pending => {
                self.store.clear();
                if wiring.wired {
                    self.backend.set_auth(AuthProvider::Null);
                    self.store.set_auth_ready(false);
                    wiring.wired = false;
                    info!("Session ended, token provider unwired");
                }
                wiring.last_session_id = None;
                ReconcileInput::SessionCleared
            }
            None => {
                debug!("Session pending, keeping current state");
                ReconcileInput::SessionPending
            }
        };

        if let Err(e) = Self::transition(&mut wiring, &input) {
            warn!(error = %e, "Reconciliation transition rejected");
        }
    }

    /// Follow the identity provider's session observable: apply its current
    /// value now and every change after it.
    ///
    /// The driver stops when the observable is dropped. Must be called from
    /// within a tokio runtime.
    pub fn run(self: &Arc<Self>, mut sessions: CellReader<SessionEmission>) -> JoinHandle<()> {
        self.observe(&sessions.current());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(emission) = sessions.changed().await {
                this.observe(&emission);
            }
            debug!("Session observable closed, reconciler driver stopped");
        })
    }

    /// End the session with the identity provider and clear local state.
    ///
    /// A failed sign-out request is logged; local state is cleared regardless.
    pub async fn sign_out(&self, identity: &dyn SignOut) {
        if let Err(e) = identity.sign_out().await {
            warn!(error = %e, "Identity provider sign-out failed");
        }
        self.observe(&SessionEmission::signed_out());
    }

    /// Current reconciliation state.
    pub fn state(&self) -> ReconcileState {
        let wiring = self.wiring.lock().expect("lock poisoned");
        match (wiring.fsm.state(), &wiring.last_session_id) {
            (ReconcileMachineState::Authenticated, Some(id)) => ReconcileState::Authenticated(id.clone()),
            (ReconcileMachineState::Pending, _) => ReconcileState::Pending,
            _ => ReconcileState::Unauthenticated,
        }
    }

    pub fn store(&self) -> &AuthSessionStore {
        &self.store
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    fn refreshable_provider(&self) -> AuthProvider {
        let store = self.store.clone();
        AuthProvider::Refreshable {
            tokens: Arc::clone(&self.tokens),
            on_change: Arc::new(move |ready: bool| store.set_auth_ready(ready)),
        }
    }

    fn transition(wiring: &mut Wiring, input: &ReconcileInput) -> AuthResult<()> {
        let old_state = wiring.fsm.state().clone();

        wiring.fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input, old_state
            ))
        })?;

        let new_state = wiring.fsm.state();
        if old_state != *new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Reconciliation state transition"
            );
        }
        Ok(())
    }
}
