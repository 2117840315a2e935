//! Session reconciliation for the Tether client.
//!
//! This crate provides:
//! - A memoized access token ([`TokenCache`]) over an identity provider
//! - An explicit FSM reconciling live session emissions and a render-time
//!   snapshot into one [`AuthSessionStore`]
//! - Wiring of the backend connection's auth slot ([`BackendAuth`])
//! - The render-time session prefetch and its cache headers
//! - An HTTP client for the identity provider's auth endpoints
//!
//! ```ignore
//! let identity = Arc::new(AuthHttpClient::new(site_url, cookie_store));
//! let tokens = Arc::new(TokenCache::new(identity.clone()));
//! let reconciler = Arc::new(SessionReconciler::new(store, tokens, backend));
//! reconciler.run(sessions.reader());
//! ```

mod auth_fsm;
mod backend;
mod error;
mod identity;
mod reconciler;
mod render;
mod store;
mod token_cache;
mod types;
mod view;

pub use auth_fsm::reconcile_machine;
pub use auth_fsm::{ReconcileInput, ReconcileMachine, ReconcileMachineState, ReconcileState};
pub use backend::{AuthChangeCallback, AuthProvider, BackendAuth, ProviderKind, RecordingBackend};
pub use error::{AuthError, AuthResult};
pub use identity::{AuthHttpClient, SessionEndpoints, SignOut, CREDENTIAL_HEADER};
pub use reconciler::SessionReconciler;
pub use render::{no_store_headers, prefetch_session, NO_STORE_HEADERS};
pub use store::AuthSessionStore;
pub use token_cache::{TokenCache, TokenSource};
pub use types::{AuthSessionData, RawSession, SessionData, SessionEmission, SessionRecord, UserRecord};
pub use view::AuthView;
