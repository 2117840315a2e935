//! Reconciliation state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 SessionPending
//!                  ┌────────┐
//!                  ▼        │
//! ┌─────────────────┐  SessionPending  ┌─────────────────┐
//! │ Unauthenticated │ ───────────────► │     Pending     │
//! │    (initial)    │ ◄─────────────── │                 │
//! └────────┬────────┘  SessionCleared  └────────┬────────┘
//!          │                                    │
//!          │ SessionObserved                    │ SessionObserved
//!          ▼                                    ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                    Authenticated                     │
//! │   SessionObserved / SessionPending stay here         │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ SessionCleared
//!                            ▼
//!                     Unauthenticated
//! ```
//!
//! A pending emission never leaves `Authenticated`: the identity provider
//! reports pending while it refreshes credentials, and the wired session stays
//! in place until it resolves.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub reconcile_machine(Unauthenticated)

    Unauthenticated => {
        SessionObserved => Authenticated,
        SessionPending => Pending,
        SessionCleared => Unauthenticated
    },
    Pending => {
        SessionObserved => Authenticated,
        SessionPending => Pending,
        SessionCleared => Unauthenticated
    },
    Authenticated => {
        SessionObserved => Authenticated,
        SessionPending => Authenticated,
        SessionCleared => Unauthenticated
    }
}

pub use reconcile_machine::Input as ReconcileInput;
pub use reconcile_machine::State as ReconcileMachineState;
pub use reconcile_machine::StateMachine as ReconcileMachine;

/// Reconciliation state for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "session_id")]
pub enum ReconcileState {
    /// No session is wired.
    Unauthenticated,
    /// The identity provider is still resolving and nothing is wired yet.
    Pending,
    /// The backend is wired to the token provider for this session.
    Authenticated(String),
}

impl ReconcileState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, ReconcileState::Authenticated(_))
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            ReconcileState::Authenticated(id) => Some(id),
            _ => None,
        }
    }
}
