//! Session data shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identity-provider user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A session safe to store and serialize. It never carries the bearer
/// credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A session as the identity provider returns it, credential included.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSession {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub token: Option<String>,
}

impl RawSession {
    /// Drop the bearer credential.
    pub fn strip_credential(self) -> SessionRecord {
        SessionRecord {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A signed-in user and session from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionData {
    pub user: UserRecord,
    pub session: RawSession,
}

/// One value of the identity provider's live session observable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEmission {
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub data: Option<SessionData>,
}

impl SessionEmission {
    /// The provider is still resolving the session.
    pub fn pending() -> Self {
        Self {
            is_pending: true,
            data: None,
        }
    }

    /// The provider resolved to no session.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(data: SessionData) -> Self {
        Self {
            is_pending: false,
            data: Some(data),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.session.id.as_str())
    }
}

/// The current user and session, set and cleared together.
///
/// A session without a user (or the reverse) cannot be built, including when
/// deserializing a render-time snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "SessionSnapshot", into = "SessionSnapshot")]
pub struct AuthSessionData {
    current: Option<(UserRecord, SessionRecord)>,
}

impl AuthSessionData {
    /// No user, no session.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(user: UserRecord, session: SessionRecord) -> Self {
        Self {
            current: Some((user, session)),
        }
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.current.as_ref().map(|(user, _)| user)
    }

    pub fn session(&self) -> Option<&SessionRecord> {
        self.current.as_ref().map(|(_, session)| session)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session().map(|session| session.id.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }
}

impl From<SessionData> for AuthSessionData {
    fn from(data: SessionData) -> Self {
        Self::new(data.user, data.session.strip_credential())
    }
}

/// Serialized form: `{ "user": ..., "session": ... }`, both null when signed out.
#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    user: Option<UserRecord>,
    session: Option<SessionRecord>,
}

impl TryFrom<SessionSnapshot> for AuthSessionData {
    type Error = String;

    fn try_from(snapshot: SessionSnapshot) -> Result<Self, Self::Error> {
        match (snapshot.user, snapshot.session) {
            (Some(user), Some(session)) => Ok(AuthSessionData::new(user, session)),
            (None, None) => Ok(AuthSessionData::empty()),
            (Some(_), None) => Err("snapshot has a user but no session".to_string()),
            (None, Some(_)) => Err("snapshot has a session but no user".to_string()),
        }
    }
}

impl From<AuthSessionData> for SessionSnapshot {
    fn from(data: AuthSessionData) -> Self {
        match data.current {
            Some((user, session)) => SessionSnapshot {
                user: Some(user),
                session: Some(session),
            },
            None => SessionSnapshot {
                user: None,
                session: None,
            },
        }
    }
}
