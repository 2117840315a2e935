#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use session_reconciler::{
    AuthError, AuthResult, RawSession, SessionData, SessionEmission, SessionEndpoints, SignOut,
    TokenSource, UserRecord,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn session_data(user_id: &str, session_id: &str) -> SessionData {
    let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    SessionData {
        user: UserRecord {
            id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            name: user_id.to_string(),
            email_verified: true,
            image: None,
            created_at: at,
            updated_at: at,
        },
        session: RawSession {
            id: session_id.to_string(),
            user_id: user_id.to_string(),
            expires_at: at + chrono::Duration::days(30),
            created_at: at,
            updated_at: at,
            token: Some(format!("bearer-{}", session_id)),
        },
    }
}

pub fn signed_in(user_id: &str, session_id: &str) -> SessionEmission {
    SessionEmission::signed_in(session_data(user_id, session_id))
}

/// Counts fetches and hands out `token-1`, `token-2`, ...
#[derive(Default)]
pub struct CountingTokens {
    pub calls: AtomicUsize,
}

impl CountingTokens {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for CountingTokens {
    async fn fetch_token(&self) -> AuthResult<Option<String>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(format!("token-{}", n)))
    }
}

/// Scripted identity provider endpoints.
pub struct FakeEndpoints {
    pub token: Mutex<Option<AuthResult<Option<String>>>>,
    pub session: Mutex<Option<AuthResult<Option<SessionData>>>>,
    pub headers: Mutex<Vec<String>>,
}

impl FakeEndpoints {
    pub fn new(
        token: AuthResult<Option<String>>,
        session: AuthResult<Option<SessionData>>,
    ) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            session: Mutex::new(Some(session)),
            headers: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> usize {
        self.headers.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionEndpoints for FakeEndpoints {
    async fn token(&self, credential_header: &str) -> AuthResult<Option<String>> {
        self.headers.lock().unwrap().push(credential_header.to_string());
        self.token.lock().unwrap().take().unwrap_or(Ok(None))
    }

    async fn session(&self, credential_header: &str) -> AuthResult<Option<SessionData>> {
        self.headers.lock().unwrap().push(credential_header.to_string());
        self.session.lock().unwrap().take().unwrap_or(Ok(None))
    }
}

#[derive(Default)]
pub struct FakeSignOut {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
}

#[async_trait]
impl SignOut for FakeSignOut {
    async fn sign_out(&self) -> AuthResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::NetworkUnavailable);
        }
        Ok(())
    }
}

pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
