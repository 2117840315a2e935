//! Identity provider seams and their HTTP implementation.

use crate::token_cache::TokenSource;
use crate::types::{RawSession, SessionData, UserRecord};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tether_storage::{credential_header, PersistedStore, StorageKeys};
use tracing::{debug, info};
use url::Url;

/// Header carrying the forwarded provider cookies.
pub const CREDENTIAL_HEADER: &str = "Better-Auth-Cookie";

const TOKEN_PATH: &str = "/api/auth/convex/token";
const SESSION_PATH: &str = "/api/auth/get-session";
const SIGN_OUT_PATH: &str = "/api/auth/sign-out";

/// One-shot identity provider calls used during a render pass.
#[async_trait]
pub trait SessionEndpoints: Send + Sync {
    /// Exchange the forwarded credential for a backend access token.
    async fn token(&self, credential_header: &str) -> AuthResult<Option<String>>;

    /// Resolve the forwarded credential to the signed-in user and session.
    async fn session(&self, credential_header: &str) -> AuthResult<Option<SessionData>>;
}

/// Ends the current session with the identity provider.
#[async_trait]
pub trait SignOut: Send + Sync {
    async fn sign_out(&self) -> AuthResult<()>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    user: Option<UserRecord>,
    #[serde(default)]
    session: Option<RawSession>,
}

/// HTTP client for the identity provider's auth endpoints.
///
/// Interactive calls build the credential header from the provider cookies kept
/// in the [`PersistedStore`].
#[derive(Clone)]
pub struct AuthHttpClient {
    http: Client,
    site_url: Url,
    store: Arc<dyn PersistedStore>,
}

impl AuthHttpClient {
    pub fn new(site_url: Url, store: Arc<dyn PersistedStore>) -> Self {
        Self {
            http: Client::new(),
            site_url,
            store,
        }
    }

    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    /// The credential header for the cookies currently stored.
    pub fn stored_credential_header(&self) -> String {
        credential_header(self.store.as_ref(), Utc::now())
    }

    /// Append `path` to the site URL, keeping any base path it carries.
    fn endpoint(&self, path: &str) -> AuthResult<Url> {
        let mut url = self.site_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(path.trim_start_matches('/').split('/'));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential_header: &str,
    ) -> AuthResult<Option<T>> {
        let url = self.endpoint(path)?;
        let mut request = self.http.get(url);
        if !credential_header.is_empty() {
            request = request.header(CREDENTIAL_HEADER, credential_header);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(endpoint = path, status = status.as_u16(), "Identity provider responded");
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SessionEndpoints for AuthHttpClient {
    async fn token(&self, credential_header: &str) -> AuthResult<Option<String>> {
        let response: Option<TokenResponse> = self.get_json(TOKEN_PATH, credential_header).await?;
        Ok(response
            .and_then(|r| r.token)
            .filter(|token| !token.is_empty()))
    }

    async fn session(&self, credential_header: &str) -> AuthResult<Option<SessionData>> {
        let response: Option<SessionResponse> =
            self.get_json(SESSION_PATH, credential_header).await?;
        Ok(response.and_then(|r| match (r.user, r.session) {
            (Some(user), Some(session)) => Some(SessionData { user, session }),
            _ => None,
        }))
    }
}

#[async_trait]
impl TokenSource for AuthHttpClient {
    async fn fetch_token(&self) -> AuthResult<Option<String>> {
        let header = self.stored_credential_header();
        self.token(&header).await
    }
}

#[async_trait]
impl SignOut for AuthHttpClient {
    async fn sign_out(&self) -> AuthResult<()> {
        let url = self.endpoint(SIGN_OUT_PATH)?;
        let header = self.stored_credential_header();

        let mut request = self.http.post(url).json(&serde_json::json!({}));
        if !header.is_empty() {
            request = request.header(CREDENTIAL_HEADER, header);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status {
                endpoint: SIGN_OUT_PATH.to_string(),
                status: status.as_u16(),
            });
        }

        self.store.remove(StorageKeys::PROVIDER_COOKIES)?;
        info!("Signed out with identity provider");
        Ok(())
    }
}

impl std::fmt::Debug for AuthHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHttpClient")
            .field("site_url", &self.site_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_storage::MemoryStore;

    fn client(site: &str) -> AuthHttpClient {
        AuthHttpClient::new(Url::parse(site).unwrap(), Arc::new(MemoryStore::new()))
    }

    #[test]
    fn endpoints_keep_site_base_path() {
        let slashed = client("https://site.example/some/base/");
        assert_eq!(
            slashed.endpoint(TOKEN_PATH).unwrap().as_str(),
            "https://site.example/some/base/api/auth/convex/token"
        );
        assert_eq!(
            slashed.endpoint(SESSION_PATH).unwrap().as_str(),
            "https://site.example/some/base/api/auth/get-session"
        );

        let bare = client("https://site.example/some/base");
        assert_eq!(
            bare.endpoint(SIGN_OUT_PATH).unwrap().as_str(),
            "https://site.example/some/base/api/auth/sign-out"
        );
    }

    #[test]
    fn endpoints_on_bare_origin() {
        let client = client("https://site.example");
        assert_eq!(
            client.endpoint(TOKEN_PATH).unwrap().as_str(),
            "https://site.example/api/auth/convex/token"
        );
    }

    #[test]
    fn opaque_site_url_is_rejected() {
        let client = client("mailto:auth@site.example");
        assert!(matches!(
            client.endpoint(TOKEN_PATH),
            Err(AuthError::InvalidUrl(_))
        ));
    }

    #[test]
    fn stored_header_is_empty_without_cookies() {
        assert_eq!(client("https://site.example").stored_credential_header(), "");
    }

    #[tokio::test]
    async fn unreachable_site_is_an_error() {
        let client = client("http://127.0.0.1:9");
        assert!(client.token("a=b").await.is_err());
    }
}
