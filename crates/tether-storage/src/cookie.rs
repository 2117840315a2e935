//! Cookie-backed storage.
//!
//! The identity provider's client persists a handful of keys. In a rendered
//! application those keys must survive the trip between the render pass and the
//! interactive client, so they all live inside a single JSON cookie. The cookie
//! medium itself (request headers, `document.cookie`, a test double) belongs to
//! the embedding application and is reached through [`CookieJar`].

use crate::{PersistedStore, StorageKeys, StorageResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::{debug, warn};

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes written alongside the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub max_age_secs: u64,
    pub same_site: SameSite,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieAttributes {
    /// Attributes for the session cookie. `secure` is set in production.
    pub fn session(secure: bool) -> Self {
        Self {
            max_age_secs: StorageKeys::SESSION_COOKIE_MAX_AGE_SECS,
            same_site: SameSite::Lax,
            secure,
            // The interactive client reads it back.
            http_only: false,
        }
    }
}

/// The medium cookies are read from and written to.
pub trait CookieJar: Send + Sync {
    /// Read the raw value of a cookie.
    fn read(&self, name: &str) -> StorageResult<Option<String>>;

    /// Write a cookie.
    fn write(&self, name: &str, value: &str, attributes: &CookieAttributes) -> StorageResult<()>;

    /// Delete a cookie.
    fn delete(&self, name: &str) -> StorageResult<()>;
}

/// A [`PersistedStore`] that keeps every key in one JSON-object cookie.
pub struct CookieStore {
    jar: Box<dyn CookieJar>,
    attributes: CookieAttributes,
}

impl CookieStore {
    /// Create a cookie store over `jar`. `secure` marks the cookie Secure.
    pub fn new(jar: Box<dyn CookieJar>, secure: bool) -> Self {
        Self {
            jar,
            attributes: CookieAttributes::session(secure),
        }
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        let Some(raw) = self.jar.read(StorageKeys::SESSION_COOKIE)? else {
            return Ok(BTreeMap::new());
        };

        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(error = %e, "Session cookie is not a JSON object, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        if map.is_empty() {
            return self.jar.delete(StorageKeys::SESSION_COOKIE);
        }
        let raw = serde_json::to_string(map)?;
        self.jar
            .write(StorageKeys::SESSION_COOKIE, &raw, &self.attributes)
    }
}

impl PersistedStore for CookieStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut map = self.load()?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let mut map = self.load()?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&map)?;
        Ok(true)
    }
}

#[derive(Debug, Deserialize)]
struct ProviderCookie {
    value: String,
    #[serde(default)]
    expires: Option<String>,
}

/// Render the forwarded credential header from the identity provider's stored
/// cookies.
///
/// Reads the [`StorageKeys::PROVIDER_COOKIES`] entry, drops cookies whose
/// expiry is not after `now` (or cannot be parsed), and joins the rest as
/// `name=value; name=value`. Missing or malformed data yields an empty string.
pub fn credential_header(store: &dyn PersistedStore, now: DateTime<Utc>) -> String {
    let raw = match store.get(StorageKeys::PROVIDER_COOKIES) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return String::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read provider cookies");
            return String::new();
        }
    };

    let parsed: BTreeMap<String, ProviderCookie> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "Provider cookies are malformed");
            return String::new();
        }
    };

    parsed
        .into_iter()
        .filter(|(_, cookie)| match &cookie.expires {
            None => true,
            Some(expires) => DateTime::parse_from_rfc3339(expires)
                .map(|at| at.with_timezone(&Utc) > now)
                .unwrap_or(false),
        })
        .map(|(name, cookie)| format!("{}={}", name, cookie.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// An in-memory [`CookieJar`] that also records the attributes of each write.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, (String, CookieAttributes)>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes of the last write of `name`, if the cookie exists.
    pub fn attributes(&self, name: &str) -> Option<CookieAttributes> {
        self.cookies
            .lock()
            .expect("lock poisoned")
            .get(name)
            .map(|(_, attributes)| attributes.clone())
    }
}

impl CookieJar for MemoryCookieJar {
    fn read(&self, name: &str) -> StorageResult<Option<String>> {
        Ok(self
            .cookies
            .lock()
            .expect("lock poisoned")
            .get(name)
            .map(|(value, _)| value.clone()))
    }

    fn write(&self, name: &str, value: &str, attributes: &CookieAttributes) -> StorageResult<()> {
        self.cookies
            .lock()
            .expect("lock poisoned")
            .insert(name.to_string(), (value.to_string(), attributes.clone()));
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        self.cookies.lock().expect("lock poisoned").remove(name);
        Ok(())
    }
}

impl<J: CookieJar + ?Sized> CookieJar for std::sync::Arc<J> {
    fn read(&self, name: &str) -> StorageResult<Option<String>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, value: &str, attributes: &CookieAttributes) -> StorageResult<()> {
        (**self).write(name, value, attributes)
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        (**self).delete(name)
    }
}
