//! Storage key constants.

/// Keys and cookie names shared with the identity provider's client.
pub struct StorageKeys;

impl StorageKeys {
    /// Name of the single cookie that holds every stored key.
    pub const SESSION_COOKIE: &'static str = "better-auth-session";

    /// Key under which the identity provider keeps its own cookies (JSON map).
    pub const PROVIDER_COOKIES: &'static str = "better-auth_cookie";

    /// Max-age of the session cookie in seconds (30 days).
    pub const SESSION_COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;
}
