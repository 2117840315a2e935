//! Persisted key-value storage for the Tether client.
//!
//! This crate provides:
//! - The [`PersistedStore`] trait consumed by the identity-provider client
//! - [`MemoryStore`], an in-process implementation
//! - [`CookieStore`], which keeps every key inside one JSON cookie of a
//!   [`CookieJar`] supplied by the embedding application
//! - [`credential_header`], which renders the forwarded credential header from
//!   the stored identity-provider cookies

mod cookie;
mod keys;
mod memory;
mod traits;

pub use cookie::{credential_header, CookieAttributes, CookieJar, CookieStore, MemoryCookieJar, SameSite};
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::PersistedStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing medium rejected the operation
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
