//! Error types for paginated live queries.

use thiserror::Error;

/// Errors raised synchronously when a paginated query is constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query options are invalid. Fatal to the constructing call.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Failures reported for a running subscription.
///
/// These never tear the subscription down. They are recorded in the query's
/// error cell and cleared by the next successful page or a new subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The transport reported a failure for this subscription
    #[error("Subscription failed: {0}")]
    Transport(String),

    /// A page arrived whose items do not match the expected item type
    #[error("Failed to decode page: {0}")]
    Decode(String),
}

/// Result type alias using QueryError.
pub type QueryResult<T> = Result<T, QueryError>;
