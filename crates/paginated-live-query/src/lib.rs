//! # paginated-live-query
//!
//! Keeps paginated query results fresh against a live backend.
//!
//! A [`PaginatedQuery`] binds a query to arguments and owns at most one
//! transport subscription for that binding. Results, status and errors are
//! exposed as [`live_cell`] readers so callers can read synchronously or wait
//! for the next push.
//!
//! ```ignore
//! let context = ExecutionContext::interactive(transport);
//! let tasks: PaginatedQuery<Task> = PaginatedQuery::new(
//!     &context,
//!     QueryRef::new("tasks:list"),
//!     json!({ "projectId": "p1" }),
//!     20,
//! )?;
//!
//! if tasks.status() == PaginationStatus::CanLoadMore {
//!     tasks.load_more(20);
//! }
//! ```

mod context;
mod error;
mod manager;
pub mod recording;
mod transport;
mod types;

pub use context::ExecutionContext;
pub use error::{QueryError, QueryResult, SubscriptionError};
pub use manager::PaginatedQuery;
pub use transport::{ErrorCallback, LiveQueryTransport, PageCallback, SubscriptionHandle, Unsubscribe};
pub use types::{LoadMore, PaginationOptions, PaginationStatus, QueryArgs, QueryRef, ResultPage};
