//! Core types for paginated live queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Where a paginated query is in loading its pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaginationStatus {
    /// No page has arrived yet.
    #[default]
    LoadingFirstPage,
    /// More pages were requested and are on their way.
    LoadingMore,
    /// The loaded pages end before the dataset does.
    CanLoadMore,
    /// Every page has been loaded.
    Exhausted,
}

impl PaginationStatus {
    /// True while a page is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            PaginationStatus::LoadingFirstPage | PaginationStatus::LoadingMore
        )
    }
}

/// Position and size of a page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationOptions {
    /// Opaque transport cursor; `None` requests the first page.
    pub cursor: Option<String>,
    pub num_items: u32,
}

impl PaginationOptions {
    /// Options for the first page of a subscription.
    pub fn first_page(num_items: u32) -> Self {
        Self {
            cursor: None,
            num_items,
        }
    }
}

/// Identity of a paginated query on the backend, e.g. `tasks:list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryRef(String);

impl QueryRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arguments for a paginated query, or the skip sentinel.
///
/// Equality is structural: two independently built argument objects with the
/// same content are equal, so rebuilding arguments never resubscribes.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArgs {
    /// Do not subscribe.
    Skip,
    /// Query arguments, excluding pagination options.
    Args(Value),
}

impl QueryArgs {
    /// Wrap any serializable argument object.
    pub fn from_serializable<A: Serialize>(args: &A) -> serde_json::Result<Self> {
        Ok(QueryArgs::Args(serde_json::to_value(args)?))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, QueryArgs::Skip)
    }
}

impl From<Value> for QueryArgs {
    fn from(value: Value) -> Self {
        QueryArgs::Args(value)
    }
}

impl<A: Into<Value>> From<Option<A>> for QueryArgs {
    fn from(value: Option<A>) -> Self {
        match value {
            Some(args) => QueryArgs::Args(args.into()),
            None => QueryArgs::Skip,
        }
    }
}

/// Capability to request more items for the subscription that produced it.
///
/// Returns false when the request cannot be made (e.g. the dataset is
/// exhausted or a request is already in flight).
pub type LoadMore = Arc<dyn Fn(u32) -> bool + Send + Sync>;

/// One push from the transport: the full current result set for a subscription.
#[derive(Clone)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub status: PaginationStatus,
    pub load_more: LoadMore,
}

impl<T: fmt::Debug> fmt::Debug for ResultPage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultPage")
            .field("items", &self.items)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_loading_matches_in_flight_statuses() {
        assert!(PaginationStatus::LoadingFirstPage.is_loading());
        assert!(PaginationStatus::LoadingMore.is_loading());
        assert!(!PaginationStatus::CanLoadMore.is_loading());
        assert!(!PaginationStatus::Exhausted.is_loading());
    }

    #[test]
    fn status_starts_at_first_page() {
        assert_eq!(PaginationStatus::default(), PaginationStatus::LoadingFirstPage);
    }

    #[test]
    fn status_serializes_with_transport_names() {
        assert_eq!(
            serde_json::to_string(&PaginationStatus::CanLoadMore).unwrap(),
            "\"CanLoadMore\""
        );
        let status: PaginationStatus = serde_json::from_str("\"Exhausted\"").unwrap();
        assert_eq!(status, PaginationStatus::Exhausted);
    }

    #[test]
    fn pagination_options_use_camel_case() {
        let json = serde_json::to_value(PaginationOptions::first_page(10)).unwrap();
        assert_eq!(json, json!({ "cursor": null, "numItems": 10 }));
    }

    #[test]
    fn args_compare_structurally() {
        let a = QueryArgs::from(json!({ "project": "p1", "filter": { "done": false } }));
        let b = QueryArgs::from(json!({ "filter": { "done": false }, "project": "p1" }));
        let c = QueryArgs::from(json!({ "project": "p2", "filter": { "done": false } }));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, QueryArgs::Skip);
    }

    #[test]
    fn args_from_option() {
        let none: Option<Value> = None;
        assert!(QueryArgs::from(none).is_skip());
        assert_eq!(
            QueryArgs::from(Some(json!({ "id": 1 }))),
            QueryArgs::Args(json!({ "id": 1 }))
        );
    }

    #[test]
    fn args_from_serializable() {
        #[derive(Serialize)]
        struct ListArgs<'a> {
            project_id: &'a str,
        }

        let args = QueryArgs::from_serializable(&ListArgs { project_id: "p1" }).unwrap();
        assert_eq!(args, QueryArgs::Args(json!({ "project_id": "p1" })));
    }
}
