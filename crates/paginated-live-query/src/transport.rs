//! The live-query transport seam and the handle that owns one open channel.

use crate::error::SubscriptionError;
use crate::types::{PaginationOptions, QueryRef, ResultPage};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Closes a transport subscription. Called at most once.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Receives every page pushed for a subscription.
pub type PageCallback = Box<dyn Fn(ResultPage<Value>) + Send + Sync>;

/// Receives out-of-band failures for a subscription.
pub type ErrorCallback = Box<dyn Fn(SubscriptionError) + Send + Sync>;

/// A backend capable of pushing updated result pages for a standing
/// paginated query.
///
/// Implementations may invoke the callbacks from any thread, including
/// synchronously from inside `open`.
pub trait LiveQueryTransport: Send + Sync {
    /// Open a subscription for `query` with `args` and return its disposer.
    fn open(
        &self,
        query: &QueryRef,
        args: &Value,
        options: PaginationOptions,
        on_result: PageCallback,
        on_error: ErrorCallback,
    ) -> Unsubscribe;
}

impl<T: LiveQueryTransport + ?Sized> LiveQueryTransport for Arc<T> {
    fn open(
        &self,
        query: &QueryRef,
        args: &Value,
        options: PaginationOptions,
        on_result: PageCallback,
        on_error: ErrorCallback,
    ) -> Unsubscribe {
        (**self).open(query, args, options, on_result, on_error)
    }
}

/// One open channel to the transport for a specific (query, args) pair.
///
/// Disposal runs the transport's disposer exactly once: a second `dispose`,
/// or dropping a disposed handle, does nothing.
pub struct SubscriptionHandle {
    unsubscribe: Option<Unsubscribe>,
    generation: u64,
}

impl SubscriptionHandle {
    pub(crate) fn new(unsubscribe: Unsubscribe, generation: u64) -> Self {
        Self {
            unsubscribe: Some(unsubscribe),
            generation,
        }
    }

    /// Generation of the subscription cycle this handle belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_disposed(&self) -> bool {
        self.unsubscribe.is_none()
    }

    /// Close the channel.
    pub fn dispose(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("generation", &self.generation)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
