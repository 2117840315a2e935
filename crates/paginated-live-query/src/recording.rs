//! In-memory transport for tests.

use crate::error::SubscriptionError;
use crate::transport::{ErrorCallback, LiveQueryTransport, PageCallback, Unsubscribe};
use crate::types::{LoadMore, PaginationOptions, PaginationStatus, QueryRef, ResultPage};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// A transport lifecycle event, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened {
        id: u64,
        query: String,
        args: Value,
        num_items: u32,
    },
    Disposed {
        id: u64,
    },
}

type SharedPageCallback = Arc<dyn Fn(ResultPage<Value>) + Send + Sync>;
type SharedErrorCallback = Arc<dyn Fn(SubscriptionError) + Send + Sync>;

#[derive(Default)]
struct State {
    next_id: u64,
    events: Vec<TransportEvent>,
    open: BTreeSet<u64>,
    // Kept after disposal so tests can simulate late deliveries.
    callbacks: HashMap<u64, (SharedPageCallback, SharedErrorCallback)>,
    load_more_calls: Vec<(u64, u32)>,
}

/// A [`LiveQueryTransport`] that records every open and dispose and lets tests
/// push pages and failures into any subscription it has opened.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<State>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lifecycle events so far.
    pub fn events(&self) -> Vec<TransportEvent> {
        self.state.lock().expect("lock poisoned").events.clone()
    }

    /// Number of subscriptions currently open.
    pub fn open_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").open.len()
    }

    /// Number of subscriptions ever opened.
    pub fn opened_total(&self) -> usize {
        self.state.lock().expect("lock poisoned").next_id as usize
    }

    /// Id of the most recently opened subscription that is still open.
    pub fn latest_open(&self) -> Option<u64> {
        self.state
            .lock()
            .expect("lock poisoned")
            .open
            .iter()
            .next_back()
            .copied()
    }

    /// Every `load_more` call made through a pushed capability, as
    /// `(subscription id, count)`.
    pub fn load_more_calls(&self) -> Vec<(u64, u32)> {
        self.state.lock().expect("lock poisoned").load_more_calls.clone()
    }

    /// Deliver a page to subscription `id`, open or not.
    ///
    /// The page's load-more capability records its calls and succeeds only
    /// when `status` is [`PaginationStatus::CanLoadMore`]. Returns false if
    /// `id` was never opened.
    pub fn push(&self, id: u64, items: Vec<Value>, status: PaginationStatus) -> bool {
        let Some((on_result, _)) = self.callbacks(id) else {
            return false;
        };

        let state = Arc::downgrade(&self.state);
        let load_more: LoadMore = Arc::new(move |num_items| {
            if let Some(state) = state.upgrade() {
                state
                    .lock()
                    .expect("lock poisoned")
                    .load_more_calls
                    .push((id, num_items));
            }
            status == PaginationStatus::CanLoadMore
        });

        on_result(ResultPage {
            items,
            status,
            load_more,
        });
        true
    }

    /// Report a transport failure on subscription `id`.
    pub fn fail(&self, id: u64, message: &str) -> bool {
        let Some((_, on_error)) = self.callbacks(id) else {
            return false;
        };
        on_error(SubscriptionError::Transport(message.to_string()));
        true
    }

    fn callbacks(&self, id: u64) -> Option<(SharedPageCallback, SharedErrorCallback)> {
        self.state
            .lock()
            .expect("lock poisoned")
            .callbacks
            .get(&id)
            .cloned()
    }
}

impl LiveQueryTransport for RecordingTransport {
    fn open(
        &self,
        query: &QueryRef,
        args: &Value,
        options: PaginationOptions,
        on_result: PageCallback,
        on_error: ErrorCallback,
    ) -> Unsubscribe {
        let id = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.next_id += 1;
            let id = state.next_id;
            state.events.push(TransportEvent::Opened {
                id,
                query: query.to_string(),
                args: args.clone(),
                num_items: options.num_items,
            });
            state.open.insert(id);
            state
                .callbacks
                .insert(id, (Arc::from(on_result), Arc::from(on_error)));
            id
        };

        let state = Arc::downgrade(&self.state);
        Box::new(move || {
            if let Some(state) = state.upgrade() {
                let mut state = state.lock().expect("lock poisoned");
                state.open.remove(&id);
                state.events.push(TransportEvent::Disposed { id });
            }
        })
    }
}
