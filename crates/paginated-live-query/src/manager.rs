//! Paginated query subscription manager.
//!
//! A [`PaginatedQuery`] owns at most one live subscription for its binding.
//! Changing the arguments disposes the current subscription, resets the
//! observable state and opens a replacement, in that order. Each subscription
//! cycle carries a generation number; pages or errors delivered by a cycle
//! that has since been replaced are dropped.

use crate::context::ExecutionContext;
use crate::error::{QueryError, QueryResult, SubscriptionError};
use crate::transport::{LiveQueryTransport, SubscriptionHandle};
use crate::types::{LoadMore, PaginationOptions, PaginationStatus, QueryArgs, QueryRef, ResultPage};
use live_cell::{CellReader, LiveCell};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Observable state shared with transport callbacks.
struct Shared<T> {
    results: LiveCell<Vec<T>>,
    status: LiveCell<PaginationStatus>,
    error: LiveCell<Option<SubscriptionError>>,
    cycle: Mutex<Cycle>,
}

/// Bookkeeping for the current subscription cycle.
#[derive(Default)]
struct Cycle {
    generation: u64,
    load_more: Option<LoadMore>,
}

impl<T: Clone> Shared<T> {
    fn new() -> Self {
        Self {
            results: LiveCell::new(Vec::new()),
            status: LiveCell::new(PaginationStatus::LoadingFirstPage),
            error: LiveCell::new(None),
            cycle: Mutex::new(Cycle::default()),
        }
    }

    /// Start a new cycle: invalidate the previous generation and restore the
    /// initial state. Returns the new generation.
    fn reset(&self) -> u64 {
        let mut cycle = self.cycle.lock().expect("lock poisoned");
        cycle.generation += 1;
        cycle.load_more = None;
        self.results.set(Vec::new());
        self.status.set_if_changed(PaginationStatus::LoadingFirstPage);
        self.error.set_if_changed(None);
        cycle.generation
    }

    fn apply_page(&self, generation: u64, items: Vec<T>, status: PaginationStatus, load_more: LoadMore) -> bool {
        let mut cycle = self.cycle.lock().expect("lock poisoned");
        if cycle.generation != generation {
            return false;
        }
        self.results.set(items);
        self.status.set_if_changed(status);
        cycle.load_more = Some(load_more);
        self.error.set_if_changed(None);
        true
    }

    fn apply_error(&self, generation: u64, error: SubscriptionError) -> bool {
        let cycle = self.cycle.lock().expect("lock poisoned");
        if cycle.generation != generation {
            return false;
        }
        self.error.set(Some(error));
        true
    }
}

struct Binding {
    args: QueryArgs,
    handle: Option<SubscriptionHandle>,
}

/// A paginated live query bound to one (query, arguments) pair at a time.
///
/// Dropping the query disposes its subscription.
pub struct PaginatedQuery<T> {
    query: QueryRef,
    transport: Option<Arc<dyn LiveQueryTransport>>,
    initial_num_items: u32,
    shared: Arc<Shared<T>>,
    binding: Mutex<Binding>,
}

impl<T> PaginatedQuery<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create the query and, when `args` is not [`QueryArgs::Skip`] and the
    /// context is interactive, open its first subscription.
    ///
    /// Fails with [`QueryError::Configuration`] before touching the transport
    /// if `initial_num_items` is negative or too large.
    pub fn new(
        context: &ExecutionContext,
        query: QueryRef,
        args: impl Into<QueryArgs>,
        initial_num_items: i64,
    ) -> QueryResult<Self> {
        let initial_num_items = validate_initial_num_items(initial_num_items)?;

        let this = Self {
            query,
            transport: context.transport().cloned(),
            initial_num_items,
            shared: Arc::new(Shared::new()),
            binding: Mutex::new(Binding {
                args: QueryArgs::Skip,
                handle: None,
            }),
        };

        if this.transport.is_none() {
            debug!(query = %this.query, "Render pass, query stays inert");
        }

        this.set_args(args);
        Ok(this)
    }

    /// Replace the arguments.
    ///
    /// Structurally equal arguments are a no-op. Otherwise the current
    /// subscription is disposed, state is reset, and a new subscription opens
    /// unless the new arguments are [`QueryArgs::Skip`].
    pub fn set_args(&self, args: impl Into<QueryArgs>) {
        let args = args.into();
        let mut binding = self.binding.lock().expect("lock poisoned");
        if binding.args == args {
            return;
        }
        binding.args = args;
        self.resubscribe(&mut binding);
    }

    fn resubscribe(&self, binding: &mut Binding) {
        if let Some(mut handle) = binding.handle.take() {
            handle.dispose();
            debug!(
                query = %self.query,
                generation = handle.generation(),
                "Disposed live subscription"
            );
        }

        let generation = self.shared.reset();

        let QueryArgs::Args(args) = &binding.args else {
            return;
        };
        let Some(transport) = &self.transport else {
            return;
        };

        debug!(
            query = %self.query,
            generation,
            num_items = self.initial_num_items,
            "Opening live subscription"
        );

        let unsubscribe = transport.open(
            &self.query,
            args,
            PaginationOptions::first_page(self.initial_num_items),
            self.page_callback(generation),
            self.error_callback(generation),
        );
        binding.handle = Some(SubscriptionHandle::new(unsubscribe, generation));
    }

    fn page_callback(&self, generation: u64) -> Box<dyn Fn(ResultPage<Value>) + Send + Sync> {
        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        let query = self.query.clone();
        Box::new(move |page: ResultPage<Value>| {
            let Some(shared) = shared.upgrade() else {
                return;
            };

            let item_count = page.items.len();
            let items = match decode_items::<T>(page.items) {
                Ok(items) => items,
                Err(e) => {
                    warn!(query = %query, generation, error = %e, "Failed to decode page");
                    shared.apply_error(generation, SubscriptionError::Decode(e.to_string()));
                    return;
                }
            };

            if shared.apply_page(generation, items, page.status, page.load_more) {
                debug!(
                    query = %query,
                    generation,
                    item_count,
                    status = ?page.status,
                    "Applied page"
                );
            } else {
                debug!(query = %query, generation, "Ignoring page from superseded subscription");
            }
        })
    }

    fn error_callback(&self, generation: u64) -> Box<dyn Fn(SubscriptionError) + Send + Sync> {
        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        let query = self.query.clone();
        Box::new(move |error: SubscriptionError| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if shared.apply_error(generation, error.clone()) {
                warn!(query = %query, generation, error = %error, "Live subscription reported an error");
            }
        })
    }

    /// Follow an argument cell: apply its current value now and every later
    /// write as an argument change.
    ///
    /// The driver stops when the cell is dropped or the query is dropped.
    /// Must be called from within a tokio runtime.
    pub fn follow_args(self: &Arc<Self>, mut args: CellReader<QueryArgs>) -> JoinHandle<()> {
        self.set_args(args.current());

        let query = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(next) = args.changed().await {
                let Some(query) = query.upgrade() else {
                    break;
                };
                query.set_args(next);
            }
        })
    }
}

impl<T: Clone> PaginatedQuery<T> {
    pub fn query(&self) -> &QueryRef {
        &self.query
    }

    /// Current arguments.
    pub fn args(&self) -> QueryArgs {
        self.binding.lock().expect("lock poisoned").args.clone()
    }

    pub fn initial_num_items(&self) -> u32 {
        self.initial_num_items
    }

    /// True if a transport subscription is currently open.
    pub fn is_subscribed(&self) -> bool {
        self.binding.lock().expect("lock poisoned").handle.is_some()
    }

    /// Latest results snapshot.
    pub fn results(&self) -> Vec<T> {
        self.shared.results.get()
    }

    pub fn results_reader(&self) -> CellReader<Vec<T>> {
        self.shared.results.reader()
    }

    pub fn status(&self) -> PaginationStatus {
        self.shared.status.get()
    }

    pub fn status_reader(&self) -> CellReader<PaginationStatus> {
        self.shared.status.reader()
    }

    /// True while the first page or a further page is in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.status.with(PaginationStatus::is_loading)
    }

    /// Latest failure reported for the current subscription.
    pub fn error(&self) -> Option<SubscriptionError> {
        self.shared.error.get()
    }

    pub fn error_reader(&self) -> CellReader<Option<SubscriptionError>> {
        self.shared.error.reader()
    }

    /// Request `num_items` more items through the latest page's capability.
    ///
    /// Returns false, without side effects, when no page has been received for
    /// the current subscription.
    pub fn load_more(&self, num_items: u32) -> bool {
        let capability = self
            .shared
            .cycle
            .lock()
            .expect("lock poisoned")
            .load_more
            .clone();
        match capability {
            Some(load_more) => load_more(num_items),
            None => false,
        }
    }
}

impl<T> Drop for PaginatedQuery<T> {
    fn drop(&mut self) {
        let binding = self
            .binding
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mut handle) = binding.handle.take() {
            handle.dispose();
            debug!(
                query = %self.query,
                generation = handle.generation(),
                "Disposed live subscription on drop"
            );
        }
    }
}

fn validate_initial_num_items(value: i64) -> QueryResult<u32> {
    if value < 0 {
        return Err(QueryError::Configuration(format!(
            "initial_num_items must be a non-negative number, got {}",
            value
        )));
    }
    u32::try_from(value).map_err(|_| {
        QueryError::Configuration(format!(
            "initial_num_items {} exceeds the maximum page size",
            value
        ))
    })
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, serde_json::Error> {
    items.into_iter().map(serde_json::from_value).collect()
}
