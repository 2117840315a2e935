use std::collections::BTreeMap;
use std::sync::Arc;

use paginated_live_query::{
    ExecutionContext, PaginatedQuery, PaginationStatus, QueryArgs, QueryRef,
};
use serde::Serialize;
use serde_json::Value;
use session_reconciler::{
    no_store_headers, prefetch_session, AuthHttpClient, AuthSessionData, AuthSessionStore,
    ProviderKind, RecordingBackend, SessionEndpoints,
};
use tether_config_and_utils::Config;
use tether_storage::MemoryStore;
use tracing::info;

#[derive(Serialize)]
struct PrefetchReport {
    snapshot: AuthSessionData,
    /// Whether the backend would receive a static token for this render.
    static_token: bool,
    headers: BTreeMap<&'static str, &'static str>,
}

/// Run the render-time session prefetch and print what the page would get.
pub async fn prefetch(
    config: &Config,
    credential_header: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = if config.has_site_url() {
        Some(AuthHttpClient::new(
            config.site_url()?,
            Arc::new(MemoryStore::new()),
        ))
    } else {
        None
    };

    let store = AuthSessionStore::new();
    let backend = RecordingBackend::new();
    let snapshot = prefetch_session(
        client.as_ref().map(|c| c as &dyn SessionEndpoints),
        credential_header,
        &store,
        &backend,
    )
    .await;

    let report = PrefetchReport {
        static_token: backend.kinds().contains(&ProviderKind::Static),
        headers: no_store_headers(&snapshot).into_iter().collect(),
        snapshot,
    };
    info!(
        authenticated = report.snapshot.is_authenticated(),
        backend_wired = report.static_token,
        "Prefetch finished"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct QueryReport {
    query: QueryRef,
    /// `None` when the query is skipped.
    args: Option<Value>,
    initial_num_items: u32,
    subscribed: bool,
    status: PaginationStatus,
    is_loading: bool,
    results: Vec<Value>,
}

/// Bind a paginated query the way a render pass does.
///
/// Render passes never reach a transport, so this reports the initial state a
/// page would be rendered with. `num_items` defaults to the configured page size.
fn render_query(
    config: &Config,
    name: &str,
    raw_args: Option<&str>,
    num_items: Option<i64>,
) -> Result<QueryReport, Box<dyn std::error::Error>> {
    let args = match raw_args {
        Some(raw) => QueryArgs::Args(serde_json::from_str(raw)?),
        None => QueryArgs::Skip,
    };
    let num_items = num_items.unwrap_or_else(|| i64::from(config.initial_num_items));

    let query: PaginatedQuery<Value> = PaginatedQuery::new(
        &ExecutionContext::RenderPass,
        QueryRef::new(name),
        args,
        num_items,
    )?;

    Ok(QueryReport {
        query: query.query().clone(),
        args: match query.args() {
            QueryArgs::Args(value) => Some(value),
            QueryArgs::Skip => None,
        },
        initial_num_items: query.initial_num_items(),
        subscribed: query.is_subscribed(),
        status: query.status(),
        is_loading: query.is_loading(),
        results: query.results(),
    })
}

/// Print the render-time state of a paginated query.
pub fn query(
    config: &Config,
    name: &str,
    raw_args: Option<&str>,
    num_items: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = render_query(config, name, raw_args, num_items)?;
    info!(
        query = %report.query,
        num_items = report.initial_num_items,
        skipped = report.args.is_none(),
        "Query bound for render"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the effective configuration.
pub fn show_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
