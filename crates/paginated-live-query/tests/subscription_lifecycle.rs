use live_cell::LiveCell;
use paginated_live_query::recording::{RecordingTransport, TransportEvent};
use paginated_live_query::{
    ExecutionContext, PaginatedQuery, PaginationStatus, QueryArgs, QueryError, QueryRef,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (ExecutionContext, RecordingTransport) {
    let transport = RecordingTransport::new();
    (ExecutionContext::interactive(transport.clone()), transport)
}

fn tasks() -> QueryRef {
    QueryRef::new("tasks:list")
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

#[test]
fn one_subscription_at_a_time_and_dispose_precedes_open() {
    let (context, transport) = setup();
    let query: PaginatedQuery<Value> =
        PaginatedQuery::new(&context, tasks(), json!({ "project": "a" }), 10).unwrap();

    for project in ["b", "c", "d"] {
        query.set_args(json!({ "project": project }));
        assert_eq!(transport.open_count(), 1);
    }

    let events = transport.events();
    assert_eq!(events.len(), 7);

    let mut open: Option<u64> = None;
    for event in events {
        match event {
            TransportEvent::Opened { id, .. } => {
                assert!(open.is_none(), "subscription {} opened before previous disposed", id);
                open = Some(id);
            }
            TransportEvent::Disposed { id } => {
                assert_eq!(open, Some(id));
                open = None;
            }
        }
    }
    assert!(open.is_some());
}

#[test]
fn structurally_equal_args_do_not_resubscribe() {
    let (context, transport) = setup();
    let query: PaginatedQuery<Value> = PaginatedQuery::new(
        &context,
        tasks(),
        json!({ "project": "a", "filter": { "done": false } }),
        10,
    )
    .unwrap();

    query.set_args(json!({ "filter": { "done": false }, "project": "a" }));
    query.set_args(json!({ "project": "a", "filter": { "done": false } }));

    assert_eq!(transport.opened_total(), 1);
    assert_eq!(transport.open_count(), 1);
}

#[test]
fn opens_with_initial_num_items() {
    let (context, transport) = setup();
    let _query: PaginatedQuery<Value> =
        PaginatedQuery::new(&context, tasks(), json!({ "project": "a" }), 25).unwrap();

    assert_eq!(
        transport.events(),
        vec![TransportEvent::Opened {
            id: 1,
            query: "tasks:list".into(),
            args: json!({ "project": "a" }),
            num_items: 25,
        }]
    );
}

#[test]
fn is_loading_tracks_status() {
    let (context, transport) = setup();
    let query: PaginatedQuery<Value> =
        PaginatedQuery::new(&context, tasks(), json!({}), 10).unwrap();
    let id = transport.latest_open().unwrap();

    assert_eq!(query.status(), PaginationStatus::LoadingFirstPage);
    assert!(query.is_loading());

    for status in [
        PaginationStatus::CanLoadMore,
        PaginationStatus::LoadingMore,
        PaginationStatus::Exhausted,
        PaginationStatus::LoadingFirstPage,
    ] {
        transport.push(id, vec![json!(1)], status);
        assert_eq!(query.status(), status);
        assert_eq!(
            query.is_loading(),
            matches!(
                status,
                PaginationStatus::LoadingFirstPage | PaginationStatus::LoadingMore
            )
        );
    }
}

#[test]
fn load_more_without_subscription_is_false_and_silent() {
    let (context, transport) = setup();
    let query: PaginatedQuery<Value> =
        PaginatedQuery::new(&context, tasks(), QueryArgs::Skip, 10).unwrap();

    let results = query.results_reader();
    let status = query.status_reader();

    assert!(!query.load_more(5));
    assert!(transport.events().is_empty());
    assert!(transport.load_more_calls().is_empty());
    assert!(!results.has_changed());
    assert!(!status.has_changed());
}

#[test]
fn skip_forces_initial_state_regardless_of_prior_state() {
    let (context, transport) = setup();
    let query: PaginatedQuery<Value> =
        PaginatedQuery::new(&context, tasks(), json!({ "project": "a" }), 10).unwrap();
    let id = transport.latest_open().unwrap();

    transport.push(id, vec![json!(1), json!(2)], PaginationStatus::CanLoadMore);
    transport.fail(id, "flaky");
    assert_eq!(query.results().len(), 2);
    assert!(query.error().is_some());

    query.set_args(QueryArgs::Skip);

    assert_eq!(transport.open_count(), 0);
    assert!(query.results().is_empty());
    assert_eq!(query.status(), PaginationStatus::LoadingFirstPage);
    assert!(query.is_loading());
    assert!(query.error().is_none());
    assert!(!query.load_more(10));
    assert!(transport.load_more_calls().is_empty());
}

#[test]
fn negative_initial_num_items_fails_before_transport() {
    let (context, transport) = setup();
    let result: Result<PaginatedQuery<Value>, QueryError> =
        PaginatedQuery::new(&context, tasks(), json!({ "project": "a" }), -1);

    assert!(matches!(result, Err(QueryError::Configuration(_))));
    assert!(transport.events().is_empty());
}

#[test]
fn drop_disposes_subscription() {
    let (context, transport) = setup();
    let query: PaginatedQuery<Value> =
        PaginatedQuery::new(&context, tasks(), json!({ "project": "a" }), 10).unwrap();
    assert_eq!(transport.open_count(), 1);

    drop(query);

    assert_eq!(transport.open_count(), 0);
    assert_eq!(transport.events().last(), Some(&TransportEvent::Disposed { id: 1 }));
}

#[test]
fn pages_after_drop_are_ignored() {
    let (context, transport) = setup();
    let query: PaginatedQuery<Value> =
        PaginatedQuery::new(&context, tasks(), json!({}), 10).unwrap();
    let id = transport.latest_open().unwrap();
    drop(query);

    // Delivered to a callback whose query no longer exists.
    assert!(transport.push(id, vec![json!(1)], PaginationStatus::Exhausted));
}

#[tokio::test]
async fn follows_argument_cell() {
    let (context, transport) = setup();
    let args = LiveCell::new(QueryArgs::Skip);
    let query: Arc<PaginatedQuery<Value>> =
        Arc::new(PaginatedQuery::new(&context, tasks(), QueryArgs::Skip, 10).unwrap());

    let driver = query.follow_args(args.reader());
    assert_eq!(transport.opened_total(), 0);

    args.set(QueryArgs::from(json!({ "project": "a" })));
    wait_for(|| transport.open_count() == 1).await;

    args.set(QueryArgs::from(json!({ "project": "b" })));
    wait_for(|| transport.opened_total() == 2).await;
    assert_eq!(transport.open_count(), 1);
    assert_eq!(query.args(), QueryArgs::from(json!({ "project": "b" })));

    drop(args);
    tokio::time::timeout(Duration::from_secs(1), driver)
        .await
        .expect("driver stops when the cell is dropped")
        .unwrap();
}

#[tokio::test]
async fn follow_args_applies_current_value_immediately() {
    let (context, transport) = setup();
    let args = LiveCell::new(QueryArgs::from(json!({ "project": "a" })));
    let query: Arc<PaginatedQuery<Value>> =
        Arc::new(PaginatedQuery::new(&context, tasks(), QueryArgs::Skip, 10).unwrap());

    let _driver = query.follow_args(args.reader());

    assert_eq!(transport.open_count(), 1);
    assert!(query.is_subscribed());
}
