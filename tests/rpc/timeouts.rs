use std::sync::Arc;
use std::time::Duration;

use emitter_rpc::bus::InMemoryBus;
use emitter_rpc::{RequestError, Requester, Responder, DEFAULT_TIMEOUT_MS};
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::support::{init_tracing, Greeting};

#[tokio::test(start_paused = true)]
async fn unanswered_request_times_out_after_default_window() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let requester = Requester::new(bus.clone());
    let started = Instant::now();

    let result = requester
        .request::<_, Value>("GET_STATE", &json!({ "prop": "x" }))
        .await;

    assert!(started.elapsed() >= Duration::from_millis(DEFAULT_TIMEOUT_MS));
    match result {
        Err(RequestError::Timeout { topic, after }) => {
            assert_eq!(topic, "GET_STATE");
            assert_eq!(after, Duration::from_millis(2000));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(requester.pending_count(), 0);
    assert_eq!(bus.total_listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_handler_loses_to_the_timeout() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let _slow = responder
        .add_responder("SLOW", |request: Greeting| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(request)
        })
        .unwrap();
    let requester = Requester::with_timeout(bus.clone(), Duration::from_millis(100));

    let result = requester
        .request::<_, Greeting>("SLOW", &Greeting { greeting: "hey".into() })
        .await;
    assert!(result.unwrap_err().is_timeout());

    // The late reply finds no pending call and is dropped.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(requester.pending_count(), 0);
    assert_eq!(bus.find_all_by_prefix("SLOW_response_").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_responder_leaves_callers_to_time_out() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let registration = responder
        .add_sync_responder("GREETING", |request: Greeting| Ok::<_, String>(request))
        .unwrap();
    registration.cancel();
    let requester = Requester::new(bus.clone());

    let result = requester
        .request::<_, Greeting>("GREETING", &Greeting { greeting: "hey".into() })
        .await;

    assert!(result.unwrap_err().is_timeout());
}
