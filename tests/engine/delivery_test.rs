//! Delivery tests: ordering, fan-out and type routing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eventide::test_utils::{wait_until, RecordingHandler};
use eventide::{handler_fn, Event, EventEngine, Handler};
use serde_json::json;

use crate::common::{wait_for_count, RunningEngine, WAIT};

#[tokio::test]
async fn test_events_dispatched_in_push_order() {
    let engine = Arc::new(EventEngine::new());
    let recorder = RecordingHandler::new("rec");
    for event_type in ["e1", "e2", "e3", "e4", "e5"] {
        engine.register(event_type, recorder.clone()).await;
    }

    for event_type in ["e1", "e2", "e3", "e4", "e5"] {
        engine.push(Event::new(event_type));
    }
    let running = RunningEngine::start(engine).await;

    assert!(wait_for_count(&recorder, 5).await);
    assert_eq!(recorder.types().await, vec!["e1", "e2", "e3", "e4", "e5"]);

    running.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_handler_invoked_once_per_event() {
    let engine = Arc::new(EventEngine::new());
    let handlers: Vec<_> = ["h1", "h2", "h3"]
        .into_iter()
        .map(RecordingHandler::new)
        .collect();
    for handler in &handlers {
        engine.register("T", handler.clone()).await;
    }
    let running = RunningEngine::start(engine).await;

    running.engine.push(Event::new("T"));

    for handler in &handlers {
        assert!(wait_for_count(handler, 1).await, "{} not invoked", handler.name());
    }
    // nothing extra trickles in
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    for handler in &handlers {
        assert_eq!(handler.count().await, 1);
    }

    running.shutdown().await;
}

#[tokio::test]
async fn test_handler_only_sees_its_type() {
    let engine = Arc::new(EventEngine::new());
    let on_t = RecordingHandler::new("on_t");
    let on_u = RecordingHandler::new("on_u");
    engine.register("T", on_t.clone()).await;
    engine.register("U", on_u.clone()).await;
    let running = RunningEngine::start(engine).await;

    running.engine.push(Event::new("U"));
    running.engine.push(Event::new("U"));

    assert!(wait_for_count(&on_u, 2).await);
    assert_eq!(on_t.count().await, 0);

    running.shutdown().await;
}

#[tokio::test]
async fn test_tick_and_order_scenario() {
    let engine = Arc::new(EventEngine::new());
    let record_a = RecordingHandler::new("recordA");
    let record_b = RecordingHandler::new("recordB");
    let record_c = RecordingHandler::new("recordC");
    engine.register("tick", record_a.clone()).await;
    engine.register("tick", record_b.clone()).await;
    engine.register("order", record_c.clone()).await;
    let running = RunningEngine::start(engine).await;

    running.engine.push(Event::from_json("tick", json!({"price": 100})));
    running.engine.push(Event::from_json("order", json!({"qty": 1})));

    assert!(wait_for_count(&record_a, 1).await);
    assert!(wait_for_count(&record_b, 1).await);
    assert!(wait_for_count(&record_c, 1).await);

    for recorder in [&record_a, &record_b] {
        let events = recorder.events().await;
        assert_eq!(events[0].event_type().as_str(), "tick");
        assert_eq!(events[0].get("price"), Some(&json!(100)));
    }
    let orders = record_c.events().await;
    assert_eq!(orders[0].event_type().as_str(), "order");
    assert_eq!(orders[0].get("qty"), Some(&json!(1)));

    // handlers of one event share the same instance
    assert!(Arc::ptr_eq(
        &record_a.events().await[0],
        &record_b.events().await[0]
    ));

    running.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_registration_runs_twice() {
    let engine = Arc::new(EventEngine::new());
    let recorder = RecordingHandler::new("rec");
    engine.register("T", recorder.clone()).await;
    engine.register("T", recorder.clone()).await;
    let running = RunningEngine::start(engine).await;

    running.engine.push(Event::new("T"));

    assert!(wait_for_count(&recorder, 2).await);
    running.shutdown().await;
}

#[tokio::test]
async fn test_handler_can_push_follow_up_events() {
    let engine = Arc::new(EventEngine::new());
    let fills = RecordingHandler::new("fills");

    let weak = Arc::downgrade(&engine);
    engine
        .register(
            "ORDER_STATUS",
            handler_fn("order_status", move |event| {
                let weak = weak.clone();
                async move {
                    if event.get("status") == Some(&json!("FILLED")) {
                        if let Some(engine) = weak.upgrade() {
                            engine.push(Event::with_data("FILL", event.data().clone()));
                        }
                    }
                    Ok(())
                }
            }),
        )
        .await;
    engine.register("FILL", fills.clone()).await;
    let running = RunningEngine::start(engine).await;

    running
        .engine
        .push(Event::from_json("ORDER_STATUS", json!({"status": "NEW", "id": 1})));
    running
        .engine
        .push(Event::from_json("ORDER_STATUS", json!({"status": "FILLED", "id": 1})));

    assert!(wait_for_count(&fills, 1).await);
    assert_eq!(fills.events().await[0].get("id"), Some(&json!(1)));

    running.shutdown().await;
}

#[tokio::test]
async fn test_independent_engines_do_not_share_state() {
    let first = Arc::new(EventEngine::new());
    let second = Arc::new(EventEngine::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    first
        .register(
            "T",
            handler_fn("count", move |_event| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
        .await;

    let first = RunningEngine::start(first).await;
    let second = RunningEngine::start(second).await;

    second.engine.push(Event::new("T"));
    first.engine.push(Event::new("T"));

    let probe = &calls;
    assert!(wait_until(WAIT, || async move { probe.load(Ordering::SeqCst) == 1 }).await);
    let second_ref = &second.engine;
    assert!(wait_until(WAIT, || async move { second_ref.stats().discarded == 1 }).await);
    assert_eq!(first.engine.stats().discarded, 0);

    first.shutdown().await;
    second.shutdown().await;
}
