//! Failure isolation tests.

use std::sync::Arc;
use std::time::Duration;

use eventide::test_utils::{wait_until, FailingHandler, PanickingHandler, RecordingHandler};
use eventide::{handler_fn, Event, EventEngine, HandlerError};

use crate::common::{wait_for_count, RunningEngine, WAIT};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_handler_does_not_affect_sibling_or_next_event() {
    let engine = Arc::new(EventEngine::new());
    let failing = FailingHandler::new();
    let sibling = RecordingHandler::new("sibling");
    let next = RecordingHandler::new("next");
    engine.register("E", failing.clone()).await;
    engine.register("E", sibling.clone()).await;
    engine.register("after", next.clone()).await;
    let running = RunningEngine::start(engine).await;

    running.engine.push(Event::new("E"));
    running.engine.push(Event::new("after"));

    assert!(wait_for_count(&sibling, 1).await);
    assert!(wait_for_count(&next, 1).await);
    assert_eq!(failing.calls(), 1);
    assert!(running.engine.is_running());

    running.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_handler_is_contained() {
    let engine = Arc::new(EventEngine::new());
    let panicking = PanickingHandler::new();
    let sibling = RecordingHandler::new("sibling");
    engine.register("E", panicking.clone()).await;
    engine.register("E", sibling.clone()).await;
    let running = RunningEngine::start(engine).await;

    for _ in 0..3 {
        running.engine.push(Event::new("E"));
    }

    assert!(wait_for_count(&sibling, 3).await);
    let engine_ref = &running.engine;
    assert!(wait_until(WAIT, || async move { engine_ref.stats().handlers_panicked == 3 }).await);
    assert_eq!(panicking.calls(), 3);
    assert_eq!(running.engine.stats().loop_errors, 0);

    running.shutdown().await;
}

#[tokio::test]
async fn test_failed_handler_is_not_retried() {
    let engine = Arc::new(EventEngine::new());
    let failing = FailingHandler::new();
    engine.register("E", failing.clone()).await;
    let running = RunningEngine::start(engine).await;

    running.engine.push(Event::new("E"));

    let engine_ref = &running.engine;
    assert!(wait_until(WAIT, || async move { engine_ref.stats().handlers_failed == 1 }).await);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(failing.calls(), 1);

    running.shutdown().await;
}

#[tokio::test]
async fn test_closure_panic_before_first_await_is_contained() {
    let engine = Arc::new(EventEngine::new());
    let survivor = RecordingHandler::new("survivor");
    engine
        .register(
            "E",
            handler_fn("eager_panic", |event| {
                // panics while building the future, not while polling it
                assert!(event.data().is_empty(), "payload not allowed");
                async { Ok::<(), HandlerError>(()) }
            }),
        )
        .await;
    engine.register("E", survivor.clone()).await;
    let running = RunningEngine::start(engine).await;

    running
        .engine
        .push(Event::from_json("E", serde_json::json!({"bad": true})));
    running.engine.push(Event::new("E"));

    assert!(wait_for_count(&survivor, 2).await);
    let engine_ref = &running.engine;
    assert!(wait_until(WAIT, || async move { engine_ref.stats().handlers_completed() == 4 }).await);
    let stats = running.engine.stats();
    assert_eq!(stats.handlers_panicked, 1);
    assert_eq!(stats.handlers_succeeded, 3);

    running.shutdown().await;
}
