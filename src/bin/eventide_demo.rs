//! eventide-demo: engine wiring example
//!
//! Runs an event engine with a simulated tick feed and a small chain of
//! handlers reacting to it.
//!
//! ## Flow
//! ```text
//! tick feed --TICK--> [engine] --> log_tick
//!                              --> threshold_signal --SIGNAL--> [engine]
//! [engine] --SIGNAL--> order_router --ORDER_CREATE--> [engine] --> log_order
//! ```
//!
//! ## Configuration
//! - First argument: optional YAML config path
//! - EVENTIDE_CONFIG / EVENTIDE__* environment variables (see `eventide::config`)
//! - EVENTIDE_LOG: tracing filter (default: info)

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use eventide::config::Config;
use eventide::utils::bootstrap::init_tracing_with;
use eventide::{handler_fn, Event, EventEngine, HandlerError};

const TICK_INTERVAL: Duration = Duration::from_millis(500);
const SIGNAL_THRESHOLD: f64 = 105.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    init_tracing_with(&config.logging);

    info!("Initializing event engine demo");

    let engine = Arc::new(EventEngine::with_config(config.engine.clone()));
    register_handlers(&engine).await;

    let loop_task = engine.spawn();
    let feed_task = spawn_tick_feed(Arc::downgrade(&engine));

    info!("Event engine started, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    feed_task.abort();
    if !engine.stop_and_wait().await {
        warn!(in_flight = engine.in_flight(), "Exiting with handlers still running");
    }
    loop_task.await?;

    let stats = engine.stats();
    info!(
        pushed = stats.pushed,
        dispatched = stats.dispatched,
        handlers_failed = stats.handlers_failed,
        "Demo has been shut down"
    );
    Ok(())
}

async fn register_handlers(engine: &Arc<EventEngine>) {
    engine
        .register(
            "TICK",
            handler_fn("log_tick", |event| async move {
                info!(%event, "Tick received");
                Ok(())
            }),
        )
        .await;

    let weak = Arc::downgrade(engine);
    engine
        .register(
            "TICK",
            handler_fn("threshold_signal", move |event| {
                let weak = weak.clone();
                async move {
                    let price = price_of(&event)?;
                    if price > SIGNAL_THRESHOLD {
                        let signal = Event::from_json(
                            "SIGNAL",
                            json!({
                                "side": "SELL",
                                "quantity": 1,
                                "symbol": "DEMO",
                                "price": price,
                            }),
                        );
                        push(&weak, signal);
                    }
                    Ok(())
                }
            }),
        )
        .await;

    let weak = Arc::downgrade(engine);
    engine
        .register(
            "SIGNAL",
            handler_fn("order_router", move |event| {
                let weak = weak.clone();
                async move {
                    info!(%event, "Signal received, creating order");
                    push(&weak, Event::with_data("ORDER_CREATE", event.data().clone()));
                    Ok(())
                }
            }),
        )
        .await;

    engine
        .register(
            "ORDER_CREATE",
            handler_fn("log_order", |event| async move {
                info!(%event, "Order created");
                Ok(())
            }),
        )
        .await;
}

fn spawn_tick_feed(engine: Weak<EventEngine>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        let mut step: u64 = 0;
        loop {
            interval.tick().await;
            // saw-tooth between 95 and 110
            let price = 95.0 + (step % 16) as f64;
            step += 1;
            let tick = Event::from_json("TICK", json!({"symbol": "DEMO", "price": price}));
            if !push(&engine, tick) {
                break;
            }
        }
    })
}

/// Push through a weak reference; `false` once the engine is gone.
fn push(engine: &Weak<EventEngine>, event: Event) -> bool {
    match engine.upgrade() {
        Some(engine) => {
            engine.push(event);
            true
        }
        None => false,
    }
}

fn price_of(event: &Event) -> Result<f64, HandlerError> {
    event
        .get("price")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerError::failed(format!("{} has no numeric price", event.event_type())))
}
