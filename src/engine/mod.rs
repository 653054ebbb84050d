//! Event engine.
//!
//! Owns the event queue, the handler registry and the dispatch loop. The
//! loop takes one event at a time off the queue and spawns every handler
//! registered for its type as an independent task, then goes straight back
//! to the queue without waiting for them.
//!
//! ```text
//! push ──> [queue] ──> dispatch loop ──┬──> spawn(handler A, event)
//!                                      ├──> spawn(handler B, event)
//!                                      └──> ...
//! ```
//!
//! Handler errors and panics are logged and counted; they never reach the
//! loop, sibling handlers or the producer.

mod in_flight;
mod stats;

pub use in_flight::{InFlight, InFlightGuard};
pub use stats::{EngineStats, StatsSnapshot};

use std::any::Any;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::event::{Event, EventType};
use crate::handler::Handler;
use crate::queue::EventQueue;
use crate::registry::{HandlerList, HandlerRegistry};

/// In-process publish/subscribe engine.
///
/// Share it behind an `Arc` so producers and handlers can `push` while the
/// loop runs in its own task:
///
/// ```ignore
/// let engine = Arc::new(EventEngine::new());
/// engine.register("TICK", on_tick).await;
/// let loop_task = engine.spawn();
/// engine.push(Event::new("TICK"));
/// engine.stop();
/// loop_task.await?;
/// ```
pub struct EventEngine {
    queue: EventQueue,
    registry: HandlerRegistry,
    /// Watched by the loop so `stop` interrupts a pending dequeue.
    state: watch::Sender<RunState>,
    stats: Arc<EngineStats>,
    in_flight: Arc<InFlight>,
    config: EngineConfig,
}

impl EventEngine {
    /// Create a stopped engine with an empty queue and registry.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            queue: EventQueue::new(),
            registry: HandlerRegistry::new(),
            state,
            stats: Arc::new(EngineStats::default()),
            in_flight: Arc::new(InFlight::new()),
            config,
        }
    }

    /// Register `handler` for `event_type`.
    ///
    /// Safe while the loop is running; takes effect from the next dequeued event.
    pub async fn register(&self, event_type: impl Into<EventType>, handler: Arc<dyn Handler>) {
        self.registry.register(event_type, handler).await;
    }

    /// Remove every handler named `name` for `event_type`. Returns how many were removed.
    pub async fn unregister(&self, event_type: &str, name: &str) -> usize {
        self.registry.unregister(event_type, name).await
    }

    /// Snapshot of the handlers currently registered for `event_type`.
    pub async fn handlers(&self, event_type: &str) -> HandlerList {
        self.registry.lookup(event_type).await
    }

    /// Enqueue `event` for dispatch. Never blocks and never fails for the caller.
    pub fn push(&self, event: Event) {
        match self.queue.enqueue(event) {
            Ok(()) => EngineStats::incr(&self.stats.pushed),
            Err(e) => {
                EngineStats::incr(&self.stats.loop_errors);
                error!(error = %e, "Failed to enqueue event");
            }
        }
    }

    /// Run the dispatch loop until [`stop`](Self::stop) is called.
    ///
    /// Returns immediately if the engine is already running. Dropping the
    /// returned future ends the run as if `stop` had been called.
    pub async fn start(&self) {
        let mut generation = 0;
        let started = self.state.send_if_modified(|state| {
            if state.running {
                false
            } else {
                state.running = true;
                state.generation += 1;
                generation = state.generation;
                true
            }
        });
        if !started {
            debug!("Event engine already running");
            return;
        }

        let _run = RunGuard {
            state: &self.state,
            generation,
        };
        let mut state_rx = self.state.subscribe();

        // A loop from a previous run may still be finishing its last iteration.
        let mut consumer = tokio::select! {
            consumer = self.queue.consumer() => consumer,
            _ = state_rx.wait_for(|state| !state.is_current(generation)) => return,
        };

        info!(pending = self.queue.len(), generation, "Event engine loop started");

        loop {
            let next = tokio::select! {
                biased;
                _ = state_rx.wait_for(|state| !state.is_current(generation)) => break,
                next = consumer.dequeue() => next,
            };

            if self.process(next, generation).await.is_break() {
                break;
            }
        }

        info!(
            pending = self.queue.len(),
            in_flight = self.in_flight.count(),
            generation,
            "Event engine loop stopped"
        );
    }

    /// Run [`start`](Self::start) on a new task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.start().await })
    }

    /// Ask the loop to exit after its current iteration.
    ///
    /// Queued events stay queued and in-flight handlers keep running.
    pub fn stop(&self) {
        let was_running = self
            .state
            .send_if_modified(|state| std::mem::replace(&mut state.running, false));
        if was_running {
            info!("Event engine stopping");
        }
    }

    /// Stop, then wait for the loop to exit and every in-flight handler to finish.
    ///
    /// Bounded by [`EngineConfig::shutdown_timeout`]. Returns `false` if the
    /// timeout expired first; the remaining handlers are left running.
    pub async fn stop_and_wait(&self) -> bool {
        self.stop();

        let timeout = self.config.shutdown_timeout();
        let drained = tokio::time::timeout(timeout, async {
            // the loop holds the consumer for as long as it runs
            drop(self.queue.consumer().await);
            self.in_flight.wait_idle().await;
        })
        .await;

        match drained {
            Ok(()) => {
                info!("Event engine stopped, all handlers finished");
                true
            }
            Err(_) => {
                warn!(
                    in_flight = self.in_flight.count(),
                    timeout_ms = self.config.shutdown_timeout_ms,
                    "Timed out waiting for handlers to finish"
                );
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Events pushed but not yet dequeued.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Handler tasks launched and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One loop iteration: dispatch `next`, or log the loop failure it carries.
    ///
    /// Breaks only when the queue can no longer deliver events.
    async fn process(&self, next: Result<Event>, generation: u64) -> ControlFlow<()> {
        let result = match next {
            Ok(event) => self.dispatch(event).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => ControlFlow::Continue(()),
            Err(EngineError::QueueClosed) => {
                EngineStats::incr(&self.stats.loop_errors);
                error!("Event queue closed, event engine loop cannot continue");
                end_run(&self.state, generation);
                ControlFlow::Break(())
            }
            Err(e) => {
                EngineStats::incr(&self.stats.loop_errors);
                error!(error = %e, "Error in event loop");
                ControlFlow::Continue(())
            }
        }
    }

    async fn dispatch(&self, event: Event) -> Result<()> {
        EngineStats::incr(&self.stats.dispatched);

        let runtime = Handle::try_current().map_err(|e| EngineError::Dispatch {
            event_type: event.event_type().to_string(),
            message: e.to_string(),
        })?;

        let handlers = self.registry.lookup(event.event_type().as_str()).await;
        if handlers.is_empty() {
            EngineStats::incr(&self.stats.discarded);
            debug!(
                event_type = %event.event_type(),
                event_id = %event.id(),
                "No handlers registered, discarding event"
            );
            return Ok(());
        }

        let queued_us = (chrono::Utc::now() - event.created_at())
            .num_microseconds()
            .unwrap_or(i64::MAX);
        debug!(
            event = %event,
            event_id = %event.id(),
            handler_count = handlers.len(),
            queued_us,
            "Processing event"
        );

        let event = Arc::new(event);
        for handler in handlers.iter() {
            let guard = self.in_flight.enter();
            EngineStats::incr(&self.stats.handlers_launched);
            runtime.spawn(run_handler(
                Arc::clone(handler),
                Arc::clone(&event),
                Arc::clone(&self.stats),
                guard,
            ));
        }

        Ok(())
    }
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state published to the loop.
#[derive(Debug, Clone, Copy, Default)]
struct RunState {
    running: bool,
    /// Bumped by every successful `start`.
    generation: u64,
}

impl RunState {
    fn is_current(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }
}

/// Mark run `generation` as Stopped, unless a later run has taken over.
fn end_run(state: &watch::Sender<RunState>, generation: u64) -> bool {
    state.send_if_modified(|state| {
        if state.is_current(generation) {
            state.running = false;
            true
        } else {
            false
        }
    })
}

/// Ends its run when the loop future finishes or is dropped.
struct RunGuard<'a> {
    state: &'a watch::Sender<RunState>,
    generation: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if end_run(self.state, self.generation) {
            info!(generation = self.generation, "Event engine loop abandoned");
        }
    }
}

/// Body of one handler task. Errors and panics stop here.
async fn run_handler(
    handler: Arc<dyn Handler>,
    event: Arc<Event>,
    stats: Arc<EngineStats>,
    _guard: InFlightGuard,
) {
    let outcome = AssertUnwindSafe(async { handler.handle(Arc::clone(&event)).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => EngineStats::incr(&stats.handlers_succeeded),
        Ok(Err(e)) => {
            EngineStats::incr(&stats.handlers_failed);
            error!(
                handler = %handler.name(),
                event_type = %event.event_type(),
                event_id = %event.id(),
                error = %e,
                "Handler failed"
            );
        }
        Err(panic) => {
            EngineStats::incr(&stats.handlers_panicked);
            error!(
                handler = %handler.name(),
                event_type = %event.event_type(),
                event_id = %event.id(),
                panic = %panic_message(&*panic),
                "Handler panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
