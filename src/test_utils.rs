//! Test utilities and handler doubles.
//!
//! Handlers here record, fail, panic or stall on purpose so tests can
//! observe dispatch without depending on timing-sensitive side effects.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::event::Event;
use crate::handler::{Handler, HandlerError, Result as HandlerResult};

/// Records every event it receives, in the order its tasks ran.
pub struct RecordingHandler {
    name: String,
    events: RwLock<Vec<Arc<Event>>>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            events: RwLock::new(Vec::new()),
        })
    }

    pub async fn events(&self) -> Vec<Arc<Event>> {
        self.events.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Event types received, in order.
    pub async fn types(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<Event>) -> HandlerResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

/// Always returns an error after counting the call.
#[derive(Default)]
pub struct FailingHandler {
    calls: AtomicUsize,
}

impl FailingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn handle(&self, _event: Arc<Event>) -> HandlerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::failed("intentional failure"))
    }
}

/// Panics on every call after counting it.
#[derive(Default)]
pub struct PanickingHandler {
    calls: AtomicUsize,
}

impl PanickingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for PanickingHandler {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn handle(&self, _event: Arc<Event>) -> HandlerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("intentional panic");
    }
}

/// Sleeps for a fixed delay, then counts the event as finished.
pub struct SlowHandler {
    delay: Duration,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl SlowHandler {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        })
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for SlowHandler {
    fn name(&self) -> &str {
        "slow"
    }

    async fn handle(&self, _event: Arc<Event>) -> HandlerResult<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
///
/// Returns whether the condition was met.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
