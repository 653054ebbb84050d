//! Handler capability.
//!
//! A handler is a named unit of work invoked once per matching event. It
//! signals success or failure to the engine only for diagnostics; nothing is
//! returned to the producer.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::Event;

/// Errors a handler may report back to the engine.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result type for handler invocations.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Consumer of events of one or more types.
///
/// Each invocation runs in its own task, so `handle` may suspend freely
/// without holding up the dispatch loop or sibling handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Process one event.
    async fn handle(&self, event: Arc<Event>) -> Result<()>;
}

/// Handler built from a name and an async closure.
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<Event>) -> Result<()> {
        (self.func)(event).await
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```ignore
/// let on_tick = handler_fn("log_tick", |event| async move {
///     tracing::info!(%event, "tick");
///     Ok(())
/// });
/// engine.register("TICK", on_tick).await;
/// ```
pub fn handler_fn<F, Fut>(name: impl Into<String>, func: F) -> Arc<dyn Handler>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHandler::new(name, func))
}
