//! Handler registry.
//!
//! Maps event types to the ordered list of handlers registered for them.
//! Lists are stored as immutable `Arc<[..]>` snapshots and replaced wholesale
//! on every registration, so a lookup never sees a list mid-mutation and the
//! dispatch loop never holds the lock while handlers run.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::event::EventType;
use crate::handler::Handler;

/// Ordered handlers for one event type.
pub type HandlerList = Arc<[Arc<dyn Handler>]>;

/// Event type -> ordered handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<EventType, HandlerList>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `event_type`.
    ///
    /// Duplicates are kept; a handler registered twice runs twice.
    pub async fn register(&self, event_type: impl Into<EventType>, handler: Arc<dyn Handler>) {
        let event_type = event_type.into();
        let count = {
            let mut guard = self.handlers.write().await;
            let current: &[Arc<dyn Handler>] =
                guard.get(&event_type).map(|list| &list[..]).unwrap_or_default();
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&handler));
            let count = next.len();
            guard.insert(event_type.clone(), next.into());
            count
        };

        debug!(
            handler = %handler.name(),
            event_type = %event_type,
            handler_count = count,
            "Handler registered"
        );
    }

    /// Remove every handler named `name` from the list for `event_type`.
    ///
    /// Returns how many were removed.
    pub async fn unregister(&self, event_type: &str, name: &str) -> usize {
        let mut guard = self.handlers.write().await;
        let Some(current) = guard.get(event_type) else {
            return 0;
        };

        let remaining: Vec<_> = current
            .iter()
            .filter(|handler| handler.name() != name)
            .cloned()
            .collect();
        let removed = current.len() - remaining.len();

        if removed > 0 {
            if remaining.is_empty() {
                guard.remove(event_type);
            } else {
                let key = EventType::new(event_type);
                guard.insert(key, remaining.into());
            }
            info!(
                handler = %name,
                event_type = %event_type,
                removed,
                "Handler unregistered"
            );
        }

        removed
    }

    /// Snapshot of the handlers for `event_type`, empty if none.
    pub async fn lookup(&self, event_type: &str) -> HandlerList {
        self.handlers
            .read()
            .await
            .get(event_type)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub async fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(event_type)
            .map_or(0, |list| list.len())
    }

    /// Event types with at least one handler.
    pub async fn event_types(&self) -> Vec<EventType> {
        let mut types: Vec<_> = self.handlers.read().await.keys().cloned().collect();
        types.sort();
        types
    }
}
