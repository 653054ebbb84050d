//! Eventide - in-process event engine
//!
//! A typed publish/subscribe primitive: producers `push` events onto a
//! single FIFO queue, and a dispatch loop fans each event out to every
//! handler registered for its type, running handlers concurrently without
//! blocking the loop.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod handler;
pub mod queue;
pub mod registry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod utils;

pub use engine::{EventEngine, StatsSnapshot};
pub use error::EngineError;
pub use event::{Event, EventData, EventType};
pub use handler::{handler_fn, FnHandler, Handler, HandlerError};
pub use registry::HandlerRegistry;
