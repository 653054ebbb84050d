//! Errors raised inside the dispatch loop.
//!
//! These never reach producers; the loop logs them and keeps going.

/// Result type for engine-internal operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Event queue closed")]
    QueueClosed,

    #[error("Dispatch failed for '{event_type}': {message}")]
    Dispatch { event_type: String, message: String },
}
