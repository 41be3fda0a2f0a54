//! Registry error types
//!
//! Error types for per-subscriber delivery.

use thiserror::Error;

/// Error returned when a frame cannot be queued for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// Subscriber queue is full (subscriber not keeping up)
    #[error("subscriber queue full")]
    Full,
    /// Subscriber writer has gone away
    #[error("subscriber connection closed")]
    Closed,
}
