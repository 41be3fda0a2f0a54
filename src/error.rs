//! Error types for the bridge
//!
//! Only socket binding is fatal. Everything else is handled where it happens
//! (logged, counted, and the offending datagram or subscriber dropped); the
//! variants below exist so those paths can propagate with `?` up to the point
//! where the decision is made.

use std::net::SocketAddr;

use thiserror::Error;

pub use crate::codec::FrameError;
pub use crate::registry::SendError;

/// Result type alias for bridge operations
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A listening or ingest socket could not be bound
    #[error("failed to bind {what} socket on {addr}")]
    Bind {
        what: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    /// Bind failure for the named socket
    pub fn bind(what: &'static str, addr: SocketAddr, source: std::io::Error) -> Self {
        BridgeError::Bind { what, addr, source }
    }

    /// Whether the error should stop startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Bind { .. } | BridgeError::Config(_))
    }
}
