//! WebSocket subscriber endpoint
//!
//! Accepts subscriber connections, greets each one with a welcome envelope and
//! registers it with the shared [`ClientRegistry`](crate::registry::ClientRegistry).

pub mod config;
mod connection;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_LISTEN_PORT, DEFAULT_WELCOME_MESSAGE};
pub use listener::SubscriberServer;
