//! Subscriber endpoint configuration

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// Default WebSocket listen port
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Greeting sent in every welcome envelope
pub const DEFAULT_WELCOME_MESSAGE: &str = "Connected to WebSocket bridge";

/// Subscriber endpoint configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_connections: usize,

    /// Frames buffered per subscriber before it is dropped
    pub queue_capacity: usize,

    /// Longest a single WebSocket write may take
    pub send_timeout: Duration,

    /// Longest the WebSocket upgrade may take
    pub handshake_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Text of the welcome envelope
    pub welcome_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                DEFAULT_LISTEN_PORT,
            )),
            max_connections: 0, // Unlimited
            queue_capacity: 256,
            send_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
            tcp_nodelay: true, // Envelopes are small and latency sensitive
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set per-subscriber queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set per-write timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set upgrade timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the welcome text
    pub fn welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = message.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert!(config.tcp_nodelay);
        assert_eq!(config.welcome_message, "Connected to WebSocket bridge");
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn test_builder_queue_capacity_clamped() {
        let config = ServerConfig::default().queue_capacity(0);

        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .queue_capacity(16)
            .send_timeout(Duration::from_millis(250))
            .handshake_timeout(Duration::from_secs(2))
            .welcome_message("hello");

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.send_timeout, Duration::from_millis(250));
        assert_eq!(config.handshake_timeout, Duration::from_secs(2));
        assert_eq!(config.welcome_message, "hello");
    }
}
