//! UDP ingest configuration

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use bytes::Bytes;

/// Default upstream telemetry port
pub const DEFAULT_UPSTREAM_PORT: u16 = 5005;

/// Default registration datagram
pub const DEFAULT_REGISTRATION_PAYLOAD: &[u8] = b"bridge-register";

/// Largest datagram the ingest loop accepts
pub const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Upper bound on resolving the upstream and sending the registration
pub const DEFAULT_REGISTRATION_TIMEOUT: Duration = Duration::from_secs(5);

/// UDP ingest configuration options
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Upstream telemetry server host
    pub upstream_host: String,

    /// Upstream telemetry server port
    pub upstream_port: u16,

    /// Local address for the ingest socket
    pub bind_addr: SocketAddr,

    /// Datagram sent once to the upstream at startup
    pub registration_payload: Bytes,

    /// Receive buffer size in bytes
    pub recv_buffer_size: usize,

    /// Time allowed for upstream resolution plus the registration send
    pub registration_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upstream_host: "localhost".to_string(),
            upstream_port: DEFAULT_UPSTREAM_PORT,
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            registration_payload: Bytes::from_static(DEFAULT_REGISTRATION_PAYLOAD),
            recv_buffer_size: MAX_DATAGRAM_SIZE,
            registration_timeout: DEFAULT_REGISTRATION_TIMEOUT,
        }
    }
}

impl IngestConfig {
    /// Create a new config for the given upstream
    pub fn with_upstream(host: impl Into<String>, port: u16) -> Self {
        Self {
            upstream_host: host.into(),
            upstream_port: port,
            ..Default::default()
        }
    }

    /// Set the local bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the registration payload
    pub fn registration_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.registration_payload = payload.into();
        self
    }

    /// Set the receive buffer size (at least one header)
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.max(crate::codec::HEADER_LEN);
        self
    }

    pub fn registration_timeout(mut self, timeout: Duration) -> Self {
        self.registration_timeout = timeout;
        self
    }

    /// Upstream as `host:port`, as announced to subscribers
    pub fn upstream_label(&self) -> String {
        format!("{}:{}", self.upstream_host, self.upstream_port)
    }
}
