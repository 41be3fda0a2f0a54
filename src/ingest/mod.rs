//! UDP telemetry ingest
//!
//! Owns the socket facing the upstream telemetry server: sends the
//! registration datagram, then decodes every datagram it receives and hands it
//! to the [`Broadcaster`](crate::registry::Broadcaster).

pub mod config;
pub mod udp;

pub use config::{
    IngestConfig, DEFAULT_REGISTRATION_PAYLOAD, DEFAULT_REGISTRATION_TIMEOUT, DEFAULT_UPSTREAM_PORT,
};
pub use udp::UdpIngest;
