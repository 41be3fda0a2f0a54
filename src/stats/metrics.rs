//! Counters for ingest and fan-out

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::codec::DecodedMessage;

/// Bridge-wide counters
///
/// All counters are relaxed atomics; they are only read for reporting.
#[derive(Debug)]
pub struct BridgeStats {
    started_at: Instant,
    datagrams_received: AtomicU64,
    bytes_received: AtomicU64,
    decode_errors: AtomicU64,
    truncated_frames: AtomicU64,
    unknown_opcodes: AtomicU64,
    messages_published: AtomicU64,
    deliveries: AtomicU64,
    send_failures: AtomicU64,
    subscribers_accepted: AtomicU64,
    subscribers_rejected: AtomicU64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            datagrams_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            truncated_frames: AtomicU64::new(0),
            unknown_opcodes: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            subscribers_accepted: AtomicU64::new(0),
            subscribers_rejected: AtomicU64::new(0),
        }
    }

    /// Count a received datagram
    pub fn record_datagram(&self, len: usize) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count truncation and unknown opcodes for a decoded message
    pub fn record_decoded(&self, msg: &DecodedMessage) {
        if msg.is_truncated() {
            self.truncated_frames.fetch_add(1, Ordering::Relaxed);
        }
        if matches!(msg.payload, crate::codec::Payload::Unknown { .. }) {
            self.unknown_opcodes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_publish(&self, delivered: usize, dropped: usize) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.send_failures.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn record_subscriber_accepted(&self) {
        self.subscribers_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscriber_rejected(&self) {
        self.subscribers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the stats were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copy of the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.uptime(),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            truncated_frames: self.truncated_frames.load(Ordering::Relaxed),
            unknown_opcodes: self.unknown_opcodes.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            subscribers_accepted: self.subscribers_accepted.load(Ordering::Relaxed),
            subscribers_rejected: self.subscribers_rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`BridgeStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub decode_errors: u64,
    pub truncated_frames: u64,
    pub unknown_opcodes: u64,
    pub messages_published: u64,
    pub deliveries: u64,
    pub send_failures: u64,
    pub subscribers_accepted: u64,
    pub subscribers_rejected: u64,
}

impl StatsSnapshot {
    /// Average datagram rate since start
    pub fn datagram_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.datagrams_received as f64 / secs
        } else {
            0.0
        }
    }

    /// Emit the snapshot as a structured log line
    pub fn log(&self, subscribers: usize) {
        tracing::info!(
            uptime_secs = self.uptime.as_secs(),
            subscribers,
            datagrams = self.datagrams_received,
            bytes = self.bytes_received,
            rate = %format!("{:.1}/s", self.datagram_rate()),
            decode_errors = self.decode_errors,
            truncated = self.truncated_frames,
            unknown = self.unknown_opcodes,
            published = self.messages_published,
            send_failures = self.send_failures,
            "Bridge stats"
        );
    }
}
