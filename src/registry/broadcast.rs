//! Broadcaster
//!
//! Serializes each decoded message once and pushes it to every subscriber in a
//! registry snapshot. A subscriber whose queue is full or closed is removed;
//! the others still receive the frame.

use std::sync::Arc;

use crate::codec::DecodedMessage;
use crate::error::Result;
use crate::stats::BridgeStats;

use super::envelope::{message_frame, OutboundFrame};
use super::store::ClientRegistry;

/// Outcome of one publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// Subscribers the frame was queued for
    pub delivered: usize,
    /// Subscribers removed because the send failed
    pub dropped: usize,
}

/// Fan-out of decoded messages to all subscribers
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
    stats: Arc<BridgeStats>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>, stats: Arc<BridgeStats>) -> Self {
        Self { registry, stats }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Serialize and deliver a decoded message
    pub async fn publish(&self, msg: &DecodedMessage) -> Result<PublishReport> {
        let frame = message_frame(msg)?;
        let report = self.publish_frame(frame).await;
        self.stats.record_publish(report.delivered, report.dropped);
        Ok(report)
    }

    /// Deliver an already serialized frame
    pub async fn publish_frame(&self, frame: OutboundFrame) -> PublishReport {
        let mut report = PublishReport::default();

        for client in self.registry.snapshot().await {
            match client.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        client_id = client.id(),
                        peer = %client.peer_addr(),
                        error = %e,
                        "Dropping subscriber"
                    );
                    self.registry.remove(client.id()).await;
                    report.dropped += 1;
                }
            }
        }

        tracing::trace!(
            delivered = report.delivered,
            dropped = report.dropped,
            bytes = frame.len(),
            "Published frame"
        );

        report
    }
}
