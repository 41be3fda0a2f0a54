//! Subscriber handle
//!
//! A [`ClientHandle`] is the registry's view of one connected subscriber: an
//! id, the peer address and the sending half of a bounded queue drained by the
//! connection's writer task.

use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::mpsc;

use super::envelope::OutboundFrame;
use super::error::SendError;

/// Handle to a connected subscriber
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: u64,
    peer_addr: SocketAddr,
    tx: mpsc::Sender<OutboundFrame>,
    connected_at: Instant,
}

impl ClientHandle {
    /// Create a handle and the receiving end of its outbound queue
    pub fn channel(
        id: u64,
        peer_addr: SocketAddr,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id,
            peer_addr,
            tx,
            connected_at: Instant::now(),
        };
        (handle, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Time since the subscriber connected
    pub fn uptime(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Queue a frame without waiting
    ///
    /// Fails if the queue is full or the writer task has exited.
    pub fn try_send(&self, frame: OutboundFrame) -> Result<(), SendError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Whether the writer side is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
