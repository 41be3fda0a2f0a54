//! Client registry implementation
//!
//! The set of currently connected subscribers. Mutation goes through
//! [`ClientRegistry::add`] and [`ClientRegistry::remove`]; fan-out iterates a
//! point-in-time [`ClientRegistry::snapshot`] so the lock is never held across
//! per-subscriber sends. Once [`ClientRegistry::close`] runs, no further
//! subscriber can be added.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use super::entry::ClientHandle;

/// Registry of connected subscribers
///
/// Thread-safe via `RwLock`. Snapshots take the read lock; add/remove take the
/// write lock. The closed flag is only read or set under the write lock.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<BTreeMap<u64, ClientHandle>>,
    closed: AtomicBool,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber
    ///
    /// A handle with an id already present replaces the old one. Returns
    /// `false` and drops the handle if the registry is closed.
    pub async fn add(&self, handle: ClientHandle) -> bool {
        let mut clients = self.clients.write().await;
        let id = handle.id();
        let peer = handle.peer_addr();

        if self.closed.load(Ordering::Acquire) {
            tracing::debug!(client_id = id, peer = %peer, "Registry closed, subscriber refused");
            return false;
        }
        clients.insert(id, handle);

        tracing::debug!(
            client_id = id,
            peer = %peer,
            subscribers = clients.len(),
            "Subscriber registered"
        );
        true
    }

    /// Remove a subscriber
    ///
    /// Returns `false` if it was not registered; removing twice is a no-op.
    pub async fn remove(&self, id: u64) -> bool {
        let mut clients = self.clients.write().await;

        match clients.remove(&id) {
            Some(handle) => {
                tracing::debug!(
                    client_id = id,
                    peer = %handle.peer_addr(),
                    connected_secs = handle.uptime().as_secs(),
                    subscribers = clients.len(),
                    "Subscriber removed"
                );
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of all subscribers, ordered by id
    pub async fn snapshot(&self) -> Vec<ClientHandle> {
        self.clients.read().await.values().cloned().collect()
    }

    /// Check whether a subscriber is registered
    pub async fn contains(&self, id: u64) -> bool {
        self.clients.read().await.contains_key(&id)
    }

    /// Number of registered subscribers
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Drop every handle and refuse later additions
    ///
    /// Writers see their queue close once the last sender is gone, which ends
    /// their connections.
    pub async fn close(&self) -> usize {
        let mut clients = self.clients.write().await;
        self.closed.store(true, Ordering::Release);
        let count = clients.len();
        clients.clear();
        count
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
