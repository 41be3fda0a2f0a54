//! Subscriber endpoint listener
//!
//! Handles the TCP accept loop and spawns a task per subscriber connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::{BridgeError, Result};
use crate::registry::ClientRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::BridgeStats;

/// WebSocket endpoint for subscribers
pub struct SubscriberServer {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    stats: Arc<BridgeStats>,
    upstream: Arc<str>,
    next_client_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SubscriberServer {
    /// Bind the listen socket
    ///
    /// `upstream` is the telemetry server address announced in welcome
    /// envelopes.
    pub async fn bind(
        config: ServerConfig,
        upstream: impl Into<Arc<str>>,
        registry: Arc<ClientRegistry>,
        stats: Arc<BridgeStats>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|e| BridgeError::bind("subscriber", config.bind_addr, e))?;

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let server = Self {
            config,
            listener,
            registry,
            stats,
            upstream: upstream.into(),
            next_client_id: AtomicU64::new(1),
            connection_semaphore,
        };
        tracing::info!(addr = %server.local_addr()?, "Subscriber endpoint listening");
        Ok(server)
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Run the accept loop
    ///
    /// This method runs until the task is dropped.
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Run the accept loop with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Subscriber endpoint shutting down");
                Ok(())
            }
            result = self.run() => result,
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    self.stats.record_subscriber_rejected();
                    return;
                }
            }
        } else {
            None
        };

        let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(client_id = client_id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let connection = Connection::new(
            client_id,
            socket,
            peer_addr,
            self.config.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            Arc::clone(&self.upstream),
        );

        tokio::spawn(async move {
            // Held for the lifetime of the connection
            let _permit = permit;

            if let Err(e) = connection.run().await {
                tracing::debug!(client_id = client_id, error = %e, "Connection error");
            }

            tracing::debug!(client_id = client_id, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;
    use serde_json::Value;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;
    use crate::registry::OutboundFrame;

    async fn start(config: ServerConfig) -> (Arc<SubscriberServer>, SocketAddr, Arc<BridgeStats>) {
        let registry = Arc::new(ClientRegistry::new());
        let stats = Arc::new(BridgeStats::new());
        let server = SubscriberServer::bind(config, "localhost:5005", registry, Arc::clone(&stats))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let server = Arc::new(server);
        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });
        (server, addr, stats)
    }

    fn loopback() -> ServerConfig {
        ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
    }

    async fn wait_for_subscribers(registry: &ClientRegistry, n: usize) {
        for _ in 0..200 {
            if registry.len().await == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} subscribers", n);
    }

    #[tokio::test]
    async fn test_welcome_then_broadcast() {
        let (server, addr, stats) = start(loopback()).await;

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let Message::Text(text) = ws.next().await.unwrap().unwrap() else {
            panic!("expected text welcome");
        };
        let welcome: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(welcome["message"], "Connected to WebSocket bridge");
        assert_eq!(welcome["udpServer"], "localhost:5005");
        assert!(welcome["timestamp"].as_str().unwrap().ends_with('Z'));

        wait_for_subscribers(server.registry(), 1).await;
        for client in server.registry().snapshot().await {
            client.try_send(OutboundFrame::new("{\"n\":1}")).unwrap();
        }

        let Message::Text(text) = ws.next().await.unwrap().unwrap() else {
            panic!("expected text frame");
        };
        assert_eq!(text, "{\"n\":1}");
        assert_eq!(stats.snapshot().subscribers_accepted, 1);
    }

    #[tokio::test]
    async fn test_disconnect_removes_subscriber() {
        let (server, addr, _stats) = start(loopback()).await;

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        let _welcome = ws.next().await.unwrap().unwrap();
        wait_for_subscribers(server.registry(), 1).await;

        ws.close(None).await.unwrap();

        wait_for_subscribers(server.registry(), 0).await;
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let (server, addr, stats) = start(loopback().max_connections(1)).await;

        let (mut first, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        let _welcome = first.next().await.unwrap().unwrap();
        wait_for_subscribers(server.registry(), 1).await;

        // Over the limit: the socket is dropped before the upgrade
        assert!(connect_async(format!("ws://{}", addr)).await.is_err());
        assert_eq!(stats.snapshot().subscribers_rejected, 1);
        assert_eq!(server.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_handshake_after_close_is_not_registered() {
        let (server, addr, stats) = start(loopback()).await;
        server.registry().close().await;

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        // No welcome: the connection is dropped right after the upgrade
        let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap();
        assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
        assert!(server.registry().is_empty().await);
        assert_eq!(stats.snapshot().subscribers_accepted, 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let (_server, addr, _stats) = start(loopback()).await;

        let result = SubscriberServer::bind(
            ServerConfig::with_addr(addr),
            "localhost:5005",
            Arc::new(ClientRegistry::new()),
            Arc::new(BridgeStats::new()),
        )
        .await;

        assert!(matches!(result, Err(BridgeError::Bind { .. })));
    }
}
