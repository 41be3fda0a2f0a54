//! Per-subscriber connection lifecycle
//!
//! ```text
//!  TCP accept ─► WebSocket upgrade ─► queue welcome ─► registry.add()
//!                                                         │
//!                     ┌───────────────────────────────────┤
//!                     ▼                                   ▼
//!              reader: wait for close            writer: drain queue
//!                     │                                   │
//!                     └────────── first to finish ────────┘
//!                                        │
//!                                 registry.remove()
//! ```
//!
//! The bridge is one-directional; inbound frames are read only to notice the
//! subscriber going away.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::{BridgeError, Result};
use crate::registry::{welcome_frame, ClientHandle, ClientRegistry, OutboundFrame};
use crate::server::config::ServerConfig;
use crate::stats::BridgeStats;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// A single subscriber connection
pub(crate) struct Connection {
    id: u64,
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    stats: Arc<BridgeStats>,
    upstream: Arc<str>,
}

impl Connection {
    pub(crate) fn new(
        id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        registry: Arc<ClientRegistry>,
        stats: Arc<BridgeStats>,
        upstream: Arc<str>,
    ) -> Self {
        Self {
            id,
            socket,
            peer_addr,
            config,
            registry,
            stats,
            upstream,
        }
    }

    /// Run the connection until the subscriber leaves or fails
    pub(crate) async fn run(self) -> Result<()> {
        let Connection {
            id,
            socket,
            peer_addr,
            config,
            registry,
            stats,
            upstream,
        } = self;

        let ws = tokio::time::timeout(
            config.handshake_timeout,
            tokio_tungstenite::accept_async(socket),
        )
        .await
        .map_err(|_| timed_out("WebSocket upgrade timed out"))??;

        let (sink, source) = ws.split();
        let (handle, rx) = ClientHandle::channel(id, peer_addr, config.queue_capacity);

        // Welcome goes into the queue before the handle is visible to the
        // broadcaster, so it is always the first frame
        let welcome = welcome_frame(&config.welcome_message, &upstream, Utc::now())?;
        handle
            .try_send(welcome)
            .map_err(|e| BridgeError::Io(io::Error::new(io::ErrorKind::BrokenPipe, e)))?;

        if !registry.add(handle).await {
            tracing::debug!(client_id = id, peer = %peer_addr, "Bridge stopping, subscriber dropped");
            return Ok(());
        }
        stats.record_subscriber_accepted();
        tracing::info!(client_id = id, peer = %peer_addr, "Subscriber connected");

        let mut writer = tokio::spawn(write_loop(sink, rx, config.send_timeout, id));

        let result = tokio::select! {
            result = read_until_close(source, id) => result,
            joined = &mut writer => match joined {
                Ok(result) => result,
                Err(e) => Err(BridgeError::Io(io::Error::other(e))),
            },
        };

        registry.remove(id).await;
        writer.abort();

        tracing::info!(client_id = id, peer = %peer_addr, "Subscriber disconnected");
        result
    }
}

/// Consume inbound frames until the peer closes
async fn read_until_close(mut source: WsSource, id: u64) -> Result<()> {
    while let Some(message) = source.next().await {
        match message? {
            Message::Close(frame) => {
                tracing::debug!(client_id = id, frame = ?frame, "Close received");
                break;
            }
            other => {
                tracing::trace!(client_id = id, len = other.len(), "Ignoring inbound frame");
            }
        }
    }
    Ok(())
}

/// Drain the subscriber queue into the socket
///
/// Ends when the queue closes (handle removed from the registry), on a write
/// error, or when a single write exceeds `send_timeout`.
async fn write_loop(
    mut sink: WsSink,
    mut rx: mpsc::Receiver<OutboundFrame>,
    send_timeout: Duration,
    id: u64,
) -> Result<()> {
    while let Some(frame) = rx.recv().await {
        // Message::Text owns a String, so each subscriber's write copies the
        // shared envelope once
        let message = Message::Text(frame.as_str().to_owned());
        match tokio::time::timeout(send_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::warn!(
                    client_id = id,
                    timeout_ms = send_timeout.as_millis() as u64,
                    "Subscriber write timed out"
                );
                return Err(timed_out("WebSocket write timed out"));
            }
        }
    }

    // Queue closed: we were removed from the registry or the bridge is stopping
    let _ = sink.send(Message::Close(None)).await;
    Ok(())
}

fn timed_out(msg: &'static str) -> BridgeError {
    BridgeError::Io(io::Error::new(io::ErrorKind::TimedOut, msg))
}
