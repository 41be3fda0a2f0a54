//! UDP ingest loop

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use chrono::Utc;
use tokio::net::UdpSocket;

use crate::codec::{decode_at, FrameError};
use crate::error::{BridgeError, Result};
use crate::ingest::config::IngestConfig;
use crate::registry::Broadcaster;
use crate::stats::BridgeStats;

/// Socket facing the upstream telemetry server
pub struct UdpIngest {
    config: IngestConfig,
    socket: UdpSocket,
    stats: Arc<BridgeStats>,
}

impl UdpIngest {
    /// Bind the ingest socket
    pub async fn bind(config: IngestConfig, stats: Arc<BridgeStats>) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .map_err(|e| BridgeError::bind("ingest", config.bind_addr, e))?;

        let ingest = Self {
            config,
            socket,
            stats,
        };
        tracing::info!(
            addr = %ingest.local_addr()?,
            upstream = %ingest.config.upstream_label(),
            "UDP ingest bound"
        );
        Ok(ingest)
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Send the registration datagram to the upstream once
    ///
    /// The upstream host is resolved here; an address of the same family as
    /// the local socket is preferred. Resolution and send together are bounded
    /// by `registration_timeout`.
    pub async fn register(&self) -> Result<SocketAddr> {
        let timeout = self.config.registration_timeout;

        tokio::time::timeout(timeout, self.resolve_and_send())
            .await
            .map_err(|_| {
                BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!(
                        "registration with {} timed out after {:?}",
                        self.config.upstream_label(),
                        timeout
                    ),
                ))
            })?
    }

    async fn resolve_and_send(&self) -> Result<SocketAddr> {
        let upstream = self.resolve_upstream().await?;
        let payload = &self.config.registration_payload;

        self.socket.send_to(payload, upstream).await?;

        tracing::info!(upstream = %upstream, len = payload.len(), "Registered with upstream");
        Ok(upstream)
    }

    /// Register best-effort, then run the receive loop
    ///
    /// A failed or timed out registration is logged and the loop starts
    /// anyway.
    pub async fn register_and_run(&self, broadcaster: &Broadcaster) -> Result<()> {
        if let Err(e) = self.register().await {
            tracing::warn!(
                upstream = %self.config.upstream_label(),
                error = %e,
                "Registration with upstream failed"
            );
        }

        self.run(broadcaster).await
    }

    async fn resolve_upstream(&self) -> Result<SocketAddr> {
        let local_v4 = self.local_addr()?.is_ipv4();
        let host = (self.config.upstream_host.as_str(), self.config.upstream_port);

        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(host).await?.collect();
        candidates
            .iter()
            .find(|addr| addr.is_ipv4() == local_v4)
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| {
                BridgeError::Config(format!(
                    "upstream {} did not resolve",
                    self.config.upstream_label()
                ))
            })
    }

    /// Receive, decode and publish until the task is dropped
    ///
    /// Malformed datagrams and receive errors are logged and skipped.
    pub async fn run(&self, broadcaster: &Broadcaster) -> Result<()> {
        let mut buf = BytesMut::zeroed(self.config.recv_buffer_size);

        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!(error = %e, "UDP receive failed");
                    continue;
                }
            };

            self.handle_datagram(&buf[..len], peer, broadcaster).await;
        }
    }

    async fn handle_datagram(&self, datagram: &[u8], peer: SocketAddr, broadcaster: &Broadcaster) {
        self.stats.record_datagram(datagram.len());

        let msg = match decode_at(datagram, Utc::now()) {
            Ok(msg) => msg,
            Err(FrameError::TruncatedHeader { len }) => {
                tracing::debug!(peer = %peer, len, "Dropping datagram shorter than header");
                self.stats.record_decode_error();
                return;
            }
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "Dropping undecodable datagram");
                self.stats.record_decode_error();
                return;
            }
        };

        tracing::trace!(
            peer = %peer,
            opcode = msg.header.opcode,
            len = datagram.len(),
            records = msg.payload.record_count(),
            "Datagram decoded"
        );

        if msg.is_truncated() {
            tracing::debug!(
                opcode = msg.header.opcode,
                declared = msg.declared_records,
                decoded = msg.payload.record_count(),
                "Record list truncated"
            );
        }
        self.stats.record_decoded(&msg);

        if let Err(e) = broadcaster.publish(&msg).await {
            tracing::warn!(opcode = msg.header.opcode, error = %e, "Failed to publish message");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use tokio_test::assert_ok;

    use super::*;
    use crate::codec::{encode_target_positions, Header, TargetPosition};
    use crate::registry::{ClientHandle, ClientRegistry};

    async fn setup(upstream: SocketAddr) -> (Arc<UdpIngest>, Broadcaster, Arc<BridgeStats>) {
        let stats = Arc::new(BridgeStats::new());
        let config = IngestConfig::with_upstream(upstream.ip().to_string(), upstream.port())
            .bind("127.0.0.1:0".parse().unwrap());
        let ingest = UdpIngest::bind(config, Arc::clone(&stats)).await.unwrap();
        let broadcaster = Broadcaster::new(Arc::new(ClientRegistry::new()), Arc::clone(&stats));
        (Arc::new(ingest), broadcaster, stats)
    }

    fn target_frame() -> bytes::Bytes {
        let target = TargetPosition {
            global_id: 2,
            latitude: 34.1,
            longitude: 74.8,
            altitude: 1200,
            heading: 90,
            ground_speed: 310,
            reserved0: 0,
            reserved1: 0,
            range: 4000,
        };
        encode_target_positions(&Header::synthetic(104, 7), &[target])
    }

    #[tokio::test]
    async fn test_register_sends_payload() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (ingest, _broadcaster, _stats) = setup(upstream.local_addr().unwrap()).await;

        let sent_to = assert_ok!(ingest.register().await);
        assert_eq!(sent_to, upstream.local_addr().unwrap());

        let mut buf = [0u8; 64];
        let (len, from) = upstream.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"bridge-register");
        assert_eq!(from, ingest.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_register_is_bounded_by_timeout() {
        let stats = Arc::new(BridgeStats::new());
        let config = IngestConfig::with_upstream("bridge-upstream.invalid", 5005)
            .bind("127.0.0.1:0".parse().unwrap())
            .registration_timeout(Duration::ZERO);
        let ingest = UdpIngest::bind(config, stats).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), ingest.register()).await;

        assert!(matches!(result, Ok(Err(_))));
    }

    #[tokio::test]
    async fn test_failed_registration_still_runs_loop() {
        let stats = Arc::new(BridgeStats::new());
        // IPv6 upstream from an IPv4 socket: the send fails
        let config = IngestConfig::with_upstream("::1", 5005).bind("127.0.0.1:0".parse().unwrap());
        let ingest = Arc::new(UdpIngest::bind(config, Arc::clone(&stats)).await.unwrap());
        assert!(ingest.register().await.is_err());

        let broadcaster = Broadcaster::new(Arc::new(ClientRegistry::new()), stats);
        let (handle, mut rx) = ClientHandle::channel(1, "127.0.0.1:40001".parse().unwrap(), 8);
        assert!(broadcaster.registry().add(handle).await);

        let runner = Arc::clone(&ingest);
        let task = tokio::spawn(async move { runner.register_and_run(&broadcaster).await });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&target_frame(), ingest.local_addr().unwrap())
            .await
            .unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(matches!(frame, Ok(Some(_))));
        assert!(!task.is_finished());

        task.abort();
    }

    #[tokio::test]
    async fn test_loop_survives_malformed_datagrams() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (ingest, broadcaster, stats) = setup(upstream.local_addr().unwrap()).await;

        let (handle, mut rx) = ClientHandle::channel(1, "127.0.0.1:40001".parse().unwrap(), 8);
        assert!(broadcaster.registry().add(handle).await);

        let runner = Arc::clone(&ingest);
        let task = tokio::spawn(async move { runner.run(&broadcaster).await });

        let target = ingest.local_addr().unwrap();
        upstream.send_to(&[1, 2, 3, 4, 5, 6], target).await.unwrap();
        upstream.send_to(&target_frame(), target).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let envelope: Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(envelope["type"], "targets");
        assert_eq!(envelope["data"][0]["globalId"], 2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.decode_errors, 1);

        task.abort();
    }

    #[tokio::test]
    async fn test_datagrams_from_any_source_are_accepted() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let stranger = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (ingest, broadcaster, _stats) = setup(upstream.local_addr().unwrap()).await;

        let (handle, mut rx) = ClientHandle::channel(1, "127.0.0.1:40001".parse().unwrap(), 8);
        assert!(broadcaster.registry().add(handle).await);

        let runner = Arc::clone(&ingest);
        let task = tokio::spawn(async move { runner.run(&broadcaster).await });

        stranger
            .send_to(&target_frame(), ingest.local_addr().unwrap())
            .await
            .unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(matches!(frame, Ok(Some(_))));

        task.abort();
    }
}
