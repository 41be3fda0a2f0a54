//! Bridge wiring
//!
//! Binds the ingest socket and the subscriber endpoint, then runs both until
//! shutdown. The two sides only meet in the shared [`ClientRegistry`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::ingest::{IngestConfig, UdpIngest};
use crate::registry::{Broadcaster, ClientRegistry};
use crate::server::{ServerConfig, SubscriberServer};
use crate::stats::BridgeStats;

/// Default period between stats log lines
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Combined configuration for both sides of the bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    /// Period between stats log lines (zero disables them)
    pub stats_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ingest: IngestConfig::default(),
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

/// A bound, not yet running bridge
pub struct Bridge {
    server: Arc<SubscriberServer>,
    ingest: Arc<UdpIngest>,
    broadcaster: Broadcaster,
    registry: Arc<ClientRegistry>,
    stats: Arc<BridgeStats>,
    stats_interval: Duration,
}

impl Bridge {
    /// Bind both sockets
    ///
    /// Fails if either socket cannot be bound; nothing is left running.
    pub async fn bind(config: BridgeConfig) -> Result<Self> {
        let registry = Arc::new(ClientRegistry::new());
        let stats = Arc::new(BridgeStats::new());

        let upstream = config.ingest.upstream_label();
        let ingest = UdpIngest::bind(config.ingest, Arc::clone(&stats)).await?;
        let server = SubscriberServer::bind(
            config.server,
            upstream,
            Arc::clone(&registry),
            Arc::clone(&stats),
        )
        .await?;

        let broadcaster = Broadcaster::new(Arc::clone(&registry), Arc::clone(&stats));

        Ok(Self {
            server: Arc::new(server),
            ingest: Arc::new(ingest),
            broadcaster,
            registry,
            stats,
            stats_interval: config.stats_interval,
        })
    }

    /// Local address of the ingest socket
    pub fn udp_local_addr(&self) -> Result<SocketAddr> {
        self.ingest.local_addr()
    }

    /// Local address of the subscriber endpoint
    pub fn ws_local_addr(&self) -> Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<BridgeStats> {
        &self.stats
    }

    /// Run until `shutdown` resolves
    ///
    /// The subscriber endpoint starts accepting immediately. The ingest task
    /// registers with the upstream first; registration is bounded by
    /// `registration_timeout` and a failure is only logged.
    ///
    /// On shutdown both loops are stopped and the registry is closed, which
    /// makes every writer send a close frame and turns away subscribers still
    /// in their handshake.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let server = Arc::clone(&self.server);
        let mut server_task = tokio::spawn(async move { server.run().await });

        let ingest = Arc::clone(&self.ingest);
        let broadcaster = self.broadcaster.clone();
        let mut ingest_task =
            tokio::spawn(async move { ingest.register_and_run(&broadcaster).await });

        let stats_task = if self.stats_interval.is_zero() {
            None
        } else {
            Some(tokio::spawn(report_stats(
                Arc::clone(&self.stats),
                Arc::clone(&self.registry),
                self.stats_interval,
            )))
        };

        tracing::info!("Bridge running");

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown requested");
                Ok(())
            }
            joined = &mut ingest_task => flatten("ingest", joined),
            joined = &mut server_task => flatten("subscriber endpoint", joined),
        };

        ingest_task.abort();
        server_task.abort();
        if let Some(task) = stats_task {
            task.abort();
        }

        let closed = self.registry.close().await;
        self.stats.snapshot().log(closed);
        tracing::info!(subscribers_closed = closed, "Bridge stopped");

        result
    }
}

fn flatten(
    what: &'static str,
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(result) => {
            tracing::error!(task = what, "Task exited");
            result
        }
        Err(e) => {
            tracing::error!(task = what, error = %e, "Task panicked");
            Err(std::io::Error::other(e).into())
        }
    }
}

async fn report_stats(stats: Arc<BridgeStats>, registry: Arc<ClientRegistry>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        stats.snapshot().log(registry.len().await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> BridgeConfig {
        BridgeConfig {
            server: ServerConfig::with_addr("127.0.0.1:0".parse().unwrap()),
            ingest: IngestConfig::with_upstream("127.0.0.1", 9).bind("127.0.0.1:0".parse().unwrap()),
            stats_interval: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();

        assert_eq!(config.stats_interval, Duration::from_secs(30));
        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.ingest.upstream_label(), "localhost:5005");
    }

    #[tokio::test]
    async fn test_bind_resolves_ports() {
        let bridge = Bridge::bind(loopback_config()).await.unwrap();

        assert_ne!(bridge.udp_local_addr().unwrap().port(), 0);
        assert_ne!(bridge.ws_local_addr().unwrap().port(), 0);
        assert!(bridge.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let first = Bridge::bind(loopback_config()).await.unwrap();

        let mut config = loopback_config();
        config.server.bind_addr = first.ws_local_addr().unwrap();

        let err = Bridge::bind(config).await.err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_run_until_returns_on_shutdown() {
        let bridge = Bridge::bind(loopback_config()).await.unwrap();

        let result = bridge.run_until(async {}).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_until_closes_registry() {
        let bridge = Bridge::bind(loopback_config()).await.unwrap();
        let registry = Arc::clone(bridge.registry());

        bridge.run_until(async {}).await.unwrap();

        assert!(registry.is_closed());
        let peer = "127.0.0.1:40001".parse().unwrap();
        let (late, _rx) = crate::registry::ClientHandle::channel(1, peer, 4);
        assert!(!registry.add(late).await);
    }
}
