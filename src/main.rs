//! datalink-bridge binary
//!
//! Run with: cargo run -- [OPTIONS]
//!
//! Every option can also be set through its `BRIDGE_*` environment variable.
//! Log filtering follows `RUST_LOG`.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;

use datalink_bridge::ingest::DEFAULT_UPSTREAM_PORT;
use datalink_bridge::{Bridge, BridgeConfig, IngestConfig, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket listen address
    #[arg(long, env = "BRIDGE_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Upstream telemetry server host
    #[arg(long, env = "BRIDGE_UDP_HOST", default_value = "localhost")]
    udp_host: String,

    /// Upstream telemetry server port
    #[arg(long, env = "BRIDGE_UDP_PORT", default_value_t = DEFAULT_UPSTREAM_PORT)]
    udp_port: u16,

    /// Local address of the UDP ingest socket
    #[arg(long, env = "BRIDGE_UDP_BIND", default_value = "0.0.0.0:0")]
    udp_bind: SocketAddr,

    /// Datagram sent to the upstream at startup
    #[arg(long, env = "BRIDGE_REGISTER_PAYLOAD", default_value = "bridge-register")]
    register_payload: String,

    /// Time allowed for resolving the upstream and registering, in milliseconds
    #[arg(long, env = "BRIDGE_REGISTER_TIMEOUT_MS", default_value_t = 5000)]
    register_timeout_ms: u64,

    /// Maximum concurrent subscribers (0 = unlimited)
    #[arg(long, env = "BRIDGE_MAX_SUBSCRIBERS", default_value_t = 0)]
    max_subscribers: usize,

    /// Frames buffered per subscriber before it is dropped
    #[arg(long, env = "BRIDGE_QUEUE_CAPACITY", default_value_t = 256)]
    queue_capacity: usize,

    /// Per-write timeout for subscriber sockets, in milliseconds
    #[arg(long, env = "BRIDGE_SEND_TIMEOUT_MS", default_value_t = 5000)]
    send_timeout_ms: u64,

    /// Seconds between stats log lines (0 = off)
    #[arg(long, env = "BRIDGE_STATS_INTERVAL", default_value_t = 30)]
    stats_interval: u64,
}

impl Args {
    fn into_config(self) -> BridgeConfig {
        BridgeConfig {
            server: ServerConfig::with_addr(self.listen)
                .max_connections(self.max_subscribers)
                .queue_capacity(self.queue_capacity)
                .send_timeout(Duration::from_millis(self.send_timeout_ms)),
            ingest: IngestConfig::with_upstream(self.udp_host, self.udp_port)
                .bind(self.udp_bind)
                .registration_payload(Bytes::from(self.register_payload))
                .registration_timeout(Duration::from_millis(self.register_timeout_ms)),
            stats_interval: Duration::from_secs(self.stats_interval),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("datalink_bridge=info".parse()?),
        )
        .init();

    let config = args.into_config();
    tracing::info!(
        listen = %config.server.bind_addr,
        upstream = %config.ingest.upstream_label(),
        "Starting bridge"
    );

    let bridge = match Bridge::bind(config).await {
        Ok(bridge) => bridge,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    bridge
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        })
        .await?;

    Ok(())
}
