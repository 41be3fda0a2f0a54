//! datalink-bridge: UDP tactical datalink to WebSocket bridge
//!
//! Registers with an upstream telemetry server over UDP, decodes each binary
//! datagram (member positions, member metadata, target positions, threat
//! reports) and fans the result out as JSON to every connected WebSocket
//! subscriber.
//!
//! # Example
//!
//! ```no_run
//! use datalink_bridge::{Bridge, BridgeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = Bridge::bind(BridgeConfig::default()).await?;
//!     bridge
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod codec;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod server;
pub mod stats;

pub use bridge::{Bridge, BridgeConfig};
pub use codec::{decode, DecodedMessage, FrameError, Payload};
pub use error::{BridgeError, Result};
pub use ingest::{IngestConfig, UdpIngest};
pub use registry::{Broadcaster, ClientRegistry};
pub use server::{ServerConfig, SubscriberServer};
pub use stats::BridgeStats;
