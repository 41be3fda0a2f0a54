//! Synthetic upstream telemetry server
//!
//! Run with: cargo run --example telemetry_sim [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example telemetry_sim                  # binds to 0.0.0.0:5005
//!   cargo run --example telemetry_sim 127.0.0.1:6005   # binds to 127.0.0.1:6005
//!
//! Any peer that sends a datagram (the bridge sends `bridge-register`) is
//! added to the destination list and receives:
//!
//! - member positions (opcode 101) for three members jittering around fixed bases
//! - target positions (opcode 104) for three targets drifting south
//! - member metadata (opcode 102) on registration and every 25 iterations
//! - the occasional threat report (opcode 106)
//!
//! Then start the bridge pointed at it:
//!   cargo run -- --udp-host 127.0.0.1 --udp-port 5005

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio::net::UdpSocket;

use datalink_bridge::codec::{
    encode_member_metadata, encode_member_positions, encode_target_positions, encode_threats,
    BattleGroupData, Header, MemberMetadata, MemberPosition, TargetPosition, ThreatReport,
    OPCODE_MEMBER_METADATA, OPCODE_MEMBER_POSITIONS, OPCODE_TARGET_POSITIONS, OPCODE_THREATS,
};

/// (global id, callsign, base latitude, base longitude, controlling id)
const MEMBERS: [(u32, &str, f64, f64, u32); 3] = [
    (10, "PNJB", 30.9, 75.85, 0),
    (94, "RAJS", 26.9, 75.8, 10),
    (80, "DELH", 28.6, 77.2, 94),
];

/// (global id, base latitude, base longitude)
const TARGETS: [(u32, f64, f64); 3] = [(1, 32.7, 74.9), (2, 34.1, 74.8), (3, 34.4, 73.5)];

const TICK: Duration = Duration::from_millis(200);
const METADATA_EVERY: u64 = 25;
const THREAT_PROBABILITY: f64 = 0.05;

struct Simulator {
    sequence: u32,
    iteration: u64,
}

impl Simulator {
    fn new() -> Self {
        Self {
            sequence: 1,
            iteration: 0,
        }
    }

    fn header(&mut self, opcode: u8) -> Header {
        let header = Header::synthetic(opcode, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// One metadata frame per member, root first
    fn metadata_frames(&mut self) -> Vec<Bytes> {
        MEMBERS
            .iter()
            .map(|&(global_id, callsign, _, _, controlling_id)| {
                let meta = MemberMetadata {
                    global_id,
                    callsign: callsign.to_string(),
                    callsign_id: global_id as u16,
                    is_valid: true,
                    is_mission_leader: controlling_id == 0,
                    controlling_id,
                    ctn: format!("C{:04}", global_id),
                    battle_group_data: BattleGroupData {
                        is_valid: true,
                        fuel: 80,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                let header = self.header(OPCODE_MEMBER_METADATA);
                encode_member_metadata(&header, &[meta])
            })
            .collect()
    }

    /// Frames for the next iteration
    fn tick(&mut self, rng: &mut impl Rng) -> Vec<Bytes> {
        let mut frames = Vec::with_capacity(6);

        let members: Vec<MemberPosition> = MEMBERS
            .iter()
            .map(|&(global_id, _, lat, lon, _)| MemberPosition {
                global_id,
                latitude: lat + rng.random_range(-0.01..0.01),
                longitude: lon + rng.random_range(-0.01..0.01),
                altitude: rng.random_range(3000..3500),
                velocity_north: rng.random_range(-50..50),
                velocity_east: rng.random_range(-50..50),
                velocity_up: 0,
                true_heading: rng.random_range(0..360),
                reserved: 0,
            })
            .collect();
        let header = self.header(OPCODE_MEMBER_POSITIONS);
        frames.push(encode_member_positions(&header, &members));

        let drift = self.iteration as f64 * 0.001;
        let targets: Vec<TargetPosition> = TARGETS
            .iter()
            .map(|&(global_id, lat, lon)| TargetPosition {
                global_id,
                latitude: lat - drift,
                longitude: lon + rng.random_range(-0.005..0.005),
                altitude: 1000,
                heading: 180,
                ground_speed: 250,
                reserved0: 0,
                reserved1: 0,
                range: 0,
            })
            .collect();
        let header = self.header(OPCODE_TARGET_POSITIONS);
        frames.push(encode_target_positions(&header, &targets));

        if self.iteration % METADATA_EVERY == 0 {
            frames.extend(self.metadata_frames());
        }

        if rng.random_bool(THREAT_PROBABILITY) {
            let threat = ThreatReport {
                threat_id: rng.random_range(1..=8),
                is_search_mode: true,
                is_lock_on: rng.random_bool(0.3),
                threat_type: rng.random_range(1..=4),
                threat_range: rng.random_range(10..=120),
                reserved: 0,
                threat_azimuth: rng.random_range(0..360),
                threat_frequency: rng.random_range(2000..=18000),
            };
            let sender = MEMBERS[rng.random_range(0..MEMBERS.len())].0;
            let header = self.header(OPCODE_THREATS);
            frames.push(encode_threats(&header, sender, &[threat]));
        }

        self.iteration += 1;
        frames
    }
}

async fn send_all(socket: &UdpSocket, peers: &BTreeSet<SocketAddr>, frames: &[Bytes]) {
    for peer in peers {
        for frame in frames {
            if let Err(e) = socket.send_to(frame, peer).await {
                tracing::warn!(peer = %peer, error = %e, "Send failed");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr: SocketAddr = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => "0.0.0.0:5005".parse()?,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telemetry_sim=info".parse()?),
        )
        .init();

    let socket = UdpSocket::bind(bind_addr).await?;
    tracing::info!(addr = %socket.local_addr()?, "Telemetry simulator listening");

    let mut sim = Simulator::new();
    let mut rng = rand::rng();
    let mut peers = BTreeSet::new();
    let mut ticker = tokio::time::interval(TICK);
    let mut buf = [0u8; 1500];

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    if peers.insert(peer) {
                        tracing::info!(
                            peer = %peer,
                            payload = %String::from_utf8_lossy(&buf[..len]),
                            "Peer registered"
                        );
                        let frames = sim.metadata_frames();
                        send_all(&socket, &BTreeSet::from([peer]), &frames).await;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Receive failed"),
            },
            _ = ticker.tick() => {
                if peers.is_empty() {
                    continue;
                }
                let frames = sim.tick(&mut rng);
                tracing::debug!(frames = frames.len(), peers = peers.len(), "Tick");
                send_all(&socket, &peers, &frames).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
