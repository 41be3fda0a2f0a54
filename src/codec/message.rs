//! Decoded message types

use chrono::{DateTime, Utc};

use super::header::{
    Header, OPCODE_MEMBER_METADATA, OPCODE_MEMBER_POSITIONS, OPCODE_TARGET_POSITIONS,
    OPCODE_THREATS,
};
use super::metadata::MemberMetadata;
use super::records::{MemberPosition, TargetPosition, ThreatBatch};

/// Decoded payload, selected by opcode
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opcode 101
    MemberPositions(Vec<MemberPosition>),
    /// Opcode 102
    MemberMetadata(Vec<MemberMetadata>),
    /// Opcode 104
    TargetPositions(Vec<TargetPosition>),
    /// Opcode 106
    ThreatReports(ThreatBatch),
    /// Any other opcode, forwarded without a body
    Unknown { opcode: u8 },
}

impl Payload {
    /// Opcode this payload was decoded from
    pub fn opcode(&self) -> u8 {
        match self {
            Payload::MemberPositions(_) => OPCODE_MEMBER_POSITIONS,
            Payload::MemberMetadata(_) => OPCODE_MEMBER_METADATA,
            Payload::TargetPositions(_) => OPCODE_TARGET_POSITIONS,
            Payload::ThreatReports(_) => OPCODE_THREATS,
            Payload::Unknown { opcode } => *opcode,
        }
    }

    /// Envelope `type` tag sent to subscribers
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::MemberPositions(_) => "networkMembers",
            Payload::MemberMetadata(_) => "networkMemberMetadata",
            Payload::TargetPositions(_) => "targets",
            Payload::ThreatReports(_) => "threats",
            Payload::Unknown { .. } => "unknown",
        }
    }

    /// Number of decoded records
    pub fn record_count(&self) -> usize {
        match self {
            Payload::MemberPositions(v) => v.len(),
            Payload::MemberMetadata(v) => v.len(),
            Payload::TargetPositions(v) => v.len(),
            Payload::ThreatReports(batch) => batch.threats.len(),
            Payload::Unknown { .. } => 0,
        }
    }
}

/// A decoded frame plus its arrival metadata
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub header: Header,
    pub payload: Payload,
    /// When the datagram was received
    pub received_at: DateTime<Utc>,
    /// Size of the raw datagram in bytes
    pub raw_length: usize,
    /// Repeat count declared by the frame (0 for unknown opcodes)
    pub declared_records: usize,
}

impl DecodedMessage {
    /// Whether the frame declared more records than it carried
    pub fn is_truncated(&self) -> bool {
        self.payload.record_count() < self.declared_records
    }
}
