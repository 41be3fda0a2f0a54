//! Frame encoder
//!
//! Inverse of [`decode`](super::decode::decode). Used by the reference
//! traffic generator and by tests to produce frames in the upstream layout.

use bytes::{BufMut, Bytes, BytesMut};

use super::header::{Header, HEADER_LEN};
use super::metadata::MemberMetadata;
use super::records::{
    MemberPosition, TargetPosition, ThreatReport, MEMBER_POSITION_LEN, TARGET_POSITION_LEN,
    THREAT_LEN,
};

/// Encode an opcode 101 frame
///
/// At most 255 members fit the 8-bit count; extra members are not written.
pub fn encode_member_positions(header: &Header, members: &[MemberPosition]) -> Bytes {
    let members = &members[..members.len().min(usize::from(u8::MAX))];
    let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 + members.len() * MEMBER_POSITION_LEN);

    header.write_to(&mut buf);
    buf.put_u8(members.len() as u8);
    buf.put_bytes(0, 3);
    for member in members {
        member.write_to(&mut buf);
    }

    buf.freeze()
}

/// Encode an opcode 102 frame
pub fn encode_member_metadata(header: &Header, members: &[MemberMetadata]) -> Bytes {
    let members = &members[..members.len().min(usize::from(u8::MAX))];
    let body: usize = members.iter().map(MemberMetadata::encoded_len).sum();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 + body);

    header.write_to(&mut buf);
    buf.put_u8(members.len() as u8);
    buf.put_bytes(0, 3);
    for member in members {
        member.write_to(&mut buf);
    }

    buf.freeze()
}

/// Encode an opcode 104 frame
pub fn encode_target_positions(header: &Header, targets: &[TargetPosition]) -> Bytes {
    let targets = &targets[..targets.len().min(usize::from(u16::MAX))];
    let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 + targets.len() * TARGET_POSITION_LEN);

    header.write_to(&mut buf);
    buf.put_u16(targets.len() as u16);
    buf.put_bytes(0, 2);
    for target in targets {
        target.write_to(&mut buf);
    }

    buf.freeze()
}

/// Encode an opcode 106 frame
pub fn encode_threats(header: &Header, sender_global_id: u32, threats: &[ThreatReport]) -> Bytes {
    let threats = &threats[..threats.len().min(usize::from(u8::MAX))];
    let mut buf = BytesMut::with_capacity(HEADER_LEN + 8 + threats.len() * THREAT_LEN);

    header.write_to(&mut buf);
    buf.put_u32(sender_global_id);
    buf.put_u8(threats.len() as u8);
    buf.put_bytes(0, 3);
    for threat in threats {
        threat.write_to(&mut buf);
    }

    buf.freeze()
}
