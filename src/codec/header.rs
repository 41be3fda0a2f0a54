//! Datalink frame header
//!
//! Every frame starts with a fixed 16-byte header:
//!
//! ```text
//! bit   0        8        16                48                80                112       128
//!       +--------+--------+-----------------+-----------------+-----------------+---------+
//!       | msg id | opcode |   reserved 0    |   reserved 1    |   reserved 2    | seq tail|
//!       +--------+--------+-----------------+-----------------+-----------------+---------+
//! ```
//!
//! Only the opcode drives decoding. The message id and sequence tail carry the
//! producer's running sequence number and are kept for diagnostics.

use bytes::BufMut;
use serde::Serialize;

use super::bits::BitReader;
use super::error::FrameError;

/// Header size in bytes
pub const HEADER_LEN: usize = 16;

/// Opcode: network member positions
pub const OPCODE_MEMBER_POSITIONS: u8 = 101;
/// Opcode: network member metadata
pub const OPCODE_MEMBER_METADATA: u8 = 102;
/// Opcode: target positions
pub const OPCODE_TARGET_POSITIONS: u8 = 104;
/// Opcode: threat reports
pub const OPCODE_THREATS: u8 = 106;

// Reserved words written by the upstream producer
const SYNTHETIC_RESERVED0: u32 = 0x0100_0000;
const SYNTHETIC_RESERVED1: u32 = 0x001C_0000;
const SYNTHETIC_RESERVED1_TARGETS: u32 = 0x004C_0000;
const SYNTHETIC_RESERVED2: u32 = 0x019A_3391;

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Low byte of the producer sequence number
    pub message_id: u8,
    /// Payload schema selector
    pub opcode: u8,
    pub reserved0: u32,
    pub reserved1: u32,
    pub reserved2: u32,
    /// Low 16 bits of the producer sequence number
    pub sequence_tail: u16,
}

impl Header {
    /// Parse the header from the start of a frame
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN {
            return Err(FrameError::TruncatedHeader { len: buf.len() });
        }

        let mut reader = BitReader::new(buf);
        Ok(Self {
            message_id: reader.u8()?,
            opcode: reader.u8()?,
            reserved0: reader.u32()?,
            reserved1: reader.u32()?,
            reserved2: reader.u32()?,
            sequence_tail: reader.u16()?,
        })
    }

    /// Header with the fixed constants the upstream producer writes
    pub fn synthetic(opcode: u8, sequence: u32) -> Self {
        let reserved1 = if opcode == OPCODE_TARGET_POSITIONS {
            SYNTHETIC_RESERVED1_TARGETS
        } else {
            SYNTHETIC_RESERVED1
        };

        Self {
            message_id: (sequence & 0xFF) as u8,
            opcode,
            reserved0: SYNTHETIC_RESERVED0,
            reserved1,
            reserved2: SYNTHETIC_RESERVED2,
            sequence_tail: (sequence & 0xFFFF) as u16,
        }
    }

    /// Write the header in wire order
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.message_id);
        buf.put_u8(self.opcode);
        buf.put_u32(self.reserved0);
        buf.put_u32(self.reserved1);
        buf.put_u32(self.reserved2);
        buf.put_u16(self.sequence_tail);
    }

    /// Subscriber-facing view of the header
    pub fn to_wire(&self) -> HeaderView {
        HeaderView {
            msg_id: self.message_id,
            opcode: self.opcode,
            reserved0: self.reserved0,
            reserved1: self.reserved1,
            reserved2: self.reserved2,
        }
    }
}

/// Header as forwarded to subscribers (sequence tail is not forwarded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderView {
    pub msg_id: u8,
    pub opcode: u8,
    pub reserved0: u32,
    pub reserved1: u32,
    pub reserved2: u32,
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_parse_producer_header() {
        let buf = [
            0x2A, 101, 1, 0, 0, 0, 0, 28, 0, 0, 1, 154, 51, 145, 0x01, 0x2A,
        ];

        let header = Header::parse(&buf).unwrap();

        assert_eq!(header.message_id, 0x2A);
        assert_eq!(header.opcode, 101);
        assert_eq!(header.reserved0, 0x0100_0000);
        assert_eq!(header.reserved1, 0x001C_0000);
        assert_eq!(header.reserved2, 0x019A_3391);
        assert_eq!(header.sequence_tail, 0x012A);
    }

    #[test]
    fn test_parse_truncated() {
        let buf = [1, 101, 0, 0, 0, 0];

        assert_eq!(
            Header::parse(&buf),
            Err(FrameError::TruncatedHeader { len: 6 })
        );
        assert_eq!(
            Header::parse(&[0u8; 15]),
            Err(FrameError::TruncatedHeader { len: 15 })
        );
    }

    #[test]
    fn test_synthetic_matches_wire() {
        let header = Header::synthetic(OPCODE_MEMBER_POSITIONS, 0x0203);
        let mut buf = BytesMut::new();
        header.write_to(&mut buf);

        assert_eq!(
            &buf[..],
            &[0x03, 101, 1, 0, 0, 0, 0, 28, 0, 0, 1, 154, 51, 145, 0x02, 0x03]
        );
        assert_eq!(Header::parse(&buf).unwrap(), header);
    }

    #[test]
    fn test_synthetic_targets_reserved_word() {
        let header = Header::synthetic(OPCODE_TARGET_POSITIONS, 1);
        let mut buf = BytesMut::new();
        header.write_to(&mut buf);

        assert_eq!(buf[7], 76);
    }

    #[test]
    fn test_wire_view_drops_sequence_tail() {
        let header = Header::synthetic(OPCODE_THREATS, 7);
        let json = serde_json::to_value(header.to_wire()).unwrap();

        assert_eq!(json["msgId"], 7);
        assert_eq!(json["opcode"], 106);
        assert_eq!(json["reserved2"], 0x019A_3391);
        assert!(json.get("sequenceTail").is_none());
    }
}
