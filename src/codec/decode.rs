//! Frame decoder
//!
//! Dispatches on the header opcode and reads as many whole records as the
//! frame holds. A repeat count larger than the body is not an error: the
//! decoder stops at the last complete record and never reads past the buffer.

use chrono::{DateTime, Utc};

use super::bits::BitReader;
use super::error::FrameError;
use super::header::{
    Header, HEADER_LEN, OPCODE_MEMBER_METADATA, OPCODE_MEMBER_POSITIONS, OPCODE_TARGET_POSITIONS,
    OPCODE_THREATS,
};
use super::message::{DecodedMessage, Payload};
use super::metadata::MemberMetadata;
use super::records::{
    MemberPosition, TargetPosition, ThreatBatch, ThreatReport, MEMBER_POSITION_LEN,
    TARGET_POSITION_LEN, THREAT_LEN,
};

// Body layout, byte offsets from frame start
const COUNT_OFFSET: usize = HEADER_LEN;
const RECORDS_OFFSET: usize = 20;
const THREAT_COUNT_OFFSET: usize = 20;
const THREAT_RECORDS_OFFSET: usize = 24;

/// Decode a frame, stamping it with the current time
pub fn decode(buf: &[u8]) -> Result<DecodedMessage, FrameError> {
    decode_at(buf, Utc::now())
}

/// Decode a frame with an explicit reception timestamp
pub fn decode_at(buf: &[u8], received_at: DateTime<Utc>) -> Result<DecodedMessage, FrameError> {
    let header = Header::parse(buf)?;

    let (payload, declared_records) = match header.opcode {
        OPCODE_MEMBER_POSITIONS => {
            let count = read_count(buf, COUNT_OFFSET, 8)?;
            let members = read_fixed(buf, RECORDS_OFFSET, count, MEMBER_POSITION_LEN, |r| {
                MemberPosition::read(r)
            })?;
            (Payload::MemberPositions(members), count)
        }
        OPCODE_MEMBER_METADATA => {
            let count = read_count(buf, COUNT_OFFSET, 8)?;
            (Payload::MemberMetadata(read_metadata(buf, count)?), count)
        }
        OPCODE_TARGET_POSITIONS => {
            let count = read_count(buf, COUNT_OFFSET, 16)?;
            let targets = read_fixed(buf, RECORDS_OFFSET, count, TARGET_POSITION_LEN, |r| {
                TargetPosition::read(r)
            })?;
            (Payload::TargetPositions(targets), count)
        }
        OPCODE_THREATS => {
            let sender_global_id = if buf.len() >= COUNT_OFFSET + 4 {
                Some(BitReader::at_byte(buf, COUNT_OFFSET).u32()?)
            } else {
                None
            };
            let count = read_count(buf, THREAT_COUNT_OFFSET, 8)?;
            let threats = read_fixed(buf, THREAT_RECORDS_OFFSET, count, THREAT_LEN, |r| {
                ThreatReport::read(r)
            })?;
            let batch = ThreatBatch {
                sender_global_id,
                threats,
            };
            (Payload::ThreatReports(batch), count)
        }
        opcode => (Payload::Unknown { opcode }, 0),
    };

    Ok(DecodedMessage {
        header,
        payload,
        received_at,
        raw_length: buf.len(),
        declared_records,
    })
}

/// Read a repeat count; a frame that ends before the count declares nothing
fn read_count(buf: &[u8], byte_offset: usize, width: u32) -> Result<usize, FrameError> {
    let mut reader = BitReader::at_byte(buf, byte_offset);
    if reader.remaining_bits() < width as usize {
        return Ok(0);
    }
    Ok(reader.bits(width)? as usize)
}

/// Read up to `count` fixed-size records, stopping at the last whole one
fn read_fixed<T, F>(
    buf: &[u8],
    start: usize,
    count: usize,
    record_len: usize,
    mut read: F,
) -> Result<Vec<T>, FrameError>
where
    F: FnMut(&mut BitReader<'_>) -> Result<T, FrameError>,
{
    let fits = buf.len().saturating_sub(start) / record_len;
    let n = count.min(fits);

    let mut reader = BitReader::at_byte(buf, start);
    let mut records = Vec::with_capacity(n);
    for _ in 0..n {
        let before = reader.position();
        records.push(read(&mut reader)?);
        debug_assert_eq!(reader.position() - before, record_len * 8);
    }
    Ok(records)
}

/// Read up to `count` variable-length metadata records
fn read_metadata(buf: &[u8], count: usize) -> Result<Vec<MemberMetadata>, FrameError> {
    let mut reader = BitReader::at_byte(buf, RECORDS_OFFSET);
    let mut members = Vec::new();
    for _ in 0..count {
        match MemberMetadata::read(&mut reader)? {
            Some(meta) => members.push(meta),
            None => break,
        }
    }
    Ok(members)
}
