//! Fixed-size position and threat records
//!
//! Opcodes 101, 104 and 106 carry a repeat count followed by fixed-size
//! records:
//!
//! ```text
//! 101  member positions   count: byte 16 (u8)      records at byte 20, 24 bytes each
//! 104  target positions   count: bytes 16-17 (u16) records at byte 20, 24 bytes each
//! 106  threat reports     sender: bytes 16-19      count: byte 20 (u8)
//!                                                  records at byte 24, 12 bytes each
//! ```
//!
//! Latitude and longitude travel as unsigned 32-bit fixed-point values. The
//! producer uses a different angular resolution per axis, so the two scale
//! factors are kept apart.

use bytes::BufMut;
use serde::Serialize;

use super::bits::BitReader;
use super::error::FrameError;

/// Raw units per degree of latitude
pub const LAT_SCALE: f64 = 11_930_469.0;

/// Raw units per degree of longitude
pub const LON_SCALE: f64 = 11_931_272.17;

/// Size of one member position record in bytes
pub const MEMBER_POSITION_LEN: usize = 24;
/// Size of one target position record in bytes
pub const TARGET_POSITION_LEN: usize = 24;
/// Size of one threat record in bytes
pub const THREAT_LEN: usize = 12;

/// Convert a raw latitude to degrees
pub fn lat_from_raw(raw: u32) -> f64 {
    f64::from(raw) / LAT_SCALE
}

/// Convert a raw longitude to degrees
pub fn lon_from_raw(raw: u32) -> f64 {
    f64::from(raw) / LON_SCALE
}

/// Convert degrees of latitude to the raw fixed-point value
pub fn lat_to_raw(degrees: f64) -> u32 {
    (degrees * LAT_SCALE).round() as i64 as u32
}

/// Convert degrees of longitude to the raw fixed-point value
pub fn lon_to_raw(degrees: f64) -> u32 {
    (degrees * LON_SCALE).round() as i64 as u32
}

/// Position report for one network member (opcode 101)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPosition {
    pub global_id: u32,
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    pub altitude: i16,
    #[serde(rename = "veIn")]
    pub velocity_north: i16,
    #[serde(rename = "veIe")]
    pub velocity_east: i16,
    #[serde(rename = "veIu")]
    pub velocity_up: i16,
    pub true_heading: i16,
    pub reserved: i16,
}

impl MemberPosition {
    pub(crate) fn read(reader: &mut BitReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            global_id: reader.u32()?,
            latitude: lat_from_raw(reader.u32()?),
            longitude: lon_from_raw(reader.u32()?),
            altitude: reader.i16()?,
            velocity_north: reader.i16()?,
            velocity_east: reader.i16()?,
            velocity_up: reader.i16()?,
            true_heading: reader.i16()?,
            reserved: reader.i16()?,
        })
    }

    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(self.global_id);
        buf.put_u32(lat_to_raw(self.latitude));
        buf.put_u32(lon_to_raw(self.longitude));
        buf.put_i16(self.altitude);
        buf.put_i16(self.velocity_north);
        buf.put_i16(self.velocity_east);
        buf.put_i16(self.velocity_up);
        buf.put_i16(self.true_heading);
        buf.put_i16(self.reserved);
    }
}

/// Track report for one target (opcode 104)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPosition {
    pub global_id: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i16,
    pub heading: i16,
    pub ground_speed: i16,
    pub reserved0: u8,
    pub reserved1: u8,
    pub range: u32,
}

impl TargetPosition {
    pub(crate) fn read(reader: &mut BitReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            global_id: reader.u32()?,
            latitude: lat_from_raw(reader.u32()?),
            longitude: lon_from_raw(reader.u32()?),
            altitude: reader.i16()?,
            heading: reader.i16()?,
            ground_speed: reader.i16()?,
            reserved0: reader.u8()?,
            reserved1: reader.u8()?,
            range: reader.u32()?,
        })
    }

    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(self.global_id);
        buf.put_u32(lat_to_raw(self.latitude));
        buf.put_u32(lon_to_raw(self.longitude));
        buf.put_i16(self.altitude);
        buf.put_i16(self.heading);
        buf.put_i16(self.ground_speed);
        buf.put_u8(self.reserved0);
        buf.put_u8(self.reserved1);
        buf.put_u32(self.range);
    }
}

/// One threat seen by the sender (opcode 106)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatReport {
    pub threat_id: u8,
    pub is_search_mode: bool,
    pub is_lock_on: bool,
    pub threat_type: u8,
    pub threat_range: u8,
    /// 24-bit reserved span
    pub reserved: u32,
    pub threat_azimuth: u16,
    pub threat_frequency: u16,
}

impl ThreatReport {
    pub(crate) fn read(reader: &mut BitReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            threat_id: reader.u8()?,
            is_search_mode: reader.bool()?,
            is_lock_on: reader.bool()?,
            threat_type: reader.u8()?,
            threat_range: reader.u8()?,
            reserved: reader.bits(24)?,
            threat_azimuth: reader.u16()?,
            threat_frequency: reader.u16()?,
        })
    }

    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.threat_id);
        buf.put_u8(u8::from(self.is_search_mode));
        buf.put_u8(u8::from(self.is_lock_on));
        buf.put_u8(self.threat_type);
        buf.put_u8(self.threat_range);
        buf.put_uint(u64::from(self.reserved & 0x00FF_FFFF), 3);
        buf.put_u16(self.threat_azimuth);
        buf.put_u16(self.threat_frequency);
    }
}

/// Threat reports from a single sender
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreatBatch {
    /// Absent when the frame ends before the sender field
    pub sender_global_id: Option<u32>,
    pub threats: Vec<ThreatReport>,
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_scales_are_distinct() {
        assert_ne!(LAT_SCALE, LON_SCALE);
        assert!((LAT_SCALE - 1.193e7).abs() < 1e4);
        assert!((LON_SCALE - 1.193e7).abs() < 1e4);
    }

    #[test]
    fn test_coordinate_quantization() {
        for degrees in [0.0, 26.9, 30.9, 75.8, 75.85, 89.999_999, 179.5] {
            assert!((lat_from_raw(lat_to_raw(degrees)) - degrees).abs() <= 1.0 / LAT_SCALE);
            assert!((lon_from_raw(lon_to_raw(degrees)) - degrees).abs() <= 1.0 / LON_SCALE);
        }
    }

    #[test]
    fn test_member_position_layout() {
        let member = MemberPosition {
            global_id: 10,
            latitude: 30.9,
            longitude: 75.85,
            altitude: 3998,
            velocity_north: -20814,
            velocity_east: 18627,
            velocity_up: 0,
            true_heading: 32766,
            reserved: 0,
        };
        let mut buf = BytesMut::new();
        member.write_to(&mut buf);

        assert_eq!(buf.len(), MEMBER_POSITION_LEN);
        assert_eq!(&buf[0..4], &[0, 0, 0, 10]);
        assert_eq!(&buf[12..14], &[15, 158]);

        let mut reader = BitReader::new(&buf);
        let decoded = MemberPosition::read(&mut reader).unwrap();
        assert_eq!(decoded.global_id, 10);
        assert_eq!(decoded.altitude, 3998);
        assert_eq!(decoded.velocity_north, -20814);
        assert_eq!(decoded.true_heading, 32766);
        assert_eq!(reader.position(), MEMBER_POSITION_LEN * 8);
    }

    #[test]
    fn test_target_position_layout() {
        let target = TargetPosition {
            global_id: 3,
            latitude: 34.4,
            longitude: 73.5,
            altitude: -5,
            heading: 270,
            ground_speed: 450,
            reserved0: 0xAA,
            reserved1: 0x55,
            range: 120_000,
        };
        let mut buf = BytesMut::new();
        target.write_to(&mut buf);

        assert_eq!(buf.len(), TARGET_POSITION_LEN);

        let mut reader = BitReader::new(&buf);
        let decoded = TargetPosition::read(&mut reader).unwrap();
        assert_eq!(decoded.altitude, -5);
        assert_eq!(decoded.reserved0, 0xAA);
        assert_eq!(decoded.reserved1, 0x55);
        assert_eq!(decoded.range, 120_000);
    }

    #[test]
    fn test_threat_layout() {
        let buf = [7, 1, 0, 3, 40, 0xAB, 0xCD, 0xEF, 0x01, 0x68, 0x27, 0x10];

        let mut reader = BitReader::new(&buf);
        let threat = ThreatReport::read(&mut reader).unwrap();

        assert_eq!(threat.threat_id, 7);
        assert!(threat.is_search_mode);
        assert!(!threat.is_lock_on);
        assert_eq!(threat.threat_type, 3);
        assert_eq!(threat.threat_range, 40);
        assert_eq!(threat.reserved, 0xABCDEF);
        assert_eq!(threat.threat_azimuth, 360);
        assert_eq!(threat.threat_frequency, 10_000);

        let mut out = BytesMut::new();
        threat.write_to(&mut out);
        assert_eq!(&out[..], &buf[..]);
    }

    #[test]
    fn test_member_json_field_names() {
        let member = MemberPosition {
            global_id: 94,
            latitude: 26.9,
            longitude: 75.8,
            altitude: 0,
            velocity_north: 1,
            velocity_east: 2,
            velocity_up: 3,
            true_heading: 4,
            reserved: 0,
        };
        let json = serde_json::to_value(&member).unwrap();

        assert_eq!(json["globalId"], 94);
        assert_eq!(json["veIn"], 1);
        assert_eq!(json["veIe"], 2);
        assert_eq!(json["veIu"], 3);
        assert_eq!(json["trueHeading"], 4);
    }
}
