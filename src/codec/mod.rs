//! Datalink wire codec
//!
//! Pure functions between raw UDP frames and typed messages. No I/O, no state.
//!
//! # Frame layout
//!
//! ```text
//! +------------------+-----------------------------------------------+
//! | header (16 B)    | body (opcode specific)                        |
//! +------------------+-----------------------------------------------+
//!   msg id, opcode,    101: count u8   + 24 B member positions
//!   3 reserved words,  102: count u8   + variable member metadata
//!   sequence tail      104: count u16  + 24 B target positions
//!                      106: sender u32 + count u8 + 12 B threats
//! ```
//!
//! All multi-byte fields are big-endian. Field reads go through the
//! bit-addressed primitive in [`bits`].

pub mod bits;
pub mod decode;
pub mod encode;
pub mod error;
pub mod header;
pub mod message;
pub mod metadata;
pub mod records;

pub use bits::{read_bits, BitReader};
pub use decode::{decode, decode_at};
pub use encode::{
    encode_member_metadata, encode_member_positions, encode_target_positions, encode_threats,
};
pub use error::FrameError;
pub use header::{
    Header, HeaderView, HEADER_LEN, OPCODE_MEMBER_METADATA, OPCODE_MEMBER_POSITIONS,
    OPCODE_TARGET_POSITIONS, OPCODE_THREATS,
};
pub use message::{DecodedMessage, Payload};
pub use metadata::{BattleGroupData, MemberMetadata, StoreEntry};
pub use records::{
    MemberPosition, TargetPosition, ThreatBatch, ThreatReport, LAT_SCALE, LON_SCALE,
};
