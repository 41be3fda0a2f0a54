//! Codec error types

use thiserror::Error;

/// Error type for frame decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Buffer shorter than the fixed 16-byte header
    #[error("frame truncated: {len} bytes, header needs 16")]
    TruncatedHeader { len: usize },

    /// Bit read width outside 1..=32
    #[error("invalid bit width: {width}")]
    InvalidWidth { width: u32 },

    /// Bit read past the end of the buffer
    #[error("read of {width} bits at bit {bit_offset} exceeds {available_bits} available bits")]
    OutOfBounds {
        bit_offset: usize,
        width: u32,
        available_bits: usize,
    },
}
