//! Bit-addressed field extraction
//!
//! The datalink treats a frame as a single big-endian bit stream: the most
//! significant bit of byte 0 is bit 0. Every field read in the codec goes
//! through [`read_bits`], so offsets can be expressed in bits regardless of
//! whether a field happens to be byte aligned.
//!
//! ```text
//!  byte:      0               1               2
//!  bit:   0 1 2 3 4 5 6 7 8 9 ...
//!        |MSB         LSB|MSB         LSB|...
//! ```

use super::error::FrameError;

/// Widest unsigned read supported by the primitive
pub const MAX_WIDTH: u32 = 32;

/// Read an unsigned integer of `width` bits starting at `bit_offset`.
///
/// Returns the value and the offset of the first bit after the field.
pub fn read_bits(buf: &[u8], bit_offset: usize, width: u32) -> Result<(u32, usize), FrameError> {
    if width == 0 || width > MAX_WIDTH {
        return Err(FrameError::InvalidWidth { width });
    }

    let available_bits = buf.len() * 8;
    let end = bit_offset
        .checked_add(width as usize)
        .filter(|end| *end <= available_bits)
        .ok_or(FrameError::OutOfBounds {
            bit_offset,
            width,
            available_bits,
        })?;

    // At most 5 bytes are touched for a 32-bit read at an unaligned offset
    let first_byte = bit_offset / 8;
    let last_byte = (end + 7) / 8;
    let mut acc: u64 = 0;
    for &byte in &buf[first_byte..last_byte] {
        acc = (acc << 8) | u64::from(byte);
    }

    let trailing = last_byte * 8 - end;
    let mask = (1u64 << width) - 1;
    Ok((((acc >> trailing) & mask) as u32, end))
}

/// Reinterpret the low 16 bits as a two's-complement signed value
pub fn sign_extend_16(value: u32) -> i16 {
    (value & 0xFFFF) as u16 as i16
}

/// Sequential reader over a frame
///
/// Thin cursor over [`read_bits`]; all typed reads advance the cursor by the
/// field width.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at bit 0
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Create a reader positioned at a byte offset
    pub fn at_byte(buf: &'a [u8], byte_offset: usize) -> Self {
        Self {
            buf,
            pos: byte_offset * 8,
        }
    }

    /// Current position in bits
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits left between the cursor and the end of the buffer
    pub fn remaining_bits(&self) -> usize {
        (self.buf.len() * 8).saturating_sub(self.pos)
    }

    /// Whether at least `bytes` whole bytes remain
    pub fn has_bytes(&self, bytes: usize) -> bool {
        self.remaining_bits() >= bytes * 8
    }

    /// Read an unsigned field of arbitrary width
    pub fn bits(&mut self, width: u32) -> Result<u32, FrameError> {
        let (value, next) = read_bits(self.buf, self.pos, width)?;
        self.pos = next;
        Ok(value)
    }

    pub fn u8(&mut self) -> Result<u8, FrameError> {
        Ok(self.bits(8)? as u8)
    }

    pub fn u16(&mut self) -> Result<u16, FrameError> {
        Ok(self.bits(16)? as u16)
    }

    pub fn i16(&mut self) -> Result<i16, FrameError> {
        Ok(sign_extend_16(self.bits(16)?))
    }

    pub fn u32(&mut self) -> Result<u32, FrameError> {
        self.bits(32)
    }

    /// Full-byte boolean (any nonzero value is true)
    pub fn bool(&mut self) -> Result<bool, FrameError> {
        Ok(self.u8()? != 0)
    }

    /// Fixed-width ASCII field, cut at the first NUL
    pub fn ascii(&mut self, len: usize) -> Result<String, FrameError> {
        let mut out = String::with_capacity(len);
        let mut terminated = false;
        for _ in 0..len {
            let byte = self.u8()?;
            if byte == 0 {
                terminated = true;
            }
            if !terminated {
                out.push(char::from(byte));
            }
        }
        Ok(out)
    }

    /// Advance the cursor without reading
    pub fn skip(&mut self, bits: usize) {
        self.pos += bits;
    }

    /// Advance the cursor by whole bytes
    pub fn skip_bytes(&mut self, bytes: usize) {
        self.pos += bytes * 8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_aligned_reads() {
        let buf = [0x12, 0x34, 0x56, 0x78, 0x9A];

        assert_eq!(read_bits(&buf, 0, 8).unwrap(), (0x12, 8));
        assert_eq!(read_bits(&buf, 8, 16).unwrap(), (0x3456, 24));
        assert_eq!(read_bits(&buf, 0, 32).unwrap(), (0x1234_5678, 32));
    }

    #[test]
    fn test_unaligned_reads() {
        // 1010_1100 0011_0101
        let buf = [0b1010_1100, 0b0011_0101];

        assert_eq!(read_bits(&buf, 0, 1).unwrap(), (1, 1));
        assert_eq!(read_bits(&buf, 1, 1).unwrap(), (0, 2));
        assert_eq!(read_bits(&buf, 2, 3).unwrap(), (0b101, 5));
        assert_eq!(read_bits(&buf, 5, 6).unwrap(), (0b100_001, 11));
        assert_eq!(read_bits(&buf, 11, 5).unwrap(), (0b10101, 16));
    }

    #[test]
    fn test_unaligned_32_bit_read_spans_five_bytes() {
        let buf = [0x0F, 0xFF, 0xFF, 0xFF, 0xF0];

        assert_eq!(read_bits(&buf, 4, 32).unwrap(), (0xFFFF_FFFF, 36));
    }

    #[test]
    fn test_out_of_bounds() {
        let buf = [0xFF, 0xFF];

        assert_eq!(
            read_bits(&buf, 9, 8),
            Err(FrameError::OutOfBounds {
                bit_offset: 9,
                width: 8,
                available_bits: 16
            })
        );
        assert!(read_bits(&buf, 8, 8).is_ok());
        assert!(read_bits(&[], 0, 1).is_err());
    }

    #[test]
    fn test_invalid_width() {
        let buf = [0u8; 8];

        assert_eq!(
            read_bits(&buf, 0, 0),
            Err(FrameError::InvalidWidth { width: 0 })
        );
        assert_eq!(
            read_bits(&buf, 0, 33),
            Err(FrameError::InvalidWidth { width: 33 })
        );
    }

    #[test]
    fn test_sign_extension() {
        assert_eq!(sign_extend_16(0x0000), 0);
        assert_eq!(sign_extend_16(0x7FFF), 32767);
        assert_eq!(sign_extend_16(0x8000), -32768);
        assert_eq!(sign_extend_16(0xFFFF), -1);
        assert_eq!(sign_extend_16(0xFFFE), -2);
    }

    #[test]
    fn test_reader_sequence() {
        let buf = [0xFF, 0xFE, 0x00, 0x00, 0x01, 0x00, 0x41, 0x42, 0x00, 0x43];
        let mut reader = BitReader::new(&buf);

        assert_eq!(reader.i16().unwrap(), -2);
        assert_eq!(reader.u32().unwrap(), 0x0000_0100);
        assert_eq!(reader.ascii(4).unwrap(), "AB");
        assert_eq!(reader.position(), 80);
        assert_eq!(reader.remaining_bits(), 0);
        assert!(reader.u8().is_err());
    }

    #[test]
    fn test_reader_bool() {
        let buf = [0x00, 0x01, 0x7F];
        let mut reader = BitReader::new(&buf);

        assert!(!reader.bool().unwrap());
        assert!(reader.bool().unwrap());
        assert!(reader.bool().unwrap());
    }

    #[test]
    fn test_reader_at_byte() {
        let buf = [0x00, 0x00, 0xAB];
        let mut reader = BitReader::at_byte(&buf, 2);

        assert!(reader.has_bytes(1));
        assert!(!reader.has_bytes(2));
        assert_eq!(reader.u8().unwrap(), 0xAB);
    }
}
