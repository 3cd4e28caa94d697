//! Byte order handling for GeoTIFF decoding
//!
//! Landsat band files are little-endian in practice, but third-party
//! rasters dropped into an archive may be Motorola-ordered. The reader
//! picks a handler once per file and routes every multi-byte read
//! through it, both for stream reads and for already-buffered bytes
//! (inline tag values and decompressed strips).

use byteorder::{BigEndian, ByteOrder as _, LittleEndian, ReadBytesExt};
use std::io::Result;

use crate::errors::{SceneError, SceneResult};
use crate::io::SeekableReader;

/// Byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the first two header bytes
    pub fn detect(reader: &mut dyn SeekableReader) -> SceneResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        match marker {
            0x4949 => Ok(ByteOrder::LittleEndian),
            0x4D4D => Ok(ByteOrder::BigEndian),
            _ => Err(SceneError::InvalidByteOrder(marker)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the handler strategy for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndianHandler),
            ByteOrder::BigEndian => Box::new(BigEndianHandler),
        }
    }
}

/// Strategy for reading multi-byte values in one byte order
pub trait ByteOrderHandler: Send + Sync {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;
    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;
    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;
    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;

    /// Decode from an in-memory slice; callers guarantee the slice length
    fn u16_from(&self, bytes: &[u8]) -> u16;
    fn u32_from(&self, bytes: &[u8]) -> u32;
    fn u64_from(&self, bytes: &[u8]) -> u64;
    fn f32_from(&self, bytes: &[u8]) -> f32;
    fn f64_from(&self, bytes: &[u8]) -> f64;

    /// Which order this handler implements
    fn order(&self) -> ByteOrder;
}

/// Little-endian byte order handler
pub struct LittleEndianHandler;

impl ByteOrderHandler for LittleEndianHandler {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<LittleEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<LittleEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<LittleEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<LittleEndian>()
    }

    fn u16_from(&self, bytes: &[u8]) -> u16 {
        LittleEndian::read_u16(bytes)
    }

    fn u32_from(&self, bytes: &[u8]) -> u32 {
        LittleEndian::read_u32(bytes)
    }

    fn u64_from(&self, bytes: &[u8]) -> u64 {
        LittleEndian::read_u64(bytes)
    }

    fn f32_from(&self, bytes: &[u8]) -> f32 {
        LittleEndian::read_f32(bytes)
    }

    fn f64_from(&self, bytes: &[u8]) -> f64 {
        LittleEndian::read_f64(bytes)
    }

    fn order(&self) -> ByteOrder {
        ByteOrder::LittleEndian
    }
}

/// Big-endian byte order handler
pub struct BigEndianHandler;

impl ByteOrderHandler for BigEndianHandler {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<BigEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<BigEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<BigEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<BigEndian>()
    }

    fn u16_from(&self, bytes: &[u8]) -> u16 {
        BigEndian::read_u16(bytes)
    }

    fn u32_from(&self, bytes: &[u8]) -> u32 {
        BigEndian::read_u32(bytes)
    }

    fn u64_from(&self, bytes: &[u8]) -> u64 {
        BigEndian::read_u64(bytes)
    }

    fn f32_from(&self, bytes: &[u8]) -> f32 {
        BigEndian::read_f32(bytes)
    }

    fn f64_from(&self, bytes: &[u8]) -> f64 {
        BigEndian::read_f64(bytes)
    }

    fn order(&self) -> ByteOrder {
        ByteOrder::BigEndian
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn detects_both_markers() {
        let mut ii = Cursor::new(vec![0x49, 0x49]);
        let mut mm = Cursor::new(vec![0x4D, 0x4D]);
        assert_eq!(ByteOrder::detect(&mut ii).unwrap(), ByteOrder::LittleEndian);
        assert_eq!(ByteOrder::detect(&mut mm).unwrap(), ByteOrder::BigEndian);
    }

    #[test]
    fn rejects_garbage_marker() {
        let mut bad = Cursor::new(vec![0x00, 0x01]);
        assert!(matches!(ByteOrder::detect(&mut bad), Err(SceneError::InvalidByteOrder(_))));
    }

    #[test]
    fn slice_decoding_follows_order() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(LittleEndianHandler.u16_from(&bytes), 0x0201);
        assert_eq!(BigEndianHandler.u16_from(&bytes), 0x0102);
        assert_eq!(BigEndianHandler.u32_from(&bytes), 0x01020304);
    }
}
