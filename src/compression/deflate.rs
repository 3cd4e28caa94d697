//! Deflate (zlib) codec, TIFF compression codes 8 and 32946

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::handler::CompressionHandler;
use crate::errors::SceneResult;
use crate::tiff::constants::compression;

/// Zlib-wrapped deflate as GDAL writes it
pub struct DeflateHandler {
    level: u32,
}

impl DeflateHandler {
    pub fn new() -> Self {
        DeflateHandler { level: 6 }
    }

    /// Level 0 (store) to 9 (best)
    pub fn with_level(level: u32) -> Self {
        DeflateHandler { level: level.min(9) }
    }
}

impl Default for DeflateHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for DeflateHandler {
    fn decompress(&self, data: &[u8]) -> SceneResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    }

    fn compress(&self, data: &[u8]) -> SceneResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "deflate"
    }

    fn code(&self) -> u16 {
        compression::DEFLATE
    }
}
