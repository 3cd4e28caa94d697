//! Zstandard codec, TIFF compression code 14

use log::warn;

use super::handler::CompressionHandler;
use crate::errors::{SceneError, SceneResult};
use crate::tiff::constants::compression;

pub struct ZstdHandler {
    /// Compression level (1-22)
    compression_level: i32,
}

impl ZstdHandler {
    pub fn new() -> Self {
        ZstdHandler { compression_level: 9 }
    }

    pub fn with_level(level: i32) -> Self {
        ZstdHandler { compression_level: level.clamp(1, 22) }
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8]) -> SceneResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        zstd::decode_all(data).map_err(|e| {
            warn!("ZSTD decompression error: {}", e);
            SceneError::GenericError(format!("ZSTD decompression error: {}", e))
        })
    }

    fn compress(&self, data: &[u8]) -> SceneResult<Vec<u8>> {
        zstd::encode_all(data, self.compression_level)
            .map_err(|e| SceneError::GenericError(format!("ZSTD compression error: {}", e)))
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn code(&self) -> u16 {
        compression::ZSTD
    }
}
