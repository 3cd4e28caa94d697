//! Compression handler trait definition

use crate::errors::SceneResult;

/// Strategy trait for one TIFF compression scheme
pub trait CompressionHandler: Send + Sync {
    /// Inflate one strip or tile
    fn decompress(&self, data: &[u8]) -> SceneResult<Vec<u8>>;

    /// Deflate one strip or tile
    fn compress(&self, data: &[u8]) -> SceneResult<Vec<u8>>;

    fn name(&self) -> &'static str;

    /// Value written to the Compression tag
    fn code(&self) -> u16;
}

/// Pass-through handler (compression code 1)
pub struct UncompressedHandler;

impl CompressionHandler for UncompressedHandler {
    fn decompress(&self, data: &[u8]) -> SceneResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn compress(&self, data: &[u8]) -> SceneResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "none"
    }

    fn code(&self) -> u16 {
        crate::tiff::constants::compression::NONE
    }
}
