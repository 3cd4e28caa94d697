//! Factory for creating compression handlers

use super::deflate::DeflateHandler;
use super::handler::{CompressionHandler, UncompressedHandler};
use super::zstd::ZstdHandler;
use crate::errors::{SceneError, SceneResult};
use crate::tiff::constants::compression;

pub struct CompressionFactory;

impl CompressionFactory {
    /// Handler for a Compression tag value found in a file
    pub fn create_handler(code: u64) -> SceneResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code) {
            Ok(compression::NONE) => Ok(Box::new(UncompressedHandler)),
            Ok(compression::DEFLATE) | Ok(compression::DEFLATE_OLD) => Ok(Box::new(DeflateHandler::new())),
            Ok(compression::ZSTD) => Ok(Box::new(ZstdHandler::new())),
            _ => Err(SceneError::UnsupportedCompression(code)),
        }
    }

    /// Handler for a user-facing name (`none`, `deflate`, `zstd`)
    pub fn get_handler_by_name(name: &str) -> SceneResult<Box<dyn CompressionHandler>> {
        match name.to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" => Ok(Box::new(DeflateHandler::new())),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            _ => Err(SceneError::InvalidConfig(format!(
                "Unknown compression '{}', expected none, deflate or zstd",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_writable_codec_reads_back() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        for name in ["none", "deflate", "zstd"] {
            let handler = CompressionFactory::get_handler_by_name(name).unwrap();
            let packed = handler.compress(&data).unwrap();
            let reader = CompressionFactory::create_handler(handler.code() as u64).unwrap();
            assert_eq!(reader.decompress(&packed).unwrap(), data, "codec {}", name);
        }
    }

    #[test]
    fn lzw_is_not_supported() {
        assert!(matches!(
            CompressionFactory::create_handler(5),
            Err(SceneError::UnsupportedCompression(5))
        ));
    }

    #[test]
    fn unknown_name_is_a_config_error() {
        assert!(matches!(
            CompressionFactory::get_handler_by_name("lzma"),
            Err(SceneError::InvalidConfig(_))
        ));
    }
}
