//! Strip compression codecs
//!
//! Archive band files arrive deflate- or zstd-compressed; exports may
//! be written with either. Codecs are strategies selected by the TIFF
//! compression code.

mod deflate;
mod factory;
mod handler;
mod zstd;

pub use deflate::DeflateHandler;
pub use factory::CompressionFactory;
pub use handler::{CompressionHandler, UncompressedHandler};
pub use zstd::ZstdHandler;
