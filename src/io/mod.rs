//! I/O utilities for file handling
//!
//! Byte-order aware readers used by the GeoTIFF decoder.

pub mod byte_order;

use std::io::{Read, Seek};

/// Readers that can both read and seek
///
/// TIFF decoding jumps between directory entries and strip data, so
/// every decoder entry point takes one of these.
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
