//! GeoTIFF reading and writing
//!
//! The reader handles what Landsat Level-2 band files and common GDAL
//! output use (TIFF/BigTIFF, strips or tiles, none/deflate/zstd, integer
//! and float samples). The builder writes single-strip GeoTIFFs.

pub mod builder;
pub mod builders;
pub mod constants;
pub mod geo_keys;
pub mod ifd;
pub mod raster_reader;
pub mod reader;
pub mod types;
pub(crate) mod validation;

pub use builder::TiffBuilder;
pub use geo_keys::{GeoKeyParser, GeoReference};
pub use ifd::{IFDEntry, IFD};
pub use raster_reader::{RasterReader, SampleType, Window};
pub use reader::TiffReader;
pub use types::TIFF;
