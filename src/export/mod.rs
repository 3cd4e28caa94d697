//! GeoTIFF export of summary rasters
//!
//! Resamples a summary onto a grid fitted to the region, clips it to the
//! region polygon, encodes the samples and writes a single-strip GeoTIFF.

mod encoding;
mod geotiff;

pub use self::encoding::SampleEncoding;
pub use self::geotiff::{ExportOutcome, ExportRequest, GeoTiffSink, DEFAULT_MAX_PIXELS};
