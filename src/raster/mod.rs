//! In-memory raster model
//!
//! Every stage after the archive works on materialized `f64` bands laid
//! out row-major over a shared [`GridSpec`]. No-data is `NaN`.

mod grid;
mod image;
pub mod resample;

pub use self::grid::GridSpec;
pub use self::image::{Band, Image, PropertyValue, SummaryRaster};
