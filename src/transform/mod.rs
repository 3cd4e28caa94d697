//! Per-image transforms
//!
//! Each transform maps one [`Image`](crate::raster::Image) to a new one.
//! [`TransformChain::standard`] runs them in the fixed order scale, mask,
//! index, tag.

mod chain;
mod cloud_mask;
mod ndvi;
mod scale;
mod time_tag;

use crate::errors::SceneResult;
use crate::raster::Image;

pub use self::chain::TransformChain;
pub use self::cloud_mask::CloudMask;
pub use self::ndvi::{NdviTransform, NDVI_BAND};
pub use self::scale::ScaleFactors;
pub use self::time_tag::{TimeTag, DATE_PROPERTY, TIME_BAND};

/// A pure image-to-image step
pub trait ImageTransform: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, image: &Image) -> SceneResult<Image>;
}
