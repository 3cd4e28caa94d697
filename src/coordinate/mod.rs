//! Spatial selection
//!
//! Bounding boxes and the region of interest that filters scenes and
//! clips exported products.

mod bbox;
mod region;

pub use self::bbox::BoundingBox;
pub use self::region::RegionOfInterest;
