pub mod api;
pub mod archive;
pub mod collection;
pub mod commands;
pub mod compression;
pub mod config;
pub mod coordinate;
pub mod errors;
pub mod export;
pub mod io;
pub mod presenter;
pub mod raster;
pub mod reducer;
pub mod sensor;
pub mod tiff;
pub mod transform;
pub mod utils;

pub use crate::api::SceneKit;

pub use archive::{LocalArchive, MemoryArchive, SceneArchive};
pub use config::{RunConfig, RunSettings};
pub use coordinate::{BoundingBox, RegionOfInterest};
pub use errors::{SceneError, SceneResult};
pub use tiff::TiffReader;
