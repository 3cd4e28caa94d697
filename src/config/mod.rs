//! Run configuration
//!
//! Settings come from three layers: command-line flags, an optional TOML
//! file (`[run]` and `[sensors.*]` tables) and built-in defaults. Each
//! layer is a [`RunSettings`] of optional values; [`RunSettings::merge`]
//! lets the higher layer win and [`RunSettings::resolve`] validates the
//! result into a [`RunConfig`].

mod settings;

pub use self::settings::{RegionSource, RunConfig, RunSettings};

/// Collection 2 Level-2 products are delivered at 30 m
pub const DEFAULT_SCALE: f64 = 30.0;
pub const DEFAULT_SENSOR: &str = "landsat8";
pub const DEFAULT_COMPRESSION: &str = "deflate";
