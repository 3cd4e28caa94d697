//! PNG quicklooks of summary rasters
//!
//! Stateless: a [`VisParams`] picks one band, stretches `[min, max]`
//! over a palette and renders no-data transparent.

mod palette;

use chrono::NaiveDate;
use image::{Rgba, RgbaImage};
use log::info;
use std::fs;
use std::path::Path;

use crate::errors::{SceneError, SceneResult};
use crate::raster::SummaryRaster;
use crate::utils::date_utils;

pub use self::palette::{Palette, RgbColor};

/// How to draw one band
#[derive(Debug, Clone, PartialEq)]
pub struct VisParams {
    pub band: String,
    pub min: f64,
    pub max: f64,
    pub palette: Palette,
}

impl VisParams {
    pub fn new(band: impl Into<String>, min: f64, max: f64, palette: Palette) -> Self {
        VisParams { band: band.into(), min, max, palette }
    }

    /// NDVI 0..1, grayscale
    pub fn ndvi(band: impl Into<String>) -> Self {
        VisParams::new(band, 0.0, 1.0, Palette::grayscale())
    }

    /// Surface temperature 280..330 K, grayscale
    pub fn lst(band: impl Into<String>) -> Self {
        VisParams::new(band, 280.0, 330.0, Palette::grayscale())
    }

    /// `YYYYMMDD` between the run's start and end, blue to cyan
    pub fn day_of_max(band: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        VisParams::new(
            band,
            date_utils::encode_yyyymmdd(start) as f64,
            date_utils::encode_yyyymmdd(end) as f64,
            Palette::blue_cyan(),
        )
    }

    /// Scenes per pixel 0..10, grayscale
    pub fn scene_count(band: impl Into<String>) -> Self {
        VisParams::new(band, 0.0, 10.0, Palette::grayscale())
    }

    /// Position of `value` in `[min, max]`, clamped; `None` for no-data
    fn stretch(&self, value: f64) -> Option<f64> {
        if value.is_nan() {
            return None;
        }
        let range = self.max - self.min;
        if range <= 0.0 {
            return Some(if value >= self.max { 1.0 } else { 0.0 });
        }
        Some(((value - self.min) / range).clamp(0.0, 1.0))
    }
}

/// Renders one band of a summary raster
pub fn render(raster: &SummaryRaster, vis: &VisParams) -> SceneResult<RgbaImage> {
    let band = raster.band(&vis.band).ok_or_else(|| SceneError::MissingBand {
        image: raster.name.clone(),
        band: vis.band.clone(),
    })?;

    let width = raster.grid.width;
    let mut image = RgbaImage::new(width, raster.grid.height);
    for (i, value) in band.data.iter().enumerate() {
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        let pixel = match vis.stretch(*value) {
            Some(t) => {
                let color = vis.palette.color_at(t);
                Rgba([color.r, color.g, color.b, 255])
            }
            None => Rgba([0, 0, 0, 0]),
        };
        image.put_pixel(x, y, pixel);
    }
    Ok(image)
}

/// Renders and writes a PNG
pub fn save_png(raster: &SummaryRaster, vis: &VisParams, path: &Path) -> SceneResult<()> {
    let image = render(raster, vis)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| SceneError::GenericError(format!("Failed to write {}: {}", path.display(), e)))?;
    info!("Quicklook {} -> {}", vis.band, path.display());
    Ok(())
}
