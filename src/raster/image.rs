//! Images, bands and reduced rasters

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::coordinate::BoundingBox;
use crate::errors::{SceneError, SceneResult};
use crate::raster::GridSpec;
use crate::utils::date_utils;

/// One named band, row-major over its image's grid
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub data: Vec<f64>,
}

impl Band {
    pub fn new(name: impl Into<String>, data: Vec<f64>) -> Self {
        Band { name: name.into(), data }
    }

    /// Band with every cell set to `value`
    pub fn filled(name: impl Into<String>, len: usize, value: f64) -> Self {
        Band::new(name, vec![value; len])
    }

    /// Cells holding data (not NaN)
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Scene metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A single acquisition: ordered bands on one grid plus metadata
///
/// Transforms never mutate an image in place; each returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub date: NaiveDate,
    pub grid: GridSpec,
    pub bands: Vec<Band>,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Scene extent in the grid's CRS; absent means "covers the grid"
    pub footprint: Option<BoundingBox>,
}

impl Image {
    pub fn new(id: impl Into<String>, date: NaiveDate, grid: GridSpec) -> Self {
        Image {
            id: id.into(),
            date,
            grid,
            bands: Vec::new(),
            properties: BTreeMap::new(),
            footprint: None,
        }
    }

    /// Appends a band, or replaces the band of the same name in place
    pub fn with_band(mut self, band: Band) -> SceneResult<Self> {
        if band.data.len() != self.grid.len() {
            return Err(SceneError::GridMismatch(format!(
                "Band {} of {} has {} cells, grid has {}",
                band.name,
                self.id,
                band.data.len(),
                self.grid.len()
            )));
        }
        match self.bands.iter_mut().find(|b| b.name == band.name) {
            Some(existing) => *existing = band,
            None => self.bands.push(band),
        }
        Ok(self)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_footprint(mut self, footprint: BoundingBox) -> Self {
        self.footprint = Some(footprint);
        self
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.name == name)
    }

    /// Like [`Image::band`] but a missing band is an error
    pub fn require_band(&self, name: &str) -> SceneResult<&Band> {
        self.band(name).ok_or_else(|| SceneError::MissingBand {
            image: self.id.clone(),
            band: name.to_string(),
        })
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// Copy holding only `names`, in that order
    pub fn select(&self, names: &[&str]) -> SceneResult<Image> {
        let bands = names
            .iter()
            .map(|name| self.require_band(name).cloned())
            .collect::<SceneResult<Vec<_>>>()?;
        Ok(Image { bands, ..self.clone_without_bands() })
    }

    /// Copy with the same metadata and no bands
    pub fn clone_without_bands(&self) -> Image {
        Image {
            id: self.id.clone(),
            date: self.date,
            grid: self.grid,
            bands: Vec::new(),
            properties: self.properties.clone(),
            footprint: self.footprint,
        }
    }

    /// Acquisition date as `YYYYMMDD`
    pub fn date_tag(&self) -> u32 {
        date_utils::encode_yyyymmdd(self.date)
    }

    /// Extent used when filtering by region
    pub fn extent(&self) -> BoundingBox {
        self.footprint.unwrap_or_else(|| self.grid.bounds())
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.id, self.date, self.band_names().join(", "))
    }
}

/// Result of a temporal reduction
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRaster {
    pub name: String,
    pub grid: GridSpec,
    pub bands: Vec<Band>,
}

impl SummaryRaster {
    pub fn new(name: impl Into<String>, grid: GridSpec, bands: Vec<Band>) -> Self {
        SummaryRaster { name: name.into(), grid, bands }
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Image {
        let grid = GridSpec::new(2, 1, [0.0, 30.0, 0.0, 60.0, 0.0, -30.0], Some(32633));
        Image::new("LC08_TEST", NaiveDate::from_ymd_opt(2020, 5, 17).unwrap(), grid)
            .with_band(Band::new("SR_B4", vec![1.0, 2.0]))
            .unwrap()
            .with_band(Band::new("SR_B5", vec![3.0, f64::NAN]))
            .unwrap()
    }

    #[test]
    fn select_keeps_requested_order() {
        let selected = sample().select(&["SR_B5", "SR_B4"]).unwrap();
        assert_eq!(selected.band_names(), vec!["SR_B5", "SR_B4"]);
    }

    #[test]
    fn missing_band_is_named() {
        match sample().select(&["QA_PIXEL"]) {
            Err(SceneError::MissingBand { image, band }) => {
                assert_eq!(image, "LC08_TEST");
                assert_eq!(band, "QA_PIXEL");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn band_length_must_match_grid() {
        assert!(sample().with_band(Band::new("NDVI", vec![0.0; 3])).is_err());
    }

    #[test]
    fn with_band_replaces_same_name() {
        let image = sample().with_band(Band::new("SR_B4", vec![9.0, 9.0])).unwrap();
        assert_eq!(image.bands.len(), 2);
        assert_eq!(image.band("SR_B4").unwrap().data, vec![9.0, 9.0]);
        assert_eq!(image.band("SR_B5").unwrap().valid_count(), 1);
        assert_eq!(image.date_tag(), 20200517);
    }
}
