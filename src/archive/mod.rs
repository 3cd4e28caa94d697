//! Imagery archives
//!
//! An archive lists the scenes of a collection and loads the bands of one
//! scene onto the analysis grid. [`LocalArchive`] reads per-band GeoTIFF
//! files from disk; [`MemoryArchive`] serves images already in memory.

mod local;
mod memory;

use chrono::NaiveDate;
use std::fmt;

use crate::coordinate::{BoundingBox, RegionOfInterest};
use crate::errors::SceneResult;
use crate::raster::{Band, GridSpec, Image};

pub use self::local::LocalArchive;
pub use self::memory::MemoryArchive;

/// What the archive knows about a scene before its pixels are read
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub id: String,
    pub date: NaiveDate,
    /// Scene extent in its own CRS
    pub footprint: Option<BoundingBox>,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.date, self.id)?;
        if let Some(fp) = &self.footprint {
            write!(f, "  [{}, {}, {}, {}]", fp.min_x, fp.min_y, fp.max_x, fp.max_y)?;
            if let Some(epsg) = fp.epsg {
                write!(f, " EPSG:{}", epsg)?;
            }
        }
        Ok(())
    }
}

/// Scenes wanted from one collection
#[derive(Debug, Clone)]
pub struct ArchiveQuery {
    pub collection: String,
    /// First day included
    pub start: NaiveDate,
    /// First day excluded
    pub end: NaiveDate,
    pub region: RegionOfInterest,
    /// Analysis grid every loaded band is sampled onto
    pub grid: GridSpec,
    pub bands: Vec<String>,
    /// Band whose bit 0 flags fill pixels in every band
    pub fill_band: Option<String>,
}

impl ArchiveQuery {
    pub fn in_date_range(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Date window and footprint test; a scene without a known
    /// footprint is kept and clipped later
    pub fn matches(&self, scene: &SceneSummary) -> bool {
        self.in_date_range(scene.date)
            && scene
                .footprint
                .as_ref()
                .map_or(true, |fp| self.region.intersects_bbox(fp))
    }

    pub fn band_refs(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.as_str()).collect()
    }
}

/// A source of scenes
pub trait SceneArchive: Send + Sync {
    /// Human readable location, for logs
    fn describe(&self) -> String;

    /// Every scene of a collection, in acquisition order
    fn list(&self, collection: &str) -> SceneResult<Vec<SceneSummary>>;

    /// Loads one scene onto the query grid; `None` when the scene has to
    /// be skipped (incompatible CRS, missing band)
    fn load(&self, scene: &SceneSummary, query: &ArchiveQuery) -> SceneResult<Option<Image>>;

    /// Scenes of the query's collection inside its date window and region
    fn matching(&self, query: &ArchiveQuery) -> SceneResult<Vec<SceneSummary>> {
        Ok(self
            .list(&query.collection)?
            .into_iter()
            .filter(|scene| query.matches(scene))
            .collect())
    }

    /// Scenes matching the query, loaded
    fn query(&self, query: &ArchiveQuery) -> SceneResult<Vec<Image>> {
        let mut images = Vec::new();
        for scene in &self.matching(query)? {
            if let Some(image) = self.load(scene, query)? {
                images.push(image);
            }
        }
        Ok(images)
    }
}

/// Sets every band to NaN where bit 0 of the fill band is set
pub(crate) fn apply_fill_mask(image: Image, fill_band: &str) -> SceneResult<Image> {
    let fill: Vec<bool> = match image.band(fill_band) {
        Some(band) => band.data.iter().map(|v| !v.is_nan() && *v >= 0.0 && (*v as u64) & 1 == 1).collect(),
        None => return Ok(image),
    };
    if !fill.iter().any(|f| *f) {
        return Ok(image);
    }

    let mut out = image.clone_without_bands();
    for band in image.bands {
        let data = band
            .data
            .into_iter()
            .zip(&fill)
            .map(|(v, is_fill)| if *is_fill { f64::NAN } else { v })
            .collect();
        out = out.with_band(Band::new(band.name, data))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> ArchiveQuery {
        let bbox = BoundingBox::new(0.0, 0.0, 60.0, 30.0);
        ArchiveQuery {
            collection: "LANDSAT/LC08/C02/T1_L2".to_string(),
            start: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 7, 1).unwrap(),
            region: RegionOfInterest::from_bbox(&bbox).unwrap(),
            grid: GridSpec::from_bbox(&bbox, 30.0).unwrap(),
            bands: vec!["SR_B4".to_string()],
            fill_band: Some("QA_PIXEL".to_string()),
        }
    }

    #[test]
    fn date_range_is_half_open() {
        let q = query();
        assert!(q.in_date_range(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()));
        assert!(q.in_date_range(NaiveDate::from_ymd_opt(2020, 6, 30).unwrap()));
        assert!(!q.in_date_range(NaiveDate::from_ymd_opt(2020, 7, 1).unwrap()));
        assert!(!q.in_date_range(NaiveDate::from_ymd_opt(2020, 4, 30).unwrap()));
    }

    #[test]
    fn footprint_outside_region_does_not_match() {
        let q = query();
        let date = NaiveDate::from_ymd_opt(2020, 5, 10).unwrap();
        let far = SceneSummary { id: "a".into(), date, footprint: Some(BoundingBox::new(100.0, 100.0, 200.0, 200.0)) };
        let near = SceneSummary { id: "b".into(), date, footprint: Some(BoundingBox::new(50.0, -10.0, 200.0, 20.0)) };
        let unknown = SceneSummary { id: "c".into(), date, footprint: None };
        assert!(!q.matches(&far));
        assert!(q.matches(&near));
        assert!(q.matches(&unknown));
    }

    #[test]
    fn fill_bit_blanks_all_bands() {
        let q = query();
        let image = Image::new("a", q.start, q.grid)
            .with_band(Band::new("SR_B4", vec![7.0, 8.0]))
            .unwrap()
            .with_band(Band::new("QA_PIXEL", vec![1.0, 21824.0]))
            .unwrap();
        let out = apply_fill_mask(image, "QA_PIXEL").unwrap();
        assert!(out.band("SR_B4").unwrap().data[0].is_nan());
        assert_eq!(out.band("SR_B4").unwrap().data[1], 8.0);
        assert!(out.band("QA_PIXEL").unwrap().data[0].is_nan());
    }
}
