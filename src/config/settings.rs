//! Layered run settings

use chrono::NaiveDate;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compression::CompressionFactory;
use crate::config::{DEFAULT_COMPRESSION, DEFAULT_SCALE, DEFAULT_SENSOR};
use crate::coordinate::{BoundingBox, RegionOfInterest};
use crate::errors::{SceneError, SceneResult};
use crate::export::DEFAULT_MAX_PIXELS;
use crate::sensor::{SensorProfile, SensorRegistry};
use crate::utils::date_utils;

/// Where the region of interest comes from
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSource {
    Bbox(BoundingBox),
    GeoJson(PathBuf),
}

/// One configuration layer; `None` means "not set here"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSettings {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub region: Option<RegionSource>,
    pub epsg: Option<u16>,
    pub archive: Option<PathBuf>,
    pub collection: Option<String>,
    pub sensor: Option<String>,
    pub scale: Option<f64>,
    pub max_pixels: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub compression: Option<String>,
    pub quicklooks: Option<bool>,
    pub progress: Option<bool>,
}

impl RunSettings {
    /// Reads the `[run]` table of a TOML document
    ///
    /// Relative paths are resolved against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> SceneResult<Self> {
        let toml_value: toml::Value = content
            .parse()
            .map_err(|e| SceneError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;
        let table = match toml_value.get("run") {
            Some(value) => value
                .as_table()
                .ok_or_else(|| SceneError::InvalidConfig("'run' must be a table".to_string()))?,
            None => return Ok(RunSettings::default()),
        };

        let text = |key: &str| -> SceneResult<Option<String>> {
            match table.get(key) {
                None => Ok(None),
                Some(v) => v
                    .as_str()
                    .map(|s| Some(s.to_string()))
                    .ok_or_else(|| SceneError::InvalidConfig(format!("run.{} must be a string", key))),
            }
        };
        let integer = |key: &str| -> SceneResult<Option<i64>> {
            match table.get(key) {
                None => Ok(None),
                Some(v) => v
                    .as_integer()
                    .or_else(|| v.as_float().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .map(Some)
                    .ok_or_else(|| SceneError::InvalidConfig(format!("run.{} must be an integer", key))),
            }
        };
        let boolean = |key: &str| -> SceneResult<Option<bool>> {
            match table.get(key) {
                None => Ok(None),
                Some(v) => v
                    .as_bool()
                    .map(Some)
                    .ok_or_else(|| SceneError::InvalidConfig(format!("run.{} must be true or false", key))),
            }
        };
        let path = |key: &str| -> SceneResult<Option<PathBuf>> { Ok(text(key)?.map(|p| base_dir.join(p))) };

        let bbox = text("bbox")?.map(|b| BoundingBox::from_string(&b)).transpose()?;
        let region_file = path("region_file")?;
        let region = match (bbox, region_file) {
            (Some(_), Some(_)) => {
                return Err(SceneError::InvalidConfig("run.bbox and run.region_file are exclusive".to_string()))
            }
            (Some(bbox), None) => Some(RegionSource::Bbox(bbox)),
            (None, Some(file)) => Some(RegionSource::GeoJson(file)),
            (None, None) => None,
        };

        let epsg = integer("epsg")?
            .map(|e| u16::try_from(e).map_err(|_| SceneError::InvalidConfig(format!("run.epsg {} out of range", e))))
            .transpose()?;
        let max_pixels = integer("max_pixels")?
            .map(|m| u64::try_from(m).map_err(|_| SceneError::InvalidConfig(format!("run.max_pixels {} must be positive", m))))
            .transpose()?;
        let scale = match table.get("scale") {
            None => None,
            Some(v) => Some(
                v.as_float()
                    .or_else(|| v.as_integer().map(|i| i as f64))
                    .ok_or_else(|| SceneError::InvalidConfig("run.scale must be a number".to_string()))?,
            ),
        };

        Ok(RunSettings {
            start: text("start")?.map(|d| date_utils::parse_iso_date(&d)).transpose()?,
            end: text("end")?.map(|d| date_utils::parse_iso_date(&d)).transpose()?,
            region,
            epsg,
            archive: path("archive")?,
            collection: text("collection")?,
            sensor: text("sensor")?,
            scale,
            max_pixels,
            output_dir: path("output_dir")?,
            compression: text("compression")?,
            quicklooks: boolean("quicklooks")?,
            progress: boolean("progress")?,
        })
    }

    pub fn from_toml_file(path: &Path) -> SceneResult<Self> {
        let content = fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base_dir)
    }

    /// Values set in `higher` win over values set in `self`
    pub fn merge(self, higher: RunSettings) -> RunSettings {
        RunSettings {
            start: higher.start.or(self.start),
            end: higher.end.or(self.end),
            region: higher.region.or(self.region),
            epsg: higher.epsg.or(self.epsg),
            archive: higher.archive.or(self.archive),
            collection: higher.collection.or(self.collection),
            sensor: higher.sensor.or(self.sensor),
            scale: higher.scale.or(self.scale),
            max_pixels: higher.max_pixels.or(self.max_pixels),
            output_dir: higher.output_dir.or(self.output_dir),
            compression: higher.compression.or(self.compression),
            quicklooks: higher.quicklooks.or(self.quicklooks),
            progress: higher.progress.or(self.progress),
        }
    }

    /// Applies defaults and validates
    pub fn resolve(self, sensors: SensorRegistry) -> SceneResult<RunConfig> {
        let start = self.start.ok_or_else(|| SceneError::InvalidConfig("A start date is required".to_string()))?;
        let end = self.end.ok_or_else(|| SceneError::InvalidConfig("An end date is required".to_string()))?;
        if start >= end {
            return Err(SceneError::InvalidConfig(format!(
                "Start date {} must be before end date {} (end is excluded)",
                start, end
            )));
        }

        let region = match self.region {
            Some(RegionSource::Bbox(bbox)) => RegionOfInterest::from_bbox(&bbox.with_epsg(self.epsg))?,
            Some(RegionSource::GeoJson(path)) => RegionOfInterest::from_geojson_file(&path, self.epsg)?,
            None => {
                return Err(SceneError::InvalidConfig(
                    "A region is required (bbox or GeoJSON region file)".to_string(),
                ))
            }
        };
        if let (Some(flag), Some(file)) = (self.epsg, region.epsg()) {
            if flag != file {
                return Err(SceneError::InvalidConfig(format!(
                    "Region file declares EPSG:{} but EPSG:{} was requested; regions are not reprojected",
                    file, flag
                )));
            }
        }

        let scale = self.scale.unwrap_or(DEFAULT_SCALE);
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SceneError::InvalidConfig(format!("Scale must be positive, got {}", scale)));
        }

        let compression = self.compression.unwrap_or_else(|| DEFAULT_COMPRESSION.to_string());
        CompressionFactory::get_handler_by_name(&compression)?;

        let sensor = self.sensor.unwrap_or_else(|| DEFAULT_SENSOR.to_string());
        let profile = sensors.get(&sensor)?.clone();
        let collection = self.collection.unwrap_or_else(|| profile.collection.clone());

        let config = RunConfig {
            start,
            end,
            region,
            archive: self.archive.unwrap_or_else(|| PathBuf::from(".")),
            collection,
            profile,
            scale,
            max_pixels: self.max_pixels.unwrap_or(DEFAULT_MAX_PIXELS),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            compression,
            quicklooks: self.quicklooks.unwrap_or(false),
            progress: self.progress.unwrap_or(true),
        };
        debug!("Resolved run configuration: {:?}", config);
        Ok(config)
    }
}

/// A validated run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub start: NaiveDate,
    /// Excluded
    pub end: NaiveDate,
    pub region: RegionOfInterest,
    pub archive: PathBuf,
    pub collection: String,
    pub profile: SensorProfile,
    pub scale: f64,
    pub max_pixels: u64,
    pub output_dir: PathBuf,
    pub compression: String,
    pub quicklooks: bool,
    pub progress: bool,
}

impl RunConfig {
    /// `<sensor>_<product>_<start>_<end>`
    pub fn output_name(&self, product: &str) -> String {
        format!("{}_{}_{}_{}", self.profile.name, product, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_layer() -> RunSettings {
        RunSettings::from_toml_str(
            r#"
            [run]
            start = "2020-05-01"
            end = "2020-06-30"
            bbox = "500000,4190000,530000,4200000"
            epsg = 32633
            archive = "data"
            scale = 60
            max_pixels = 1e10
            quicklooks = true
            "#,
            Path::new("/srv/runs"),
        )
        .unwrap()
    }

    #[test]
    fn toml_run_table_is_read() {
        let settings = file_layer();
        assert_eq!(settings.start, Some(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()));
        assert_eq!(settings.archive, Some(PathBuf::from("/srv/runs/data")));
        assert_eq!(settings.scale, Some(60.0));
        assert_eq!(settings.max_pixels, Some(10_000_000_000));
        assert_eq!(settings.epsg, Some(32633));
    }

    #[test]
    fn cli_layer_wins_over_file() {
        let cli = RunSettings { scale: Some(30.0), sensor: Some("landsat9".into()), ..Default::default() };
        let config = file_layer().merge(cli).resolve(SensorRegistry::builtin()).unwrap();
        assert_eq!(config.scale, 30.0);
        assert_eq!(config.collection, "LANDSAT/LC09/C02/T1_L2");
        assert!(config.quicklooks);
        assert_eq!(config.region.epsg(), Some(32633));
        assert_eq!(config.output_name("ndvi"), "landsat9_ndvi_2020-05-01_2020-06-30");
    }

    #[test]
    fn defaults_apply() {
        let config = file_layer().resolve(SensorRegistry::builtin()).unwrap();
        assert_eq!(config.profile.name, "landsat8");
        assert_eq!(config.compression, DEFAULT_COMPRESSION);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn inverted_dates_are_rejected() {
        let cli = RunSettings { end: Some(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()), ..Default::default() };
        assert!(matches!(
            file_layer().merge(cli).resolve(SensorRegistry::builtin()),
            Err(SceneError::InvalidConfig(_))
        ));
    }

    #[test]
    fn region_is_required() {
        let settings = RunSettings { region: None, ..file_layer() };
        assert!(settings.resolve(SensorRegistry::builtin()).is_err());
    }

    #[test]
    fn bbox_and_region_file_are_exclusive() {
        let result = RunSettings::from_toml_str("[run]\nbbox = \"0,0,1,1\"\nregion_file = \"a.geojson\"\n", Path::new("."));
        assert!(result.is_err());
    }
}
