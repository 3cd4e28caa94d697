//! Directory-tree archive of per-band GeoTIFF files
//!
//! Layout: `<root>/<collection id>/<scene id>/<scene id>_<BAND>.TIF`,
//! e.g. `LANDSAT/LC08/C02/T1_L2/LC08_L2SP_190026_20200517_20200527_02_T1/
//! LC08_L2SP_190026_20200517_20200527_02_T1_SR_B4.TIF`.

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::archive::{apply_fill_mask, ArchiveQuery, SceneArchive, SceneSummary};
use crate::coordinate::BoundingBox;
use crate::errors::{SceneError, SceneResult};
use crate::raster::resample::resample_nearest;
use crate::raster::{Band, GridSpec, Image, PropertyValue};
use crate::tiff::{GeoKeyParser, GeoReference, RasterReader, TiffReader, Window, IFD};
use crate::utils::date_utils;

lazy_static! {
    /// `LC08_L2SP_190026_20200517_20200527_02_T1`: sensor, level, path/row, acquired
    static ref PRODUCT_ID: Regex = Regex::new(r"^([A-Z0-9]{4})_[A-Z0-9]{4}_(\d{6})_(\d{8})(?:_|$)")
        .unwrap_or_else(|e| panic!("invalid product id pattern: {}", e));
}

/// Acquisition date and WRS path/row of a Landsat product id
pub fn parse_product_id(id: &str) -> Option<(chrono::NaiveDate, String)> {
    let captures = PRODUCT_ID.captures(id)?;
    let date = date_utils::parse_compact_date(&captures[3]).ok()?;
    Some((date, captures[2].to_string()))
}

pub struct LocalArchive {
    root: PathBuf,
}

impl LocalArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalArchive { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> SceneResult<PathBuf> {
        if !self.root.is_dir() {
            return Err(SceneError::ArchiveUnavailable(format!(
                "Archive root {} is not a directory",
                self.root.display()
            )));
        }
        let dir = collection.split('/').fold(self.root.clone(), |path, part| path.join(part));
        if !dir.is_dir() {
            return Err(SceneError::ArchiveUnavailable(format!(
                "Collection {} not found under {}",
                collection,
                self.root.display()
            )));
        }
        Ok(dir)
    }

    /// Path of one band file; accepts `.TIF` and `.tif`
    fn band_path(scene_dir: &Path, scene_id: &str, band: &str) -> Option<PathBuf> {
        ["TIF", "tif"]
            .iter()
            .map(|ext| scene_dir.join(format!("{}_{}.{}", scene_id, band, ext)))
            .find(|p| p.is_file())
    }

    /// Any band file of a scene, for its footprint
    fn first_band_file(scene_dir: &Path) -> SceneResult<Option<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(scene_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| e.eq_ignore_ascii_case("tif"))
            })
            .collect();
        files.sort();
        Ok(files.into_iter().next())
    }
}

impl SceneArchive for LocalArchive {
    fn describe(&self) -> String {
        format!("local archive at {}", self.root.display())
    }

    fn list(&self, collection: &str) -> SceneResult<Vec<SceneSummary>> {
        let dir = self.collection_dir(collection)?;
        let mut scenes = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let id = match path.file_name().and_then(|n| n.to_str()) {
                Some(id) => id.to_string(),
                None => continue,
            };
            let date = match parse_product_id(&id) {
                Some((date, _)) => date,
                None => {
                    warn!("Skipping {}: not a Landsat product id", id);
                    continue;
                }
            };

            let footprint = match Self::first_band_file(&path)? {
                Some(file) => match BandFile::open(&file) {
                    Ok(band) => Some(band.footprint()),
                    Err(e) => {
                        warn!("Cannot read footprint of {}: {}", id, e);
                        None
                    }
                },
                None => {
                    warn!("Skipping {}: no band files", id);
                    continue;
                }
            };
            scenes.push(SceneSummary { id, date, footprint });
        }

        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        debug!("{} scenes in {}", scenes.len(), dir.display());
        Ok(scenes)
    }

    fn load(&self, scene: &SceneSummary, query: &ArchiveQuery) -> SceneResult<Option<Image>> {
        let scene_dir = self.collection_dir(&query.collection)?.join(&scene.id);
        let mut image = Image::new(scene.id.clone(), scene.date, query.grid);
        if let Some((_, path_row)) = parse_product_id(&scene.id) {
            image = image.with_property("WRS_PATH_ROW", PropertyValue::Text(path_row));
        }

        for band_name in &query.bands {
            let path = match Self::band_path(&scene_dir, &scene.id, band_name) {
                Some(path) => path,
                None => {
                    warn!("Skipping {}: band {} missing", scene.id, band_name);
                    return Ok(None);
                }
            };

            let mut band_file = BandFile::open(&path)?;
            if let (Some(scene_epsg), Some(grid_epsg)) = (band_file.geo.epsg, query.grid.epsg) {
                if scene_epsg != grid_epsg {
                    warn!(
                        "Skipping {}: EPSG:{} differs from analysis grid EPSG:{}",
                        scene.id, scene_epsg, grid_epsg
                    );
                    return Ok(None);
                }
            }

            if image.footprint.is_none() {
                image = image.with_footprint(band_file.footprint());
            }
            let data = band_file.sample_onto(&query.grid)?;
            image = image.with_band(Band::new(band_name.clone(), data))?;
        }

        if let Some(fill_band) = &query.fill_band {
            image = apply_fill_mask(image, fill_band)?;
        }
        info!("Loaded {}", image);
        Ok(Some(image))
    }
}

/// One open single-band GeoTIFF
struct BandFile {
    tiff_reader: TiffReader,
    file: BufReader<File>,
    ifd: IFD,
    geo: GeoReference,
    width: u32,
    height: u32,
}

impl BandFile {
    fn open(path: &Path) -> SceneResult<Self> {
        let mut tiff_reader = TiffReader::new();
        let (tiff, mut file) = tiff_reader.open(path)?;
        let ifd = tiff.main_ifd().ok_or(SceneError::InvalidHeader)?.clone();
        let (width, height) = ifd.get_dimensions().ok_or(SceneError::MissingDimensions)?;
        let geo = GeoKeyParser::read_georeference(&tiff_reader, &mut file, &ifd)?;
        if geo.geotransform[2] != 0.0 || geo.geotransform[4] != 0.0 {
            return Err(SceneError::GenericError(format!(
                "{} is rotated; only north-up rasters are supported",
                path.display()
            )));
        }
        Ok(BandFile { tiff_reader, file, ifd, geo, width: width as u32, height: height as u32 })
    }

    fn grid(&self) -> GridSpec {
        GridSpec::new(self.width, self.height, self.geo.geotransform, self.geo.epsg)
    }

    fn footprint(&self) -> BoundingBox {
        self.grid().bounds()
    }

    /// Reads the part of the first sample covering `grid` and samples it
    /// onto `grid`; no-data values become NaN
    fn sample_onto(&mut self, grid: &GridSpec) -> SceneResult<Vec<f64>> {
        let gt = self.geo.geotransform;
        let window = match grid
            .bounds()
            .to_pixel_window(&gt)
            .intersect(&Window::full(self.width, self.height))
        {
            Some(window) => window,
            None => return Ok(vec![f64::NAN; grid.len()]),
        };

        let raster = RasterReader::new(&self.tiff_reader, &mut self.file, &self.ifd)?;
        let mut planes = raster.read_window(&mut self.file, window)?;
        if planes.is_empty() {
            return Err(SceneError::UnsupportedSampleLayout("raster without samples".to_string()));
        }
        let mut data = planes.swap_remove(0);

        if let Some(nodata) = self.geo.nodata.filter(|n| !n.is_nan()) {
            for value in data.iter_mut().filter(|v| **v == nodata) {
                *value = f64::NAN;
            }
        }

        let window_grid = GridSpec::new(
            window.width,
            window.height,
            [
                gt[0] + window.x as f64 * gt[1],
                gt[1],
                0.0,
                gt[3] + window.y as f64 * gt[5],
                0.0,
                gt[5],
            ],
            self.geo.epsg,
        );
        Ok(resample_nearest(&data, &window_grid, grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn product_ids_give_date_and_path_row() {
        let (date, path_row) = parse_product_id("LC08_L2SP_190026_20200517_20200527_02_T1").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 5, 17).unwrap());
        assert_eq!(path_row, "190026");
        assert!(parse_product_id("LC08_L2SP_190026_20201345_20200527_02_T1").is_none());
        assert!(parse_product_id("notes").is_none());
    }

    #[test]
    fn missing_root_is_retryable() {
        let archive = LocalArchive::new("/nonexistent/scenekit/archive");
        let err = archive.list("LANDSAT/LC08/C02/T1_L2").unwrap_err();
        assert!(err.is_retryable());
    }
}
