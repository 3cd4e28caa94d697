use log::{debug, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveQuery, LocalArchive, SceneArchive, SceneSummary};
use crate::collection::{split_views, Collection, CollectionLoader};
use crate::config::RunConfig;
use crate::errors::{SceneError, SceneResult};
use crate::export::{ExportOutcome, ExportRequest, GeoTiffSink, SampleEncoding};
use crate::presenter::{self, VisParams};
use crate::raster::{GridSpec, SummaryRaster};
use crate::reducer::{self, Reducer};
use crate::tiff::builders::metadata_tags::parse_band_descriptions;
use crate::tiff::constants::tags;
use crate::tiff::{GeoKeyParser, RasterReader, TiffReader};
use crate::transform::{TransformChain, NDVI_BAND, TIME_BAND};

/// Exported products and their band counts
const PRODUCT_BANDS: [(&str, usize); 3] = [("ndvi", 1), ("lst", 1), ("greenest", 2)];

/// The summary mosaics of one run
#[derive(Debug, Clone)]
pub struct Summaries {
    pub ndvi_mean: SummaryRaster,
    pub ndvi_median: SummaryRaster,
    /// Maximum NDVI and the `YYYYMMDD` of the image that held it
    pub greenest: SummaryRaster,
    pub lst_mean: SummaryRaster,
    /// Valid NDVI observations per pixel
    pub scene_count: SummaryRaster,
}

/// What a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scene_ids: Vec<String>,
    pub exports: Vec<ExportOutcome>,
    pub quicklooks: Vec<PathBuf>,
}

/// Main interface to the scenekit library
pub struct SceneKit {
    config: RunConfig,
}

impl SceneKit {
    pub fn new(config: RunConfig) -> Self {
        SceneKit { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The region's bounding box at the analysis scale
    pub fn analysis_grid(&self) -> SceneResult<GridSpec> {
        GridSpec::from_bbox(self.config.region.bounding_box(), self.config.scale)
    }

    pub fn query(&self) -> SceneResult<ArchiveQuery> {
        let profile = &self.config.profile;
        Ok(ArchiveQuery {
            collection: self.config.collection.clone(),
            start: self.config.start,
            end: self.config.end,
            region: self.config.region.clone(),
            grid: self.analysis_grid()?,
            bands: profile.required_bands().into_iter().map(String::from).collect(),
            fill_band: Some(profile.qa.clone()),
        })
    }

    /// Scenes the run would use, without reading pixels
    pub fn list_scenes(&self, archive: &dyn SceneArchive) -> SceneResult<Vec<SceneSummary>> {
        archive.matching(&self.query()?)
    }

    /// Query plus the standard transform chain
    pub fn load_collection(&self, archive: &dyn SceneArchive) -> SceneResult<Collection> {
        let chain = TransformChain::standard(&self.config.profile);
        CollectionLoader::new(archive)
            .with_progress(self.config.progress)
            .load(&self.query()?, &chain)
    }

    /// Splits into the NDVI and LST views and reduces them
    pub fn summarize(&self, collection: &Collection) -> SceneResult<Summaries> {
        let views = split_views(collection, &self.config.profile)?;
        let thermal = self.config.profile.thermal.as_str();
        Ok(Summaries {
            ndvi_mean: reducer::mean(&views.ndvi, NDVI_BAND)?,
            ndvi_median: reducer::median(&views.ndvi, NDVI_BAND)?,
            greenest: Reducer::MaxWithCoBand { coband: TIME_BAND.to_string() }.reduce(&views.ndvi, NDVI_BAND)?,
            lst_mean: reducer::mean(&views.lst, thermal)?,
            scene_count: reducer::count(&views.ndvi, NDVI_BAND)?,
        })
    }

    /// The three GeoTIFF products of a run
    pub fn export_requests<'a>(&'a self, summaries: &'a Summaries) -> Vec<ExportRequest<'a>> {
        let request = |raster: &'a SummaryRaster, product: &str, encoding: SampleEncoding| ExportRequest {
            raster,
            description: self.config.output_name(product),
            scale: self.config.scale,
            region: &self.config.region,
            max_pixels: self.config.max_pixels,
            encoding,
            compression: self.config.compression.clone(),
        };
        vec![
            request(&summaries.ndvi_mean, "ndvi", SampleEncoding::Int16 { multiplier: 1000.0 }),
            request(&summaries.lst_mean, "lst", SampleEncoding::Int16 { multiplier: 1.0 }),
            request(&summaries.greenest, "greenest", SampleEncoding::Float64),
        ]
    }

    /// Pixel ceiling of every product, from the region extent alone
    pub fn check_ceilings(&self) -> SceneResult<()> {
        for (product, bands) in PRODUCT_BANDS.iter() {
            let requested =
                GeoTiffSink::check_ceiling(&self.config.region, self.config.scale, *bands, self.config.max_pixels)?;
            debug!("{}: {} of {} pixels", product, requested, self.config.max_pixels);
        }
        Ok(())
    }

    /// Writes every product; all ceilings are checked before the first write
    pub fn export(&self, summaries: &Summaries) -> SceneResult<Vec<ExportOutcome>> {
        let requests = self.export_requests(summaries);
        for request in &requests {
            GeoTiffSink::check(request)?;
        }
        let sink = GeoTiffSink::new(&self.config.output_dir);
        requests.iter().map(|request| sink.export(request)).collect()
    }

    pub fn render_quicklooks(&self, summaries: &Summaries) -> SceneResult<Vec<PathBuf>> {
        let dir = self.config.output_dir.join("quicklooks");
        let max_band = format!("{}_max", NDVI_BAND);
        let day_band = format!("{}_at_max", TIME_BAND);
        let layers = [
            (&summaries.ndvi_mean, VisParams::ndvi(summaries.ndvi_mean.name.clone()), "ndvi_mean"),
            (&summaries.ndvi_median, VisParams::ndvi(summaries.ndvi_median.name.clone()), "ndvi_median"),
            (&summaries.greenest, VisParams::ndvi(max_band), "ndvi_max"),
            (
                &summaries.greenest,
                VisParams::day_of_max(day_band, self.config.start, self.config.end),
                "day_of_max_ndvi",
            ),
            (&summaries.lst_mean, VisParams::lst(summaries.lst_mean.name.clone()), "lst_mean"),
            (&summaries.scene_count, VisParams::scene_count(summaries.scene_count.name.clone()), "scenes"),
        ];

        let mut written = Vec::with_capacity(layers.len());
        for (raster, vis, product) in layers.iter() {
            let path = dir.join(format!("{}.png", self.config.output_name(product)));
            presenter::save_png(raster, vis, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// The whole pipeline against any archive
    pub fn run(&self, archive: &dyn SceneArchive) -> SceneResult<RunReport> {
        info!(
            "Run {} {}..{} over {:?} at {} m",
            self.config.profile.name,
            self.config.start,
            self.config.end,
            self.config.region.bounding_box(),
            self.config.scale
        );
        self.check_ceilings()?;
        let collection = self.load_collection(archive)?;
        if collection.is_empty() {
            warn!("No usable scenes; products will hold no data");
        }

        let summaries = self.summarize(&collection)?;
        let exports = self.export(&summaries)?;
        let quicklooks = if self.config.quicklooks {
            self.render_quicklooks(&summaries)?
        } else {
            Vec::new()
        };

        Ok(RunReport {
            scene_ids: collection.images().iter().map(|i| i.id.clone()).collect(),
            exports,
            quicklooks,
        })
    }

    /// The whole pipeline against the configured archive directory
    pub fn run_local(&self) -> SceneResult<RunReport> {
        self.run(&LocalArchive::new(&self.config.archive))
    }

    /// Structure and georeferencing of a GeoTIFF, as text
    pub fn inspect(path: &Path) -> SceneResult<String> {
        let mut tiff_reader = TiffReader::new();
        let (tiff, mut file) = tiff_reader.open(path)?;
        let ifd = tiff.main_ifd().ok_or(SceneError::InvalidHeader)?;

        let mut out = format!("{}\n", path.display());
        let fmt_err = |e: std::fmt::Error| SceneError::GenericError(e.to_string());
        write!(out, "{}", tiff).map_err(fmt_err)?;

        let raster = RasterReader::new(&tiff_reader, &mut file, ifd)?;
        let layout = raster.layout();
        writeln!(
            out,
            "Raster: {}x{}, {} band(s) of {:?}, compression {}",
            layout.width,
            layout.height,
            layout.samples_per_pixel,
            layout.sample_type,
            layout.compression
        )
        .map_err(fmt_err)?;

        match GeoKeyParser::read_georeference(&tiff_reader, &mut file, ifd) {
            Ok(geo) => {
                let grid = GridSpec::new(layout.width, layout.height, geo.geotransform, geo.epsg);
                writeln!(out, "Grid: {}", grid).map_err(fmt_err)?;
                let b = grid.bounds();
                writeln!(out, "Bounds: {}, {}, {}, {}", b.min_x, b.min_y, b.max_x, b.max_y).map_err(fmt_err)?;
                if let Some(nodata) = geo.nodata {
                    writeln!(out, "No-data: {}", nodata).map_err(fmt_err)?;
                }
            }
            Err(e) => writeln!(out, "Not georeferenced: {}", e).map_err(fmt_err)?,
        }

        if ifd.has_tag(tags::GDAL_METADATA) {
            let xml = tiff_reader.read_tag_ascii(&mut file, ifd, tags::GDAL_METADATA)?;
            for (i, description) in parse_band_descriptions(&xml).iter().enumerate() {
                writeln!(out, "Band {}: {}", i + 1, description).map_err(fmt_err)?;
            }
        }
        Ok(out)
    }
}
