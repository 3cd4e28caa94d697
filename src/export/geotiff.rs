//! Single-strip GeoTIFF sink

use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compression::CompressionFactory;
use crate::coordinate::RegionOfInterest;
use crate::errors::{SceneError, SceneResult};
use crate::export::SampleEncoding;
use crate::raster::resample::resample_nearest;
use crate::raster::{GridSpec, SummaryRaster};
use crate::tiff::builders::basic_tags::SampleLayout;
use crate::tiff::constants::tags;
use crate::tiff::TiffBuilder;

/// Pixel ceiling applied when none is configured
pub const DEFAULT_MAX_PIXELS: u64 = 10_000_000_000;

/// One raster to write
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    pub raster: &'a SummaryRaster,
    /// File stem of the output
    pub description: String,
    /// Output pixel size in CRS units
    pub scale: f64,
    pub region: &'a RegionOfInterest,
    /// Upper bound on width * height * bands
    pub max_pixels: u64,
    pub encoding: SampleEncoding,
    /// `none`, `deflate` or `zstd`
    pub compression: String,
}

/// What was written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub grid: GridSpec,
    pub bands: usize,
    pub bytes: u64,
}

pub struct GeoTiffSink {
    output_dir: PathBuf,
}

impl GeoTiffSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        GeoTiffSink { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output grid of a request: the region's bounding box snapped
    /// outward to the export scale
    pub fn target_grid(request: &ExportRequest) -> SceneResult<GridSpec> {
        let epsg = request.region.epsg().or(request.raster.grid.epsg);
        let bbox = request.region.bounding_box().with_epsg(epsg);
        GridSpec::from_bbox(&bbox, request.scale)
    }

    /// Pixel ceiling for `bands` bands over the region at `scale`
    ///
    /// Works on the snapped extent alone, so it can run before any
    /// raster of that size is allocated. Returns the requested count.
    pub fn check_ceiling(region: &RegionOfInterest, scale: f64, bands: usize, max_pixels: u64) -> SceneResult<u64> {
        let (width, height) = GridSpec::snapped_size(region.bounding_box(), scale)?;
        let requested = width.saturating_mul(height).saturating_mul(bands as u64);
        if requested > max_pixels {
            return Err(SceneError::PixelCeilingExceeded { requested, allowed: max_pixels });
        }
        Ok(requested)
    }

    /// Output grid of a request, after the pixel ceiling check
    pub fn check(request: &ExportRequest) -> SceneResult<GridSpec> {
        let bands = request.raster.band_count();
        Self::check_ceiling(request.region, request.scale, bands, request.max_pixels)?;
        if bands == 0 || bands > u16::MAX as usize {
            return Err(SceneError::UnsupportedSampleLayout(format!("cannot export {} bands", bands)));
        }
        Self::target_grid(request)
    }

    /// Validates, encodes and writes; no file is left behind on error
    pub fn export(&self, request: &ExportRequest) -> SceneResult<ExportOutcome> {
        let grid = Self::check(request)?;
        let bands = request.raster.band_count();
        let codec = CompressionFactory::get_handler_by_name(&request.compression)?;

        info!(
            "Exporting {} ({}) on {} as {}, {} compression",
            request.description,
            request.raster.band_names().join(", "),
            grid,
            request.encoding,
            codec.name()
        );

        let inside = region_mask(&grid, request.region);
        let planes: Vec<Vec<f64>> = request
            .raster
            .bands
            .iter()
            .map(|band| {
                let mut data = resample_nearest(&band.data, &request.raster.grid, &grid);
                for (value, keep) in data.iter_mut().zip(&inside) {
                    if !keep {
                        *value = f64::NAN;
                    }
                }
                data
            })
            .collect();

        let strip = interleave(&planes, grid.len(), request.encoding);
        let packed = codec.compress(&strip)?;
        debug!("Strip {} bytes, {} after {}", strip.len(), packed.len(), codec.name());

        let mut builder = TiffBuilder::for_payload(packed.len() as u64);
        let ifd = builder.add_ifd();
        builder.add_raster_tags(
            ifd,
            SampleLayout {
                width: grid.width,
                height: grid.height,
                samples_per_pixel: bands as u16,
                bits_per_sample: request.encoding.bits_per_sample(),
                sample_format: request.encoding.sample_format(),
            },
            codec.code(),
        )?;
        builder.setup_single_strip(ifd, packed)?;
        builder.add_georeferencing(ifd, &grid.geotransform, grid.epsg)?;
        builder.add_nodata_tag(ifd, request.encoding.nodata())?;
        let items = vec![
            ("PRODUCT".to_string(), request.raster.name.clone()),
            ("ENCODING".to_string(), request.encoding.to_string()),
        ];
        let descriptions: Vec<String> = request.raster.band_names().iter().map(|n| n.to_string()).collect();
        builder.add_gdal_metadata_tag(ifd, &items, &descriptions)?;
        builder.add_ascii_tag(ifd, tags::IMAGE_DESCRIPTION, &request.description)?;
        builder.add_ascii_tag(ifd, tags::SOFTWARE, concat!("scenekit ", env!("CARGO_PKG_VERSION")))?;

        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.tif", request.description));
        let part = self.output_dir.join(format!("{}.tif.part", request.description));
        if let Err(e) = builder.write(&part).and_then(|_| fs::rename(&part, &path).map_err(SceneError::from)) {
            if let Err(cleanup) = fs::remove_file(&part) {
                warn!("Could not remove {}: {}", part.display(), cleanup);
            }
            return Err(e);
        }

        let bytes = fs::metadata(&path)?.len();
        info!("Wrote {} ({} bytes)", path.display(), bytes);
        Ok(ExportOutcome { path, grid, bands, bytes })
    }
}

/// Whether each pixel centre of `grid` lies inside the region
fn region_mask(grid: &GridSpec, region: &RegionOfInterest) -> Vec<bool> {
    let width = grid.width as usize;
    let mut mask = vec![false; grid.len()];
    if width == 0 {
        return mask;
    }
    mask.par_chunks_mut(width).enumerate().for_each(|(row, cells)| {
        for (col, cell) in cells.iter_mut().enumerate() {
            let (x, y) = grid.pixel_center(col as u32, row as u32);
            *cell = region.contains(x, y);
        }
    });
    mask
}

/// Chunky pixel order: all bands of pixel 0, then pixel 1, ...
fn interleave(planes: &[Vec<f64>], pixels: usize, encoding: SampleEncoding) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels * planes.len() * encoding.bytes_per_sample());
    for i in 0..pixels {
        for plane in planes {
            encoding.encode_into(plane[i], &mut out);
        }
    }
    out
}
