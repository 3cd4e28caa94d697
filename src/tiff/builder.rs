//! GeoTIFF construction
//!
//! `TiffBuilder` collects IFDs, tag payloads and strip data and hands
//! them to the writer. Tag groups are delegated to the strategy
//! builders in [`crate::tiff::builders`].

use log::{debug, error};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::{SceneError, SceneResult};
use crate::tiff::builders::basic_tags::{BasicTagsBuilder, SampleLayout};
use crate::tiff::builders::geo_tags::GeoTagsBuilder;
use crate::tiff::builders::metadata_tags::MetadataBuilder;
use crate::tiff::builders::writer::WriterBuilder;
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::ExternalData;

/// Classic TIFF addresses at most 4 GiB; leave room for tags
const CLASSIC_TIFF_LIMIT: u64 = u32::MAX as u64 - 16 * 1024 * 1024;

/// Builder for GeoTIFF files
pub struct TiffBuilder {
    is_big_tiff: bool,
    ifds: Vec<IFD>,
    image_data: BTreeMap<usize, Vec<u8>>,
    external_data: ExternalData,
}

impl TiffBuilder {
    pub fn new(is_big_tiff: bool) -> Self {
        TiffBuilder {
            is_big_tiff,
            ifds: Vec::new(),
            image_data: BTreeMap::new(),
            external_data: ExternalData::new(),
        }
    }

    /// Picks BigTIFF when the payload would not fit a classic TIFF
    pub fn for_payload(payload_bytes: u64) -> Self {
        Self::new(payload_bytes > CLASSIC_TIFF_LIMIT)
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Appends an empty IFD and returns its index
    pub fn add_ifd(&mut self) -> usize {
        let index = self.ifds.len();
        self.ifds.push(IFD::new(index, 0));
        index
    }

    pub fn ifd(&self, ifd_index: usize) -> Option<&IFD> {
        self.ifds.get(ifd_index)
    }

    fn checked_index(&self, ifd_index: usize) -> SceneResult<()> {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
            return Err(SceneError::GenericError(format!(
                "Invalid IFD index {}, only have {} IFDs",
                ifd_index,
                self.ifds.len()
            )));
        }
        Ok(())
    }

    /// Dimensions, sample layout and compression
    pub fn add_raster_tags(&mut self, ifd_index: usize, layout: SampleLayout, compression: u16) -> SceneResult<()> {
        self.checked_index(ifd_index)?;
        BasicTagsBuilder::add_raster_tags(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            self.is_big_tiff,
            layout,
            compression,
        );
        Ok(())
    }

    /// Stores the (already compressed) pixel data as a single strip
    pub fn setup_single_strip(&mut self, ifd_index: usize, strip_data: Vec<u8>) -> SceneResult<()> {
        self.checked_index(ifd_index)?;
        BasicTagsBuilder::setup_single_strip(
            &mut self.ifds[ifd_index],
            &mut self.image_data,
            ifd_index,
            self.is_big_tiff,
            strip_data,
        );
        Ok(())
    }

    pub fn add_georeferencing(&mut self, ifd_index: usize, geotransform: &[f64; 6], epsg: Option<u16>) -> SceneResult<()> {
        self.checked_index(ifd_index)?;
        GeoTagsBuilder::add_georeferencing(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            self.is_big_tiff,
            geotransform,
            epsg,
        );
        Ok(())
    }

    pub fn add_nodata_tag(&mut self, ifd_index: usize, nodata: f64) -> SceneResult<()> {
        self.checked_index(ifd_index)?;
        MetadataBuilder::add_nodata_tag(&mut self.ifds[ifd_index], &mut self.external_data, ifd_index, self.is_big_tiff, nodata);
        Ok(())
    }

    pub fn add_gdal_metadata_tag(&mut self, ifd_index: usize, items: &[(String, String)], band_descriptions: &[String]) -> SceneResult<()> {
        self.checked_index(ifd_index)?;
        MetadataBuilder::add_gdal_metadata_tag(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            self.is_big_tiff,
            items,
            band_descriptions,
        );
        Ok(())
    }

    pub fn add_ascii_tag(&mut self, ifd_index: usize, tag: u16, text: &str) -> SceneResult<()> {
        self.checked_index(ifd_index)?;
        MetadataBuilder::add_ascii_tag(&mut self.ifds[ifd_index], &mut self.external_data, ifd_index, self.is_big_tiff, tag, text);
        Ok(())
    }

    /// Serializes the file into memory
    pub fn to_bytes(&self) -> SceneResult<Vec<u8>> {
        let mut bytes = Vec::new();
        WriterBuilder::write(&mut bytes, self.is_big_tiff, &self.ifds, &self.image_data, &self.external_data)?;
        Ok(bytes)
    }

    /// Writes the file to disk
    pub fn write(&self, output_path: &Path) -> SceneResult<()> {
        debug!("Writing TIFF to {}", output_path.display());
        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        WriterBuilder::write(&mut writer, self.is_big_tiff, &self.ifds, &self.image_data, &self.external_data)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::{compression, sample_format, tags};
    use crate::tiff::geo_keys::GeoKeyParser;
    use crate::tiff::raster_reader::{RasterReader, SampleType};
    use crate::tiff::reader::TiffReader;
    use std::io::Cursor;

    fn two_band_float(big: bool) -> Vec<u8> {
        let values: [f32; 12] = [0.1, 20200501.0, 0.2, 20200517.0, f32::NAN, f32::NAN, 0.4, 20200602.0, 0.5, 20200618.0, 0.6, 20200501.0];
        let strip: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

        let mut builder = TiffBuilder::new(big);
        let ifd = builder.add_ifd();
        let layout = SampleLayout { width: 3, height: 2, samples_per_pixel: 2, bits_per_sample: 32, sample_format: sample_format::IEEEFP };
        builder.add_raster_tags(ifd, layout, compression::NONE).unwrap();
        builder.setup_single_strip(ifd, strip).unwrap();
        builder.add_georeferencing(ifd, &[500000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0], Some(32633)).unwrap();
        builder.add_nodata_tag(ifd, f64::NAN).unwrap();
        builder.to_bytes().unwrap()
    }

    #[test]
    fn written_file_reads_back() {
        for big in [false, true] {
            let mut cursor = Cursor::new(two_band_float(big));
            let mut reader = TiffReader::new();
            let tiff = reader.read(&mut cursor).unwrap();
            assert_eq!(tiff.is_big_tiff, big);
            let ifd = tiff.main_ifd().unwrap();

            let raster = RasterReader::new(&reader, &mut cursor, ifd).unwrap();
            assert_eq!(raster.layout().sample_type, SampleType::F32);
            let planes = raster.read_all(&mut cursor).unwrap();
            assert_eq!(planes.len(), 2);
            assert!((planes[0][1] - 0.2).abs() < 1e-6);
            assert_eq!(planes[1][3], 20200602.0);
            assert!(planes[0][2].is_nan());

            let geo = GeoKeyParser::read_georeference(&reader, &mut cursor, ifd).unwrap();
            assert_eq!(geo.geotransform, [500000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0]);
            assert_eq!(geo.epsg, Some(32633));
            assert!(geo.nodata.unwrap().is_nan());
        }
    }

    #[test]
    fn entries_are_sorted_on_disk() {
        let bytes = two_band_float(false);
        let mut cursor = Cursor::new(bytes);
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        let order: Vec<u16> = tiff.main_ifd().unwrap().entries().map(|e| e.tag).collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
        assert!(order.contains(&tags::EXTRA_SAMPLES));
    }

    #[test]
    fn bad_ifd_index_is_an_error() {
        let mut builder = TiffBuilder::new(false);
        assert!(builder.add_nodata_tag(3, 0.0).is_err());
    }
}
