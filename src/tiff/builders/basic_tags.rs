//! Raster structure tags
//!
//! Dimensions, sample layout, compression and the single-strip data
//! description of an exported raster.

use log::debug;
use std::collections::BTreeMap;

use crate::tiff::constants::{field_types, photometric, planar_config, tags};
use crate::tiff::ifd::{IFDEntry, IFD};
use crate::utils::tiff_utils::{self, ExternalData};

/// Sample layout of a raster about to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub sample_format: u16,
}

pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Adds the mandatory tags of a chunky grayscale raster with one or
    /// more bands
    pub fn add_raster_tags(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        layout: SampleLayout,
        compression: u16,
    ) {
        debug!("Adding raster tags: {:?}, compression {}", layout, compression);
        let spp = layout.samples_per_pixel as usize;

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, layout.width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, layout.height as u64));
        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, compression as u64));
        ifd.add_entry(IFDEntry::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            field_types::SHORT,
            1,
            photometric::BLACK_IS_ZERO as u64,
        ));
        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, spp as u64));
        ifd.add_entry(IFDEntry::new(
            tags::PLANAR_CONFIGURATION,
            field_types::SHORT,
            1,
            planar_config::CHUNKY as u64,
        ));

        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tags::BITS_PER_SAMPLE,
            field_types::SHORT,
            tiff_utils::shorts_to_bytes(&vec![layout.bits_per_sample; spp]),
        );
        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tags::SAMPLE_FORMAT,
            field_types::SHORT,
            tiff_utils::shorts_to_bytes(&vec![layout.sample_format; spp]),
        );

        // Bands beyond the first are plain data, not alpha
        if spp > 1 {
            tiff_utils::store_tag(
                ifd,
                external_data,
                ifd_index,
                is_big_tiff,
                tags::EXTRA_SAMPLES,
                field_types::SHORT,
                tiff_utils::shorts_to_bytes(&vec![0u16; spp - 1]),
            );
        }
    }

    /// Describes the whole raster as one strip holding `strip_data`
    ///
    /// StripOffsets is a placeholder; the writer patches it once the
    /// file layout is known.
    pub fn setup_single_strip(
        ifd: &mut IFD,
        image_data: &mut BTreeMap<usize, Vec<u8>>,
        ifd_index: usize,
        is_big_tiff: bool,
        strip_data: Vec<u8>,
    ) {
        let offset_type = if is_big_tiff { field_types::LONG8 } else { field_types::LONG };
        debug!("Single strip of {} bytes", strip_data.len());

        ifd.add_entry(IFDEntry::new(tags::STRIP_OFFSETS, offset_type, 1, 0));
        ifd.add_entry(IFDEntry::new(tags::STRIP_BYTE_COUNTS, offset_type, 1, strip_data.len() as u64));
        if let Some((_, height)) = ifd.get_dimensions() {
            ifd.add_entry(IFDEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, 1, height));
        }

        image_data.insert(ifd_index, strip_data);
    }
}
