//! File layout and serialization
//!
//! Layout: header, every IFD back to back, external tag payloads, then
//! strip data, each block aligned to the word size of the format. All
//! offsets are computed up front so the file is written front to back.

use log::debug;
use std::collections::BTreeMap;
use std::io::Write;

use crate::errors::{SceneError, SceneResult};
use crate::tiff::constants::{header, tags};
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::ExternalData;
use crate::utils::write_utils;

pub struct WriterBuilder;

impl WriterBuilder {
    /// Serializes IFDs, tag payloads and strips as a little-endian file
    pub fn write(
        writer: &mut impl Write,
        is_big_tiff: bool,
        ifds: &[IFD],
        image_data: &BTreeMap<usize, Vec<u8>>,
        external_data: &ExternalData,
    ) -> SceneResult<u64> {
        let word = if is_big_tiff { 8 } else { 4 };
        let header_size = if is_big_tiff { 16 } else { 8 };

        let mut current = header_size;
        let mut ifd_offsets = Vec::with_capacity(ifds.len());
        for ifd in ifds {
            ifd_offsets.push(current);
            current = write_utils::align_to(current + Self::ifd_size(ifd, is_big_tiff), word);
        }

        let mut data_offsets: BTreeMap<(usize, u16), u64> = BTreeMap::new();
        for (key, data) in external_data {
            data_offsets.insert(*key, current);
            current = write_utils::align_to(current + data.len() as u64, word);
        }
        for (ifd_index, data) in image_data {
            data_offsets.insert((*ifd_index, tags::STRIP_OFFSETS), current);
            current = write_utils::align_to(current + data.len() as u64, word);
        }

        if !is_big_tiff && current > u32::MAX as u64 {
            return Err(SceneError::GenericError(format!(
                "{} bytes do not fit a classic TIFF, BigTIFF required",
                current
            )));
        }

        Self::write_header(writer, is_big_tiff, ifd_offsets.first().copied().unwrap_or(0))?;
        for (index, ifd) in ifds.iter().enumerate() {
            let next = ifd_offsets.get(index + 1).copied().unwrap_or(0);
            let size = Self::write_ifd(writer, ifd, index, next, &data_offsets, is_big_tiff)?;
            write_utils::write_padding(writer, size, word as usize)?;
        }
        for data in external_data.values() {
            writer.write_all(data)?;
            write_utils::write_padding(writer, data.len(), word as usize)?;
        }
        for data in image_data.values() {
            writer.write_all(data)?;
            write_utils::write_padding(writer, data.len(), word as usize)?;
        }
        writer.flush()?;

        debug!("Wrote {} IFDs, {} bytes", ifds.len(), current);
        Ok(current)
    }

    fn write_header(writer: &mut impl Write, is_big_tiff: bool, first_ifd_offset: u64) -> SceneResult<()> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;
        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;
            writer.write_all(&first_ifd_offset.to_le_bytes())?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&(first_ifd_offset as u32).to_le_bytes())?;
        }
        Ok(())
    }

    fn ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
        let entries = ifd.entry_count() as u64;
        if is_big_tiff {
            8 + 20 * entries + 8
        } else {
            2 + 12 * entries + 4
        }
    }

    /// Writes one IFD; returns the number of bytes written
    fn write_ifd(
        writer: &mut impl Write,
        ifd: &IFD,
        ifd_index: usize,
        next_offset: u64,
        data_offsets: &BTreeMap<(usize, u16), u64>,
        is_big_tiff: bool,
    ) -> SceneResult<usize> {
        if is_big_tiff {
            writer.write_all(&(ifd.entry_count() as u64).to_le_bytes())?;
        } else {
            writer.write_all(&(ifd.entry_count() as u16).to_le_bytes())?;
        }

        for entry in ifd.entries() {
            let value = data_offsets.get(&(ifd_index, entry.tag)).copied().unwrap_or(entry.value_offset);
            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;
            if is_big_tiff {
                writer.write_all(&entry.count.to_le_bytes())?;
                writer.write_all(&value.to_le_bytes())?;
            } else {
                writer.write_all(&(entry.count as u32).to_le_bytes())?;
                writer.write_all(&(value as u32).to_le_bytes())?;
            }
        }

        if is_big_tiff {
            writer.write_all(&next_offset.to_le_bytes())?;
        } else {
            writer.write_all(&(next_offset as u32).to_le_bytes())?;
        }
        Ok(Self::ifd_size(ifd, is_big_tiff) as usize)
    }
}
