//! Image File Directory (IFD) structures
//!
//! An IFD is the tag table describing one raster inside a TIFF file.
//! Entries keep the raw value field next to the parsed offset so that
//! small arrays stored inline can be decoded in the file's byte order.

use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::tiff::constants::{field_types, tags};
use crate::utils::tag_utils;

/// One tag entry of an IFD
#[derive(Debug, Clone, PartialEq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values, decoded in the file's byte order
    pub value_offset: u64,
    /// The raw value field as it appeared in the file (4 or 8 bytes used)
    pub inline: [u8; 8],
}

impl IFDEntry {
    /// Creates an entry from a decoded value field
    ///
    /// Used by the writer, which always produces little-endian files;
    /// the raw bytes are derived from `value_offset`.
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline: value_offset.to_le_bytes(),
        }
    }

    /// Creates an entry as read from a file
    pub fn from_raw(tag: u16, field_type: u16, count: u64, value_offset: u64, inline: [u8; 8]) -> Self {
        Self { tag, field_type, count, value_offset, inline }
    }

    /// Size in bytes of one value of this entry's type
    pub fn field_type_size(&self) -> usize {
        field_type_size(self.field_type)
    }

    /// Total payload size in bytes
    pub fn byte_len(&self) -> usize {
        self.field_type_size() * self.count as usize
    }

    /// Whether the payload lives in the value field instead of at an offset
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.byte_len() <= inline_size
    }

    pub fn description(&self) -> String {
        format!(
            "Tag: {} ({}), Type: {} ({}), Count: {}, Value/Offset: {}",
            self.tag,
            tag_utils::get_tag_name(self.tag),
            self.field_type,
            tag_utils::get_field_type_name(self.field_type),
            self.count,
            self.value_offset
        )
    }
}

/// Size in bytes of one value of a TIFF field type
pub fn field_type_size(field_type: u16) -> usize {
    match field_type {
        field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => 1,
        field_types::SHORT | field_types::SSHORT => 2,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => 8,
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
        _ => 1,
    }
}

/// An Image File Directory
///
/// Entries are kept sorted by tag, which is also the order the writer
/// must emit them in.
#[derive(Debug, Clone)]
pub struct IFD {
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file (0 until written)
    pub offset: u64,
    entries: BTreeMap<u16, IFDEntry>,
}

impl IFD {
    pub fn new(number: usize, offset: u64) -> Self {
        Self { number, offset, entries: BTreeMap::new() }
    }

    /// Adds or replaces an entry
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("IFD #{}: {}", self.number, entry.description());
        self.entries.insert(entry.tag, entry);
    }

    /// The value field of a tag, for single-valued tags
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.entries.get(&tag).map(|entry| entry.value_offset)
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.entries.get(&tag)
    }

    pub fn get_entry_mut(&mut self, tag: u16) -> Option<&mut IFDEntry> {
        self.entries.get_mut(&tag)
    }

    /// Entries in ascending tag order
    pub fn entries(&self) -> impl Iterator<Item = &IFDEntry> {
        self.entries.values()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Width and height, if both tags are present
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Samples per pixel (defaults to 1)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether the raster is stored in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_OFFSETS)
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;

        writeln!(f, "  Tags:")?;
        for entry in self.entries.values() {
            let value_display = match entry.tag {
                tags::COMPRESSION => format!(
                    "{} ({})",
                    entry.value_offset,
                    tag_utils::get_compression_name(entry.value_offset)
                ),
                _ if entry.count > 1 => format!("{} values", entry.count),
                _ => entry.value_offset.to_string(),
            };
            writeln!(
                f,
                "    {} ({}): {} [{}]",
                entry.tag,
                tag_utils::get_tag_name(entry.tag),
                value_display,
                tag_utils::get_field_type_name(entry.field_type)
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_iterate_in_tag_order() {
        let mut ifd = IFD::new(0, 0);
        ifd.add_entry(IFDEntry::new(tags::SAMPLE_FORMAT, field_types::SHORT, 1, 3));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 10));
        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, 1));

        let order: Vec<u16> = ifd.entries().map(|e| e.tag).collect();
        assert_eq!(order, vec![tags::IMAGE_WIDTH, tags::COMPRESSION, tags::SAMPLE_FORMAT]);
    }

    #[test]
    fn inline_threshold_depends_on_format() {
        let two_shorts = IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 2, 0);
        let three_shorts = IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 3, 0);
        assert!(two_shorts.is_value_inline(false));
        assert!(!three_shorts.is_value_inline(false));
        assert!(three_shorts.is_value_inline(true));
    }

    #[test]
    fn missing_dimensions_are_none() {
        let mut ifd = IFD::new(0, 0);
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 10));
        assert_eq!(ifd.get_dimensions(), None);
        assert_eq!(ifd.get_samples_per_pixel(), 1);
    }
}
