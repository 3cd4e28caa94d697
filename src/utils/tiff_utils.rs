//! Tag construction helpers shared by the tag builders
//!
//! Payloads that fit the IFD value field are packed inline; larger ones
//! are parked in the external data map and patched with a file offset
//! when the writer lays the file out.

use std::collections::BTreeMap;

use crate::tiff::ifd::{field_type_size, IFDEntry, IFD};

/// Out-of-line tag payloads keyed by (IFD index, tag)
pub type ExternalData = BTreeMap<(usize, u16), Vec<u8>>;

/// Adds a tag whose payload is already little-endian encoded
///
/// Replaces any previous entry and payload for the same tag.
pub fn store_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    is_big_tiff: bool,
    tag: u16,
    field_type: u16,
    data: Vec<u8>,
) {
    let count = (data.len() / field_type_size(field_type)) as u64;
    let inline_size = if is_big_tiff { 8 } else { 4 };

    external_data.remove(&(ifd_index, tag));
    if data.len() <= inline_size {
        let mut packed = [0u8; 8];
        packed[..data.len()].copy_from_slice(&data);
        ifd.add_entry(IFDEntry::new(tag, field_type, count, u64::from_le_bytes(packed)));
    } else {
        ifd.add_entry(IFDEntry::new(tag, field_type, count, 0));
        external_data.insert((ifd_index, tag), data);
    }
}

pub fn shorts_to_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn doubles_to_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// ASCII payload with the mandatory NUL terminator
pub fn ascii_to_bytes(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
