//! Sanity checks applied while decoding untrusted TIFF files

use log::{error, warn};
use std::io::{Seek, SeekFrom};

use crate::errors::{SceneError, SceneResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::tiff::constants::header;

/// Rejects IFD offsets pointing into the header or past the end of file
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> SceneResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(SceneError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }
    Ok(())
}

/// Size of the underlying stream; restores the current position
///
/// Falls back to `u64::MAX` when the stream cannot seek to its end.
pub fn get_file_size(reader: &mut dyn SeekableReader) -> SceneResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;
    Ok(file_size)
}

/// Checks the BigTIFF offset-size and reserved fields after the version
pub fn validate_bigtiff_header(reader: &mut dyn SeekableReader, handler: &dyn ByteOrderHandler) -> SceneResult<()> {
    let offset_size = handler.read_u16(reader)?;
    let zeros = handler.read_u16(reader)?;

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(SceneError::InvalidBigTIFFHeader);
    }
    Ok(())
}

/// Checks that a byte range lies inside the file
pub fn validate_data_range(offset: u64, length: u64, file_size: u64, what: &str) -> SceneResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(SceneError::GenericError(format!(
            "{} at offset {} (+{} bytes) runs past end of file ({} bytes)",
            what, offset, length, file_size
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn file_size_keeps_position() {
        let mut cursor = Cursor::new(vec![0u8; 64]);
        cursor.set_position(10);
        assert_eq!(get_file_size(&mut cursor).unwrap(), 64);
        assert_eq!(cursor.position(), 10);
    }

    #[test]
    fn ifd_offsets_inside_header_are_rejected() {
        assert!(validate_ifd_offset(4, 100).is_err());
        assert!(validate_ifd_offset(100, 100).is_err());
        assert!(validate_ifd_offset(8, 100).is_ok());
    }

    #[test]
    fn data_range_overflow_is_rejected() {
        assert!(validate_data_range(90, 20, 100, "strip").is_err());
        assert!(validate_data_range(u64::MAX, 2, 100, "strip").is_err());
        assert!(validate_data_range(80, 20, 100, "strip").is_ok());
    }
}
