//! TIFF file reader
//!
//! Parses the header and the IFD chain of a TIFF or BigTIFF file and
//! decodes tag payloads. Pixel data is decoded separately by
//! [`crate::tiff::raster_reader::RasterReader`].

use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::errors::{SceneError, SceneResult};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::SeekableReader;
use crate::tiff::constants::{field_types, header};
use crate::tiff::ifd::{IFDEntry, IFD};
use crate::tiff::types::TIFF;
use crate::tiff::validation;

/// Upper bound on chained IFDs; protects against offset loops
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    pub fn new() -> Self {
        TiffReader { byte_order_handler: None, is_big_tiff: false }
    }

    /// Opens a file and parses its header and directories
    ///
    /// Returns the parsed structure along with the open reader so the
    /// caller can go on to decode tags and pixels without reopening.
    pub fn open(&mut self, path: &Path) -> SceneResult<(TIFF, BufReader<File>)> {
        debug!("Loading TIFF file: {}", path.display());
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);
        let tiff = self.read(&mut reader)?;
        Ok((tiff, reader))
    }

    /// Parses header and IFD chain from any seekable source
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> SceneResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;
        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        let handler = byte_order.create_handler();

        let version = handler.read_u16(reader)?;
        self.is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, handler.as_ref())?;
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(SceneError::UnsupportedVersion(version)),
        };

        let first_ifd_offset = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };
        self.byte_order_handler = Some(handler);

        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;
        if tiff.ifds.is_empty() {
            return Err(SceneError::InvalidHeader);
        }

        debug!("Read {} IFDs", tiff.ifds.len());
        Ok(tiff)
    }

    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_offset: u64, file_size: u64) -> SceneResult<Vec<IFD>> {
        let handler = self.handler()?;
        let mut ifds = Vec::new();
        let mut offset = first_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", offset, file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) => {
                    // A damaged trailing overview must not hide the main image
                    if ifds.is_empty() {
                        return Err(e);
                    }
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };
            ifds.push(ifd);

            // read_ifd leaves the stream right after the last entry
            let next = if self.is_big_tiff {
                handler.read_u64(reader)
            } else {
                handler.read_u32(reader).map(|v| v as u64)
            };
            offset = match next {
                Ok(next) if next == 0 || (next >= 8 && next < file_size) => next,
                Ok(next) => {
                    warn!("Invalid next IFD offset: {}, stopping IFD chain", next);
                    0
                }
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    0
                }
            };
        }

        Ok(ifds)
    }

    /// Reads a single IFD at `offset`
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> SceneResult<IFD> {
        let handler = self.handler()?;
        reader.seek(SeekFrom::Start(offset))?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }
        Ok(ifd)
    }

    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> SceneResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let mut inline = [0u8; 8];
        let value_offset = if self.is_big_tiff {
            reader.read_exact(&mut inline)?;
            handler.u64_from(&inline)
        } else {
            reader.read_exact(&mut inline[..4])?;
            handler.u32_from(&inline[..4]) as u64
        };

        Ok(IFDEntry::from_raw(tag, field_type, count, value_offset, inline))
    }

    /// Raw payload bytes of an entry, wherever they are stored
    pub fn read_entry_bytes(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> SceneResult<Vec<u8>> {
        let len = entry.byte_len();
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.inline[..len].to_vec());
        }

        let file_size = validation::get_file_size(reader)?;
        validation::validate_data_range(entry.value_offset, len as u64, file_size, "Tag payload")?;

        let mut buffer = vec![0u8; len];
        reader.seek(SeekFrom::Start(entry.value_offset))?;
        reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads an integer-typed tag as u64 values
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> SceneResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(SceneError::TagNotFound(tag))?;
        let bytes = self.read_entry_bytes(reader, entry)?;
        let handler = self.handler()?;
        let size = entry.field_type_size();

        bytes
            .chunks_exact(size)
            .map(|chunk| match entry.field_type {
                field_types::BYTE | field_types::UNDEFINED => Ok(chunk[0] as u64),
                field_types::SHORT => Ok(handler.u16_from(chunk) as u64),
                field_types::LONG => Ok(handler.u32_from(chunk) as u64),
                field_types::LONG8 | field_types::IFD8 => Ok(handler.u64_from(chunk)),
                other => Err(SceneError::UnsupportedFieldType(other)),
            })
            .collect()
    }

    /// Reads a numeric tag as f64 values (DOUBLE, FLOAT or any integer type)
    pub fn read_tag_doubles(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> SceneResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(SceneError::TagNotFound(tag))?;
        match entry.field_type {
            field_types::DOUBLE | field_types::FLOAT => {
                let bytes = self.read_entry_bytes(reader, entry)?;
                let handler = self.handler()?;
                Ok(bytes
                    .chunks_exact(entry.field_type_size())
                    .map(|chunk| {
                        if entry.field_type == field_types::DOUBLE {
                            handler.f64_from(chunk)
                        } else {
                            handler.f32_from(chunk) as f64
                        }
                    })
                    .collect())
            }
            _ => Ok(self.read_tag_values(reader, ifd, tag)?.into_iter().map(|v| v as f64).collect()),
        }
    }

    /// Reads an ASCII tag, trimming trailing NULs
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> SceneResult<String> {
        let entry = ifd.get_entry(tag).ok_or(SceneError::TagNotFound(tag))?;
        let mut bytes = self.read_entry_bytes(reader, entry)?;
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        String::from_utf8(bytes).map_err(|e| SceneError::GenericError(format!("Invalid UTF-8 in tag {}: {}", tag, e)))
    }

    /// The handler for the file most recently parsed
    pub fn handler(&self) -> SceneResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| SceneError::GenericError("Byte order not yet determined".to_string()))
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::tags;
    use std::io::Cursor;

    /// Hand-assembled big-endian classic TIFF with one IFD
    fn big_endian_sample() -> Vec<u8> {
        let mut bytes = vec![0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
        bytes.extend_from_slice(&[0x00, 0x03]); // three entries
        // ImageWidth SHORT 1 = 7 (value left-justified in the field)
        bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x07, 0x00, 0x00]);
        // ImageLength LONG 1 = 5
        bytes.extend_from_slice(&[0x01, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x05]);
        // BitsPerSample SHORT 2 = [16, 16] inline
        bytes.extend_from_slice(&[0x01, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00, 0x02, 0x00, 0x10, 0x00, 0x10]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn reads_big_endian_inline_shorts() {
        let mut cursor = Cursor::new(big_endian_sample());
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();

        assert_eq!(tiff.byte_order, ByteOrder::BigEndian);
        let ifd = tiff.main_ifd().unwrap();
        assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::IMAGE_WIDTH).unwrap(), vec![7]);
        assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::IMAGE_LENGTH).unwrap(), vec![5]);
        assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::BITS_PER_SAMPLE).unwrap(), vec![16, 16]);
    }

    #[test]
    fn rejects_unknown_version() {
        let mut cursor = Cursor::new(vec![0x49, 0x49, 0x2B, 0x01, 0, 0, 0, 0]);
        let result = TiffReader::new().read(&mut cursor);
        assert!(matches!(result, Err(SceneError::UnsupportedVersion(_))));
    }

    #[test]
    fn missing_tag_is_reported() {
        let mut cursor = Cursor::new(big_endian_sample());
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        let result = reader.read_tag_values(&mut cursor, tiff.main_ifd().unwrap(), tags::COMPRESSION);
        assert!(matches!(result, Err(SceneError::TagNotFound(tags::COMPRESSION))));
    }
}
