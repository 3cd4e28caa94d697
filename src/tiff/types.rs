//! Core TIFF data structures

use std::fmt;

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::tags;
use crate::tiff::ifd::IFD;

/// A parsed TIFF file: its directories plus the header facts needed to
/// decode tag payloads later
#[derive(Debug)]
pub struct TIFF {
    /// Image File Directories in file order
    pub ifds: Vec<IFD>,
    /// Whether this is a BigTIFF file
    pub is_big_tiff: bool,
    /// Byte order of every multi-byte value in the file
    pub byte_order: ByteOrder,
}

impl TIFF {
    pub fn new(is_big_tiff: bool, byte_order: ByteOrder) -> Self {
        TIFF { ifds: Vec::new(), is_big_tiff, byte_order }
    }

    /// The full-resolution raster (first IFD)
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    /// Reduced-resolution subfiles (NewSubfileType bit 0)
    pub fn overviews(&self) -> Vec<&IFD> {
        self.ifds
            .iter()
            .filter(|ifd| ifd.get_tag_value(tags::NEW_SUBFILE_TYPE).map_or(false, |t| t & 1 == 1))
            .collect()
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File:")?;
        writeln!(f, "  Format: {}", if self.is_big_tiff { "BigTIFF" } else { "TIFF" })?;
        writeln!(f, "  Byte order: {}", self.byte_order.name())?;
        writeln!(f, "  Number of IFDs: {} ({} overviews)", self.ifds.len(), self.overviews().len())?;

        if let Some(ifd) = self.main_ifd() {
            write!(f, "{}", ifd)?;
        }

        Ok(())
    }
}
