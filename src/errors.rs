//! Custom error types for the compositing pipeline
//!
//! A single error enum covers GeoTIFF decoding/encoding, archive access,
//! band bookkeeping and export validation so that every stage can use `?`.

use std::fmt;
use std::io;

/// Error type shared by every pipeline stage
#[derive(Debug)]
pub enum SceneError {
    /// I/O error
    IoError(io::Error),
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Sample layout we cannot decode (bit depth, format, planar config)
    UnsupportedSampleLayout(String),
    /// Image dimensions not found
    MissingDimensions,
    /// The imagery archive could not be reached; callers may retry
    ArchiveUnavailable(String),
    /// An image lacks a band a transform or view needs
    MissingBand { image: String, band: String },
    /// Rasters that should share a pixel grid do not
    GridMismatch(String),
    /// Export would produce more pixels than allowed
    PixelCeilingExceeded { requested: u64, allowed: u64 },
    /// Bad user configuration (dates, region, sensor table)
    InvalidConfig(String),
    /// Generic error with message
    GenericError(String),
}

impl SceneError {
    /// Whether the failure is transient and the whole run may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, SceneError::ArchiveUnavailable(_))
    }
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::IoError(e) => write!(f, "I/O error: {}", e),
            SceneError::InvalidHeader => write!(f, "Invalid TIFF header"),
            SceneError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            SceneError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            SceneError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            SceneError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            SceneError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            SceneError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            SceneError::UnsupportedSampleLayout(msg) => write!(f, "Unsupported sample layout: {}", msg),
            SceneError::MissingDimensions => write!(f, "Image dimensions not found"),
            SceneError::ArchiveUnavailable(msg) => write!(f, "Imagery archive unavailable (retryable): {}", msg),
            SceneError::MissingBand { image, band } => write!(f, "Image {} has no band '{}'", image, band),
            SceneError::GridMismatch(msg) => write!(f, "Pixel grid mismatch: {}", msg),
            SceneError::PixelCeilingExceeded { requested, allowed } => write!(
                f,
                "Export too large: {} pixels requested, at most {} allowed",
                requested, allowed
            ),
            SceneError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SceneError::GenericError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SceneError {
    fn from(error: io::Error) -> Self {
        SceneError::IoError(error)
    }
}

impl From<String> for SceneError {
    fn from(msg: String) -> Self {
        SceneError::GenericError(msg)
    }
}

/// Result type for pipeline operations
pub type SceneResult<T> = Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_archive_failures_are_retryable() {
        assert!(SceneError::ArchiveUnavailable("offline".into()).is_retryable());
        assert!(!SceneError::InvalidHeader.is_retryable());
        assert!(!SceneError::PixelCeilingExceeded { requested: 2, allowed: 1 }.is_retryable());
    }

    #[test]
    fn ceiling_message_names_both_counts() {
        let msg = SceneError::PixelCeilingExceeded { requested: 20_000_000_000, allowed: 10_000_000_000 }
            .to_string();
        assert!(msg.contains("20000000000"));
        assert!(msg.contains("10000000000"));
    }
}
