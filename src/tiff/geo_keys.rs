//! GeoTIFF georeferencing
//!
//! Derives the affine geotransform, the EPSG code and the GDAL no-data
//! value of a raster from its GeoTIFF tags.

use log::{debug, warn};

use crate::errors::{SceneError, SceneResult};
use crate::io::SeekableReader;
use crate::tiff::constants::{geo_keys, geo_values, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One entry of the GeoKeyDirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

/// Georeferencing facts of one raster
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    /// `[origin_x, pixel_width, 0, origin_y, 0, -pixel_height]`
    pub geotransform: [f64; 6],
    /// Projected or geographic CRS code, when declared
    pub epsg: Option<u16>,
    /// GDAL no-data marker
    pub nodata: Option<f64>,
}

pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Parses the key directory; an IFD without one yields no keys
    pub fn parse_geo_key_directory(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> SceneResult<Vec<GeoKeyEntry>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(Vec::new());
        }

        let shorts = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
        if shorts.len() < 4 {
            return Err(SceneError::GenericError("Invalid GeoKey directory header".to_string()));
        }

        let num_keys = shorts[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}", shorts[0], shorts[1], shorts[2], num_keys);

        let keys: Vec<GeoKeyEntry> = shorts[4..]
            .chunks_exact(4)
            .take(num_keys)
            .map(|k| GeoKeyEntry {
                key_id: k[0] as u16,
                tiff_tag_location: k[1] as u16,
                count: k[2] as u16,
                value_offset: k[3] as u16,
            })
            .collect();

        if keys.len() < num_keys {
            warn!("GeoKey directory declares {} keys but holds {}", num_keys, keys.len());
        }
        Ok(keys)
    }

    /// EPSG code from ProjectedCSType, falling back to GeographicType
    ///
    /// Only keys stored inline (location 0) carry a code; the
    /// user-defined marker 32767 means no EPSG code applies.
    pub fn epsg_from_keys(keys: &[GeoKeyEntry]) -> Option<u16> {
        let inline_value = |id: u16| {
            keys.iter()
                .find(|k| k.key_id == id && k.tiff_tag_location == 0)
                .map(|k| k.value_offset)
                .filter(|v| *v != 0 && *v != geo_values::USER_DEFINED)
        };
        inline_value(geo_keys::PROJECTED_CS_TYPE).or_else(|| inline_value(geo_keys::GEOGRAPHIC_TYPE))
    }

    /// Reads geotransform, EPSG and no-data of an IFD
    pub fn read_georeference(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> SceneResult<GeoReference> {
        let geotransform = Self::read_geotransform(tiff_reader, reader, ifd)?;
        let keys = Self::parse_geo_key_directory(tiff_reader, reader, ifd)?;
        let epsg = Self::epsg_from_keys(&keys);
        let nodata = Self::read_nodata(tiff_reader, reader, ifd)?;

        debug!("Georeference: {:?}, EPSG {:?}, nodata {:?}", geotransform, epsg, nodata);
        Ok(GeoReference { geotransform, epsg, nodata })
    }

    /// Geotransform from ModelPixelScale + ModelTiepoint, or from
    /// ModelTransformation when the file carries a matrix instead
    pub fn read_geotransform(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> SceneResult<[f64; 6]> {
        if ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) && ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            let scale = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
            let tiepoint = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
            if scale.len() < 2 || tiepoint.len() < 6 {
                return Err(SceneError::GenericError("Truncated pixel scale or tiepoint tag".to_string()));
            }
            // Tiepoint (i, j, k, x, y, z): raster (i, j) sits at world (x, y)
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Ok([origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1]]);
        }

        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let m = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            if m.len() < 8 {
                return Err(SceneError::GenericError("Truncated model transformation tag".to_string()));
            }
            return Ok([m[3], m[0], m[1], m[7], m[4], m[5]]);
        }

        Err(SceneError::GenericError("Raster is not georeferenced".to_string()))
    }

    /// GDAL_NODATA as a number; absent or unparsable means none
    pub fn read_nodata(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> SceneResult<Option<f64>> {
        if !ifd.has_tag(tags::GDAL_NODATA) {
            return Ok(None);
        }
        let text = tiff_reader.read_tag_ascii(reader, ifd, tags::GDAL_NODATA)?;
        match text.trim().to_lowercase().as_str() {
            "nan" | "-nan" => Ok(Some(f64::NAN)),
            other => match other.parse::<f64>() {
                Ok(value) => Ok(Some(value)),
                Err(_) => {
                    warn!("Ignoring unparsable GDAL_NODATA '{}'", text);
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key_id: u16, value: u16) -> GeoKeyEntry {
        GeoKeyEntry { key_id, tiff_tag_location: 0, count: 1, value_offset: value }
    }

    #[test]
    fn projected_code_wins_over_geographic() {
        let keys = vec![key(geo_keys::GEOGRAPHIC_TYPE, 4326), key(geo_keys::PROJECTED_CS_TYPE, 32633)];
        assert_eq!(GeoKeyParser::epsg_from_keys(&keys), Some(32633));
    }

    #[test]
    fn user_defined_crs_has_no_code() {
        let keys = vec![key(geo_keys::PROJECTED_CS_TYPE, geo_values::USER_DEFINED)];
        assert_eq!(GeoKeyParser::epsg_from_keys(&keys), None);
    }
}
