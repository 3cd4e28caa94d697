//! GeoTIFF georeferencing tags
//!
//! North-up rasters only: the geotransform must have zero rotation
//! terms, which holds for every grid this crate produces.

use log::debug;

use crate::tiff::constants::{epsg, field_types, geo_keys, geo_values, tags};
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::{self, ExternalData};

pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    /// Adds ModelPixelScale, ModelTiepoint and a GeoKeyDirectory
    ///
    /// EPSG 4326 or an unknown CRS is declared geographic WGS84; any
    /// other code is declared as a projected CRS.
    pub fn add_georeferencing(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        geotransform: &[f64; 6],
        crs: Option<u16>,
    ) {
        let pixel_scale = [geotransform[1], -geotransform[5], 0.0];
        let tiepoint = [0.0, 0.0, 0.0, geotransform[0], geotransform[3], 0.0];
        debug!("Georeferencing: scale {:?}, tiepoint {:?}, EPSG {:?}", pixel_scale, tiepoint, crs);

        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tags::MODEL_PIXEL_SCALE_TAG,
            field_types::DOUBLE,
            tiff_utils::doubles_to_bytes(&pixel_scale),
        );
        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tags::MODEL_TIEPOINT_TAG,
            field_types::DOUBLE,
            tiff_utils::doubles_to_bytes(&tiepoint),
        );
        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tags::GEO_KEY_DIRECTORY_TAG,
            field_types::SHORT,
            tiff_utils::shorts_to_bytes(&Self::key_directory(crs)),
        );
    }

    /// Key directory: header (version 1, revision 1.0, key count) then
    /// sorted (id, location, count, value) quadruples
    pub fn key_directory(crs: Option<u16>) -> Vec<u16> {
        let code = crs.unwrap_or(epsg::WGS84);
        let (model_type, crs_key) = if code == epsg::WGS84 {
            (geo_values::MODEL_TYPE_GEOGRAPHIC, geo_keys::GEOGRAPHIC_TYPE)
        } else {
            (geo_values::MODEL_TYPE_PROJECTED, geo_keys::PROJECTED_CS_TYPE)
        };

        vec![
            1, 1, 0, 3,
            geo_keys::GT_MODEL_TYPE, 0, 1, model_type,
            geo_keys::GT_RASTER_TYPE, 0, 1, geo_values::RASTER_PIXEL_IS_AREA,
            crs_key, 0, 1, code,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utm_code_is_projected() {
        let dir = GeoTagsBuilder::key_directory(Some(32633));
        assert_eq!(dir[3], 3);
        assert_eq!(&dir[12..16], &[geo_keys::PROJECTED_CS_TYPE, 0, 1, 32633]);
        assert_eq!(dir[7], geo_values::MODEL_TYPE_PROJECTED);
    }

    #[test]
    fn missing_code_falls_back_to_wgs84() {
        let dir = GeoTagsBuilder::key_directory(None);
        assert_eq!(&dir[12..16], &[geo_keys::GEOGRAPHIC_TYPE, 0, 1, 4326]);
    }
}
