//! Normalized difference vegetation index

use crate::errors::SceneResult;
use crate::raster::{Band, Image};
use crate::sensor::SensorProfile;
use crate::transform::ImageTransform;

pub const NDVI_BAND: &str = "NDVI";

/// Appends `NDVI = (NIR - RED) / (NIR + RED)`
pub struct NdviTransform {
    red: String,
    nir: String,
}

impl NdviTransform {
    pub fn new(red: impl Into<String>, nir: impl Into<String>) -> Self {
        NdviTransform { red: red.into(), nir: nir.into() }
    }

    pub fn for_sensor(profile: &SensorProfile) -> Self {
        NdviTransform::new(profile.red.clone(), profile.nir.clone())
    }
}

/// NaN when either input is NaN or the denominator is zero
pub fn ndvi(red: f64, nir: f64) -> f64 {
    let sum = nir + red;
    if red.is_nan() || nir.is_nan() || sum == 0.0 {
        return f64::NAN;
    }
    ((nir - red) / sum).clamp(-1.0, 1.0)
}

impl ImageTransform for NdviTransform {
    fn name(&self) -> &str {
        "ndvi"
    }

    fn apply(&self, image: &Image) -> SceneResult<Image> {
        let red = image.require_band(&self.red)?;
        let nir = image.require_band(&self.nir)?;
        let data = red.data.iter().zip(&nir.data).map(|(r, n)| ndvi(*r, *n)).collect();
        image.clone().with_band(Band::new(NDVI_BAND, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;
    use chrono::NaiveDate;

    #[test]
    fn ndvi_edge_cases() {
        assert!((ndvi(0.1, 0.3) - 0.5).abs() < 1e-12);
        assert!(ndvi(0.0, 0.0).is_nan());
        assert!(ndvi(-0.1, 0.1).is_nan());
        assert!(ndvi(f64::NAN, 0.3).is_nan());
        // negative reflectance after scaling can push the ratio out of range
        assert_eq!(ndvi(-0.05, 0.1), 1.0);
    }

    #[test]
    fn appends_ndvi_band() {
        let grid = GridSpec::new(2, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        let image = Image::new("a", NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(), grid)
            .with_band(Band::new("SR_B4", vec![0.1, 0.2]))
            .unwrap()
            .with_band(Band::new("SR_B5", vec![0.3, 0.2]))
            .unwrap();
        let out = NdviTransform::new("SR_B4", "SR_B5").apply(&image).unwrap();
        assert_eq!(out.band_names(), vec!["SR_B4", "SR_B5", "NDVI"]);
        let values = &out.band(NDVI_BAND).unwrap().data;
        assert!((values[0] - 0.5).abs() < 1e-12);
        assert_eq!(values[1], 0.0);
    }
}
