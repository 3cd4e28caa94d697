//! Digital numbers to physical units

use crate::errors::SceneResult;
use crate::raster::{Band, Image};
use crate::sensor::SensorProfile;
use crate::transform::ImageTransform;

/// Applies the optical and thermal scale factors by band-name pattern
pub struct ScaleFactors {
    profile: SensorProfile,
}

impl ScaleFactors {
    pub fn new(profile: &SensorProfile) -> Self {
        ScaleFactors { profile: profile.clone() }
    }
}

impl ImageTransform for ScaleFactors {
    fn name(&self) -> &str {
        "scale"
    }

    fn apply(&self, image: &Image) -> SceneResult<Image> {
        let mut out = image.clone_without_bands();
        for band in &image.bands {
            let scale = if self.profile.is_optical(&band.name) {
                Some(self.profile.optical_scale)
            } else if self.profile.is_thermal(&band.name) {
                Some(self.profile.thermal_scale)
            } else {
                None
            };
            let scaled = match scale {
                Some(scale) => Band::new(band.name.clone(), band.data.iter().map(|v| scale.apply(*v)).collect()),
                None => band.clone(),
            };
            out = out.with_band(scaled)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;
    use crate::sensor::SensorRegistry;
    use chrono::NaiveDate;

    #[test]
    fn scales_by_pattern_and_keeps_qa() {
        let grid = GridSpec::new(2, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        let image = Image::new("a", NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(), grid)
            .with_band(Band::new("SR_B4", vec![10000.0, f64::NAN]))
            .unwrap()
            .with_band(Band::new("ST_B10", vec![44000.0, 0.0]))
            .unwrap()
            .with_band(Band::new("QA_PIXEL", vec![21824.0, 1.0]))
            .unwrap();

        let profile = SensorRegistry::builtin().get("landsat8").unwrap().clone();
        let scaled = ScaleFactors::new(&profile).apply(&image).unwrap();

        let red = &scaled.band("SR_B4").unwrap().data;
        assert!((red[0] - 0.075).abs() < 1e-12);
        assert!(red[1].is_nan());
        let lst = &scaled.band("ST_B10").unwrap().data;
        assert!(lst[0] > 250.0 && lst[0] < 350.0);
        assert_eq!(lst[1], 149.0);
        assert_eq!(scaled.band("QA_PIXEL").unwrap().data, vec![21824.0, 1.0]);
        assert_eq!(scaled.band_names(), image.band_names());
    }
}
