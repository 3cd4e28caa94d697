//! Ordered transform pipelines

use log::debug;

use crate::errors::{SceneError, SceneResult};
use crate::raster::Image;
use crate::sensor::SensorProfile;
use crate::transform::{CloudMask, ImageTransform, NdviTransform, ScaleFactors, TimeTag};

/// Transforms applied one after another to each image
pub struct TransformChain {
    required_bands: Vec<String>,
    steps: Vec<Box<dyn ImageTransform>>,
}

impl TransformChain {
    pub fn new(steps: Vec<Box<dyn ImageTransform>>) -> Self {
        TransformChain { required_bands: Vec::new(), steps }
    }

    /// scale, cloud mask, NDVI, time tag
    pub fn standard(profile: &SensorProfile) -> Self {
        TransformChain {
            required_bands: profile.required_bands().into_iter().map(String::from).collect(),
            steps: vec![
                Box::new(ScaleFactors::new(profile)),
                Box::new(CloudMask::for_sensor(profile)),
                Box::new(NdviTransform::for_sensor(profile)),
                Box::new(TimeTag),
            ],
        }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn apply(&self, image: &Image) -> SceneResult<Image> {
        if let Some(missing) = self.required_bands.iter().find(|b| image.band(b).is_none()) {
            return Err(SceneError::MissingBand { image: image.id.clone(), band: missing.clone() });
        }

        let mut current = image.clone();
        for step in &self.steps {
            current = step.apply(&current)?;
            debug!("{}: applied {}", current.id, step.name());
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Band, GridSpec};
    use crate::sensor::SensorRegistry;
    use crate::transform::{NDVI_BAND, TIME_BAND};
    use chrono::NaiveDate;

    fn raw_scene(qa: f64) -> Image {
        let grid = GridSpec::new(1, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        Image::new("LC08_L2SP_190026_20200517_20200527_02_T1", NaiveDate::from_ymd_opt(2020, 5, 17).unwrap(), grid)
            .with_band(Band::new("SR_B4", vec![10000.0]))
            .unwrap()
            .with_band(Band::new("SR_B5", vec![20000.0]))
            .unwrap()
            .with_band(Band::new("ST_B10", vec![44000.0]))
            .unwrap()
            .with_band(Band::new("QA_PIXEL", vec![qa]))
            .unwrap()
    }

    #[test]
    fn standard_chain_order_and_output() {
        let profile = SensorRegistry::builtin().get("landsat8").unwrap().clone();
        let chain = TransformChain::standard(&profile);
        assert_eq!(chain.step_names(), vec!["scale", "cloud_mask", "ndvi", "time_tag"]);

        let out = chain.apply(&raw_scene(21824.0)).unwrap();
        // red 0.075, nir 0.35
        let ndvi = out.band(NDVI_BAND).unwrap().data[0];
        assert!((ndvi - 0.275 / 0.425).abs() < 1e-9);
        assert_eq!(out.band(TIME_BAND).unwrap().data[0], 20200517.0);
    }

    #[test]
    fn cloudy_pixel_has_no_ndvi_but_keeps_time() {
        let profile = SensorRegistry::builtin().get("landsat8").unwrap().clone();
        let out = TransformChain::standard(&profile).apply(&raw_scene(8.0)).unwrap();
        assert!(out.band(NDVI_BAND).unwrap().data[0].is_nan());
        assert!(out.band("ST_B10").unwrap().data[0].is_nan());
        assert_eq!(out.band(TIME_BAND).unwrap().data[0], 20200517.0);
    }

    #[test]
    fn missing_thermal_band_is_reported() {
        let profile = SensorRegistry::builtin().get("landsat8").unwrap().clone();
        let scene = raw_scene(0.0).select(&["SR_B4", "SR_B5", "QA_PIXEL"]).unwrap();
        match TransformChain::standard(&profile).apply(&scene) {
            Err(SceneError::MissingBand { band, .. }) => assert_eq!(band, "ST_B10"),
            other => panic!("unexpected {:?}", other.map(|i| i.id)),
        }
    }
}
