//! QA bitmask cloud and shadow masking

use log::debug;

use crate::errors::SceneResult;
use crate::raster::{Band, Image};
use crate::sensor::SensorProfile;
use crate::transform::ImageTransform;

/// Sets every band to NaN where any flagged QA bit is set
///
/// A QA cell that is already NaN counts as flagged, so masking an
/// already masked image changes nothing.
pub struct CloudMask {
    qa_band: String,
    mask: u64,
}

impl CloudMask {
    pub fn new(qa_band: impl Into<String>, mask: u64) -> Self {
        CloudMask { qa_band: qa_band.into(), mask }
    }

    pub fn for_sensor(profile: &SensorProfile) -> Self {
        CloudMask::new(profile.qa.clone(), profile.mask_value())
    }

    fn is_clear(&self, qa: f64) -> bool {
        !qa.is_nan() && qa >= 0.0 && (qa as u64) & self.mask == 0
    }
}

impl ImageTransform for CloudMask {
    fn name(&self) -> &str {
        "cloud_mask"
    }

    fn apply(&self, image: &Image) -> SceneResult<Image> {
        let clear: Vec<bool> = image.require_band(&self.qa_band)?.data.iter().map(|qa| self.is_clear(*qa)).collect();
        debug!(
            "{}: {} of {} pixels clear",
            image.id,
            clear.iter().filter(|c| **c).count(),
            clear.len()
        );

        let mut out = image.clone_without_bands();
        for band in &image.bands {
            let data = band
                .data
                .iter()
                .zip(&clear)
                .map(|(value, keep)| if *keep { *value } else { f64::NAN })
                .collect();
            out = out.with_band(Band::new(band.name.clone(), data))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SceneError;
    use crate::raster::GridSpec;
    use chrono::NaiveDate;

    fn image(qa: Vec<f64>) -> Image {
        let grid = GridSpec::new(qa.len() as u32, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        let red = vec![0.1; qa.len()];
        Image::new("a", NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(), grid)
            .with_band(Band::new("SR_B4", red))
            .unwrap()
            .with_band(Band::new("QA_PIXEL", qa))
            .unwrap()
    }

    #[test]
    fn flagged_bits_blank_every_band() {
        // clear, dilated cloud, cloud, shadow, water-only (bit 7)
        let input = image(vec![21824.0, 2.0, 8.0, 16.0, 128.0]);
        let masked = CloudMask::new("QA_PIXEL", 0b11010).apply(&input).unwrap();

        let red = &masked.band("SR_B4").unwrap().data;
        assert_eq!(red[0], 0.1);
        assert!(red[1].is_nan() && red[2].is_nan() && red[3].is_nan());
        assert_eq!(red[4], 0.1);
        assert!(masked.band("QA_PIXEL").unwrap().data[2].is_nan());
    }

    #[test]
    fn masking_is_idempotent() {
        let mask = CloudMask::new("QA_PIXEL", 0b11010);
        let once = mask.apply(&image(vec![0.0, 8.0, f64::NAN])).unwrap();
        let twice = mask.apply(&once).unwrap();
        for (a, b) in once.bands.iter().zip(&twice.bands) {
            for (x, y) in a.data.iter().zip(&b.data) {
                assert!(x == y || (x.is_nan() && y.is_nan()));
            }
        }
        assert_eq!(twice.band("SR_B4").unwrap().valid_count(), 1);
    }

    #[test]
    fn missing_qa_band_is_an_error() {
        let result = CloudMask::new("QA_RADSAT", 1).apply(&image(vec![0.0]));
        assert!(matches!(result, Err(SceneError::MissingBand { .. })));
    }
}
