//! Acquisition date as a band

use crate::errors::SceneResult;
use crate::raster::{Band, Image, PropertyValue};
use crate::transform::ImageTransform;

pub const TIME_BAND: &str = "time";
pub const DATE_PROPERTY: &str = "date";

/// Appends a constant `time` band holding `YYYYMMDD`, and the `date` property
///
/// The band is constant everywhere, masked pixels included; reducers
/// only read it where the primary band has data.
pub struct TimeTag;

impl ImageTransform for TimeTag {
    fn name(&self) -> &str {
        "time_tag"
    }

    fn apply(&self, image: &Image) -> SceneResult<Image> {
        let tag = image.date_tag();
        image
            .clone()
            .with_property(DATE_PROPERTY, PropertyValue::Int(tag as i64))
            .with_band(Band::filled(TIME_BAND, image.grid.len(), tag as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;
    use chrono::NaiveDate;

    #[test]
    fn tags_band_and_property() {
        let grid = GridSpec::new(3, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        let image = Image::new("a", NaiveDate::from_ymd_opt(2020, 6, 2).unwrap(), grid);
        let tagged = TimeTag.apply(&image).unwrap();
        assert_eq!(tagged.band(TIME_BAND).unwrap().data, vec![20200602.0; 3]);
        assert_eq!(tagged.properties.get(DATE_PROPERTY), Some(&PropertyValue::Int(20200602)));
    }
}
