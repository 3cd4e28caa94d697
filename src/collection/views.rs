//! Per-product band views of a transformed collection

use crate::collection::Collection;
use crate::errors::SceneResult;
use crate::sensor::SensorProfile;
use crate::transform::{NDVI_BAND, TIME_BAND};

/// `{thermal, time}` and `{NDVI, time}` projections
#[derive(Debug, Clone)]
pub struct CollectionViews {
    pub lst: Collection,
    pub ndvi: Collection,
}

pub fn split_views(collection: &Collection, profile: &SensorProfile) -> SceneResult<CollectionViews> {
    Ok(CollectionViews {
        lst: collection.select(&[profile.thermal.as_str(), TIME_BAND])?,
        ndvi: collection.select(&[NDVI_BAND, TIME_BAND])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Band, GridSpec, Image};
    use crate::sensor::SensorRegistry;
    use chrono::NaiveDate;

    #[test]
    fn views_hold_product_and_time() {
        let grid = GridSpec::new(1, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        let image = Image::new("a", NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(), grid)
            .with_band(Band::new("SR_B4", vec![0.1]))
            .unwrap()
            .with_band(Band::new("ST_B10", vec![300.0]))
            .unwrap()
            .with_band(Band::new("NDVI", vec![0.4]))
            .unwrap()
            .with_band(Band::new("time", vec![20200501.0]))
            .unwrap();
        let collection = Collection::from_images("c", grid, vec![image]).unwrap();
        let profile = SensorRegistry::builtin().get("landsat8").unwrap().clone();

        let views = split_views(&collection, &profile).unwrap();
        assert_eq!(views.lst.images()[0].band_names(), vec!["ST_B10", "time"]);
        assert_eq!(views.ndvi.images()[0].band_names(), vec!["NDVI", "time"]);
    }
}
