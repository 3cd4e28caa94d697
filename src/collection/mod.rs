//! Time-ordered image collections
//!
//! A [`Collection`] holds images on one analysis grid, sorted by
//! acquisition date. Filters and band projections return new collections.

mod loader;
mod views;

use chrono::NaiveDate;
use log::debug;

use crate::coordinate::RegionOfInterest;
use crate::errors::SceneResult;
use crate::raster::{GridSpec, Image};

pub use self::loader::CollectionLoader;
pub use self::views::{split_views, CollectionViews};

#[derive(Debug, Clone)]
pub struct Collection {
    pub id: String,
    pub grid: GridSpec,
    images: Vec<Image>,
}

impl Collection {
    pub fn empty(id: impl Into<String>, grid: GridSpec) -> Self {
        Collection { id: id.into(), grid, images: Vec::new() }
    }

    /// Sorts by date, ties by scene id; every image must be on `grid`
    pub fn from_images(id: impl Into<String>, grid: GridSpec, mut images: Vec<Image>) -> SceneResult<Self> {
        for image in &images {
            grid.ensure_same(&image.grid)?;
        }
        images.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(Collection { id: id.into(), grid, images })
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keeps images acquired on or after `start` and before `end`
    pub fn filter_date(&self, start: NaiveDate, end: NaiveDate) -> Collection {
        self.filtered(|image| image.date >= start && image.date < end)
    }

    /// Keeps images whose extent intersects the region
    pub fn filter_bounds(&self, region: &RegionOfInterest) -> Collection {
        self.filtered(|image| region.intersects_bbox(&image.extent()))
    }

    fn filtered(&self, keep: impl Fn(&Image) -> bool) -> Collection {
        let images: Vec<Image> = self.images.iter().filter(|i| keep(i)).cloned().collect();
        debug!("{}: filter kept {} of {} images", self.id, images.len(), self.images.len());
        Collection { id: self.id.clone(), grid: self.grid, images }
    }

    /// Projects every image to `bands`, in that order
    pub fn select(&self, bands: &[&str]) -> SceneResult<Collection> {
        let images = self.images.iter().map(|i| i.select(bands)).collect::<SceneResult<Vec<_>>>()?;
        Ok(Collection { id: self.id.clone(), grid: self.grid, images })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::BoundingBox;
    use crate::raster::Band;

    fn grid() -> GridSpec {
        GridSpec::new(1, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None)
    }

    fn image(id: &str, day: u32) -> Image {
        Image::new(id, NaiveDate::from_ymd_opt(2020, 5, day).unwrap(), grid())
            .with_band(Band::new("NDVI", vec![0.5]))
            .unwrap()
            .with_band(Band::new("time", vec![20200500.0 + day as f64]))
            .unwrap()
    }

    #[test]
    fn images_are_sorted_by_date_then_id() {
        let collection = Collection::from_images("c", grid(), vec![image("z", 9), image("b", 1), image("a", 9)]).unwrap();
        let ids: Vec<&str> = collection.images().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "z"]);
    }

    #[test]
    fn date_filter_excludes_end() {
        let collection = Collection::from_images("c", grid(), vec![image("a", 1), image("b", 10), image("c", 20)]).unwrap();
        let start = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 5, 20).unwrap();
        assert_eq!(collection.filter_date(start, end).len(), 2);
    }

    #[test]
    fn bounds_filter_uses_footprint() {
        let far = image("far", 2).with_footprint(BoundingBox::new(1000.0, 1000.0, 2000.0, 2000.0));
        let collection = Collection::from_images("c", grid(), vec![image("near", 1), far]).unwrap();
        let region = RegionOfInterest::from_bbox(&BoundingBox::new(0.0, 0.0, 30.0, 30.0)).unwrap();
        let kept = collection.filter_bounds(&region);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.images()[0].id, "near");
    }

    #[test]
    fn foreign_grid_is_rejected() {
        let other = GridSpec::new(2, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        assert!(Collection::from_images("c", other, vec![image("a", 1)]).is_err());
    }

    #[test]
    fn select_projects_bands() {
        let collection = Collection::from_images("c", grid(), vec![image("a", 1)]).unwrap();
        let projected = collection.select(&["time"]).unwrap();
        assert_eq!(projected.images()[0].band_names(), vec!["time"]);
        assert!(collection.select(&["LST"]).is_err());
    }
}
