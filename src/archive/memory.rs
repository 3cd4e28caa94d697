//! Archive over images held in memory

use log::warn;

use crate::archive::{apply_fill_mask, ArchiveQuery, SceneArchive, SceneSummary};
use crate::errors::{SceneError, SceneResult};
use crate::raster::resample::resample_nearest;
use crate::raster::{Band, Image};

/// A fixed set of images standing in for one collection
pub struct MemoryArchive {
    collection: String,
    images: Vec<Image>,
}

impl MemoryArchive {
    pub fn new(collection: impl Into<String>, images: Vec<Image>) -> Self {
        MemoryArchive { collection: collection.into(), images }
    }

    fn find(&self, id: &str) -> Option<&Image> {
        self.images.iter().find(|image| image.id == id)
    }
}

impl SceneArchive for MemoryArchive {
    fn describe(&self) -> String {
        format!("in-memory archive of {} images", self.images.len())
    }

    fn list(&self, collection: &str) -> SceneResult<Vec<SceneSummary>> {
        if collection != self.collection {
            return Err(SceneError::ArchiveUnavailable(format!("Collection {} not found", collection)));
        }
        let mut scenes: Vec<SceneSummary> = self
            .images
            .iter()
            .map(|image| SceneSummary { id: image.id.clone(), date: image.date, footprint: Some(image.extent()) })
            .collect();
        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(scenes)
    }

    fn load(&self, scene: &SceneSummary, query: &ArchiveQuery) -> SceneResult<Option<Image>> {
        let source = self
            .find(&scene.id)
            .ok_or_else(|| SceneError::GenericError(format!("Scene {} vanished from memory archive", scene.id)))?;

        if let (Some(a), Some(b)) = (source.grid.epsg, query.grid.epsg) {
            if a != b {
                warn!("Skipping {}: EPSG:{} differs from analysis grid EPSG:{}", source.id, a, b);
                return Ok(None);
            }
        }
        if let Some(missing) = query.bands.iter().find(|b| source.band(b).is_none()) {
            warn!("Skipping {}: band {} missing", source.id, missing);
            return Ok(None);
        }

        let mut image = Image::new(source.id.clone(), source.date, query.grid).with_footprint(source.extent());
        image.properties = source.properties.clone();
        for name in &query.bands {
            let band = source.require_band(name)?;
            let data = resample_nearest(&band.data, &source.grid, &query.grid);
            image = image.with_band(Band::new(name.clone(), data))?;
        }

        match &query.fill_band {
            Some(fill_band) => apply_fill_mask(image, fill_band).map(Some),
            None => Ok(Some(image)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{BoundingBox, RegionOfInterest};
    use crate::raster::GridSpec;
    use chrono::NaiveDate;

    fn archive() -> (MemoryArchive, ArchiveQuery) {
        let bbox = BoundingBox::new_with_crs(0.0, 0.0, 60.0, 30.0, 32633);
        let grid = GridSpec::from_bbox(&bbox, 30.0).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2020, 5, d).unwrap();
        let scene = |id: &str, date, epsg| {
            Image::new(id, date, GridSpec { epsg, ..grid })
                .with_band(Band::new("SR_B4", vec![1.0, 2.0]))
                .unwrap()
        };
        let images = vec![
            scene("b", day(9), Some(32633)),
            scene("a", day(9), Some(32633)),
            scene("utm34", day(3), Some(32634)),
        ];
        let query = ArchiveQuery {
            collection: "mem".to_string(),
            start: day(1),
            end: day(31),
            region: RegionOfInterest::from_bbox(&bbox).unwrap(),
            grid,
            bands: vec!["SR_B4".to_string()],
            fill_band: None,
        };
        (MemoryArchive::new("mem", images), query)
    }

    #[test]
    fn query_orders_and_skips_other_crs() {
        let (archive, query) = archive();
        let ids: Vec<String> = archive.query(&query).unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn matching_applies_the_date_window() {
        let (archive, mut query) = archive();
        query.end = NaiveDate::from_ymd_opt(2020, 5, 9).unwrap();
        let ids: Vec<String> = archive.matching(&query).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["utm34"]);
        assert!(archive.query(&query).unwrap().is_empty());
    }

    #[test]
    fn missing_band_skips_scene() {
        let (archive, mut query) = archive();
        query.bands.push("SR_B5".to_string());
        assert!(archive.query(&query).unwrap().is_empty());
    }

    #[test]
    fn unknown_collection_is_unavailable() {
        let (archive, _) = archive();
        assert!(matches!(archive.list("other"), Err(SceneError::ArchiveUnavailable(_))));
    }
}
