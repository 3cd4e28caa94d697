//! Archive query plus per-image transforms, with progress

use log::{info, warn};

use crate::archive::{ArchiveQuery, SceneArchive};
use crate::collection::Collection;
use crate::errors::SceneResult;
use crate::transform::TransformChain;
use crate::utils::progress::ProgressTracker;

pub struct CollectionLoader<'a> {
    archive: &'a dyn SceneArchive,
    show_progress: bool,
}

impl<'a> CollectionLoader<'a> {
    pub fn new(archive: &'a dyn SceneArchive) -> Self {
        CollectionLoader { archive, show_progress: false }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Loads every matching scene and runs `chain` on it
    ///
    /// No matching scene is not an error: the result is an empty
    /// collection on the query grid.
    pub fn load(&self, query: &ArchiveQuery, chain: &TransformChain) -> SceneResult<Collection> {
        info!(
            "Querying {} for {} from {} to {} (end excluded)",
            self.archive.describe(),
            query.collection,
            query.start,
            query.end
        );
        let scenes = self.archive.matching(query)?;

        if scenes.is_empty() {
            warn!("No scenes of {} match the date range and region", query.collection);
            return Ok(Collection::empty(query.collection.clone(), query.grid));
        }

        let progress = if self.show_progress {
            ProgressTracker::new(scenes.len() as u64, "Loading scenes")
        } else {
            ProgressTracker::hidden(scenes.len() as u64)
        };

        let mut images = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            progress.set_message(&scene.id);
            if let Some(image) = self.archive.load(scene, query)? {
                images.push(chain.apply(&image)?);
            }
            progress.increment(1);
        }
        progress.finish();

        let collection = Collection::from_images(query.collection.clone(), query.grid, images)?
            .filter_date(query.start, query.end)
            .filter_bounds(&query.region);
        info!("Collection {} holds {} images", collection.id, collection.len());
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::coordinate::{BoundingBox, RegionOfInterest};
    use crate::raster::{Band, GridSpec, Image};
    use crate::sensor::SensorRegistry;
    use chrono::NaiveDate;

    fn query(grid: GridSpec, bbox: &BoundingBox) -> ArchiveQuery {
        ArchiveQuery {
            collection: "LANDSAT/LC08/C02/T1_L2".to_string(),
            start: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 7, 1).unwrap(),
            region: RegionOfInterest::from_bbox(bbox).unwrap(),
            grid,
            bands: ["SR_B4", "SR_B5", "ST_B10", "QA_PIXEL"].iter().map(|s| s.to_string()).collect(),
            fill_band: Some("QA_PIXEL".to_string()),
        }
    }

    #[test]
    fn empty_match_gives_empty_collection_on_grid() {
        let bbox = BoundingBox::new(0.0, 0.0, 60.0, 60.0);
        let grid = GridSpec::from_bbox(&bbox, 30.0).unwrap();
        let archive = MemoryArchive::new("LANDSAT/LC08/C02/T1_L2", Vec::new());
        let profile = SensorRegistry::builtin().get("landsat8").unwrap().clone();

        let collection = CollectionLoader::new(&archive)
            .load(&query(grid, &bbox), &TransformChain::standard(&profile))
            .unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.grid, grid);
    }

    #[test]
    fn loaded_scenes_are_transformed() {
        let bbox = BoundingBox::new(0.0, 0.0, 30.0, 30.0);
        let grid = GridSpec::from_bbox(&bbox, 30.0).unwrap();
        let scene = Image::new("LC08_L2SP_190026_20200517_20200527_02_T1", NaiveDate::from_ymd_opt(2020, 5, 17).unwrap(), grid)
            .with_band(Band::new("SR_B4", vec![10000.0]))
            .unwrap()
            .with_band(Band::new("SR_B5", vec![20000.0]))
            .unwrap()
            .with_band(Band::new("ST_B10", vec![44000.0]))
            .unwrap()
            .with_band(Band::new("QA_PIXEL", vec![21824.0]))
            .unwrap();
        let archive = MemoryArchive::new("LANDSAT/LC08/C02/T1_L2", vec![scene]);
        let profile = SensorRegistry::builtin().get("landsat8").unwrap().clone();

        let collection = CollectionLoader::new(&archive)
            .load(&query(grid, &bbox), &TransformChain::standard(&profile))
            .unwrap();
        assert_eq!(collection.len(), 1);
        assert!(collection.images()[0].band("NDVI").is_some());
        assert_eq!(collection.images()[0].band("time").unwrap().data, vec![20200517.0]);
    }
}
