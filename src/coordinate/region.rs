//! Region of interest
//!
//! A (multi)polygon in the archive's CRS. It selects scenes whose
//! footprint touches it and masks output pixels whose centre falls
//! outside it.

use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use log::debug;
use std::fs;
use std::path::Path;

use crate::coordinate::BoundingBox;
use crate::errors::{SceneError, SceneResult};

#[derive(Debug, Clone, PartialEq)]
pub struct RegionOfInterest {
    shape: MultiPolygon<f64>,
    bounds: BoundingBox,
}

impl RegionOfInterest {
    /// Rectangle region
    pub fn from_bbox(bbox: &BoundingBox) -> SceneResult<Self> {
        bbox.validate()?;
        let ring = LineString::from(vec![
            (bbox.min_x, bbox.min_y),
            (bbox.max_x, bbox.min_y),
            (bbox.max_x, bbox.max_y),
            (bbox.min_x, bbox.max_y),
            (bbox.min_x, bbox.min_y),
        ]);
        Ok(RegionOfInterest {
            shape: MultiPolygon::new(vec![Polygon::new(ring, vec![])]),
            bounds: *bbox,
        })
    }

    pub fn from_polygons(polygons: Vec<Polygon<f64>>, epsg: Option<u16>) -> SceneResult<Self> {
        let shape = MultiPolygon::new(polygons);
        let rect = shape
            .bounding_rect()
            .ok_or_else(|| SceneError::InvalidConfig("Region has no polygons".to_string()))?;
        let bounds = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y).with_epsg(epsg);
        bounds.validate()?;
        Ok(RegionOfInterest { shape, bounds })
    }

    /// Parses a GeoJSON Geometry, Feature or FeatureCollection
    ///
    /// Every Polygon and MultiPolygon found becomes part of the region.
    /// A legacy `crs` member naming an EPSG code overrides `default_epsg`.
    pub fn from_geojson_str(content: &str, default_epsg: Option<u16>) -> SceneResult<Self> {
        let geojson: geojson::GeoJson = content
            .parse()
            .map_err(|e| SceneError::InvalidConfig(format!("Invalid GeoJSON region: {}", e)))?;

        let (geometries, crs_member) = match geojson {
            geojson::GeoJson::FeatureCollection(fc) => {
                let crs = fc.foreign_members.as_ref().and_then(|fm| fm.get("crs")).and_then(epsg_from_crs_member);
                (fc.features.into_iter().filter_map(|f| f.geometry).collect::<Vec<_>>(), crs)
            }
            geojson::GeoJson::Feature(feature) => (feature.geometry.into_iter().collect(), None),
            geojson::GeoJson::Geometry(geometry) => (vec![geometry], None),
        };

        let mut polygons = Vec::new();
        for geometry in geometries {
            match geometry.value {
                geojson::Value::Polygon(rings) => polygons.push(polygon_from_rings(&rings)?),
                geojson::Value::MultiPolygon(parts) => {
                    for rings in &parts {
                        polygons.push(polygon_from_rings(rings)?);
                    }
                }
                other => debug!("Ignoring non-polygon region geometry {}", other.type_name()),
            }
        }

        if polygons.is_empty() {
            return Err(SceneError::InvalidConfig("GeoJSON region contains no Polygon".to_string()));
        }
        Self::from_polygons(polygons, crs_member.or(default_epsg))
    }

    pub fn from_geojson_file(path: &Path, default_epsg: Option<u16>) -> SceneResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_geojson_str(&content, default_epsg)
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn epsg(&self) -> Option<u16> {
        self.bounds.epsg
    }

    pub fn with_epsg(mut self, epsg: Option<u16>) -> Self {
        self.bounds.epsg = epsg;
        self
    }

    /// Point-in-region test (boundary points count as outside)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bounds.contains(x, y) && self.shape.contains(&Point::new(x, y))
    }

    /// Whether a scene footprint can contribute pixels
    pub fn intersects_bbox(&self, footprint: &BoundingBox) -> bool {
        self.bounds.intersects(footprint)
    }

    /// Whether the region is exactly its bounding rectangle
    pub fn is_rectangle(&self) -> bool {
        self.shape.0.len() == 1 && self.shape.0[0].interiors().is_empty() && self.shape.0[0].exterior().0.len() == 5 && {
            let b = &self.bounds;
            self.shape.0[0]
                .exterior()
                .coords()
                .all(|c| (c.x == b.min_x || c.x == b.max_x) && (c.y == b.min_y || c.y == b.max_y))
        }
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> SceneResult<Polygon<f64>> {
    let mut converted = rings.iter().map(|ring| {
        let coords: Vec<Coord<f64>> = ring
            .iter()
            .filter(|position| position.len() >= 2)
            .map(|position| Coord { x: position[0], y: position[1] })
            .collect();
        if coords.len() < 4 {
            return Err(SceneError::InvalidConfig("Polygon ring needs at least four positions".to_string()));
        }
        Ok(LineString::new(coords))
    });

    let exterior = converted
        .next()
        .ok_or_else(|| SceneError::InvalidConfig("Polygon without exterior ring".to_string()))??;
    let interiors = converted.collect::<SceneResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// `{"type":"name","properties":{"name":"EPSG:32633"}}` or the URN form
fn epsg_from_crs_member(crs: &geojson::JsonValue) -> Option<u16> {
    crs.get("properties")?
        .get("name")?
        .as_str()?
        .split(':')
        .last()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32633"}},
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [100, 0], [0, 100], [0, 0]]]}
        }]
    }"#;

    #[test]
    fn bbox_region_contains_its_interior() {
        let region = RegionOfInterest::from_bbox(&BoundingBox::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert!(region.contains(5.0, 5.0));
        assert!(!region.contains(11.0, 5.0));
        assert!(region.is_rectangle());
    }

    #[test]
    fn geojson_polygon_clips_by_shape() {
        let region = RegionOfInterest::from_geojson_str(TRIANGLE, None).unwrap();
        assert_eq!(region.epsg(), Some(32633));
        assert_eq!(region.bounding_box().max_x, 100.0);
        assert!(region.contains(10.0, 10.0));
        assert!(!region.contains(90.0, 90.0));
        assert!(!region.is_rectangle());
    }

    #[test]
    fn bare_geometry_uses_default_epsg() {
        let geometry = r#"{"type": "Polygon", "coordinates": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]]}"#;
        let region = RegionOfInterest::from_geojson_str(geometry, Some(32610)).unwrap();
        assert_eq!(region.epsg(), Some(32610));
    }

    #[test]
    fn point_only_geojson_is_rejected() {
        let point = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(matches!(
            RegionOfInterest::from_geojson_str(point, None),
            Err(SceneError::InvalidConfig(_))
        ));
    }
}
