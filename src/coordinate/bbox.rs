//! Axis-aligned bounding boxes in map units

use crate::errors::{SceneError, SceneResult};
use crate::tiff::raster_reader::Window;

/// A bounding box in some coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// EPSG code of the coordinate system
    pub epsg: Option<u16>,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y, epsg: None }
    }

    pub fn new_with_crs(min_x: f64, min_y: f64, max_x: f64, max_y: f64, epsg: u16) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y, epsg: Some(epsg) }
    }

    /// Parses `minx,miny,maxx,maxy`
    pub fn from_string(bbox_str: &str) -> SceneResult<Self> {
        let parts: Vec<&str> = bbox_str.split(',').collect();
        if parts.len() != 4 {
            return Err(SceneError::InvalidConfig(
                "Bounding box must have 4 comma-separated values".to_string(),
            ));
        }

        let mut values = [0.0; 4];
        for (value, (part, name)) in values.iter_mut().zip(parts.iter().zip(["min_x", "min_y", "max_x", "max_y"])) {
            *value = part
                .trim()
                .parse::<f64>()
                .map_err(|_| SceneError::InvalidConfig(format!("Invalid {} value '{}'", name, part.trim())))?;
        }

        let bbox = BoundingBox::new(values[0], values[1], values[2], values[3]);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Rejects empty or inverted boxes
    pub fn validate(&self) -> SceneResult<()> {
        if !(self.max_x > self.min_x && self.max_y > self.min_y) {
            return Err(SceneError::InvalidConfig(format!(
                "Bounding box {},{},{},{} is empty or inverted",
                self.min_x, self.min_y, self.max_x, self.max_y
            )));
        }
        Ok(())
    }

    pub fn with_epsg(mut self, epsg: Option<u16>) -> Self {
        self.epsg = epsg;
        self
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether two boxes overlap with positive area
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x && other.min_x < self.max_x && self.min_y < other.max_y && other.min_y < self.max_y
    }

    /// Pixel window covering this box under a north-up geotransform
    ///
    /// Rounds outward and clamps at the raster origin; the caller clips
    /// against the raster extent.
    pub fn to_pixel_window(&self, geotransform: &[f64; 6]) -> Window {
        let origin_x = geotransform[0];
        let pixel_width = geotransform[1];
        let origin_y = geotransform[3];
        let pixel_height = geotransform[5];

        let x_min = ((self.min_x - origin_x) / pixel_width).floor() as i64;
        let x_max = ((self.max_x - origin_x) / pixel_width).ceil() as i64;
        let y_min = ((self.max_y - origin_y) / pixel_height).floor() as i64;
        let y_max = ((self.min_y - origin_y) / pixel_height).ceil() as i64;

        let start_x = x_min.max(0);
        let start_y = y_min.max(0);
        let width = (x_max - start_x).max(0) as u32;
        let height = (y_max - start_y).max(0) as u32;

        Window::new(start_x as u32, start_y as u32, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_values() {
        let bbox = BoundingBox::from_string("500000, 4190000, 530000,4200000").unwrap();
        assert_eq!(bbox.width(), 30000.0);
        assert_eq!(bbox.height(), 10000.0);
    }

    #[test]
    fn rejects_bad_boxes() {
        assert!(BoundingBox::from_string("1,2,3").is_err());
        assert!(BoundingBox::from_string("1,2,x,4").is_err());
        assert!(BoundingBox::from_string("5,2,3,4").is_err());
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&BoundingBox::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&BoundingBox::new(10.0, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn pixel_window_rounds_outward() {
        let gt = [1000.0, 30.0, 0.0, 2000.0, 0.0, -30.0];
        let window = BoundingBox::new(1045.0, 1900.0, 1100.0, 1970.0).to_pixel_window(&gt);
        assert_eq!(window, Window::new(1, 1, 3, 3));
    }
}
