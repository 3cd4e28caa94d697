//! Pixel grids

use std::fmt;

use crate::coordinate::BoundingBox;
use crate::errors::{SceneError, SceneResult};

/// A north-up pixel grid in some CRS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub width: u32,
    pub height: u32,
    /// `[origin_x, pixel_width, 0, origin_y, 0, -pixel_height]`
    pub geotransform: [f64; 6],
    pub epsg: Option<u16>,
}

impl GridSpec {
    pub fn new(width: u32, height: u32, geotransform: [f64; 6], epsg: Option<u16>) -> Self {
        GridSpec { width, height, geotransform, epsg }
    }

    /// Width and height in `scale` pixels of `bbox` snapped outward, as
    /// 64-bit counts so oversized regions can be measured before a grid
    /// exists
    pub fn snapped_size(bbox: &BoundingBox, scale: f64) -> SceneResult<(u64, u64)> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SceneError::InvalidConfig(format!("Scale must be positive, got {}", scale)));
        }
        bbox.validate()?;

        let (min_x, min_y, max_x, max_y) = Self::snap(bbox, scale);
        let width = ((max_x - min_x) / scale).round();
        let height = ((max_y - min_y) / scale).round();
        if !(width >= 1.0 && height >= 1.0) {
            return Err(SceneError::InvalidConfig(format!(
                "Region {:?} gives an empty {}x{} grid at scale {}",
                bbox, width, height, scale
            )));
        }
        // `as` saturates at u64::MAX for huge or infinite extents
        Ok((width as u64, height as u64))
    }

    fn snap(bbox: &BoundingBox, scale: f64) -> (f64, f64, f64, f64) {
        (
            (bbox.min_x / scale).floor() * scale,
            (bbox.min_y / scale).floor() * scale,
            (bbox.max_x / scale).ceil() * scale,
            (bbox.max_y / scale).ceil() * scale,
        )
    }

    /// Grid of square `scale` pixels covering `bbox`
    ///
    /// The box is snapped outward to multiples of `scale` so grids built
    /// from overlapping boxes share pixel edges.
    pub fn from_bbox(bbox: &BoundingBox, scale: f64) -> SceneResult<Self> {
        let (width, height) = Self::snapped_size(bbox, scale)?;
        let to_u32 = |n: u64| {
            u32::try_from(n).map_err(|_| {
                SceneError::InvalidConfig(format!(
                    "Region {:?} gives an unusable {}x{} grid at scale {}",
                    bbox, width, height, scale
                ))
            })
        };
        let (min_x, _, _, max_y) = Self::snap(bbox, scale);

        Ok(GridSpec {
            width: to_u32(width)?,
            height: to_u32(height)?,
            geotransform: [min_x, scale, 0.0, max_y, 0.0, -scale],
            epsg: bbox.epsg,
        })
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Number of cells, as a buffer length
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(pixel_width, pixel_height)`, both positive
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.geotransform[1].abs(), self.geotransform[5].abs())
    }

    /// World coordinates of the centre of pixel `(col, row)`
    pub fn pixel_center(&self, col: u32, row: u32) -> (f64, f64) {
        let gt = &self.geotransform;
        let px = col as f64 + 0.5;
        let py = row as f64 + 0.5;
        (gt[0] + px * gt[1] + py * gt[2], gt[3] + px * gt[4] + py * gt[5])
    }

    /// Pixel containing a world coordinate, if inside the grid
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let gt = &self.geotransform;
        let col = ((x - gt[0]) / gt[1]).floor();
        let row = ((y - gt[3]) / gt[5]).floor();
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((col as u32, row as u32))
    }

    /// Extent in world coordinates
    pub fn bounds(&self) -> BoundingBox {
        let gt = &self.geotransform;
        let x0 = gt[0];
        let x1 = gt[0] + self.width as f64 * gt[1];
        let y0 = gt[3];
        let y1 = gt[3] + self.height as f64 * gt[5];
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)).with_epsg(self.epsg)
    }

    /// Errors unless `other` describes the same cells
    pub fn ensure_same(&self, other: &GridSpec) -> SceneResult<()> {
        if self.width != other.width || self.height != other.height || self.geotransform != other.geotransform {
            return Err(SceneError::GridMismatch(format!("{} vs {}", self, other)));
        }
        Ok(())
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (px, py) = self.pixel_size();
        write!(
            f,
            "{}x{} @ {}x{} from ({}, {})",
            self.width, self.height, px, py, self.geotransform[0], self.geotransform[3]
        )?;
        if let Some(epsg) = self.epsg {
            write!(f, " EPSG:{}", epsg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_is_snapped_outward() {
        let bbox = BoundingBox::new_with_crs(500020.0, 4199950.0, 500100.0, 4200020.0, 32633);
        let grid = GridSpec::from_bbox(&bbox, 30.0).unwrap();
        assert_eq!(grid.geotransform, [500010.0, 30.0, 0.0, 4200030.0, 0.0, -30.0]);
        assert_eq!((grid.width, grid.height), (3, 3));
        assert_eq!(grid.epsg, Some(32633));
    }

    #[test]
    fn snapped_size_measures_regions_wider_than_a_grid() {
        let bbox = BoundingBox::new(0.0, 0.0, 30.0 * 5_000_000_000.0, 30.0);
        assert_eq!(GridSpec::snapped_size(&bbox, 30.0).unwrap(), (5_000_000_000, 1));
        assert!(matches!(GridSpec::from_bbox(&bbox, 30.0), Err(SceneError::InvalidConfig(_))));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(GridSpec::from_bbox(&bbox, 0.0).is_err());
    }

    #[test]
    fn pixel_centres_map_back() {
        let grid = GridSpec::new(4, 3, [100.0, 10.0, 0.0, 50.0, 0.0, -10.0], None);
        let (x, y) = grid.pixel_center(2, 1);
        assert_eq!((x, y), (125.0, 35.0));
        assert_eq!(grid.world_to_pixel(x, y), Some((2, 1)));
        assert_eq!(grid.world_to_pixel(99.0, 45.0), None);
        assert_eq!(grid.bounds(), BoundingBox::new(100.0, 20.0, 140.0, 50.0));
    }

    #[test]
    fn grid_mismatch_is_reported() {
        let a = GridSpec::new(4, 3, [0.0, 10.0, 0.0, 0.0, 0.0, -10.0], None);
        let b = GridSpec::new(4, 4, [0.0, 10.0, 0.0, 0.0, 0.0, -10.0], None);
        assert!(matches!(a.ensure_same(&b), Err(SceneError::GridMismatch(_))));
    }
}
