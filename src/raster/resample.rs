//! Nearest-neighbour resampling between grids of the same CRS

use rayon::prelude::*;

use crate::raster::GridSpec;

/// Samples `source` (laid out on `source_grid`) at every pixel centre of
/// `target`; centres outside the source become NaN
pub fn resample_nearest(source: &[f64], source_grid: &GridSpec, target: &GridSpec) -> Vec<f64> {
    if source_grid == target {
        return source.to_vec();
    }

    let width = target.width as usize;
    let mut out = vec![f64::NAN; target.len()];
    if width == 0 {
        return out;
    }
    out.par_chunks_mut(width).enumerate().for_each(|(row, cells)| {
        for (col, cell) in cells.iter_mut().enumerate() {
            let (x, y) = target.pixel_center(col as u32, row as u32);
            if let Some((sc, sr)) = source_grid.world_to_pixel(x, y) {
                *cell = source[sr as usize * source_grid.width as usize + sc as usize];
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_grids_copy() {
        let grid = GridSpec::new(2, 2, [0.0, 1.0, 0.0, 2.0, 0.0, -1.0], None);
        assert_eq!(resample_nearest(&[1.0, 2.0, 3.0, 4.0], &grid, &grid), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn coarse_to_fine_and_outside() {
        let source_grid = GridSpec::new(2, 1, [0.0, 60.0, 0.0, 60.0, 0.0, -60.0], None);
        let target = GridSpec::new(5, 1, [0.0, 30.0, 0.0, 30.0, 0.0, -30.0], None);
        let out = resample_nearest(&[1.0, 2.0], &source_grid, &target);
        assert_eq!(&out[..4], &[1.0, 1.0, 2.0, 2.0]);
        assert!(out[4].is_nan());
    }
}
