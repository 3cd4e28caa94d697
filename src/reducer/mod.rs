//! Temporal reducers
//!
//! Collapse a collection to one summary raster, pixel by pixel, looking
//! only at images where the primary band has data. Rows are reduced in
//! parallel.

use log::debug;
use rayon::prelude::*;
use std::fmt;

use crate::collection::Collection;
use crate::errors::SceneResult;
use crate::raster::{Band, GridSpec, SummaryRaster};

/// A per-pixel statistic over time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reducer {
    Mean,
    Median,
    /// Maximum, plus the named band of the image that held it
    MaxWithCoBand { coband: String },
    /// Number of valid observations
    Count,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Mean => write!(f, "mean"),
            Reducer::Median => write!(f, "median"),
            Reducer::MaxWithCoBand { coband } => write!(f, "max({})", coband),
            Reducer::Count => write!(f, "count"),
        }
    }
}

impl Reducer {
    pub fn reduce(&self, collection: &Collection, band: &str) -> SceneResult<SummaryRaster> {
        debug!("Reducing {} images of {} with {} over {}", collection.len(), collection.id, self, band);
        match self {
            Reducer::Mean => mean(collection, band),
            Reducer::Median => median(collection, band),
            Reducer::MaxWithCoBand { coband } => max_with_coband(collection, band, coband),
            Reducer::Count => count(collection, band),
        }
    }
}

/// The named band of every image, in collection order
fn band_stack<'c>(collection: &'c Collection, band: &str) -> SceneResult<Vec<&'c [f64]>> {
    collection
        .images()
        .iter()
        .map(|image| image.require_band(band).map(|b| b.data.as_slice()))
        .collect()
}

/// Evaluates `f` for every pixel index, a row per task
fn per_pixel<T, F>(grid: &GridSpec, fill: T, f: F) -> Vec<T>
where
    T: Clone + Send,
    F: Fn(usize) -> T + Sync,
{
    let width = grid.width as usize;
    let mut out = vec![fill; grid.len()];
    if width == 0 {
        return out;
    }
    out.par_chunks_mut(width).enumerate().for_each(|(row, cells)| {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = f(row * width + col);
        }
    });
    out
}

pub fn mean(collection: &Collection, band: &str) -> SceneResult<SummaryRaster> {
    let stack = band_stack(collection, band)?;
    let data = per_pixel(&collection.grid, f64::NAN, |i| {
        let (sum, n) = stack
            .iter()
            .map(|values| values[i])
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    });
    let name = format!("{}_mean", band);
    Ok(SummaryRaster::new(name.clone(), collection.grid, vec![Band::new(name, data)]))
}

/// Middle value; the mean of the two middle values for an even count
pub fn median_of(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub fn median(collection: &Collection, band: &str) -> SceneResult<SummaryRaster> {
    let stack = band_stack(collection, band)?;
    let data = per_pixel(&collection.grid, f64::NAN, |i| {
        let mut valid: Vec<f64> = stack.iter().map(|values| values[i]).filter(|v| !v.is_nan()).collect();
        median_of(&mut valid)
    });
    let name = format!("{}_median", band);
    Ok(SummaryRaster::new(name.clone(), collection.grid, vec![Band::new(name, data)]))
}

/// Per pixel: the maximum of `band` and the value of `coband` in the
/// same image. On ties the earliest image wins.
pub fn max_with_coband(collection: &Collection, band: &str, coband: &str) -> SceneResult<SummaryRaster> {
    let stack = band_stack(collection, band)?;
    let co_stack = band_stack(collection, coband)?;

    let winners = per_pixel(&collection.grid, None, |i| {
        let mut best: Option<(usize, f64)> = None;
        for (index, values) in stack.iter().enumerate() {
            let v = values[i];
            if v.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, max)| v > max) {
                best = Some((index, v));
            }
        }
        best
    });

    let max_data = winners.iter().map(|w| w.map_or(f64::NAN, |(_, v)| v)).collect();
    let co_data = winners
        .iter()
        .enumerate()
        .map(|(i, w)| w.map_or(f64::NAN, |(index, _)| co_stack[index][i]))
        .collect();

    Ok(SummaryRaster::new(
        format!("{}_max", band),
        collection.grid,
        vec![Band::new(format!("{}_max", band), max_data), Band::new(format!("{}_at_max", coband), co_data)],
    ))
}

pub fn count(collection: &Collection, band: &str) -> SceneResult<SummaryRaster> {
    let stack = band_stack(collection, band)?;
    let data = per_pixel(&collection.grid, 0.0, |i| {
        stack.iter().filter(|values| !values[i].is_nan()).count() as f64
    });
    let name = format!("{}_count", band);
    Ok(SummaryRaster::new(name.clone(), collection.grid, vec![Band::new(name, data)]))
}
