//! Exact area of mask and class rasters

use std::collections::BTreeMap;

use serde::Serialize;

use super::SQUARE_METERS_PER_HECTARE;
use crate::statistics::Footprint;
use landmask_core::{BinaryMask, Raster, Region, Result};

/// Area of the true cells of a mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaSummary {
    /// Sampled true cells inside the region
    pub cells: u64,
    /// Unrounded area in square meters
    pub area_m2: f64,
    /// Area in hectares, rounded to the nearest integer
    pub hectares: u64,
}

impl AreaSummary {
    fn from_cells(cells: u64, pixel_area: f64) -> Self {
        let area_m2 = cells as f64 * pixel_area;
        Self {
            cells,
            area_m2,
            hectares: (area_m2 / SQUARE_METERS_PER_HECTARE).round() as u64,
        }
    }
}

/// Count, square meters and rounded hectares of the true cells of `mask`
/// inside `region`, sampled at `scale`.
pub fn area_summary(mask: &BinaryMask, region: &Region, scale: f64) -> Result<AreaSummary> {
    let (rows, cols) = mask.shape();
    let footprint = Footprint::new(region, mask.transform(), rows, cols, scale)?;

    let cells = mask
        .iter_true()
        .filter(|&(row, col)| footprint.includes(row, col))
        .count() as u64;

    Ok(AreaSummary::from_cells(cells, footprint.grid().pixel_area()))
}

/// `round(cells × scale² / 10 000)` over the true cells of `mask` inside
/// `region`. The cell count is exact; nothing is estimated or tiled.
pub fn compute_area_hectares(mask: &BinaryMask, region: &Region, scale: f64) -> Result<u64> {
    area_summary(mask, region, scale).map(|a| a.hectares)
}

/// Area per class value of a classification raster
pub fn class_areas_hectares(
    classes: &Raster<i32>,
    region: &Region,
    scale: f64,
) -> Result<BTreeMap<i32, AreaSummary>> {
    let footprint = Footprint::for_raster(classes, region, scale)?;
    let stride = footprint.grid().stride();
    let (rows, cols) = classes.shape();

    let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
    for row in (0..rows).step_by(stride) {
        for col in (0..cols).step_by(stride) {
            if !footprint.includes(row, col) {
                continue;
            }
            if let Some(class) = classes.valid_value(row, col) {
                *counts.entry(class).or_default() += 1;
            }
        }
    }

    let pixel_area = footprint.grid().pixel_area();
    Ok(counts
        .into_iter()
        .map(|(class, cells)| (class, AreaSummary::from_cells(cells, pixel_area)))
        .collect())
}
