//! Exclusion masks of known non-target areas

use landmask_core::{BinaryMask, Error, MaskValue, Raster, Result};

/// Cells where `predicate` holds for the raster value. No-data cells are
/// no-data in the mask.
pub fn threshold_exclusion<F>(raster: &Raster<f64>, predicate: F) -> BinaryMask
where
    F: Fn(f64) -> bool,
{
    BinaryMask::from_fn(raster, |row, col| match raster.valid_value(row, col) {
        Some(v) => predicate(v).into(),
        None => MaskValue::NoData,
    })
}

/// Permanent water from a surface-water seasonality layer (months per year
/// a cell is water, 0..=12): true where `months >= min_months`.
pub fn permanent_water_mask(seasonality: &Raster<f64>, min_months: f64) -> Result<BinaryMask> {
    if !(0.0..=12.0).contains(&min_months) {
        return Err(Error::invalid_parameter(
            "permanent_water_months",
            min_months,
            "must be within 0..=12",
        ));
    }
    Ok(threshold_exclusion(seasonality, |months| months >= min_months))
}
