//! Slope from a DEM
//!
//! Horn (1981) finite differences over a 3x3 neighbourhood. Neighbours that
//! fall off the grid or are no-data take the centre value, so edge cells
//! still get a slope.

use ndarray::Array2;
use crate::maybe_rayon::*;
use landmask_core::raster::Raster;
use landmask_core::{BinaryMask, Error, MaskValue, Result};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Percent rise (100 = 45°)
    Percent,
    /// Radians (0-π/2)
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone, Copy)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Horizontal units per elevation unit (default 1.0).
    /// Use ~111320 for lat/lon DEMs with meters elevation
    pub z_factor: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
        }
    }
}

impl SlopeParams {
    pub fn percent() -> Self {
        Self {
            units: SlopeUnits::Percent,
            ..Self::default()
        }
    }
}

/// Calculate slope from a DEM
///
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
/// slope = atan(sqrt(dz/dx² + dz/dy²))
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    if !(params.z_factor > 0.0) {
        return Err(Error::invalid_parameter("z_factor", params.z_factor, "must be positive"));
    }

    let (rows, cols) = dem.shape();
    let eight_cell_size = 8.0 * dem.cell_size() * params.z_factor;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let Some(e) = dem.valid_value(row, col) else {
                    continue;
                };

                let z = |dr: isize, dc: isize| -> f64 {
                    let r = row as isize + dr;
                    let c = col as isize + dc;
                    if r < 0 || c < 0 {
                        return e;
                    }
                    dem.valid_value(r as usize, c as usize).unwrap_or(e)
                };

                let (a, b, c) = (z(-1, -1), z(-1, 0), z(-1, 1));
                let (d, f) = (z(0, -1), z(0, 1));
                let (g, h, i) = (z(1, -1), z(1, 0), z(1, 1));

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell_size;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cell_size;
                let rise = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();

                *out = match params.units {
                    SlopeUnits::Degrees => rise.atan().to_degrees(),
                    SlopeUnits::Percent => rise * 100.0,
                    SlopeUnits::Radians => rise.atan(),
                };
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Cells whose slope is at least `max_percent` percent.
///
/// Used as an exclusion: terrain this steep does not hold flood water.
/// No-data DEM cells are no-data in the mask.
pub fn steep_terrain_mask(dem: &Raster<f64>, max_percent: f64) -> Result<BinaryMask> {
    if !(max_percent >= 0.0) {
        return Err(Error::invalid_parameter("max_slope_percent", max_percent, "must be >= 0"));
    }
    let pct = slope(dem, SlopeParams::percent())?;
    Ok(BinaryMask::from_fn(&pct, |row, col| {
        match pct.valid_value(row, col) {
            Some(s) => (s >= max_percent).into(),
            None => MaskValue::NoData,
        }
    }))
}
