//! Focal (moving window) mean, used for speckle reduction
//!
//! Radar backscatter is dominated by speckle; a circular focal mean before
//! computing change indices keeps single-pixel noise from surviving the
//! threshold as tiny flood patches.

use ndarray::Array2;
use crate::maybe_rayon::*;
use landmask_core::raster::Raster;
use landmask_core::{Error, Result};

/// Parameters for the focal mean
#[derive(Debug, Clone)]
pub struct FocalParams {
    /// Window radius in cells (window size = 2*radius + 1)
    pub radius: usize,
    /// Circular window instead of square
    pub circular: bool,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            radius: 1,
            circular: true,
        }
    }
}

fn window_offsets(radius: usize, circular: bool) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let r_sq = r * r;
    let mut offs = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dr in -r..=r {
        for dc in -r..=r {
            if !circular || dr * dr + dc * dc <= r_sq {
                offs.push((dr, dc));
            }
        }
    }
    offs
}

/// Mean of the valid cells in a window around each cell.
///
/// No-data cells stay no-data; windows clipped at the raster edge average
/// whatever valid neighbours remain.
pub fn focal_mean(raster: &Raster<f64>, params: FocalParams) -> Result<Raster<f64>> {
    if params.radius == 0 {
        return Err(Error::Algorithm("Focal radius must be > 0".into()));
    }

    let (rows, cols) = raster.shape();
    let offsets = window_offsets(params.radius, params.circular);

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                if raster.valid_value(row, col).is_none() {
                    continue;
                }

                let mut sum = 0.0;
                let mut n = 0usize;
                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 {
                        continue;
                    }
                    if let Some(v) = raster.valid_value(nr as usize, nc as usize) {
                        sum += v;
                        n += 1;
                    }
                }

                *out = sum / n as f64;
            }

            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Circular focal mean with a radius in ground units.
///
/// The radius is converted to whole cells (at least one).
pub fn speckle_filter(raster: &Raster<f64>, radius: f64) -> Result<Raster<f64>> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(Error::invalid_parameter("speckle_radius", radius, "must be positive"));
    }
    let cells = (radius / raster.cell_size()).round().max(1.0) as usize;
    focal_mean(
        raster,
        FocalParams {
            radius: cells,
            circular: true,
        },
    )
}
