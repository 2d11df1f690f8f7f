//! Spectral and radar change indices
//!
//! Every index is a per-cell formula over co-registered single-band rasters.
//! A cell is no-data in the output when any input is no-data there or the
//! formula's denominator vanishes.

use ndarray::Array2;
use crate::maybe_rayon::*;
use landmask_core::raster::Raster;
use landmask_core::{Error, Result};

const EPSILON: f64 = 1e-10;

/// Apply `f` to the values of `bands` at every cell.
///
/// `f` returns `None` for cells it cannot evaluate.
fn pixelwise<F>(bands: &[&Raster<f64>], f: F) -> Result<Raster<f64>>
where
    F: Fn(&[f64]) -> Option<f64> + Sync + Send,
{
    let Some((first, rest)) = bands.split_first() else {
        return Err(Error::MissingInput("no bands given".into()));
    };
    for band in rest {
        first.check_same_grid(band)?;
    }

    let (rows, cols) = first.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values = vec![0.0; bands.len()];
            'cells: for (col, out) in row_data.iter_mut().enumerate() {
                for (v, band) in values.iter_mut().zip(bands) {
                    match band.valid_value(row, col) {
                        Some(x) => *v = x,
                        None => continue 'cells,
                    }
                }
                if let Some(x) = f(&values) {
                    *out = x;
                }
            }
            row_data
        })
        .collect();

    build_output(first, rows, cols, data)
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    (den.abs() >= EPSILON).then(|| num / den)
}

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative inputs.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[band_a, band_b], |v| ratio(v[0] - v[1], v[0] + v[1]))
}

// ---------------------------------------------------------------------------
// Vegetation
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Green Normalized Difference Vegetation Index (Gitelson et al., 1996)
///
/// `GNDVI = (NIR - Green) / (NIR + Green)`
pub fn gndvi(nir: &Raster<f64>, green: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, green)
}

/// Parameters for SAVI
#[derive(Debug, Clone, Copy)]
pub struct SaviParams {
    /// Soil brightness correction factor (0 = high vegetation, 1 = low vegetation)
    /// Default: 0.5
    pub l_factor: f64,
}

impl Default for SaviParams {
    fn default() -> Self {
        Self { l_factor: 0.5 }
    }
}

/// Soil Adjusted Vegetation Index (Huete, 1988)
///
/// `SAVI = ((NIR - Red) / (NIR + Red + L)) * (1 + L)`
pub fn savi(nir: &Raster<f64>, red: &Raster<f64>, params: SaviParams) -> Result<Raster<f64>> {
    let l = params.l_factor;
    pixelwise(&[nir, red], |v| {
        ratio(v[0] - v[1], v[0] + v[1] + l).map(|x| x * (1.0 + l))
    })
}

/// Parameters for EVI
#[derive(Debug, Clone, Copy)]
pub struct EviParams {
    /// Gain factor (default: 2.5)
    pub g: f64,
    /// Aerosol coefficient for red band (default: 6.0)
    pub c1: f64,
    /// Aerosol coefficient for blue band (default: 7.5)
    pub c2: f64,
    /// Canopy background adjustment (default: 1.0)
    pub l: f64,
}

impl Default for EviParams {
    fn default() -> Self {
        Self {
            g: 2.5,
            c1: 6.0,
            c2: 7.5,
            l: 1.0,
        }
    }
}

/// Enhanced Vegetation Index (Huete et al., 2002)
///
/// `EVI = G * (NIR - Red) / (NIR + C1 * Red - C2 * Blue + L)`
///
/// # Arguments
/// * `nir` - Near-infrared band
/// * `red` - Red band
/// * `blue` - Blue band
/// * `params` - EVI coefficients
pub fn evi(
    nir: &Raster<f64>,
    red: &Raster<f64>,
    blue: &Raster<f64>,
    params: EviParams,
) -> Result<Raster<f64>> {
    pixelwise(&[nir, red, blue], |v| {
        let (n, r, b) = (v[0], v[1], v[2]);
        ratio(params.g * (n - r), n + params.c1 * r - params.c2 * b + params.l)
    })
}

// ---------------------------------------------------------------------------
// Moisture and water
// ---------------------------------------------------------------------------

/// Normalized Difference Moisture Index
///
/// `NDMI = (NIR - SWIR1) / (NIR + SWIR1)`
pub fn ndmi(nir: &Raster<f64>, swir1: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, swir1)
}

/// Modified Normalized Difference Water Index (Xu, 2006)
///
/// `MNDWI = (Green - SWIR1) / (Green + SWIR1)`
pub fn mndwi(green: &Raster<f64>, swir1: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, swir1)
}

// ---------------------------------------------------------------------------
// Soil
// ---------------------------------------------------------------------------

/// Simple Ratio, `NIR / Red`
pub fn simple_ratio(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[nir, red], |v| ratio(v[0], v[1]))
}

/// Difference Vegetation Index, `NIR - Red`
pub fn dvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[nir, red], |v| Some(v[0] - v[1]))
}

/// Clay Minerals Ratio, `SWIR1 / SWIR2`
pub fn clay_minerals_ratio(swir1: &Raster<f64>, swir2: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[swir1, swir2], |v| ratio(v[0], v[1]))
}

// ---------------------------------------------------------------------------
// Radar change (linear backscatter, before and after an event)
// ---------------------------------------------------------------------------

/// Ratio Index, `pre / post`.
///
/// Open water lowers backscatter, so newly flooded cells score high.
pub fn ratio_index(pre: &Raster<f64>, post: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[pre, post], |v| ratio(v[0], v[1]))
}

/// Normalized Difference Flood Index, `(post - pre) / (post + pre)`.
///
/// Newly flooded cells score low.
pub fn ndfi(pre: &Raster<f64>, post: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(post, pre)
}

/// Difference Image Index, `pre - post`.
///
/// Newly flooded cells score high.
pub fn dii(pre: &Raster<f64>, post: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[pre, post], |v| Some(v[0] - v[1]))
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
