//! Statistics of a raster within a region at a nominal scale
//!
//! Every reduction in the pipeline (min/max for normalization, mean/std for
//! thresholding, cell counts for area) runs over the same footprint: the
//! cells whose centers fall inside the region, sampled on the grid implied
//! by the requested scale.

use ndarray::Array2;
use serde::Serialize;
use landmask_core::raster::{Raster, RasterElement};
use landmask_core::{Error, GeoTransform, Region, Result};

/// Relative tolerance when checking that scale is a multiple of cell size
const SCALE_TOLERANCE: f64 = 1e-6;

/// Summary statistics of the valid cells in a footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub count: usize,
}

impl Statistics {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Nearest-neighbour sampling grid for a nominal scale.
///
/// A scale equal to the cell size samples every cell; a scale of `n` cell
/// sizes samples every `n`-th row and column, starting at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGrid {
    stride: usize,
    scale: f64,
}

impl SampleGrid {
    pub fn new(cell_size: f64, scale: f64) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::invalid_parameter("scale", scale, "must be positive"));
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(Error::invalid_parameter(
                "cell_size",
                cell_size,
                "raster has no usable cell size",
            ));
        }

        let ratio = scale / cell_size;
        let stride = ratio.round();
        if stride < 1.0 || (ratio - stride).abs() > SCALE_TOLERANCE * ratio {
            return Err(Error::invalid_parameter(
                "scale",
                scale,
                format!("must be a whole multiple of the cell size {}", cell_size),
            ));
        }

        Ok(Self {
            stride: stride as usize,
            scale,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Ground area of one sample in squared CRS units
    pub fn pixel_area(&self) -> f64 {
        self.scale * self.scale
    }

    pub fn is_sampled(&self, row: usize, col: usize) -> bool {
        row % self.stride == 0 && col % self.stride == 0
    }

    /// Dimensions of the sampled grid for a `rows x cols` raster
    pub fn sampled_shape(&self, rows: usize, cols: usize) -> (usize, usize) {
        (rows.div_ceil(self.stride), cols.div_ceil(self.stride))
    }

    /// Transform of the sampled grid
    pub fn sampled_transform(&self, transform: &GeoTransform) -> GeoTransform {
        let s = self.stride as f64;
        GeoTransform {
            pixel_width: transform.pixel_width * s,
            pixel_height: transform.pixel_height * s,
            row_rotation: transform.row_rotation * s,
            col_rotation: transform.col_rotation * s,
            ..*transform
        }
    }
}

/// Cells of a grid that take part in reductions: inside the region and on
/// the sample grid.
#[derive(Debug, Clone)]
pub struct Footprint {
    inside: Array2<bool>,
    grid: SampleGrid,
}

impl Footprint {
    pub fn new(
        region: &Region,
        transform: &GeoTransform,
        rows: usize,
        cols: usize,
        scale: f64,
    ) -> Result<Self> {
        let grid = SampleGrid::new(transform.cell_size(), scale)?;
        let inside = region.cell_mask(transform, rows, cols);
        Ok(Self { inside, grid })
    }

    pub fn for_raster<T: RasterElement>(
        raster: &Raster<T>,
        region: &Region,
        scale: f64,
    ) -> Result<Self> {
        Self::new(region, raster.transform(), raster.rows(), raster.cols(), scale)
    }

    /// Inside the region (at native resolution)
    pub fn in_region(&self, row: usize, col: usize) -> bool {
        self.inside.get((row, col)).copied().unwrap_or(false)
    }

    /// Inside the region and on the sample grid
    pub fn includes(&self, row: usize, col: usize) -> bool {
        self.grid.is_sampled(row, col) && self.in_region(row, col)
    }

    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    pub fn shape(&self) -> (usize, usize) {
        self.inside.dim()
    }

    /// Statistics of the valid values of `raster` over this footprint.
    ///
    /// Uses Welford's update so that large near-constant rasters do not
    /// lose the variance to cancellation.
    pub fn statistics(&self, raster: &Raster<f64>) -> Result<Statistics> {
        if raster.shape() != self.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = raster.shape();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut count = 0usize;

        let stride = self.grid.stride;
        let (rows, cols) = raster.shape();
        for row in (0..rows).step_by(stride) {
            for col in (0..cols).step_by(stride) {
                if !self.inside[(row, col)] {
                    continue;
                }
                let Some(v) = raster.valid_value(row, col) else {
                    continue;
                };
                count += 1;
                min = min.min(v);
                max = max.max(v);
                let delta = v - mean;
                mean += delta / count as f64;
                m2 += delta * (v - mean);
            }
        }

        if count == 0 {
            return Err(Error::EmptyInput(
                "no valid cells inside the region".to_string(),
            ));
        }

        Ok(Statistics {
            min,
            max,
            mean: mean.clamp(min, max),
            std_dev: (m2 / count as f64).max(0.0).sqrt(),
            count,
        })
    }
}

/// Min, max, mean and standard deviation of `raster` within `region`,
/// sampled at `scale`.
///
/// Fails with [`Error::EmptyInput`] when no valid cell is inside the region.
pub fn region_statistics(raster: &Raster<f64>, region: &Region, scale: f64) -> Result<Statistics> {
    Footprint::for_raster(raster, region, scale)?.statistics(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(rows: usize, cols: usize) -> Raster<f64> {
        let data = (0..rows * cols).map(|v| v as f64).collect();
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_full_region() {
        let r = ramp(4, 4);
        let stats = region_statistics(&r, &Region::covering(&r), 10.0).unwrap();
        assert_eq!(stats.count, 16);
        assert_relative_eq!(stats.min, 0.0);
        assert_relative_eq!(stats.max, 15.0);
        assert_relative_eq!(stats.mean, 7.5);
        // Population variance of 0..16 is (16^2 - 1) / 12
        assert_relative_eq!(stats.std_dev, (255.0_f64 / 12.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_sub_region() {
        let r = ramp(4, 4);
        // Left half: columns 0 and 1
        let region = Region::from_bounds(0.0, 0.0, 20.0, 40.0);
        let stats = region_statistics(&r, &region, 10.0).unwrap();
        assert_eq!(stats.count, 8);
        assert_relative_eq!(stats.max, 13.0);
    }

    #[test]
    fn test_skips_nodata() {
        let mut r = ramp(3, 3);
        r.set(1, 1, f64::NAN).unwrap();
        let stats = region_statistics(&r, &Region::covering(&r), 10.0).unwrap();
        assert_eq!(stats.count, 8);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
    }

    #[test]
    fn test_coarser_scale_samples() {
        let r = ramp(4, 4);
        let stats = region_statistics(&r, &Region::covering(&r), 20.0).unwrap();
        // Samples (0,0), (0,2), (2,0), (2,2)
        assert_eq!(stats.count, 4);
        assert_relative_eq!(stats.mean, (0.0 + 2.0 + 8.0 + 10.0) / 4.0);
    }

    #[test]
    fn test_invalid_scale() {
        let r = ramp(4, 4);
        let region = Region::covering(&r);
        assert!(matches!(
            region_statistics(&r, &region, 15.0),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            region_statistics(&r, &region, 5.0),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(region_statistics(&r, &region, -10.0).is_err());
    }

    #[test]
    fn test_empty_region() {
        let r = ramp(4, 4);
        let far_away = Region::from_bounds(1000.0, 1000.0, 2000.0, 2000.0);
        assert!(matches!(
            region_statistics(&r, &far_away, 10.0),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_sampled_geometry() {
        let grid = SampleGrid::new(10.0, 30.0).unwrap();
        assert_eq!(grid.stride(), 3);
        assert_eq!(grid.sampled_shape(10, 7), (4, 3));
        assert_relative_eq!(grid.pixel_area(), 900.0);
        let t = grid.sampled_transform(&GeoTransform::new(5.0, 100.0, 10.0, -10.0));
        assert_relative_eq!(t.pixel_width, 30.0);
        assert_relative_eq!(t.origin_x, 5.0);
    }
}
