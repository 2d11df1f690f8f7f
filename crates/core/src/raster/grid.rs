//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a row-major grid together with
/// its transform, CRS and no-data value. Index images, slope grids and
/// classification maps are all rasters; masks wrap a `Raster<u8>`.
///
/// # Example
///
/// ```ignore
/// use landmask_core::Raster;
///
/// let mut ndvi: Raster<f64> = Raster::new(100, 100);
/// ndvi.set(10, 20, 0.42)?;
/// let value = ndvi.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a zero-filled raster of another cell type on the same grid
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    /// Create a raster of another cell type on this grid from a cell function
    pub fn map_cells<U, F>(&self, nodata: Option<U>, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(usize, usize, T) -> U,
    {
        let data = Array2::from_shape_fn(self.data.dim(), |(row, col)| {
            f(row, col, self.data[(row, col)])
        });
        Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata,
        }
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Geographic coordinates of the cell center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Fractional pixel coordinates (col, row) of a geographic point
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    // Grid compatibility

    /// Whether `other` has the same shape and transform as this raster
    pub fn same_grid<U: RasterElement>(&self, other: &Raster<U>) -> bool {
        self.shape() == other.shape() && self.transform.approx_eq(other.transform())
    }

    /// Fail with [`Error::GridMismatch`] unless `other` lies on the same grid.
    /// CRS tags are compared only when both rasters carry one.
    pub fn check_same_grid<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::GridMismatch(format!(
                "shape {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        if !self.transform.approx_eq(other.transform()) {
            return Err(Error::GridMismatch(format!(
                "transform {:?} vs {:?}",
                self.transform.to_gdal(),
                other.transform().to_gdal()
            )));
        }
        if let (Some(a), Some(b)) = (self.crs(), other.crs()) {
            if !a.is_equivalent(b) {
                return Err(Error::GridMismatch(format!("CRS {} vs {}", a, b)));
            }
        }
        Ok(())
    }

    // Value checks

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Value at (row, col) unless it is no-data or out of bounds
    pub fn valid_value(&self, row: usize, col: usize) -> Option<T> {
        self.data
            .get((row, col))
            .copied()
            .filter(|v| !self.is_nodata(*v))
    }

    /// Basic statistics over all valid cells (no region, no sampling)
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }
            let Some(v) = value.to_f64() else { continue };
            min = min.min(v);
            max = max.max(v);
            sum += v;
            sum_sq += v * v;
            count += 1;
        }

        if count == 0 {
            return RasterStatistics {
                min: None,
                max: None,
                mean: None,
                std_dev: None,
                valid_count: 0,
                nodata_count: self.len(),
            };
        }

        let n = count as f64;
        let mean = sum / n;
        let variance = (sum_sq / n - mean * mean).max(0.0);

        RasterStatistics {
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
            std_dev: Some(variance.sqrt()),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Whole-raster summary used for quick inspection
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
        assert!(matches!(raster.get(0, 10), Err(Error::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_raster_statistics() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f64).unwrap();
            }
        }
        raster.set(0, 0, f64::NAN).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
    }

    #[test]
    fn test_statistics_all_nodata() {
        let raster = Raster::filled(3, 3, f64::NAN);
        let stats = raster.statistics();
        assert_eq!(stats.valid_count, 0);
        assert!(stats.mean.is_none());
    }

    #[test]
    fn test_grid_check() {
        let mut a: Raster<f64> = Raster::new(4, 4);
        a.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        let mut b: Raster<u8> = a.with_same_meta(4, 4);
        assert!(a.check_same_grid(&b).is_ok());

        b.set_transform(GeoTransform::new(0.0, 40.0, 20.0, -20.0));
        assert!(matches!(a.check_same_grid(&b), Err(Error::GridMismatch(_))));

        let c: Raster<u8> = a.with_same_meta(4, 5);
        assert!(!a.same_grid(&c));

        let mut d: Raster<u8> = a.with_same_meta(4, 4);
        d.set_crs(Some(CRS::from_epsg(32719)));
        assert!(a.check_same_grid(&d).is_ok());
        a.set_crs(Some(CRS::from_epsg(4326)));
        assert!(matches!(a.check_same_grid(&d), Err(Error::GridMismatch(_))));
    }

    #[test]
    fn test_valid_value() {
        let mut r = Raster::filled(2, 2, 1.0_f64);
        r.set_nodata(Some(-9999.0));
        r.set(0, 1, -9999.0).unwrap();
        assert_eq!(r.valid_value(0, 0), Some(1.0));
        assert_eq!(r.valid_value(0, 1), None);
        assert_eq!(r.valid_value(5, 5), None);
    }
}
