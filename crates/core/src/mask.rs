//! Tri-state binary masks
//!
//! A [`BinaryMask`] marks the cells of a raster grid that belong to a target
//! class. Besides `True` and `False` every cell can be `NoData`: the input
//! index had no value there, or the cell lies outside the region of
//! interest. No-data never counts as true, never joins a connected
//! component and never contributes area, but it is kept distinct from
//! `False` so that "observed and negative" and "not observed" stay apart
//! through every stage.

use crate::crs::CRS;
use crate::error::Result;
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::Array2;

const FALSE_CODE: u8 = 0;
const TRUE_CODE: u8 = 1;
const NODATA_CODE: u8 = 255;

/// State of one mask cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskValue {
    False,
    True,
    NoData,
}

impl MaskValue {
    fn code(self) -> u8 {
        match self {
            MaskValue::False => FALSE_CODE,
            MaskValue::True => TRUE_CODE,
            MaskValue::NoData => NODATA_CODE,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            FALSE_CODE => MaskValue::False,
            NODATA_CODE => MaskValue::NoData,
            _ => MaskValue::True,
        }
    }

    pub fn is_true(self) -> bool {
        self == MaskValue::True
    }

    pub fn is_nodata(self) -> bool {
        self == MaskValue::NoData
    }
}

impl From<bool> for MaskValue {
    fn from(value: bool) -> Self {
        if value { MaskValue::True } else { MaskValue::False }
    }
}

/// Boolean field on a raster grid with an explicit no-data state.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    cells: Raster<u8>,
}

impl BinaryMask {
    /// Mask on the grid of `template` with every cell set to `fill`
    pub fn like<T: RasterElement>(template: &Raster<T>, fill: MaskValue) -> Self {
        let mut cells: Raster<u8> = template.with_same_meta(template.rows(), template.cols());
        cells.data_mut().fill(fill.code());
        cells.set_nodata(Some(NODATA_CODE));
        Self { cells }
    }

    /// Mask on the grid of `template`, one value per cell from `f(row, col)`
    pub fn from_fn<T, F>(template: &Raster<T>, f: F) -> Self
    where
        T: RasterElement,
        F: Fn(usize, usize) -> MaskValue,
    {
        let cells = template.map_cells(Some(NODATA_CODE), |row, col, _| f(row, col).code());
        Self { cells }
    }

    /// Mask from row-major booleans on the given grid (no no-data cells)
    pub fn from_bools(
        values: &[bool],
        rows: usize,
        cols: usize,
        transform: GeoTransform,
    ) -> Result<Self> {
        let codes = values.iter().map(|&v| MaskValue::from(v).code()).collect();
        let mut cells = Raster::from_vec(codes, rows, cols)?;
        cells.set_transform(transform);
        cells.set_nodata(Some(NODATA_CODE));
        Ok(Self { cells })
    }

    /// Interpret an integer raster as a mask.
    ///
    /// Zero is `False`, the raster's no-data value (or 255 when none is set)
    /// is `NoData`, every other value is `True`.
    pub fn from_raster(raster: &Raster<u8>) -> Self {
        let nodata = raster.nodata().unwrap_or(NODATA_CODE);
        let cells = raster.map_cells(Some(NODATA_CODE), |_, _, v| {
            if v == nodata {
                NODATA_CODE
            } else if v == FALSE_CODE {
                FALSE_CODE
            } else {
                TRUE_CODE
            }
        });
        Self { cells }
    }

    // Dimensions and metadata

    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.shape()
    }

    pub fn transform(&self) -> &GeoTransform {
        self.cells.transform()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.cells.crs()
    }

    pub fn cell_size(&self) -> f64 {
        self.cells.cell_size()
    }

    /// Underlying 0/1/255 raster
    pub fn as_raster(&self) -> &Raster<u8> {
        &self.cells
    }

    // Cell access

    pub fn get(&self, row: usize, col: usize) -> Result<MaskValue> {
        self.cells.get(row, col).map(MaskValue::from_code)
    }

    /// Cell state; out-of-bounds cells read as `NoData`
    pub fn value(&self, row: usize, col: usize) -> MaskValue {
        self.cells
            .data()
            .get((row, col))
            .map_or(MaskValue::NoData, |&c| MaskValue::from_code(c))
    }

    pub fn is_true(&self, row: usize, col: usize) -> bool {
        self.value(row, col).is_true()
    }

    pub fn set(&mut self, row: usize, col: usize, value: MaskValue) -> Result<()> {
        self.cells.set(row, col, value.code())
    }

    /// Number of `True` cells
    pub fn count_true(&self) -> usize {
        self.cells.data().iter().filter(|&&c| c == TRUE_CODE).count()
    }

    /// Number of cells that are not `NoData`
    pub fn count_valid(&self) -> usize {
        self.cells.data().iter().filter(|&&c| c != NODATA_CODE).count()
    }

    /// `(row, col)` of every `True` cell in row-major order
    pub fn iter_true(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .data()
            .indexed_iter()
            .filter(|(_, c)| **c == TRUE_CODE)
            .map(|(idx, _)| idx)
    }

    /// Same grid as another mask, else [`Error::GridMismatch`]
    pub fn check_same_grid(&self, other: &BinaryMask) -> Result<()> {
        self.cells.check_same_grid(&other.cells)
    }

    /// Cell-wise union: `True` if either is true, `False` if either is
    /// false, `NoData` only where both are no-data.
    pub fn union(&self, other: &BinaryMask) -> Result<BinaryMask> {
        self.check_same_grid(other)?;
        let data = ndarray::Zip::from(self.cells.data())
            .and(other.cells.data())
            .map_collect(|&a, &b| {
                if a == TRUE_CODE || b == TRUE_CODE {
                    TRUE_CODE
                } else if a == FALSE_CODE || b == FALSE_CODE {
                    FALSE_CODE
                } else {
                    NODATA_CODE
                }
            });
        Ok(self.with_codes(data))
    }

    /// Whether every `True` cell of this mask is also `True` in `other`
    pub fn is_subset_of(&self, other: &BinaryMask) -> Result<bool> {
        self.check_same_grid(other)?;
        Ok(ndarray::Zip::from(self.cells.data())
            .and(other.cells.data())
            .all(|&a, &b| a != TRUE_CODE || b == TRUE_CODE))
    }

    /// New mask on this grid from raw cell codes
    fn with_codes(&self, data: Array2<u8>) -> BinaryMask {
        let mut cells = self.cells.clone();
        *cells.data_mut() = data;
        BinaryMask { cells }
    }

    /// Mask on this grid with each cell replaced by `f(row, col, current)`
    pub fn map<F>(&self, f: F) -> BinaryMask
    where
        F: Fn(usize, usize, MaskValue) -> MaskValue,
    {
        let cells = self.cells.map_cells(Some(NODATA_CODE), |row, col, c| {
            f(row, col, MaskValue::from_code(c)).code()
        });
        BinaryMask { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn grid() -> GeoTransform {
        GeoTransform::new(0.0, 30.0, 10.0, -10.0)
    }

    #[test]
    fn test_counts() {
        let mask = BinaryMask::from_bools(
            &[true, false, true, false, false, false, true, true, false],
            3,
            3,
            grid(),
        )
        .unwrap();
        assert_eq!(mask.count_true(), 4);
        assert_eq!(mask.count_valid(), 9);
        assert_eq!(
            mask.iter_true().collect::<Vec<_>>(),
            vec![(0, 0), (0, 2), (2, 0), (2, 1)]
        );
    }

    #[test]
    fn test_nodata_is_distinct_from_false() {
        let template: Raster<f64> = Raster::new(2, 2);
        let mut mask = BinaryMask::like(&template, MaskValue::False);
        mask.set(0, 0, MaskValue::NoData).unwrap();
        mask.set(1, 1, MaskValue::True).unwrap();
        assert_eq!(mask.value(0, 0), MaskValue::NoData);
        assert_eq!(mask.count_valid(), 3);
        assert_eq!(mask.count_true(), 1);
        assert!(!mask.is_true(0, 0));
        assert_eq!(mask.value(9, 9), MaskValue::NoData);
    }

    #[test]
    fn test_union() {
        let template: Raster<f64> = Raster::new(1, 4);
        let a = BinaryMask::from_fn(&template, |_, c| match c {
            0 => MaskValue::True,
            1 => MaskValue::False,
            _ => MaskValue::NoData,
        });
        let b = BinaryMask::from_fn(&template, |_, c| match c {
            0 | 1 => MaskValue::NoData,
            2 => MaskValue::False,
            _ => MaskValue::NoData,
        });
        let u = a.union(&b).unwrap();
        assert_eq!(u.value(0, 0), MaskValue::True);
        assert_eq!(u.value(0, 1), MaskValue::False);
        assert_eq!(u.value(0, 2), MaskValue::False);
        assert_eq!(u.value(0, 3), MaskValue::NoData);
    }

    #[test]
    fn test_subset() {
        let small = BinaryMask::from_bools(&[true, false, false, false], 2, 2, grid()).unwrap();
        let big = BinaryMask::from_bools(&[true, true, false, false], 2, 2, grid()).unwrap();
        assert!(small.is_subset_of(&big).unwrap());
        assert!(!big.is_subset_of(&small).unwrap());
    }

    #[test]
    fn test_grid_mismatch() {
        let a = BinaryMask::from_bools(&[true; 4], 2, 2, grid()).unwrap();
        let b = BinaryMask::from_bools(&[true; 6], 2, 3, grid()).unwrap();
        assert!(matches!(a.union(&b), Err(Error::GridMismatch(_))));
    }

    #[test]
    fn test_from_raster() {
        let mut r = Raster::from_vec(vec![0u8, 1, 7, 200], 2, 2).unwrap();
        r.set_nodata(Some(200));
        let mask = BinaryMask::from_raster(&r);
        assert_eq!(mask.value(0, 0), MaskValue::False);
        assert_eq!(mask.value(0, 1), MaskValue::True);
        assert_eq!(mask.value(1, 0), MaskValue::True);
        assert_eq!(mask.value(1, 1), MaskValue::NoData);
    }
}
