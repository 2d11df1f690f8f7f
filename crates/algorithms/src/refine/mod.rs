//! Mask refinement
//!
//! Cleans a thresholded mask in two steps: known non-target areas (an
//! exclusion mask) are forced false, then connected groups of true cells
//! smaller than a minimum size are dropped.

mod components;

pub use components::{label_components, CellBounds, ComponentLabels, Connectivity};
pub(crate) use components::label_where;

use landmask_core::{BinaryMask, MaskValue, Result};
use tracing::debug;

/// Force every cell that is true in `exclusion` to false.
///
/// This includes cells that are no-data in `mask`: an excluded cell is
/// known not to be target. All other cells pass through unchanged.
///
/// # Errors
/// [`landmask_core::Error::GridMismatch`] when the masks are on different grids.
pub fn exclude_region(mask: &BinaryMask, exclusion: &BinaryMask) -> Result<BinaryMask> {
    mask.check_same_grid(exclusion)?;

    let refined = mask.map(|row, col, value| {
        if exclusion.is_true(row, col) {
            MaskValue::False
        } else {
            value
        }
    });

    debug!(
        before = mask.count_true(),
        after = refined.count_true(),
        "exclude region"
    );
    Ok(refined)
}

/// Set to false every true cell whose connected component has fewer than
/// `min_size` cells.
///
/// Only component size decides survival, so the result does not depend on
/// labeling order.
pub fn filter_small_components(
    mask: &BinaryMask,
    min_size: usize,
    connectivity: Connectivity,
) -> BinaryMask {
    let components = label_components(mask, connectivity);

    let refined = mask.map(|row, col, value| {
        let label = components.label_at(row, col);
        if label != 0 && components.size(label) < min_size {
            MaskValue::False
        } else {
            value
        }
    });

    debug!(
        components = components.count(),
        min_size,
        %connectivity,
        before = mask.count_true(),
        after = refined.count_true(),
        "filter small components"
    );
    refined
}

#[cfg(test)]
mod tests {
    use super::*;
    use landmask_core::{Error, GeoTransform, Raster};

    fn blob_mask(size: usize, cells: &[(usize, usize)]) -> BinaryMask {
        let mut values = vec![false; size * size];
        for &(r, c) in cells {
            values[r * size + c] = true;
        }
        BinaryMask::from_bools(&values, size, size, GeoTransform::new(0.0, 100.0, 10.0, -10.0))
            .unwrap()
    }

    fn twelve_cells() -> Vec<(usize, usize)> {
        // 3 x 4 block
        (2..5).flat_map(|r| (3..7).map(move |c| (r, c))).collect()
    }

    #[test]
    fn test_exclusion_forces_false() {
        let mask = blob_mask(10, &twelve_cells());
        let exclusion = blob_mask(10, &[(2, 3), (2, 4), (2, 5), (9, 9)]);
        let out = exclude_region(&mask, &exclusion).unwrap();
        assert_eq!(out.count_true(), 9);
        assert!(!out.is_true(2, 3));
        assert_eq!(out.get(9, 9).unwrap(), MaskValue::False);
        assert!(out.is_true(3, 3));
    }

    #[test]
    fn test_exclusion_over_nodata() {
        let mut mask = blob_mask(4, &[(0, 0)]);
        mask.set(1, 1, MaskValue::NoData).unwrap();
        mask.set(2, 2, MaskValue::NoData).unwrap();
        let exclusion = blob_mask(4, &[(1, 1)]);
        let out = exclude_region(&mask, &exclusion).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), MaskValue::False);
        assert_eq!(out.get(2, 2).unwrap(), MaskValue::NoData);
    }

    #[test]
    fn test_exclusion_grid_mismatch() {
        let mask = blob_mask(4, &[]);
        let other = BinaryMask::like(&Raster::<f64>::new(5, 4), MaskValue::False);
        assert!(matches!(
            exclude_region(&mask, &other),
            Err(Error::GridMismatch(_))
        ));
    }

    #[test]
    fn test_blob_survives_min_size() {
        let mask = blob_mask(10, &twelve_cells());
        let out = filter_small_components(&mask, 10, Connectivity::Four);
        assert_eq!(out.count_true(), 12);
    }

    #[test]
    fn test_excluded_blob_removed() {
        let mask = blob_mask(10, &twelve_cells());
        let exclusion = blob_mask(10, &[(2, 3), (2, 4), (2, 5)]);
        let excluded = exclude_region(&mask, &exclusion).unwrap();
        let out = filter_small_components(&excluded, 10, Connectivity::Four);
        assert_eq!(out.count_true(), 0);
    }

    #[test]
    fn test_connectivity_changes_survival() {
        // Two 3-cell pieces that touch at a corner
        let mask = blob_mask(6, &[(0, 0), (0, 1), (0, 2), (1, 3), (1, 4), (1, 5)]);
        assert_eq!(filter_small_components(&mask, 6, Connectivity::Eight).count_true(), 6);
        assert_eq!(filter_small_components(&mask, 6, Connectivity::Four).count_true(), 0);
    }

    #[test]
    fn test_filter_keeps_nodata() {
        let mut mask = blob_mask(3, &[(0, 0)]);
        mask.set(2, 2, MaskValue::NoData).unwrap();
        let out = filter_small_components(&mask, 2, Connectivity::Eight);
        assert_eq!(out.get(0, 0).unwrap(), MaskValue::False);
        assert_eq!(out.get(2, 2).unwrap(), MaskValue::NoData);
    }
}
