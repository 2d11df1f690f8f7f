//! End-to-end scenarios: fixed grids with known areas, thresholds and
//! refinement outcomes.

use approx::assert_relative_eq;
use landmask_algorithms::refine::{exclude_region, filter_small_components, Connectivity};
use landmask_algorithms::threshold::{normalize, threshold, ThresholdRule};
use landmask_algorithms::vectorize::{compute_area_hectares, vectorize};
use landmask_core::{BinaryMask, GeoTransform, Raster, Region};

/// 10 m cells, origin at (0, rows * 10)
fn transform(rows: usize) -> GeoTransform {
    GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0)
}

fn mask_from_cells(rows: usize, cols: usize, cells: &[(usize, usize)]) -> BinaryMask {
    let mut values = vec![false; rows * cols];
    for &(r, c) in cells {
        values[r * cols + c] = true;
    }
    BinaryMask::from_bools(&values, rows, cols, transform(rows)).unwrap()
}

fn region_for(rows: usize, cols: usize) -> Region {
    Region::from_bounds(0.0, 0.0, cols as f64 * 10.0, rows as f64 * 10.0)
}

/// 12-cell blob: a 3x4 block in a 10x10 grid
fn blob_12() -> Vec<(usize, usize)> {
    (3..6).flat_map(|r| (2..6).map(move |c| (r, c))).collect()
}

#[test]
fn twelve_cell_blob_survives_and_rounds_to_zero_hectares() {
    let mask = mask_from_cells(10, 10, &blob_12());
    let region = region_for(10, 10);

    let refined = filter_small_components(&mask, 10, Connectivity::Eight);
    assert_eq!(refined.count_true(), 12);
    // 12 * 100 m² = 0.12 ha
    assert_eq!(compute_area_hectares(&refined, &region, 10.0).unwrap(), 0);
    assert_eq!(vectorize(&refined, &region, 10.0).unwrap().count(), 1);
}

#[test]
fn thousand_cell_blob_is_ten_hectares() {
    // 25 x 40 block in a 50x50 grid
    let cells: Vec<(usize, usize)> = (5..30).flat_map(|r| (5..45).map(move |c| (r, c))).collect();
    assert_eq!(cells.len(), 1000);
    let mask = mask_from_cells(50, 50, &cells);
    let region = region_for(50, 50);

    let refined = filter_small_components(&mask, 10, Connectivity::Eight);
    assert_eq!(compute_area_hectares(&refined, &region, 10.0).unwrap(), 10);
}

#[test]
fn threshold_at_mean_plus_quarter_std() {
    // min 0.2, max 0.8, mean 0.5, population std 0.1
    let mut data = vec![0.5; 18];
    data[0] = 0.2;
    data[17] = 0.8;
    let mut raster = Raster::from_vec(data, 3, 6).unwrap();
    raster.set_transform(transform(3));
    let region = region_for(3, 6);

    let outcome = threshold(&raster, &region, 10.0, ThresholdRule::gt(0.25)).unwrap();
    assert_relative_eq!(outcome.value, 0.525, epsilon = 1e-12);
    assert_eq!(outcome.mask.count_true(), 1);
    assert!(outcome.mask.is_true(2, 5));
}

#[test]
fn excluding_three_cells_drops_blob_below_min_size() {
    let blob = blob_12();
    let mask = mask_from_cells(10, 10, &blob);
    let exclusion = mask_from_cells(10, 10, &blob[..3]);
    let region = region_for(10, 10);

    let excluded = exclude_region(&mask, &exclusion).unwrap();
    assert_eq!(excluded.count_true(), 9);

    let refined = filter_small_components(&excluded, 10, Connectivity::Eight);
    assert_eq!(refined.count_true(), 0);
    assert_eq!(compute_area_hectares(&refined, &region, 10.0).unwrap(), 0);
}

#[test]
fn full_chain_from_index_to_polygons() {
    // Background gradient with two raised patches of different size
    let rows = 30;
    let cols = 30;
    let mut index = Raster::new(rows, cols);
    index.set_transform(transform(rows));
    for r in 0..rows {
        for c in 0..cols {
            let big = (5..12).contains(&r) && (5..12).contains(&c);
            let small = (20..22).contains(&r) && (20..22).contains(&c);
            let v = if big || small { 50.0 } else { 10.0 + (c % 5) as f64 };
            index.set(r, c, v).unwrap();
        }
    }
    let region = region_for(rows, cols);

    let normalized = normalize(&index, &region, 10.0).unwrap();
    let outcome = threshold(&normalized, &region, 10.0, ThresholdRule::gt(1.0)).unwrap();
    assert_eq!(outcome.mask.count_true(), 49 + 4);

    let refined = filter_small_components(&outcome.mask, 10, Connectivity::Four);
    assert_eq!(refined.count_true(), 49);

    let features: Vec<_> = vectorize(&refined, &region, 10.0).unwrap().collect();
    assert_eq!(features.len(), 1);
    use geo::Area;
    assert_relative_eq!(features[0].geometry.unsigned_area(), 4900.0);
}
