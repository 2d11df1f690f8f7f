//! Raster-to-vector conversion and area accounting
//!
//! Masks are sampled on the scale grid inside the region, grouped into
//! connected components and traced into polygons along cell edges. Area is
//! an exact count of sampled true cells times the sample area.

mod area;
mod rasterize;
mod trace;

pub use area::{class_areas_hectares, compute_area_hectares, area_summary, AreaSummary};
pub use rasterize::rasterize;

use std::collections::BTreeSet;

use geo_types::Geometry;
use ndarray::Array2;

use crate::refine::{label_where, ComponentLabels, Connectivity};
use crate::statistics::Footprint;
use landmask_core::{BinaryMask, Feature, GeoTransform, Raster, Region, Result};

pub(crate) const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Lazy sequence of polygons, one per connected component.
///
/// Each feature carries `component` (1-based id), `cells` (sample count),
/// `area_ha` (unrounded) and, when set, `label` and `class`. Consumers must
/// not rely on the order of features.
#[derive(Debug, Clone)]
pub struct PolygonIter {
    components: ComponentLabels,
    transform: GeoTransform,
    pixel_area: f64,
    label: Option<String>,
    class: Option<i64>,
    next: u32,
}

impl PolygonIter {
    fn new(components: ComponentLabels, transform: GeoTransform, pixel_area: f64) -> Self {
        Self {
            components,
            transform,
            pixel_area,
            label: None,
            class: None,
            next: 1,
        }
    }

    /// Tag every feature with a `label` attribute
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn with_class(mut self, class: i64) -> Self {
        self.class = Some(class);
        self
    }

    /// Number of polygons in the sequence
    pub fn component_count(&self) -> usize {
        self.components.count()
    }
}

impl Iterator for PolygonIter {
    type Item = Feature;

    fn next(&mut self) -> Option<Feature> {
        let id = self.next;
        if id as usize > self.components.count() {
            return None;
        }
        self.next += 1;

        let polygons = trace::component_polygons(&self.components, id);
        let geometry = if polygons.len() == 1 {
            Geometry::Polygon(polygons[0].to_geo(&self.transform))
        } else {
            Geometry::MultiPolygon(trace::to_multi_polygon(&polygons, &self.transform))
        };

        let cells = self.components.size(id);
        let mut feature = Feature::new(geometry)
            .with_property("component", id as i64)
            .with_property("cells", cells as i64)
            .with_property(
                "area_ha",
                cells as f64 * self.pixel_area / SQUARE_METERS_PER_HECTARE,
            );
        if let Some(label) = &self.label {
            feature.set_property("label", label.as_str());
        }
        if let Some(class) = self.class {
            feature.set_property("class", class);
        }
        Some(feature)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.components.count() + 1).saturating_sub(self.next as usize);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PolygonIter {}

/// Sampled grid of a `rows x cols` raster: membership of each sample and
/// the sample grid's transform.
fn sample<F>(footprint: &Footprint, transform: &GeoTransform, member: F) -> (Array2<bool>, GeoTransform)
where
    F: Fn(usize, usize) -> bool,
{
    let grid = footprint.grid();
    let stride = grid.stride();
    let (rows, cols) = footprint.shape();
    let (srows, scols) = grid.sampled_shape(rows, cols);

    let samples = Array2::from_shape_fn((srows, scols), |(r, c)| {
        let (row, col) = (r * stride, c * stride);
        footprint.includes(row, col) && member(row, col)
    });
    (samples, grid.sampled_transform(transform))
}

/// Polygons of the connected true regions of `mask` inside `region`,
/// sampled at `scale`, using 8-connectivity.
pub fn vectorize(mask: &BinaryMask, region: &Region, scale: f64) -> Result<PolygonIter> {
    vectorize_with(mask, region, scale, Connectivity::default())
}

/// [`vectorize`] with an explicit connectivity
pub fn vectorize_with(
    mask: &BinaryMask,
    region: &Region,
    scale: f64,
    connectivity: Connectivity,
) -> Result<PolygonIter> {
    let (rows, cols) = mask.shape();
    let footprint = Footprint::new(region, mask.transform(), rows, cols, scale)?;
    let (samples, transform) = sample(&footprint, mask.transform(), |r, c| mask.is_true(r, c));

    let components = label_where(samples.dim(), connectivity, |r, c| samples[(r, c)]);
    Ok(PolygonIter::new(
        components,
        transform,
        footprint.grid().pixel_area(),
    ))
}

/// One independent vectorization per distinct class value.
///
/// No-data cells belong to no class. Features carry a `class` attribute.
pub fn vectorize_classes(
    classes: &Raster<i32>,
    region: &Region,
    scale: f64,
    connectivity: Connectivity,
) -> Result<impl Iterator<Item = Feature>> {
    let footprint = Footprint::for_raster(classes, region, scale)?;
    let pixel_area = footprint.grid().pixel_area();

    let values: BTreeSet<i32> = {
        let (rows, cols) = classes.shape();
        let stride = footprint.grid().stride();
        (0..rows)
            .step_by(stride)
            .flat_map(|row| (0..cols).step_by(stride).map(move |col| (row, col)))
            .filter(|&(row, col)| footprint.includes(row, col))
            .filter_map(|(row, col)| classes.valid_value(row, col))
            .collect()
    };

    let passes: Vec<PolygonIter> = values
        .into_iter()
        .map(|class| {
            let (samples, transform) = sample(&footprint, classes.transform(), |r, c| {
                classes.valid_value(r, c) == Some(class)
            });
            let components = label_where(samples.dim(), connectivity, |r, c| samples[(r, c)]);
            PolygonIter::new(components, transform, pixel_area).with_class(class as i64)
        })
        .collect();

    Ok(passes.into_iter().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use landmask_core::AttributeValue;

    fn mask_10x10(cells: &[(usize, usize)]) -> BinaryMask {
        let mut values = vec![false; 100];
        for &(r, c) in cells {
            values[r * 10 + c] = true;
        }
        BinaryMask::from_bools(&values, 10, 10, GeoTransform::new(0.0, 100.0, 10.0, -10.0))
            .unwrap()
    }

    fn region() -> Region {
        Region::from_bounds(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_one_polygon_per_component() {
        let mask = mask_10x10(&[(0, 0), (0, 1), (5, 5), (9, 9)]);
        let features: Vec<Feature> = vectorize(&mask, &region(), 10.0).unwrap().collect();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].get_property("cells"), Some(&AttributeValue::Int(2)));
        assert!(matches!(features[0].geometry, Geometry::Polygon(_)));
    }

    #[test]
    fn test_area_attribute() {
        let mask = mask_10x10(&[(2, 2), (2, 3), (3, 2)]);
        let f = vectorize(&mask, &region(), 10.0).unwrap().next().unwrap();
        match f.get_property("area_ha") {
            Some(AttributeValue::Float(ha)) => assert_relative_eq!(*ha, 0.03),
            other => panic!("unexpected area {:?}", other),
        }
    }

    #[test]
    fn test_diagonal_component_is_multipolygon() {
        let mask = mask_10x10(&[(1, 1), (2, 2)]);
        let mut it = vectorize_with(&mask, &region(), 10.0, Connectivity::Eight).unwrap();
        assert_eq!(it.len(), 1);
        let f = it.next().unwrap();
        match f.geometry {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 2),
            other => panic!("expected multipolygon, got {:?}", other),
        }

        let four = vectorize_with(&mask, &region(), 10.0, Connectivity::Four).unwrap();
        assert_eq!(four.count(), 2);
    }

    #[test]
    fn test_labeled_and_empty() {
        let mask = mask_10x10(&[(4, 4)]);
        let f = vectorize(&mask, &region(), 10.0)
            .unwrap()
            .labeled("flood")
            .next()
            .unwrap();
        assert_eq!(f.label(), Some("flood"));

        let empty = mask_10x10(&[]);
        assert_eq!(vectorize(&empty, &region(), 10.0).unwrap().count(), 0);
    }

    #[test]
    fn test_outside_region_not_vectorized() {
        let mask = mask_10x10(&[(0, 0), (9, 9)]);
        // Lower-right quarter only
        let quarter = Region::from_bounds(50.0, 0.0, 100.0, 50.0);
        assert_eq!(vectorize(&mask, &quarter, 10.0).unwrap().count(), 1);
    }

    #[test]
    fn test_coarse_scale_geometry() {
        let cells: Vec<(usize, usize)> = (0..4).flat_map(|r| (0..4).map(move |c| (r, c))).collect();
        let mask = mask_10x10(&cells);
        let f = vectorize(&mask, &region(), 20.0).unwrap().next().unwrap();
        assert_eq!(f.get_property("cells"), Some(&AttributeValue::Int(4)));
        match f.geometry {
            Geometry::Polygon(p) => {
                use geo::Area;
                assert_relative_eq!(p.unsigned_area(), 1600.0);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_classes() {
        let mut data = vec![1; 16];
        data[0] = 2;
        data[1] = 2;
        data[15] = -1;
        let mut classes = Raster::from_vec(data, 4, 4).unwrap();
        classes.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        classes.set_nodata(Some(-1));

        let features: Vec<Feature> = vectorize_classes(
            &classes,
            &Region::covering(&classes),
            10.0,
            Connectivity::Four,
        )
        .unwrap()
        .collect();
        assert_eq!(features.len(), 2);
        let class_of = |f: &Feature| f.get_property("class").cloned();
        assert_eq!(class_of(&features[0]), Some(AttributeValue::Int(1)));
        assert_eq!(features[0].get_property("cells"), Some(&AttributeValue::Int(13)));
        assert_eq!(class_of(&features[1]), Some(AttributeValue::Int(2)));
    }
}
