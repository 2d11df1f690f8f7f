//! Area of interest

use crate::raster::{GeoTransform, Raster, RasterElement};
use geo::{Area, BoundingRect, Contains};
use geo_types::{coord, MultiPolygon, Point, Polygon, Rect};
use ndarray::Array2;

/// Polygon boundary that constrains every raster operation of a run.
///
/// Coordinates are in the CRS of the rasters it is applied to. A cell is
/// inside the region when its center is inside the polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn new(polygon: Polygon<f64>) -> Self {
        Self {
            geometry: MultiPolygon::new(vec![polygon]),
        }
    }

    pub fn from_multi_polygon(geometry: MultiPolygon<f64>) -> Self {
        Self { geometry }
    }

    /// Axis-aligned rectangle
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let rect = Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y });
        Self::new(rect.to_polygon())
    }

    /// The full extent of a raster
    pub fn covering<T: RasterElement>(raster: &Raster<T>) -> Self {
        let (min_x, min_y, max_x, max_y) = raster.bounds();
        Self::from_bounds(min_x, min_y, max_x, max_y)
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Planar area in squared CRS units
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(&Point::new(x, y))
    }

    /// Cells of a `rows x cols` grid whose centers fall inside the region
    pub fn cell_mask(&self, transform: &GeoTransform, rows: usize, cols: usize) -> Array2<bool> {
        let Some(bbox) = self.geometry.bounding_rect() else {
            return Array2::from_elem((rows, cols), false);
        };
        let (min, max) = (bbox.min(), bbox.max());

        Array2::from_shape_fn((rows, cols), |(row, col)| {
            let (x, y) = transform.pixel_to_geo(col, row);
            if x < min.x || x > max.x || y < min.y || y > max.y {
                return false;
            }
            self.geometry.contains(&Point::new(x, y))
        })
    }

    /// [`Region::cell_mask`] on the grid of `raster`
    pub fn cell_mask_for<T: RasterElement>(&self, raster: &Raster<T>) -> Array2<bool> {
        self.cell_mask(raster.transform(), raster.rows(), raster.cols())
    }
}
