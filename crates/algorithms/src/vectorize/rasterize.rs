//! Burning polygons back onto a mask grid

use geo::{BoundingRect, Contains};
use geo_types::{Point, Rect};

use landmask_core::{BinaryMask, Feature};

/// Mask on the grid of `like` that is true where a cell center lies inside
/// any feature geometry, false elsewhere.
pub fn rasterize<'a, I>(features: I, like: &BinaryMask) -> BinaryMask
where
    I: IntoIterator<Item = &'a Feature>,
{
    let shapes: Vec<(&Feature, Rect<f64>)> = features
        .into_iter()
        .filter_map(|f| f.geometry.bounding_rect().map(|b| (f, b)))
        .collect();
    let transform = *like.transform();

    like.map(|row, col, _| {
        let (x, y) = transform.pixel_to_geo(col, row);
        let point = Point::new(x, y);
        shapes
            .iter()
            .any(|(f, b)| {
                x >= b.min().x
                    && x <= b.max().x
                    && y >= b.min().y
                    && y <= b.max().y
                    && f.geometry.contains(&point)
            })
            .into()
    })
}
