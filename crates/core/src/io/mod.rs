//! Reading geospatial rasters

mod native;

pub use native::{read_geotiff, read_geotiff_from_buffer};
