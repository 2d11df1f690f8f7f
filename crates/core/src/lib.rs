//! # landmask core
//!
//! Core types for thresholding index rasters into land-cover masks.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced raster grid with no-data handling
//! - `BinaryMask`: tri-state (true / false / no-data) mask on a raster grid
//! - `Region`: the area-of-interest polygon
//! - `Feature`: vector output of vectorization
//! - native GeoTIFF reading

pub mod crs;
pub mod error;
pub mod io;
pub mod mask;
pub mod raster;
pub mod region;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use mask::{BinaryMask, MaskValue};
pub use raster::{GeoTransform, Raster, RasterElement, RasterStatistics};
pub use region::Region;
pub use vector::{AttributeValue, Feature};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::mask::{BinaryMask, MaskValue};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::Region;
    pub use crate::vector::Feature;
}
