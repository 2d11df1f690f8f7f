//! Statistical reductions over rasters
//!
//! - **region**: min/max/mean/std within a region at a nominal scale
//! - **focal**: moving-window mean (speckle reduction)

pub mod focal;
pub mod region;

pub use focal::{focal_mean, speckle_filter, FocalParams};
pub use region::{region_statistics, Footprint, SampleGrid, Statistics};
