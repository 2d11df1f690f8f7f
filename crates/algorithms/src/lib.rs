//! # landmask algorithms
//!
//! Statistical thresholding of index rasters into land-cover masks.
//!
//! ## Stages
//!
//! - **statistics**: region statistics at a nominal scale, speckle smoothing
//! - **threshold**: min/max normalization and `mean ± k·std` binarization
//! - **refine**: exclusion masks and small-component removal
//! - **vectorize**: polygons per connected component, exact area in hectares
//!
//! ## Inputs
//!
//! - **imagery**: spectral and radar change indices from bands
//! - **terrain**: slope and steep-terrain masks
//! - **exclusion**: permanent water and predicate masks
//!
//! **pipeline** chains the stages per index and runs whole products
//! (flood, vegetation, soil, moisture) from a [`pipeline::ProductConfig`].

pub(crate) mod maybe_rayon;

pub mod exclusion;
pub mod imagery;
pub mod pipeline;
pub mod refine;
pub mod statistics;
pub mod terrain;
pub mod threshold;
pub mod vectorize;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::exclusion::{permanent_water_mask, threshold_exclusion};
    pub use crate::imagery::{Band, BandSet, SpectralIndex};
    pub use crate::pipeline::{
        run_index_pipeline, run_product, IndexConfig, IndexResult, IndexSettings, ProductConfig,
        ProductInputs, ProductResult, ProductSummary,
    };
    pub use crate::refine::{
        exclude_region, filter_small_components, label_components, Connectivity,
    };
    pub use crate::statistics::{region_statistics, speckle_filter, Statistics};
    pub use crate::terrain::{slope, steep_terrain_mask, SlopeParams, SlopeUnits};
    pub use crate::threshold::{normalize, threshold, ThresholdDirection, ThresholdRule};
    pub use crate::vectorize::{
        compute_area_hectares, rasterize, vectorize, vectorize_classes, PolygonIter,
    };
    pub use landmask_core::prelude::*;
}
