//! Terrain inputs for exclusion masks
//!
//! - Slope (Horn method) in degrees, percent or radians
//! - Steep-terrain mask: cells at or above a slope threshold

mod slope;

pub use slope::{slope, steep_terrain_mask, SlopeParams, SlopeUnits};
