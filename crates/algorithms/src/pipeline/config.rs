//! Product configuration
//!
//! A product (flood, vegetation, soil, moisture) is a set of indices, each
//! with its own threshold rule, plus the refinement settings shared by all
//! of them. Built-in presets carry the tuned values; custom products load
//! from TOML:
//!
//! ```toml
//! name = "wetland"
//! min_component_size = 10
//! connectivity = 8
//!
//! [exclusion]
//! permanent_water_months = 10
//!
//! [[indices]]
//! name = "MNDWI"
//! k = 0.1
//! direction = "gt"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::refine::Connectivity;
use crate::threshold::{ThresholdDirection, ThresholdRule};
use landmask_core::{Error, Result};

/// Names of the built-in presets
pub const PRESET_NAMES: [&str; 4] = ["flood", "vegetation", "soil", "moisture"];

/// Threshold settings of one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name (e.g. "NDVI"); also the key of a supplied index raster
    pub name: String,
    pub k: f64,
    #[serde(default)]
    pub direction: ThresholdDirection,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>, k: f64, direction: ThresholdDirection) -> Self {
        Self {
            name: name.into(),
            k,
            direction,
        }
    }

    pub fn rule(&self) -> ThresholdRule {
        ThresholdRule::new(self.k, self.direction)
    }
}

/// Layers whose true cells are removed from every index mask
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExclusionConfig {
    /// Exclude cells that are water at least this many months per year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_water_months: Option<f64>,
    /// Exclude cells whose slope is at least this many percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_slope_percent: Option<f64>,
}

impl ExclusionConfig {
    pub fn is_empty(&self) -> bool {
        self.permanent_water_months.is_none() && self.max_slope_percent.is_none()
    }
}

/// Configuration of one product run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    /// Components with fewer cells are removed
    pub min_component_size: usize,
    #[serde(default)]
    pub connectivity: Connectivity,
    /// Nominal resolution; defaults to the input cell size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Focal-mean radius applied to input bands before computing indices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speckle_radius_m: Option<f64>,
    #[serde(default)]
    pub exclusion: ExclusionConfig,
    pub indices: Vec<IndexConfig>,
}

impl ProductConfig {
    /// Load and validate a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse and validate a TOML configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ProductConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Built-in preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flood" => Some(Self::flood()),
            "vegetation" => Some(Self::vegetation()),
            "soil" => Some(Self::soil()),
            "moisture" => Some(Self::moisture()),
            _ => None,
        }
    }

    /// Radar flood mapping: RI, NDFI and DII from pre/post backscatter,
    /// excluding permanent water and slopes of 5 % or more.
    pub fn flood() -> Self {
        use ThresholdDirection::{Gt, Lt};
        Self {
            name: "flood".into(),
            min_component_size: 5,
            connectivity: Connectivity::Four,
            scale: None,
            speckle_radius_m: Some(50.0),
            exclusion: ExclusionConfig {
                permanent_water_months: Some(10.0),
                max_slope_percent: Some(5.0),
            },
            indices: vec![
                IndexConfig::new("RI", 0.25, Gt),
                IndexConfig::new("NDFI", 1.0, Lt),
                IndexConfig::new("DII", 0.8, Gt),
            ],
        }
    }

    pub fn vegetation() -> Self {
        use ThresholdDirection::Gt;
        Self {
            name: "vegetation".into(),
            min_component_size: 10,
            connectivity: Connectivity::Eight,
            scale: None,
            speckle_radius_m: None,
            exclusion: ExclusionConfig::default(),
            indices: vec![
                IndexConfig::new("NDVI", 0.25, Gt),
                IndexConfig::new("GNDVI", 0.25, Gt),
                IndexConfig::new("EVI", 0.25, Gt),
                IndexConfig::new("SAVI", 0.25, Gt),
            ],
        }
    }

    /// Hydric soil indicators
    pub fn soil() -> Self {
        use ThresholdDirection::{Gt, Lt};
        Self {
            name: "soil".into(),
            min_component_size: 10,
            connectivity: Connectivity::Eight,
            scale: None,
            speckle_radius_m: None,
            exclusion: ExclusionConfig {
                permanent_water_months: Some(10.0),
                max_slope_percent: None,
            },
            indices: vec![
                IndexConfig::new("SR", 0.1, Lt),
                IndexConfig::new("DVI", 0.1, Gt),
                IndexConfig::new("CMR", 0.1, Lt),
            ],
        }
    }

    /// Soil moisture. SWI has no band formula and must be supplied as a
    /// finished raster.
    pub fn moisture() -> Self {
        use ThresholdDirection::{Gt, Lt};
        Self {
            name: "moisture".into(),
            min_component_size: 10,
            connectivity: Connectivity::Eight,
            scale: None,
            speckle_radius_m: None,
            exclusion: ExclusionConfig {
                permanent_water_months: Some(10.0),
                max_slope_percent: None,
            },
            indices: vec![
                IndexConfig::new("SWI", 0.1, Lt),
                IndexConfig::new("NDMI", 0.1, Gt),
                IndexConfig::new("MNDWI", 0.1, Gt),
            ],
        }
    }

    /// Reject configurations the pipeline cannot run
    pub fn validate(&self) -> Result<()> {
        if self.indices.is_empty() {
            return Err(Error::Config(format!("product '{}' has no indices", self.name)));
        }
        if self.min_component_size == 0 {
            return Err(Error::Config("min_component_size must be at least 1".into()));
        }
        if let Some(scale) = self.scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(Error::Config(format!("scale must be positive, got {}", scale)));
            }
        }
        if let Some(radius) = self.speckle_radius_m {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(Error::Config(format!(
                    "speckle_radius_m must be positive, got {}",
                    radius
                )));
            }
        }
        if let Some(months) = self.exclusion.permanent_water_months {
            if !(0.0..=12.0).contains(&months) {
                return Err(Error::Config(format!(
                    "permanent_water_months must be within 0..=12, got {}",
                    months
                )));
            }
        }
        if let Some(pct) = self.exclusion.max_slope_percent {
            if !pct.is_finite() || pct < 0.0 {
                return Err(Error::Config(format!(
                    "max_slope_percent must be >= 0, got {}",
                    pct
                )));
            }
        }

        let mut seen = HashSet::new();
        for index in &self.indices {
            if index.name.trim().is_empty() {
                return Err(Error::Config("index with empty name".into()));
            }
            if !index.k.is_finite() {
                return Err(Error::Config(format!("index '{}': k must be finite", index.name)));
            }
            if !seen.insert(index.name.to_ascii_uppercase()) {
                return Err(Error::Config(format!("index '{}' listed twice", index.name)));
            }
        }
        Ok(())
    }
}
