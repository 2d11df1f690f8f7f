//! Generic per-index pipeline and product runner
//!
//! Every index goes through the same stages:
//!
//! ```text
//! index raster -> normalize -> threshold -> exclude -> filter components
//!                                                      -> polygons / area
//! ```
//!
//! Each stage returns a new value; the intermediate rasters and masks are
//! collected in an [`IndexResult`] instead of being kept in shared state.
//! Indices of a product are independent and run in parallel.

mod config;

pub use config::{ExclusionConfig, IndexConfig, ProductConfig, PRESET_NAMES};

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::exclusion::permanent_water_mask;
use crate::imagery::{BandSet, SpectralIndex};
use crate::maybe_rayon::*;
use crate::refine::{exclude_region, filter_small_components, Connectivity};
use crate::statistics::{speckle_filter, Statistics};
use crate::terrain::steep_terrain_mask;
use crate::threshold::{normalize_with_statistics, threshold, ThresholdDirection, ThresholdRule};
use crate::vectorize::{area_summary, vectorize_with, AreaSummary, PolygonIter};
use landmask_core::{BinaryMask, Error, Raster, Region, Result};

/// Parameters of one index pipeline run
#[derive(Debug, Clone)]
pub struct IndexSettings {
    /// Index name, used to label outputs
    pub name: String,
    pub scale: f64,
    pub rule: ThresholdRule,
    pub min_component_size: usize,
    pub connectivity: Connectivity,
}

/// Everything one index pipeline produced
#[derive(Debug, Clone)]
pub struct IndexResult {
    pub name: String,
    pub scale: f64,
    pub rule: ThresholdRule,
    pub connectivity: Connectivity,
    /// Min/max/mean/std of the raw index inside the region
    pub index_statistics: Statistics,
    /// Statistics of the normalized index the threshold came from
    pub normalized_statistics: Statistics,
    pub threshold: f64,
    pub normalized: Raster<f64>,
    /// Mask straight out of the threshold
    pub raw_mask: BinaryMask,
    /// Mask after exclusion and component filtering
    pub mask: BinaryMask,
    pub cells_selected: usize,
    pub cells_after_exclusion: usize,
    pub cells_refined: usize,
    pub area: AreaSummary,
}

impl IndexResult {
    /// Polygons of the refined mask, labeled with the index name
    pub fn polygons(&self, region: &Region) -> Result<PolygonIter> {
        Ok(vectorize_with(&self.mask, region, self.scale, self.connectivity)?.labeled(&self.name))
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            name: self.name.clone(),
            k: self.rule.k,
            direction: self.rule.direction,
            index_min: self.index_statistics.min,
            index_max: self.index_statistics.max,
            mean: self.normalized_statistics.mean,
            std_dev: self.normalized_statistics.std_dev,
            threshold: self.threshold,
            cells_selected: self.cells_selected,
            cells_after_exclusion: self.cells_after_exclusion,
            cells_refined: self.cells_refined,
            area_m2: self.area.area_m2,
            hectares: self.area.hectares,
        }
    }
}

/// Run normalize, threshold, exclusion and component filtering for one
/// index raster.
///
/// `exclusion`, when given, must be on the grid of `index`.
pub fn run_index_pipeline(
    index: &Raster<f64>,
    region: &Region,
    exclusion: Option<&BinaryMask>,
    settings: &IndexSettings,
) -> Result<IndexResult> {
    let normalized = normalize_with_statistics(index, region, settings.scale)?;
    let outcome = threshold(&normalized.raster, region, settings.scale, settings.rule)?;
    let cells_selected = outcome.mask.count_true();

    let excluded = match exclusion {
        Some(ex) => exclude_region(&outcome.mask, ex)?,
        None => outcome.mask.clone(),
    };
    let cells_after_exclusion = excluded.count_true();

    let mask = filter_small_components(&excluded, settings.min_component_size, settings.connectivity);
    let cells_refined = mask.count_true();
    let area = area_summary(&mask, region, settings.scale)?;

    info!(
        index = %settings.name,
        threshold = outcome.value,
        cells = cells_refined,
        hectares = area.hectares,
        "index done"
    );

    Ok(IndexResult {
        name: settings.name.clone(),
        scale: settings.scale,
        rule: settings.rule,
        connectivity: settings.connectivity,
        index_statistics: normalized.statistics,
        normalized_statistics: outcome.statistics,
        threshold: outcome.value,
        normalized: normalized.raster,
        raw_mask: outcome.mask,
        mask,
        cells_selected,
        cells_after_exclusion,
        cells_refined,
        area,
    })
}

/// Rasters a product run draws from
#[derive(Debug, Clone, Default)]
pub struct ProductInputs {
    /// Finished index rasters keyed by upper-case index name
    indices: BTreeMap<String, Raster<f64>>,
    pub bands: BandSet,
    /// Months per year each cell is water
    pub water_seasonality: Option<Raster<f64>>,
    pub dem: Option<Raster<f64>>,
}

impl ProductInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply a finished index raster; it takes precedence over a formula
    pub fn with_index(mut self, name: &str, raster: Raster<f64>) -> Self {
        self.insert_index(name, raster);
        self
    }

    pub fn insert_index(&mut self, name: &str, raster: Raster<f64>) {
        self.indices.insert(name.trim().to_ascii_uppercase(), raster);
    }

    pub fn index(&self, name: &str) -> Option<&Raster<f64>> {
        self.indices.get(&name.trim().to_ascii_uppercase())
    }

    pub fn with_bands(mut self, bands: BandSet) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_water_seasonality(mut self, raster: Raster<f64>) -> Self {
        self.water_seasonality = Some(raster);
        self
    }

    pub fn with_dem(mut self, raster: Raster<f64>) -> Self {
        self.dem = Some(raster);
        self
    }
}

/// All index results of a product run
#[derive(Debug, Clone)]
pub struct ProductResult {
    pub product: String,
    pub scale: f64,
    pub exclusion: Option<BinaryMask>,
    pub indices: Vec<IndexResult>,
}

impl ProductResult {
    pub fn get(&self, name: &str) -> Option<&IndexResult> {
        self.indices.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            product: self.product.clone(),
            scale: self.scale,
            excluded_cells: self.exclusion.as_ref().map(|m| m.count_true()),
            indices: self.indices.iter().map(IndexResult::summary).collect(),
        }
    }
}

/// Per-index report of a run
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub name: String,
    pub k: f64,
    pub direction: ThresholdDirection,
    pub index_min: f64,
    pub index_max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
    pub cells_selected: usize,
    pub cells_after_exclusion: usize,
    pub cells_refined: usize,
    pub area_m2: f64,
    pub hectares: u64,
}

/// Serializable report of a product run
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub product: String,
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_cells: Option<usize>,
    pub indices: Vec<IndexSummary>,
}

/// The index raster for `config`: a supplied raster, or the formula of the
/// same name evaluated over `bands`.
fn resolve_index(config: &IndexConfig, inputs: &ProductInputs, bands: &BandSet) -> Result<Raster<f64>> {
    if let Some(raster) = inputs.index(&config.name) {
        return Ok(raster.clone());
    }
    let formula: SpectralIndex = config.name.parse().map_err(|_| {
        Error::MissingInput(format!(
            "index '{}' has no formula; supply it as a raster",
            config.name
        ))
    })?;
    if !bands.contains_all(formula.required_bands()) {
        let names: Vec<&str> = formula.required_bands().iter().map(|b| b.name()).collect();
        return Err(Error::MissingInput(format!(
            "index '{}' needs a raster or bands [{}]",
            config.name,
            names.join(", ")
        )));
    }
    formula.compute(bands)
}

/// Apply the speckle filter to every band
fn smooth_bands(bands: &BandSet, radius: f64) -> Result<BandSet> {
    let smoothed: Vec<_> = bands
        .iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(band, raster)| speckle_filter(raster, radius).map(|r| (band, r)))
        .collect::<Result<Vec<_>>>()?;
    Ok(smoothed
        .into_iter()
        .fold(BandSet::new(), |set, (band, raster)| set.with(band, raster)))
}

/// Union of the exclusion layers named by `config`
fn build_exclusion(config: &ExclusionConfig, inputs: &ProductInputs) -> Result<Option<BinaryMask>> {
    let mut combined: Option<BinaryMask> = None;

    if let Some(months) = config.permanent_water_months {
        let seasonality = inputs.water_seasonality.as_ref().ok_or_else(|| {
            Error::MissingInput("permanent water exclusion needs a water seasonality raster".into())
        })?;
        combined = Some(permanent_water_mask(seasonality, months)?);
    }

    if let Some(pct) = config.max_slope_percent {
        let dem = inputs
            .dem
            .as_ref()
            .ok_or_else(|| Error::MissingInput("slope exclusion needs a DEM".into()))?;
        let steep = steep_terrain_mask(dem, pct)?;
        combined = Some(match combined {
            Some(water) => water.union(&steep)?,
            None => steep,
        });
    }

    if let Some(mask) = &combined {
        debug!(cells = mask.count_true(), "exclusion mask");
    }
    Ok(combined)
}

/// Run every index of `config` over `inputs` within `region`.
///
/// The exclusion mask is built once and shared read-only by all index
/// pipelines. Scale defaults to the cell size of the first index raster.
pub fn run_product(config: &ProductConfig, inputs: &ProductInputs, region: &Region) -> Result<ProductResult> {
    config.validate()?;

    let bands = match config.speckle_radius_m {
        Some(radius) if !inputs.bands.is_empty() => smooth_bands(&inputs.bands, radius)?,
        _ => inputs.bands.clone(),
    };

    let rasters: Vec<(IndexConfig, Raster<f64>)> = config
        .indices
        .iter()
        .map(|ic| resolve_index(ic, inputs, &bands).map(|r| (ic.clone(), r)))
        .collect::<Result<_>>()?;

    let scale = match config.scale {
        Some(s) => s,
        None => rasters
            .first()
            .map(|(_, r)| r.cell_size())
            .ok_or_else(|| Error::MissingInput("no index rasters".into()))?,
    };

    let exclusion = build_exclusion(&config.exclusion, inputs)?;

    info!(
        product = %config.name,
        indices = rasters.len(),
        scale,
        "running product"
    );

    let indices: Vec<IndexResult> = rasters
        .into_par_iter()
        .map(|(ic, raster)| {
            let settings = IndexSettings {
                name: ic.name.clone(),
                scale,
                rule: ic.rule(),
                min_component_size: config.min_component_size,
                connectivity: config.connectivity,
            };
            run_index_pipeline(&raster, region, exclusion.as_ref(), &settings)
        })
        .collect::<Result<_>>()?;

    Ok(ProductResult {
        product: config.name.clone(),
        scale,
        exclusion,
        indices,
    })
}
