//! Index normalization and statistical thresholding
//!
//! An index raster is rescaled to [0, 1] by its min/max inside the region,
//! then binarized against `mean ± k·std` of the rescaled values. `k` and
//! the comparison direction are per-index configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::statistics::{Footprint, Statistics};
use landmask_core::{BinaryMask, Error, MaskValue, Raster, Region, Result};

/// Which side of the threshold marks the target class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdDirection {
    /// Target where value > mean + k·std
    #[default]
    Gt,
    /// Target where value < mean − k·std
    Lt,
}

impl ThresholdDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdDirection::Gt => "gt",
            ThresholdDirection::Lt => "lt",
        }
    }

    fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdDirection::Gt => value > threshold,
            ThresholdDirection::Lt => value < threshold,
        }
    }
}

impl fmt::Display for ThresholdDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gt" | ">" => Ok(ThresholdDirection::Gt),
            "lt" | "<" => Ok(ThresholdDirection::Lt),
            other => Err(Error::invalid_parameter(
                "direction",
                other,
                "expected 'gt' or 'lt'",
            )),
        }
    }
}

/// `mean + k·std` (gt) or `mean − k·std` (lt)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub k: f64,
    pub direction: ThresholdDirection,
}

impl ThresholdRule {
    pub fn new(k: f64, direction: ThresholdDirection) -> Self {
        Self { k, direction }
    }

    pub fn gt(k: f64) -> Self {
        Self::new(k, ThresholdDirection::Gt)
    }

    pub fn lt(k: f64) -> Self {
        Self::new(k, ThresholdDirection::Lt)
    }

    /// Threshold value for the given statistics
    pub fn value(&self, stats: &Statistics) -> f64 {
        match self.direction {
            ThresholdDirection::Gt => stats.mean + self.k * stats.std_dev,
            ThresholdDirection::Lt => stats.mean - self.k * stats.std_dev,
        }
    }
}

/// Result of [`threshold`]
#[derive(Debug, Clone)]
pub struct ThresholdOutcome {
    /// The threshold the mask was cut at
    pub value: f64,
    /// Statistics of the normalized raster the threshold was derived from
    pub statistics: Statistics,
    pub mask: BinaryMask,
}

/// Normalized raster and the statistics of the index it was scaled from
#[derive(Debug, Clone)]
pub struct Normalized {
    pub raster: Raster<f64>,
    pub statistics: Statistics,
}

/// Rescale `index` to [0, 1] using its min and max within `region` at `scale`.
///
/// Cells outside the region and no-data cells become NaN. Cells inside the
/// region that the sample grid skipped may fall outside the sampled range;
/// they are clamped so every valid output lies in [0, 1].
///
/// # Errors
/// - [`Error::DegenerateRange`] when min == max
/// - [`Error::EmptyInput`] when no valid cell is inside the region
pub fn normalize(index: &Raster<f64>, region: &Region, scale: f64) -> Result<Raster<f64>> {
    normalize_with_statistics(index, region, scale).map(|n| n.raster)
}

/// [`normalize`], also returning the min/max/mean/std of the input index
pub fn normalize_with_statistics(
    index: &Raster<f64>,
    region: &Region,
    scale: f64,
) -> Result<Normalized> {
    let footprint = Footprint::for_raster(index, region, scale)?;
    let stats = footprint.statistics(index)?;

    let range = stats.range();
    if range <= 0.0 {
        return Err(Error::DegenerateRange {
            min: stats.min,
            max: stats.max,
        });
    }
    debug!(min = stats.min, max = stats.max, cells = stats.count, "normalize");

    let min = stats.min;
    let raster = index.map_cells(Some(f64::NAN), |row, col, _| {
        if !footprint.in_region(row, col) {
            return f64::NAN;
        }
        match index.valid_value(row, col) {
            Some(v) => ((v - min) / range).clamp(0.0, 1.0),
            None => f64::NAN,
        }
    });

    Ok(Normalized {
        raster,
        statistics: stats,
    })
}

/// Binarize a normalized raster against `rule` evaluated on its statistics
/// within `region` at `scale`.
///
/// No-data cells and cells outside the region are `NoData` in the mask and
/// never satisfy the comparison.
pub fn threshold(
    normalized: &Raster<f64>,
    region: &Region,
    scale: f64,
    rule: ThresholdRule,
) -> Result<ThresholdOutcome> {
    if !rule.k.is_finite() {
        return Err(Error::invalid_parameter("k", rule.k, "must be finite"));
    }

    let footprint = Footprint::for_raster(normalized, region, scale)?;
    let statistics = footprint.statistics(normalized)?;
    let value = rule.value(&statistics);

    let mask = BinaryMask::from_fn(normalized, |row, col| {
        if !footprint.in_region(row, col) {
            return MaskValue::NoData;
        }
        match normalized.valid_value(row, col) {
            Some(v) => rule.direction.passes(v, value).into(),
            None => MaskValue::NoData,
        }
    });

    debug!(
        mean = statistics.mean,
        std_dev = statistics.std_dev,
        k = rule.k,
        direction = %rule.direction,
        threshold = value,
        selected = mask.count_true(),
        "threshold"
    );

    Ok(ThresholdOutcome {
        value,
        statistics,
        mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use landmask_core::GeoTransform;

    fn grid(data: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_normalize_extremes() {
        let r = grid(vec![2.0, 4.0, 6.0, 10.0], 2, 2);
        let n = normalize(&r, &Region::covering(&r), 10.0).unwrap();
        assert_eq!(n.get(0, 0).unwrap(), 0.0);
        assert_eq!(n.get(1, 1).unwrap(), 1.0);
        assert_relative_eq!(n.get(0, 1).unwrap(), 0.25);
    }

    #[test]
    fn test_normalize_skips_infinite_cells() {
        let r = grid(vec![0.0, 1.0, 2.0, f64::INFINITY], 2, 2);
        let region = Region::covering(&r);
        let n = normalize_with_statistics(&r, &region, 10.0).unwrap();
        assert_eq!(n.statistics.max, 2.0);
        assert_eq!(n.statistics.count, 3);
        assert_eq!(n.raster.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(n.raster.get(0, 1).unwrap(), 0.5);
        assert_eq!(n.raster.get(1, 0).unwrap(), 1.0);
        assert!(n.raster.get(1, 1).unwrap().is_nan());

        let outcome = threshold(&n.raster, &region, 10.0, ThresholdRule::gt(0.0)).unwrap();
        assert_eq!(outcome.mask.get(1, 1).unwrap(), MaskValue::NoData);
        assert_eq!(outcome.mask.count_valid(), 3);
    }

    #[test]
    fn test_normalize_constant_is_degenerate() {
        let r = grid(vec![3.0; 9], 3, 3);
        assert!(matches!(
            normalize(&r, &Region::covering(&r), 10.0),
            Err(Error::DegenerateRange { .. })
        ));
    }

    #[test]
    fn test_normalize_outside_region_is_nodata() {
        let r = grid((0..16).map(f64::from).collect(), 4, 4);
        let left = Region::from_bounds(0.0, 0.0, 20.0, 40.0);
        let n = normalize(&r, &left, 10.0).unwrap();
        assert!(n.get(0, 3).unwrap().is_nan());
        assert_eq!(n.get(0, 0).unwrap(), 0.0);
        assert_eq!(n.get(3, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_threshold_scenario() {
        // min 0.2, max 0.8, mean 0.5, population std 0.1
        let mut data = vec![0.5; 18];
        data[0] = 0.2;
        data[17] = 0.8;
        let r = grid(data, 3, 6);

        let out = threshold(&r, &Region::covering(&r), 10.0, ThresholdRule::gt(0.25)).unwrap();
        assert_relative_eq!(out.statistics.mean, 0.5, epsilon = 1e-12);
        assert_relative_eq!(out.statistics.std_dev, 0.1, epsilon = 1e-12);
        assert_relative_eq!(out.value, 0.525, epsilon = 1e-12);
        assert_eq!(out.mask.count_true(), 1);
        assert!(out.mask.is_true(2, 5));
    }

    #[test]
    fn test_threshold_lt() {
        let r = grid(vec![0.0, 0.1, 0.5, 0.9, 1.0, 0.5], 2, 3);
        let out = threshold(&r, &Region::covering(&r), 10.0, ThresholdRule::lt(0.5)).unwrap();
        assert!(out.value < out.statistics.mean);
        assert!(out.mask.is_true(0, 0));
        assert!(out.mask.is_true(0, 1));
        assert!(!out.mask.is_true(1, 1));
    }

    #[test]
    fn test_threshold_nodata_never_true() {
        let mut r = grid(vec![0.0, 1.0, 1.0, 1.0], 2, 2);
        r.set(1, 1, f64::NAN).unwrap();
        let out = threshold(&r, &Region::covering(&r), 10.0, ThresholdRule::gt(-10.0)).unwrap();
        assert_eq!(out.mask.get(1, 1).unwrap(), MaskValue::NoData);
        assert_eq!(out.mask.count_true(), 3);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("gt".parse::<ThresholdDirection>().unwrap(), ThresholdDirection::Gt);
        assert_eq!(" LT ".parse::<ThresholdDirection>().unwrap(), ThresholdDirection::Lt);
        assert!("ge".parse::<ThresholdDirection>().is_err());
        assert_eq!(ThresholdDirection::Lt.to_string(), "lt");
    }
}
