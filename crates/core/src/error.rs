//! Error types for landmask

use thiserror::Error;

/// Main error type for landmask operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    /// Two rasters or masks disagree in extent, shape or resolution.
    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    /// Normalization range is zero: the index is constant over the region.
    #[error("Degenerate value range: min = max = {min} (constant field, no usable signal)")]
    DegenerateRange { min: f64, max: f64 },

    /// No valid data for the requested region. Distinct from an empty result.
    #[error("No valid input data: {0}")]
    EmptyInput(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`]
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for landmask operations
pub type Result<T> = std::result::Result<T, Error>;
