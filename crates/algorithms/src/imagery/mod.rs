//! Index rasters from spectral and radar bands
//!
//! - Spectral indices: NDVI, GNDVI, EVI, SAVI, NDMI, MNDWI, SR, DVI, CMR
//! - Radar change indices: RI, NDFI, DII (pre/post event backscatter)
//! - [`SpectralIndex`]: named formula with its required bands, evaluated
//!   over a [`BandSet`]

mod indices;

pub use indices::{
    clay_minerals_ratio, dii, dvi, evi, gndvi, mndwi, ndfi, ndmi, ndvi, normalized_difference,
    ratio_index, savi, simple_ratio, EviParams, SaviParams,
};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use landmask_core::{Error, Raster, Result};

/// Input band of an index formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
    /// Backscatter before the event
    Pre,
    /// Backscatter after the event
    Post,
}

impl Band {
    pub const ALL: [Band; 8] = [
        Band::Blue,
        Band::Green,
        Band::Red,
        Band::Nir,
        Band::Swir1,
        Band::Swir2,
        Band::Pre,
        Band::Post,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Band::Blue => "blue",
            Band::Green => "green",
            Band::Red => "red",
            Band::Nir => "nir",
            Band::Swir1 => "swir1",
            Band::Swir2 => "swir2",
            Band::Pre => "pre",
            Band::Post => "post",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        Band::ALL
            .into_iter()
            .find(|b| b.name() == key)
            .ok_or_else(|| Error::invalid_parameter("band", s, "unknown band name"))
    }
}

/// Co-registered band rasters keyed by [`Band`]
#[derive(Debug, Clone, Default)]
pub struct BandSet {
    bands: BTreeMap<Band, Raster<f64>>,
}

impl BandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, band: Band, raster: Raster<f64>) {
        self.bands.insert(band, raster);
    }

    pub fn with(mut self, band: Band, raster: Raster<f64>) -> Self {
        self.insert(band, raster);
        self
    }

    pub fn get(&self, band: Band) -> Option<&Raster<f64>> {
        self.bands.get(&band)
    }

    /// The raster for `band`, or [`Error::MissingInput`]
    pub fn require(&self, band: Band) -> Result<&Raster<f64>> {
        self.get(band)
            .ok_or_else(|| Error::MissingInput(format!("band '{}'", band)))
    }

    pub fn contains_all(&self, bands: &[Band]) -> bool {
        bands.iter().all(|b| self.bands.contains_key(b))
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, &Raster<f64>)> {
        self.bands.iter().map(|(b, r)| (*b, r))
    }
}

/// Index formulas that can be derived from bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    NDVI,
    /// Green Normalized Difference Vegetation Index
    GNDVI,
    /// Enhanced Vegetation Index
    EVI,
    /// Soil Adjusted Vegetation Index
    SAVI,
    /// Normalized Difference Moisture Index
    NDMI,
    /// Modified Normalized Difference Water Index
    MNDWI,
    /// Simple Ratio
    SR,
    /// Difference Vegetation Index
    DVI,
    /// Clay Minerals Ratio
    CMR,
    /// Radar Ratio Index
    RI,
    /// Normalized Difference Flood Index
    NDFI,
    /// Difference Image Index
    DII,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 12] = [
        SpectralIndex::NDVI,
        SpectralIndex::GNDVI,
        SpectralIndex::EVI,
        SpectralIndex::SAVI,
        SpectralIndex::NDMI,
        SpectralIndex::MNDWI,
        SpectralIndex::SR,
        SpectralIndex::DVI,
        SpectralIndex::CMR,
        SpectralIndex::RI,
        SpectralIndex::NDFI,
        SpectralIndex::DII,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::NDVI => "NDVI",
            SpectralIndex::GNDVI => "GNDVI",
            SpectralIndex::EVI => "EVI",
            SpectralIndex::SAVI => "SAVI",
            SpectralIndex::NDMI => "NDMI",
            SpectralIndex::MNDWI => "MNDWI",
            SpectralIndex::SR => "SR",
            SpectralIndex::DVI => "DVI",
            SpectralIndex::CMR => "CMR",
            SpectralIndex::RI => "RI",
            SpectralIndex::NDFI => "NDFI",
            SpectralIndex::DII => "DII",
        }
    }

    /// Bands the formula reads, in argument order
    pub fn required_bands(&self) -> &'static [Band] {
        match self {
            SpectralIndex::NDVI | SpectralIndex::SAVI | SpectralIndex::SR | SpectralIndex::DVI => {
                &[Band::Nir, Band::Red]
            }
            SpectralIndex::GNDVI => &[Band::Nir, Band::Green],
            SpectralIndex::EVI => &[Band::Nir, Band::Red, Band::Blue],
            SpectralIndex::NDMI => &[Band::Nir, Band::Swir1],
            SpectralIndex::MNDWI => &[Band::Green, Band::Swir1],
            SpectralIndex::CMR => &[Band::Swir1, Band::Swir2],
            SpectralIndex::RI | SpectralIndex::NDFI | SpectralIndex::DII => &[Band::Pre, Band::Post],
        }
    }

    /// Evaluate the formula over `bands`.
    ///
    /// Fails with [`Error::MissingInput`] when a required band is absent and
    /// [`Error::GridMismatch`] when the bands are not co-registered.
    pub fn compute(&self, bands: &BandSet) -> Result<Raster<f64>> {
        let b = |band| bands.require(band);
        match self {
            SpectralIndex::NDVI => ndvi(b(Band::Nir)?, b(Band::Red)?),
            SpectralIndex::GNDVI => gndvi(b(Band::Nir)?, b(Band::Green)?),
            SpectralIndex::EVI => evi(b(Band::Nir)?, b(Band::Red)?, b(Band::Blue)?, EviParams::default()),
            SpectralIndex::SAVI => savi(b(Band::Nir)?, b(Band::Red)?, SaviParams::default()),
            SpectralIndex::NDMI => ndmi(b(Band::Nir)?, b(Band::Swir1)?),
            SpectralIndex::MNDWI => mndwi(b(Band::Green)?, b(Band::Swir1)?),
            SpectralIndex::SR => simple_ratio(b(Band::Nir)?, b(Band::Red)?),
            SpectralIndex::DVI => dvi(b(Band::Nir)?, b(Band::Red)?),
            SpectralIndex::CMR => clay_minerals_ratio(b(Band::Swir1)?, b(Band::Swir2)?),
            SpectralIndex::RI => ratio_index(b(Band::Pre)?, b(Band::Post)?),
            SpectralIndex::NDFI => ndfi(b(Band::Pre)?, b(Band::Post)?),
            SpectralIndex::DII => dii(b(Band::Pre)?, b(Band::Post)?),
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    /// Case-insensitive formula name; unknown names (e.g. SWI) are errors
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_uppercase();
        SpectralIndex::ALL
            .into_iter()
            .find(|i| i.name() == key)
            .ok_or_else(|| Error::invalid_parameter("index", s, "no formula for this index"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_names() {
        assert_eq!("ndvi".parse::<SpectralIndex>().unwrap(), SpectralIndex::NDVI);
        assert_eq!("Ndfi".parse::<SpectralIndex>().unwrap(), SpectralIndex::NDFI);
        assert!("SWI".parse::<SpectralIndex>().is_err());
        assert_eq!("SWIR1".parse::<Band>().unwrap(), Band::Swir1);
        assert!("thermal".parse::<Band>().is_err());
    }

    #[test]
    fn test_compute_from_bands() {
        let bands = BandSet::new()
            .with(Band::Nir, Raster::filled(3, 3, 0.6))
            .with(Band::Red, Raster::filled(3, 3, 0.2));
        let out = SpectralIndex::NDVI.compute(&bands).unwrap();
        assert_relative_eq!(out.get(1, 1).unwrap(), 0.5, epsilon = 1e-12);
        assert!(bands.contains_all(SpectralIndex::SR.required_bands()));
    }

    #[test]
    fn test_missing_band() {
        let bands = BandSet::new().with(Band::Nir, Raster::filled(3, 3, 0.6));
        assert!(matches!(
            SpectralIndex::GNDVI.compute(&bands),
            Err(Error::MissingInput(_))
        ));
        assert!(!bands.contains_all(SpectralIndex::GNDVI.required_bands()));
    }
}
