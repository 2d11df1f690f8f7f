//! Cell value trait for raster grids

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Index rasters are `f64`, masks are `u8` and classification rasters
/// are `i32`; the remaining integer widths exist so that GeoTIFF bands
/// of any common sample format can be decoded without a detour.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Value used to fill cells that could not be decoded
    fn default_nodata() -> Self;

    /// Check if this value represents no-data.
    ///
    /// NaN and ±infinity are always no-data for float types, whether or
    /// not an explicit no-data value is set.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::MIN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    nodata == Some(*self)
                }
            }
        )*
    };
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::NAN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    if !self.is_finite() {
                        return true;
                    }
                    match nodata {
                        Some(nd) if !nd.is_nan() => (self - nd).abs() < <$t>::EPSILON * 100.0,
                        _ => false,
                    }
                }
            }
        )*
    };
}

impl_raster_element_int!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_raster_element_float!(f32, f64);
