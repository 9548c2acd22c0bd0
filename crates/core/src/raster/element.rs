//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a band raster.
///
/// Quality words are stored as unsigned integers, reflectance and derived
/// bands as `f64`.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;
}

macro_rules! impl_raster_element_uint {
    ($t:ty) => {
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    };
}

impl_raster_element_uint!(u8);
impl_raster_element_uint!(u16);

impl RasterElement for f64 {
    // NaN is always no-data, whatever the declared value is.
    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        if self.is_nan() {
            return true;
        }
        match nodata {
            Some(nd) => (self - nd).abs() < f64::EPSILON * 100.0,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f64::NAN.is_nodata(Some(-9999.0)));
        assert!(!0.0_f64.is_nodata(None));
    }

    #[test]
    fn test_uint_nodata() {
        assert!(0_u16.is_nodata(Some(0)));
        assert!(!1_u16.is_nodata(Some(0)));
        assert!(!0_u16.is_nodata(None));
    }
}
