//! Pixel element trait for generic sample values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a tile block.
///
/// Bounds the sample types a host may negotiate, and centralizes the
/// nodata test so the sentinel signal behaves identically for every type.
pub trait PixelElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default nodata sentinel for this type
    fn default_nodata() -> Self;

    /// Check whether this value represents nodata.
    ///
    /// For float types NaN always counts as nodata, with or without a
    /// sentinel.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert an f64 to this type, if representable
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_pixel_element_int {
    ($t:ty) => {
        impl PixelElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn is_float() -> bool {
                false
            }
        }
    };
}

macro_rules! impl_pixel_element_float {
    ($t:ty) => {
        impl PixelElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    };
}

impl_pixel_element_int!(i8);
impl_pixel_element_int!(i16);
impl_pixel_element_int!(i32);
impl_pixel_element_int!(i64);
impl_pixel_element_int!(u8);
impl_pixel_element_int!(u16);
impl_pixel_element_int!(u32);
impl_pixel_element_int!(u64);
impl_pixel_element_float!(f32);
impl_pixel_element_float!(f64);
