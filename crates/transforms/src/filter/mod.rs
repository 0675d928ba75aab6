//! Per-band image filters

mod sobel;
mod wallis;
mod wiener;
mod window;

pub use sobel::SobelMagnitude;
pub use wallis::{WallisNormalization, WallisParams};
pub use wiener::{WienerDenoise, WienerParams};
