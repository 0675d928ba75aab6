//! Multivariate and multi-band spectral transforms

mod basis;
mod change;

pub use basis::{BasisRotationParams, MaskedBasisRotation};
pub use change::{BandRatioChange, ChangeParams};
