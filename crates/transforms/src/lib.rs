//! # rastile transforms
//!
//! Tile transform handlers for a raster-processing host.
//!
//! ## Available handler categories
//!
//! - **spectral**: masked principal-component basis rotation, band-ratio
//!   change detection
//! - **filter**: Sobel magnitude, Wallis normalization, Wiener denoising
//! - **terrain**: terrain ruggedness index
//!
//! Every handler implements [`rastile_core::TileTransform`]: it is
//! configured once per run (all parameters validated eagerly), then
//! applied once per tile. Handlers hold no cross-tile state, so the host
//! may process tiles in parallel against a single configured handler.

pub mod filter;
pub mod spectral;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::filter::{
        SobelMagnitude, WallisNormalization, WallisParams, WienerDenoise, WienerParams,
    };
    pub use crate::spectral::{
        BandRatioChange, BasisRotationParams, ChangeParams, MaskedBasisRotation,
    };
    pub use crate::terrain::TerrainRuggedness;
    pub use rastile_core::prelude::*;
}
