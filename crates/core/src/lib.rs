//! # rastile core
//!
//! Core types for the rastile family of raster-tile transform handlers.
//!
//! This crate provides:
//! - `TileBlock<T>`: generic multi-band pixel block, halo included
//! - `ValidityMask`: per-pixel validity aligned to a block
//! - `MaskedMatrix`: masked band-stack reductions (mean, covariance)
//! - `RasterInfo` / `BlockRequirements`: explicit host-boundary records
//! - The `TileTransform` trait every handler implements
//!
//! A handler is configured once per run, then applied once per tile. The
//! host owns tiling, scheduling and stitching; handlers hold no cross-tile
//! state, so a configured handler may be shared across worker threads.

pub mod block;
pub mod error;
pub mod info;
pub mod masked;

pub use block::{PixelElement, TileBlock, ValidityMask};
pub use error::{Error, Result};
pub use info::{BlockRequirements, KeyMetadata, MetadataScope, PixelType, RasterInfo};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::block::{PixelElement, TileBlock, ValidityMask};
    pub use crate::error::{Error, Result};
    pub use crate::info::{
        BlockRequirements, KeyMetadata, MetadataScope, PixelType, PropertyFlags, RasterInfo,
    };
    pub use crate::masked::MaskedMatrix;
    pub use crate::{TileTransform, TransformOutput};
}

/// Result of applying a transform to one tile: the derived pixel block
/// and its aligned validity mask.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub pixels: TileBlock<f64>,
    pub mask: ValidityMask,
}

/// Core trait for all tile transform handlers.
///
/// Implementors are constructed by a `configure` associated function that
/// validates every negotiated parameter eagerly; a value of the type is
/// proof that configuration succeeded. `apply` is synchronous, performs no
/// I/O, and allocates all temporaries per call.
pub trait TileTransform: Send + Sync {
    /// Returns the handler name
    fn name(&self) -> &'static str;

    /// Returns a description of what the handler does
    fn description(&self) -> &'static str;

    /// Band name written into the first output band's key metadata
    fn band_name(&self) -> &'static str;

    /// What the host must supply with every tile
    fn requirements(&self) -> BlockRequirements;

    /// Describe the output raster for a given input raster
    fn output_info(&self, input: &RasterInfo) -> Result<RasterInfo>;

    /// Transform one tile.
    ///
    /// `block` is the padded pixel block; `mask` is the host-supplied
    /// validity mask, absent meaning all pixels are valid. The output
    /// block and mask are cropped to the tile interior. A handler never
    /// returns a result for a tile it has flagged as failed.
    fn apply(&self, block: &TileBlock<f64>, mask: Option<&ValidityMask>)
        -> Result<TransformOutput>;

    /// Relabel key properties after a successful configuration.
    ///
    /// The default marks the dataset "Processed" and, on the first band,
    /// clears spectral wavelength bounds that no longer apply and assigns
    /// the handler's fixed band name.
    fn update_key_metadata(&self, scope: MetadataScope, metadata: &mut KeyMetadata) {
        match scope {
            MetadataScope::Dataset => {
                metadata.datatype = Some("Processed".to_string());
            }
            MetadataScope::Band(0) => {
                metadata.wavelength_min = None;
                metadata.wavelength_max = None;
                metadata.band_name = Some(self.band_name().to_string());
            }
            MetadataScope::Band(_) => {}
        }
    }
}
