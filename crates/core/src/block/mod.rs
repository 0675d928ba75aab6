//! Pixel blocks, sample element types and validity masks

mod element;
mod mask;
mod tile;

pub use element::PixelElement;
pub use mask::ValidityMask;
pub use tile::{BlockStatistics, TileBlock};
