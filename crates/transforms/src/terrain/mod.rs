//! Terrain analysis transforms

mod ruggedness;

pub use ruggedness::TerrainRuggedness;
