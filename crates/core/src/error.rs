//! Error types for rastile

use thiserror::Error;

/// Main error type for rastile operations
#[derive(Error, Debug)]
pub enum Error {
    /// A negotiated parameter is invalid. Raised while a handler is being
    /// configured, before any tile flows; fatal to the run.
    #[error("invalid configuration: {name} = {value} ({reason})")]
    Configuration {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A covariance entry has no jointly valid samples. For a diagonal
    /// entry `band_a == band_b` (the band itself is entirely invalid).
    #[error("covariance entry ({band_a}, {band_b}) has zero contributing valid samples")]
    StatisticalUnderflow { band_a: usize, band_b: usize },

    /// Eigen-decomposition produced non-finite eigenvalues or vectors.
    #[error("eigen-decomposition produced non-finite values")]
    NumericInstability,

    #[error("block size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch {
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("index out of bounds: ({row}, {col}) in block of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("band index {band} out of range for {bands}-band block")]
    BandOutOfRange { band: usize, bands: usize },

    #[error("invalid block dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("unsupported pixel value: {0}")]
    UnsupportedPixelValue(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error is local to a single tile.
    ///
    /// Tile-local errors let the host decide between skipping the tile and
    /// aborting the run; configuration errors always abort. The core never
    /// substitutes a fabricated value for a failed tile.
    pub fn is_tile_local(&self) -> bool {
        matches!(
            self,
            Error::StatisticalUnderflow { .. }
                | Error::NumericInstability
                | Error::SizeMismatch { .. }
                | Error::BandOutOfRange { .. }
                | Error::InvalidDimensions { .. }
        )
    }
}

/// Result type alias for rastile operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_local_classification() {
        let cfg = Error::Configuration {
            name: "components",
            value: "7".into(),
            reason: "requested components exceed available bands".into(),
        };
        assert!(!cfg.is_tile_local());

        let underflow = Error::StatisticalUnderflow {
            band_a: 0,
            band_b: 2,
        };
        assert!(underflow.is_tile_local());
        assert!(Error::NumericInstability.is_tile_local());
        // a delivered block shaped unlike what was negotiated fails that
        // tile, not the run
        assert!(Error::BandOutOfRange { band: 2, bands: 1 }.is_tile_local());
    }

    #[test]
    fn test_display_messages() {
        let e = Error::StatisticalUnderflow {
            band_a: 1,
            band_b: 1,
        };
        assert!(e.to_string().contains("(1, 1)"));

        let e = Error::BandOutOfRange { band: 4, bands: 3 };
        assert!(e.to_string().contains("band index 4"));
    }
}
