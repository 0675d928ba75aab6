//! Host-boundary configuration and metadata records
//!
//! The host negotiates every recognized option through explicit records:
//! what a handler requires of each delivered block
//! ([`BlockRequirements`]), what the output raster looks like
//! ([`RasterInfo`]), and which key properties get relabeled after a
//! successful configuration ([`KeyMetadata`]). There is no implicit or
//! ambient configuration state.

use std::ops::BitOr;

/// Negotiated sample type of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl PixelType {
    /// Size of one sample in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            PixelType::U8 => 1,
            PixelType::U16 | PixelType::I16 => 2,
            PixelType::U32 | PixelType::I32 | PixelType::F32 => 4,
            PixelType::F64 => 8,
        }
    }

    /// Whether this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, PixelType::F32 | PixelType::F64)
    }
}

/// Bit-set of upstream raster properties, used for both the inherit word
/// (which properties survive unchanged) and the invalidate word (which
/// must be recomputed downstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    pub const NONE: PropertyFlags = PropertyFlags(0);
    /// Negotiated sample type
    pub const PIXEL_TYPE: PropertyFlags = PropertyFlags(1);
    /// Nodata sentinel
    pub const NODATA: PropertyFlags = PropertyFlags(2);
    /// Statistics and histogram
    pub const STATISTICS: PropertyFlags = PropertyFlags(4);
    /// Key metadata (dataset type, band names, wavelengths)
    pub const KEY_METADATA: PropertyFlags = PropertyFlags(8);
    pub const ALL: PropertyFlags = PropertyFlags(15);

    /// Whether every flag in `other` is set in `self`
    pub fn contains(self, other: PropertyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit word as negotiated with the host
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for PropertyFlags {
    type Output = PropertyFlags;

    fn bitor(self, rhs: PropertyFlags) -> PropertyFlags {
        PropertyFlags(self.0 | rhs.0)
    }
}

/// What a configured handler asks of the host for every tile it is given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequirements {
    /// Halo width the host must supply around each block (0 or 1)
    pub padding: usize,
    /// Whether the host must deliver a validity mask with each block
    pub needs_mask: bool,
    /// Upstream properties that survive the transform unchanged
    pub inherit: PropertyFlags,
    /// Upstream properties the host must recompute afterwards
    pub invalidate: PropertyFlags,
}

impl Default for BlockRequirements {
    fn default() -> Self {
        Self {
            padding: 0,
            needs_mask: false,
            inherit: PropertyFlags::ALL,
            invalidate: PropertyFlags::NONE,
        }
    }
}

/// Description of a raster at the host boundary
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    /// Number of bands
    pub band_count: usize,
    /// Negotiated sample type
    pub pixel_type: PixelType,
    /// Nodata sentinel, if any
    pub nodata: Option<f64>,
    /// Whether per-band statistics are present
    pub has_statistics: bool,
    /// Whether per-band histograms are present
    pub has_histogram: bool,
    /// Whether a colormap is present
    pub has_colormap: bool,
}

impl RasterInfo {
    pub fn new(band_count: usize, pixel_type: PixelType) -> Self {
        Self {
            band_count,
            pixel_type,
            nodata: None,
            has_statistics: false,
            has_histogram: false,
            has_colormap: false,
        }
    }

    /// Copy of this info with statistics, histogram and colormap cleared.
    ///
    /// Handlers that modify pixel values start their output info here.
    pub fn cleared(&self) -> Self {
        Self {
            has_statistics: false,
            has_histogram: false,
            has_colormap: false,
            ..self.clone()
        }
    }
}

/// Which level of key metadata an update applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataScope {
    /// Dataset-level properties
    Dataset,
    /// Properties of one band (zero-based)
    Band(usize),
}

/// Key properties a handler may relabel after configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMetadata {
    /// Dataset type label ("Processed" once a handler has run)
    pub datatype: Option<String>,
    /// Descriptive band name
    pub band_name: Option<String>,
    /// Lower wavelength bound of a spectral band, in nanometers
    pub wavelength_min: Option<f64>,
    /// Upper wavelength bound of a spectral band, in nanometers
    pub wavelength_max: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_flags_compose() {
        let flags = PropertyFlags::STATISTICS | PropertyFlags::KEY_METADATA;
        assert!(flags.contains(PropertyFlags::STATISTICS));
        assert!(!flags.contains(PropertyFlags::PIXEL_TYPE));
        assert_eq!(flags.bits(), 12);
        assert!(PropertyFlags::ALL.contains(flags));
    }

    #[test]
    fn test_pixel_type() {
        assert_eq!(PixelType::F32.size_bytes(), 4);
        assert!(PixelType::F32.is_float());
        assert!(!PixelType::U16.is_float());
    }

    #[test]
    fn test_cleared_drops_derived_properties() {
        let mut info = RasterInfo::new(5, PixelType::F64);
        info.has_statistics = true;
        info.has_histogram = true;
        info.nodata = Some(-9999.0);

        let cleared = info.cleared();
        assert!(!cleared.has_statistics);
        assert!(!cleared.has_histogram);
        assert_eq!(cleared.nodata, Some(-9999.0));
        assert_eq!(cleared.band_count, 5);
    }
}
