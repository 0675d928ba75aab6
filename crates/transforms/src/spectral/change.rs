//! Band-ratio change detection
//!
//! Ratio (optionally log-ratio) of two selected bands, typically the same
//! spectral band from two acquisition dates stacked into one raster.
//! Pixels where either band is non-positive or nodata map to 0, the
//! output sentinel.

use ndarray::Array3;
use rastile_core::prelude::*;

/// Parameters for band-ratio change detection
#[derive(Debug, Clone)]
pub struct ChangeParams {
    /// First band (numerator), zero-based (default: 0)
    pub band_a: usize,
    /// Second band (denominator), zero-based (default: 1)
    pub band_b: usize,
    /// Whether to return the natural log of the ratio (default: true)
    pub log_ratio: bool,
}

impl Default for ChangeParams {
    fn default() -> Self {
        Self {
            band_a: 0,
            band_b: 1,
            log_ratio: true,
        }
    }
}

/// Band-ratio change detection handler
#[derive(Debug, Clone)]
pub struct BandRatioChange {
    band_a: usize,
    band_b: usize,
    log_ratio: bool,
}

impl BandRatioChange {
    /// Validate the selected band indices against the input band count
    pub fn configure(band_count: usize, params: ChangeParams) -> Result<Self> {
        for (name, band) in [("band_a", params.band_a), ("band_b", params.band_b)] {
            if band >= band_count {
                return Err(Error::Configuration {
                    name,
                    value: band.to_string(),
                    reason: format!("input raster has {band_count} bands"),
                });
            }
        }
        Ok(Self {
            band_a: params.band_a,
            band_b: params.band_b,
            log_ratio: params.log_ratio,
        })
    }
}

impl TileTransform for BandRatioChange {
    fn name(&self) -> &'static str {
        "Change Detection"
    }

    fn description(&self) -> &'static str {
        "Computes the ratio of two raster bands, optionally log-scaled, as \
         a per-pixel change measure."
    }

    fn band_name(&self) -> &'static str {
        "ChangeDetection"
    }

    fn requirements(&self) -> BlockRequirements {
        BlockRequirements {
            padding: 0,
            needs_mask: false,
            inherit: PropertyFlags::STATISTICS | PropertyFlags::KEY_METADATA,
            invalidate: PropertyFlags::NODATA
                | PropertyFlags::STATISTICS
                | PropertyFlags::KEY_METADATA,
        }
    }

    fn output_info(&self, input: &RasterInfo) -> Result<RasterInfo> {
        if self.band_a >= input.band_count || self.band_b >= input.band_count {
            return Err(Error::Configuration {
                name: "band_count",
                value: input.band_count.to_string(),
                reason: "selected bands not present in input".to_string(),
            });
        }
        let mut out = input.cleared();
        out.band_count = 1;
        out.pixel_type = PixelType::F32;
        out.nodata = Some(0.0);
        Ok(out)
    }

    fn apply(
        &self,
        block: &TileBlock<f64>,
        mask: Option<&ValidityMask>,
    ) -> Result<TransformOutput> {
        let (bands, rows, cols) = block.shape();
        if self.band_a >= bands || self.band_b >= bands {
            return Err(Error::BandOutOfRange {
                band: self.band_a.max(self.band_b),
                bands,
            });
        }

        if let Some(m) = mask {
            if m.rows() != rows || m.cols() != cols {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: m.rows(),
                    ac: m.cols(),
                });
            }
            if m.bands() != 1 && m.bands() <= self.band_a.max(self.band_b) {
                return Err(Error::BandOutOfRange {
                    band: self.band_a.max(self.band_b),
                    bands: m.bands(),
                });
            }
        }

        let data = Array3::from_shape_fn((1, rows, cols), |(_, r, c)| {
            let va = unsafe { block.get_unchecked(self.band_a, r, c) };
            let vb = unsafe { block.get_unchecked(self.band_b, r, c) };
            let mask_ok = match mask {
                // a 1-band mask is shared by every block band
                Some(m) if m.bands() == 1 => m.is_valid(0, r, c),
                Some(m) => {
                    m.is_valid(self.band_a, r, c) && m.is_valid(self.band_b, r, c)
                }
                None => true,
            };

            if !mask_ok
                || va <= 0.0
                || vb <= 0.0
                || block.is_nodata(va)
                || block.is_nodata(vb)
            {
                return 0.0;
            }

            let ratio = va / vb;
            if self.log_ratio {
                ratio.max(1.0e-15).ln()
            } else {
                ratio
            }
        });

        let mut pixels = TileBlock::from_array(data);
        pixels.set_nodata(Some(0.0));

        Ok(TransformOutput {
            pixels,
            mask: ValidityMask::all_valid(1, rows, cols),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn block() -> TileBlock<f64> {
        let mut b = TileBlock::filled(2, 2, 2, 1.0);
        b.set(0, 0, 0, 4.0).unwrap();
        b.set(1, 0, 0, 2.0).unwrap();
        b.set(0, 1, 1, -3.0).unwrap();
        b
    }

    #[test]
    fn test_configure_rejects_missing_band() {
        let params = ChangeParams {
            band_a: 0,
            band_b: 5,
            log_ratio: true,
        };
        assert!(BandRatioChange::configure(2, params).is_err());
    }

    #[test]
    fn test_log_ratio() {
        let cd = BandRatioChange::configure(2, ChangeParams::default()).unwrap();
        let out = cd.apply(&block(), None).unwrap();
        assert_eq!(out.pixels.shape(), (1, 2, 2));
        assert_abs_diff_eq!(out.pixels.get(0, 0, 0).unwrap(), 2.0f64.ln(), epsilon = 1e-12);
        // non-positive input maps to the output sentinel
        assert_eq!(out.pixels.get(0, 1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_plain_ratio_and_nodata() {
        let mut b = block();
        b.set_nodata(Some(1.0));
        let cd = BandRatioChange::configure(
            2,
            ChangeParams {
                band_a: 0,
                band_b: 1,
                log_ratio: false,
            },
        )
        .unwrap();
        let out = cd.apply(&b, None).unwrap();
        assert_abs_diff_eq!(out.pixels.get(0, 0, 0).unwrap(), 2.0);
        // band values equal to the sentinel are invalid
        assert_eq!(out.pixels.get(0, 0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_per_band_mask_follows_selected_bands() {
        // only the denominator band's plane is invalidated at (0, 1); the
        // selected bands' planes, not plane 0, decide validity
        let mut mask = ValidityMask::all_valid(2, 2, 2);
        mask.set(1, 0, 1, false).unwrap();

        let cd = BandRatioChange::configure(2, ChangeParams::default()).unwrap();
        let out = cd.apply(&block(), Some(&mask)).unwrap();
        assert_eq!(out.pixels.get(0, 0, 1).unwrap(), 0.0);
        assert_abs_diff_eq!(out.pixels.get(0, 0, 0).unwrap(), 2.0f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_mask_short_of_selected_bands_is_rejected() {
        let mask = ValidityMask::all_valid(2, 2, 2);
        let cd = BandRatioChange::configure(
            3,
            ChangeParams {
                band_a: 0,
                band_b: 2,
                log_ratio: true,
            },
        )
        .unwrap();
        let b = TileBlock::filled(3, 2, 2, 1.0);
        let err = cd.apply(&b, Some(&mask)).unwrap_err();
        assert!(matches!(err, Error::BandOutOfRange { band: 2, bands: 2 }));
    }

    #[test]
    fn test_output_info() {
        let cd = BandRatioChange::configure(3, ChangeParams::default()).unwrap();
        let out = cd.output_info(&RasterInfo::new(3, PixelType::U16)).unwrap();
        assert_eq!(out.band_count, 1);
        assert_eq!(out.nodata, Some(0.0));
        assert_eq!(out.pixel_type, PixelType::F32);
    }
}
