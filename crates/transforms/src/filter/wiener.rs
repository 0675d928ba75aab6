//! Adaptive Wiener denoising

use crate::filter::window::{local_moments, odd_window};
use ndarray::Array3;
use rastile_core::prelude::*;

/// Parameters for the Wiener filter
#[derive(Debug, Clone)]
pub struct WienerParams {
    /// Moving window size; even sizes are bumped up to odd (default: 3)
    pub window: usize,
}

impl Default for WienerParams {
    fn default() -> Self {
        Self { window: 3 }
    }
}

/// Adaptive Wiener denoising handler.
///
/// Estimates the noise power as the mean of the local variances over each
/// band, then attenuates each pixel's deviation from its local mean in
/// proportion to the local signal-to-noise ratio. Windows with variance at
/// or below the noise floor collapse to the local mean.
#[derive(Debug, Clone)]
pub struct WienerDenoise {
    band_count: usize,
    radius: usize,
}

impl WienerDenoise {
    pub fn configure(band_count: usize, params: WienerParams) -> Result<Self> {
        if band_count == 0 {
            return Err(Error::Configuration {
                name: "band_count",
                value: band_count.to_string(),
                reason: "input raster has no bands".to_string(),
            });
        }
        if params.window < 3 {
            return Err(Error::Configuration {
                name: "window",
                value: params.window.to_string(),
                reason: "window must be at least 3".to_string(),
            });
        }
        Ok(Self {
            band_count,
            radius: odd_window(params.window) / 2,
        })
    }
}

impl TileTransform for WienerDenoise {
    fn name(&self) -> &'static str {
        "Wiener Filter"
    }

    fn description(&self) -> &'static str {
        "Reduces degradation and noise in an image using an adaptive \
         local-statistics Wiener filter."
    }

    fn band_name(&self) -> &'static str {
        "WienerFilter"
    }

    fn requirements(&self) -> BlockRequirements {
        BlockRequirements {
            padding: 0,
            needs_mask: false,
            inherit: PropertyFlags::STATISTICS | PropertyFlags::KEY_METADATA,
            invalidate: PropertyFlags::STATISTICS | PropertyFlags::KEY_METADATA,
        }
    }

    fn output_info(&self, input: &RasterInfo) -> Result<RasterInfo> {
        let mut out = input.cleared();
        out.band_count = self.band_count;
        out.pixel_type = PixelType::F32;
        Ok(out)
    }

    fn apply(
        &self,
        block: &TileBlock<f64>,
        _mask: Option<&ValidityMask>,
    ) -> Result<TransformOutput> {
        let (bands, rows, cols) = block.shape();

        let mut data = Array3::<f64>::zeros((bands, rows, cols));
        for b in 0..bands {
            let plane = block.band(b)?;
            let (mean, var) = local_moments(&plane, self.radius);
            let noise = var.iter().sum::<f64>() / var.len() as f64;

            for r in 0..rows {
                for c in 0..cols {
                    let x = plane[(r, c)];
                    let m = mean[(r, c)];
                    let v = var[(r, c)];
                    data[(b, r, c)] = if v <= noise {
                        m
                    } else {
                        m + (v - noise) / v * (x - m)
                    };
                }
            }
        }

        Ok(TransformOutput {
            pixels: TileBlock::from_array(data),
            mask: ValidityMask::all_valid(bands, rows, cols),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_configure_rejects_tiny_window() {
        assert!(WienerDenoise::configure(1, WienerParams { window: 1 }).is_err());
    }

    #[test]
    fn test_constant_image_unchanged() {
        let block = TileBlock::filled(1, 5, 5, 42.0);
        let w = WienerDenoise::configure(1, WienerParams::default()).unwrap();
        let out = w.apply(&block, None).unwrap();
        for r in 0..5 {
            for c in 0..5 {
                assert_abs_diff_eq!(out.pixels.get(0, r, c).unwrap(), 42.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_isolated_spike_is_attenuated() {
        let mut block = TileBlock::filled(1, 7, 7, 10.0);
        block.set(0, 3, 3, 100.0).unwrap();
        let w = WienerDenoise::configure(1, WienerParams::default()).unwrap();
        let out = w.apply(&block, None).unwrap();

        let filtered = out.pixels.get(0, 3, 3).unwrap();
        assert!(filtered < 100.0, "spike should be pulled down, got {filtered}");
        assert!(filtered > 10.0);
    }
}
