//! Wallis contrast normalization

use crate::filter::window::{local_moments, odd_window};
use ndarray::Array3;
use rastile_core::prelude::*;

/// Parameters for Wallis normalization
#[derive(Debug, Clone)]
pub struct WallisParams {
    /// Desired output mean, in [0, 255] (default: 128)
    pub desired_mean: f64,
    /// Desired output standard deviation, in [1, 255] (default: 76.8)
    pub desired_stddev: f64,
    /// Moving window size; even sizes are bumped up to odd (default: 3)
    pub window: usize,
    /// Maximum contrast expansion gain, in [0, 255] (default: 6)
    pub gain: f64,
    /// Brightness forcing constant, non-negative (default: 0.8)
    pub alpha: f64,
}

impl Default for WallisParams {
    fn default() -> Self {
        Self {
            desired_mean: 128.0,
            desired_stddev: 76.8,
            window: 3,
            gain: 6.0,
            alpha: 0.8,
        }
    }
}

/// Wallis normalization handler.
///
/// Forces the local mean and contrast of a single-band image toward
/// desired values, window by window.
#[derive(Debug, Clone)]
pub struct WallisNormalization {
    desired_mean: f64,
    desired_stddev: f64,
    radius: usize,
    gain: f64,
    alpha: f64,
}

impl WallisNormalization {
    pub fn configure(band_count: usize, params: WallisParams) -> Result<Self> {
        if band_count != 1 {
            return Err(Error::Configuration {
                name: "band_count",
                value: band_count.to_string(),
                reason: "only single-band rasters are supported".to_string(),
            });
        }
        if !(0.0..=255.0).contains(&params.desired_mean) {
            return Err(Error::Configuration {
                name: "desired_mean",
                value: params.desired_mean.to_string(),
                reason: "desired mean out of range".to_string(),
            });
        }
        if !(1.0..=255.0).contains(&params.desired_stddev) {
            return Err(Error::Configuration {
                name: "desired_stddev",
                value: params.desired_stddev.to_string(),
                reason: "desired standard deviation out of range".to_string(),
            });
        }
        if !(0.0..=255.0).contains(&params.gain) {
            return Err(Error::Configuration {
                name: "gain",
                value: params.gain.to_string(),
                reason: "maximum gain out of range".to_string(),
            });
        }
        if params.alpha < 0.0 {
            return Err(Error::Configuration {
                name: "alpha",
                value: params.alpha.to_string(),
                reason: "alpha must be non-negative".to_string(),
            });
        }
        Ok(Self {
            desired_mean: params.desired_mean,
            desired_stddev: params.desired_stddev,
            radius: odd_window(params.window) / 2,
            gain: params.gain,
            alpha: params.alpha,
        })
    }
}

impl TileTransform for WallisNormalization {
    fn name(&self) -> &'static str {
        "Wallis Normalization"
    }

    fn description(&self) -> &'static str {
        "Adjusts local mean and contrast toward desired values using the \
         Wallis filter formula."
    }

    fn band_name(&self) -> &'static str {
        "WallisFilter"
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
        if input.band_count != 1 {
            return Err(Error::Configuration {
                name: "band_count",
                value: input.band_count.to_string(),
                reason: "only single-band rasters are supported".to_string(),
            });
        }
        let mut out = input.cleared();
        out.pixel_type = PixelType::F32;
        Ok(out)
    }

    fn apply(
        &self,
        block: &TileBlock<f64>,
        _mask: Option<&ValidityMask>,
    ) -> Result<TransformOutput> {
        let (_, rows, cols) = block.shape();
        let plane = block.band(0)?;
        let (mean, var) = local_moments(&plane, self.radius);

        let data = Array3::from_shape_fn((1, rows, cols), |(_, r, c)| {
            let x = plane[(r, c)];
            let m = mean[(r, c)];
            let sd = var[(r, c)].sqrt();
            self.alpha * self.desired_mean
                + (1.0 - self.alpha) * m
                + (x - m) * self.desired_stddev / (self.desired_stddev / self.gain + sd)
        });

        Ok(TransformOutput {
            pixels: TileBlock::from_array(data),
            mask: ValidityMask::all_valid(1, rows, cols),
        })
    }
}
