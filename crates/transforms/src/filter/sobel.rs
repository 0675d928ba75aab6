//! Sobel gradient magnitude

use crate::filter::window::clamped;
use ndarray::Array3;
use rastile_core::prelude::*;

const KX: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const KY: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Sobel edge-magnitude handler.
///
/// Convolves each band with the horizontal and vertical Sobel kernels and
/// returns the gradient magnitude. Edge samples are clamped.
#[derive(Debug, Clone)]
pub struct SobelMagnitude {
    band_count: usize,
}

impl SobelMagnitude {
    pub fn configure(band_count: usize) -> Result<Self> {
        if band_count == 0 {
            return Err(Error::Configuration {
                name: "band_count",
                value: band_count.to_string(),
                reason: "input raster has no bands".to_string(),
            });
        }
        Ok(Self { band_count })
    }
}

impl TileTransform for SobelMagnitude {
    fn name(&self) -> &'static str {
        "Sobel Filter"
    }

    fn description(&self) -> &'static str {
        "Computes the Sobel gradient magnitude of each band, highlighting \
         edges in the image."
    }

    fn band_name(&self) -> &'static str {
        "SobelFilter"
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
            for r in 0..rows {
                for c in 0..cols {
                    let mut gx = 0.0;
                    let mut gy = 0.0;
                    for (dr, (kx_row, ky_row)) in KX.iter().zip(KY.iter()).enumerate() {
                        for dc in 0..3 {
                            let v = clamped(
                                &plane,
                                r as isize + dr as isize - 1,
                                c as isize + dc as isize - 1,
                            );
                            gx += kx_row[dc] * v;
                            gy += ky_row[dc] * v;
                        }
                    }
                    data[(b, r, c)] = gx.hypot(gy);
                }
            }
        }

        Ok(TransformOutput {
            pixels: TileBlock::from_array(data),
            mask: ValidityMask::all_valid(bands, rows, cols),
        })
    }
}
