//! Terrain Ruggedness Index
//!
//! Riley's TRI: the root of the summed squared differences between each
//! cell and its 3x3 neighbors, an objective measure of topographic
//! heterogeneity. Uses the same halo/mask contract as the basis rotation:
//! a one-pixel halo supplies neighbor context, the output is cropped to
//! the interior, and the output mask is the 3x3 AND-reduction of the
//! input mask.

use ndarray::Array3;
use rastile_core::prelude::*;

/// Terrain Ruggedness Index handler for single-band elevation rasters
#[derive(Debug, Clone)]
pub struct TerrainRuggedness;

impl TerrainRuggedness {
    pub fn configure(band_count: usize) -> Result<Self> {
        if band_count != 1 {
            return Err(Error::Configuration {
                name: "band_count",
                value: band_count.to_string(),
                reason: "only single-band rasters are supported".to_string(),
            });
        }
        Ok(Self)
    }
}

impl TileTransform for TerrainRuggedness {
    fn name(&self) -> &'static str {
        "Terrain Ruggedness Index"
    }

    fn description(&self) -> &'static str {
        "Quantifies topographic heterogeneity as the root of summed \
         squared elevation differences over the 3x3 neighborhood."
    }

    fn band_name(&self) -> &'static str {
        "RuggednessIndex"
    }

    fn requirements(&self) -> BlockRequirements {
        BlockRequirements {
            padding: 1,
            needs_mask: true,
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
        out.pixel_type = PixelType::U16;
        Ok(out)
    }

    fn apply(
        &self,
        block: &TileBlock<f64>,
        mask: Option<&ValidityMask>,
    ) -> Result<TransformOutput> {
        let (_, rows, cols) = block.shape();
        if rows <= 2 || cols <= 2 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let plane = block.band(0)?;
        let data = Array3::from_shape_fn((1, rows - 2, cols - 2), |(_, r, c)| {
            // interior coordinates in the padded block
            let (cr, cc) = (r + 1, c + 1);
            let center = plane[(cr, cc)];
            let mut sum_sq = 0.0;
            for dr in -1isize..=1 {
                for dc in -1isize..=1 {
                    let n = plane[((cr as isize + dr) as usize, (cc as isize + dc) as usize)];
                    let d = center - n;
                    sum_sq += d * d;
                }
            }
            sum_sq.sqrt()
        });

        let validity = ValidityMask::joint(block, mask, 1)?;
        let out_mask = validity.erode(1)?;

        Ok(TransformOutput {
            pixels: TileBlock::from_array(data),
            mask: out_mask,
        })
    }
}
