//! Masked principal-component basis rotation
//!
//! Rotates the first `components` bands of a tile into a variance-ranked
//! basis computed from the masked covariance matrix of the tile itself.
//! Both invalidity signals (host mask and nodata sentinel) restrict the
//! statistics; the halo supplied by the host is cropped from the output,
//! and the output mask is the neighborhood AND-reduction of the joint
//! input validity. Statistics are local to each tile: the covariance
//! matrix, eigen pairs and basis are tile-local temporaries, never cached
//! across tiles.

use log::debug;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{s, Array2, Array3};
use rastile_core::prelude::*;

/// Parameters for the basis rotation
#[derive(Debug, Clone)]
pub struct BasisRotationParams {
    /// Number of output components (default: 3)
    pub components: usize,
    /// Halo width the host supplies around each block, 0 or 1 (default: 1)
    pub padding: usize,
}

impl Default for BasisRotationParams {
    fn default() -> Self {
        Self {
            components: 3,
            padding: 1,
        }
    }
}

/// Masked principal-component basis rotation handler.
///
/// Configured once per run with the input band count and the negotiated
/// parameters; stateless between tiles apart from those fixed counts, so
/// a single instance may serve concurrent per-tile calls.
#[derive(Debug, Clone)]
pub struct MaskedBasisRotation {
    band_count: usize,
    components: usize,
    padding: usize,
}

impl MaskedBasisRotation {
    /// Validate the negotiated parameters and fix the output shape.
    ///
    /// Fails before any tile flows if `components` exceeds the available
    /// bands, is zero, or the padding width is not 0 or 1.
    pub fn configure(band_count: usize, params: BasisRotationParams) -> Result<Self> {
        if params.components == 0 {
            return Err(Error::Configuration {
                name: "components",
                value: params.components.to_string(),
                reason: "at least one output component is required".to_string(),
            });
        }
        if params.components > band_count {
            return Err(Error::Configuration {
                name: "components",
                value: params.components.to_string(),
                reason: "requested components exceed available bands".to_string(),
            });
        }
        if params.padding > 1 {
            return Err(Error::Configuration {
                name: "padding",
                value: params.padding.to_string(),
                reason: "halo width must be 0 or 1".to_string(),
            });
        }
        Ok(Self {
            band_count,
            components: params.components,
            padding: params.padding,
        })
    }

    /// Number of output components
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of input bands fixed at configuration
    pub fn band_count(&self) -> usize {
        self.band_count
    }
}

impl TileTransform for MaskedBasisRotation {
    fn name(&self) -> &'static str {
        "Principal Component Analysis"
    }

    fn description(&self) -> &'static str {
        "Rotates a set of raster bands into principal components computed \
         from the masked covariance matrix of each tile."
    }

    fn band_name(&self) -> &'static str {
        "PrincipalComponent"
    }

    fn requirements(&self) -> BlockRequirements {
        BlockRequirements {
            padding: self.padding,
            needs_mask: true,
            // everything but the pixel type and the nodata sentinel
            inherit: PropertyFlags::STATISTICS | PropertyFlags::KEY_METADATA,
            invalidate: PropertyFlags::STATISTICS | PropertyFlags::KEY_METADATA,
        }
    }

    fn output_info(&self, input: &RasterInfo) -> Result<RasterInfo> {
        if input.band_count != self.band_count {
            return Err(Error::Configuration {
                name: "band_count",
                value: input.band_count.to_string(),
                reason: format!("handler was configured for {} bands", self.band_count),
            });
        }
        let mut out = input.cleared();
        out.band_count = self.components;
        out.pixel_type = PixelType::F32;
        // rotated values carry no meaningful sentinel; validity travels in
        // the output mask
        out.nodata = None;
        Ok(out)
    }

    fn apply(
        &self,
        block: &TileBlock<f64>,
        mask: Option<&ValidityMask>,
    ) -> Result<TransformOutput> {
        let (bands, rows, cols) = block.shape();
        let comp = self.components;
        let p = self.padding;

        if bands < comp {
            return Err(Error::BandOutOfRange { band: comp, bands });
        }
        if rows <= 2 * p || cols <= 2 * p {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        // joint validity of the bands entering the statistics, honoring
        // both the host mask and the nodata sentinel
        let validity = ValidityMask::joint(block, mask, comp)?;

        let stack = MaskedMatrix::from_block(block, &validity, comp)?;
        let cov = stack.covariance_matrix()?;
        debug!("masked covariance matrix: {cov:?}");

        let basis = principal_basis(&cov)?;

        // rotate the raw band stack: out = basis^T * stack. Elements fed by
        // invalid inputs are rotated too; the output mask governs their
        // validity downstream.
        let mut rotated = Array3::<f64>::zeros((comp, rows, cols));
        for c in 0..comp {
            for r in 0..rows {
                for col in 0..cols {
                    let mut acc = 0.0;
                    for b in 0..comp {
                        acc += basis[(b, c)] * unsafe { block.get_unchecked(b, r, col) };
                    }
                    rotated[(c, r, col)] = acc;
                }
            }
        }

        // crop the halo from the numeric output
        let interior = rotated
            .slice(s![.., p..rows - p, p..cols - p])
            .to_owned();

        // output validity: AND across the contributing bands, AND-reduced
        // over the full padded neighborhood, one plane per output band
        let out_mask = validity.combined().erode(p)?.replicate(comp)?;

        Ok(TransformOutput {
            pixels: TileBlock::from_array(interior),
            mask: out_mask,
        })
    }
}

/// Assemble the rotation basis from a symmetric covariance matrix.
///
/// Columns are the eigenvectors sorted by descending absolute eigenvalue
/// (stable on ties, so equal-eigenvalue cases keep the solver's original
/// order). The assembled matrix is negated: eigenvectors are defined only
/// up to sign, and the negation fixes the output sign run-to-run.
fn principal_basis(cov: &Array2<f64>) -> Result<Array2<f64>> {
    let n = cov.nrows();
    let m = DMatrix::from_fn(n, n, |i, j| cov[(i, j)]);

    let eigen = SymmetricEigen::new(m);
    if eigen.eigenvalues.iter().any(|v| !v.is_finite())
        || eigen.eigenvectors.iter().any(|v| !v.is_finite())
    {
        return Err(Error::NumericInstability);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .abs()
            .partial_cmp(&eigen.eigenvalues[a].abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    debug!(
        "sorted eigenvalues: {:?}",
        order
            .iter()
            .map(|&i| eigen.eigenvalues[i])
            .collect::<Vec<_>>()
    );

    let mut basis = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        for row in 0..n {
            basis[(row, dst)] = -eigen.eigenvectors[(row, src)];
        }
    }
    Ok(basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn two_band_block(rows: usize, cols: usize) -> TileBlock<f64> {
        // band 1 = 2 * band 0, fully valid
        let mut block = TileBlock::new(2, rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                let v = (r * cols + c) as f64;
                block.set(0, r, c, v).unwrap();
                block.set(1, r, c, 2.0 * v).unwrap();
            }
        }
        block
    }

    #[test]
    fn test_configure_rejects_excess_components() {
        let err = MaskedBasisRotation::configure(
            2,
            BasisRotationParams {
                components: 3,
                padding: 1,
            },
        )
        .unwrap_err();
        assert!(!err.is_tile_local());
        assert!(err.to_string().contains("exceed available bands"));
    }

    #[test]
    fn test_configure_rejects_wide_halo() {
        assert!(MaskedBasisRotation::configure(
            4,
            BasisRotationParams {
                components: 2,
                padding: 2,
            },
        )
        .is_err());
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let cov = array![
            [4.0, 1.2, 0.3],
            [1.2, 3.0, 0.5],
            [0.3, 0.5, 2.0]
        ];
        let basis = principal_basis(&cov).unwrap();

        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = (0..3).map(|k| basis[(k, i)] * basis[(k, j)]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(dot, expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_basis_ordering_by_absolute_eigenvalue() {
        let cov = array![
            [1.0, 0.0, 0.0],
            [0.0, 5.0, 0.0],
            [0.0, 0.0, 3.0]
        ];
        let basis = principal_basis(&cov).unwrap();

        // recovered eigenvalues v^T C v, in column order
        let mut prev = f64::INFINITY;
        for c in 0..3 {
            let mut lambda = 0.0;
            for i in 0..3 {
                for j in 0..3 {
                    lambda += basis[(i, c)] * cov[(i, j)] * basis[(j, c)];
                }
            }
            assert!(lambda.abs() <= prev + 1e-9);
            prev = lambda.abs();
        }
    }

    #[test]
    fn test_correlated_bands_collapse_to_one_component() {
        let block = two_band_block(6, 6);
        let pca = MaskedBasisRotation::configure(
            2,
            BasisRotationParams {
                components: 2,
                padding: 0,
            },
        )
        .unwrap();

        let out = pca.apply(&block, None).unwrap();
        assert_eq!(out.pixels.shape(), (2, 6, 6));

        // the second component carries no variance: band1 = 2*band0 means
        // the orthogonal direction is annihilated everywhere
        for r in 0..6 {
            for c in 0..6 {
                assert_abs_diff_eq!(out.pixels.get(1, r, c).unwrap(), 0.0, epsilon = 1e-9);
            }
        }

        // and the first captures it all: |(x1 + 2*x2)| / sqrt(5) = sqrt(5)*v,
        // up to the eigenvector sign
        for r in 0..6 {
            for c in 0..6 {
                let v = (r * 6 + c) as f64;
                let expected = 5.0f64.sqrt() * v;
                assert_abs_diff_eq!(
                    out.pixels.get(0, r, c).unwrap().abs(),
                    expected,
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_non_finite_pixel_is_numeric_instability() {
        // a valid infinity poisons the covariance matrix; the eigen guard
        // must reject the tile instead of emitting non-finite components
        let mut block = two_band_block(4, 4);
        block.set(0, 1, 1, f64::INFINITY).unwrap();

        let pca = MaskedBasisRotation::configure(
            2,
            BasisRotationParams {
                components: 2,
                padding: 0,
            },
        )
        .unwrap();

        match pca.apply(&block, None) {
            Err(Error::NumericInstability) => {}
            other => panic!("expected numeric instability, got {other:?}"),
        }
    }

    #[test]
    fn test_short_block_is_tile_local() {
        // the host delivered a block with fewer bands than the configured
        // component count; the tile fails but the run may continue
        let pca = MaskedBasisRotation::configure(
            3,
            BasisRotationParams {
                components: 2,
                padding: 0,
            },
        )
        .unwrap();

        let block: TileBlock<f64> = TileBlock::filled(1, 4, 4, 1.0);
        let err = pca.apply(&block, None).unwrap_err();
        assert!(matches!(err, Error::BandOutOfRange { band: 2, bands: 1 }));
        assert!(err.is_tile_local());
    }

    #[test]
    fn test_band_entirely_nodata_is_fatal() {
        let mut block = two_band_block(4, 4);
        block.set_nodata(Some(-9999.0));
        for r in 0..4 {
            for c in 0..4 {
                block.set(1, r, c, -9999.0).unwrap();
            }
        }

        let pca = MaskedBasisRotation::configure(
            2,
            BasisRotationParams {
                components: 2,
                padding: 0,
            },
        )
        .unwrap();

        match pca.apply(&block, None) {
            Err(Error::StatisticalUnderflow { band_a: 1, band_b: 1 }) => {}
            other => panic!("expected underflow, got {other:?}"),
        }
    }

    #[test]
    fn test_output_info_shapes_and_clears() {
        let pca = MaskedBasisRotation::configure(5, BasisRotationParams::default()).unwrap();
        let mut input = RasterInfo::new(5, PixelType::U16);
        input.has_statistics = true;
        input.nodata = Some(0.0);

        let out = pca.output_info(&input).unwrap();
        assert_eq!(out.band_count, 3);
        assert_eq!(out.pixel_type, PixelType::F32);
        assert!(!out.has_statistics);
        assert_eq!(out.nodata, None);

        let wrong = RasterInfo::new(4, PixelType::U16);
        assert!(pca.output_info(&wrong).is_err());
    }

    #[test]
    fn test_key_metadata_relabeling() {
        let pca = MaskedBasisRotation::configure(3, BasisRotationParams::default()).unwrap();

        let mut dataset = KeyMetadata::default();
        pca.update_key_metadata(MetadataScope::Dataset, &mut dataset);
        assert_eq!(dataset.datatype.as_deref(), Some("Processed"));

        let mut band0 = KeyMetadata {
            wavelength_min: Some(450.0),
            wavelength_max: Some(520.0),
            ..Default::default()
        };
        pca.update_key_metadata(MetadataScope::Band(0), &mut band0);
        assert_eq!(band0.wavelength_min, None);
        assert_eq!(band0.wavelength_max, None);
        assert_eq!(band0.band_name.as_deref(), Some("PrincipalComponent"));
    }
}
