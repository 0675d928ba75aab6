//! Masked band-stack statistics
//!
//! A [`MaskedMatrix`] pairs a flattened `(bands, samples)` value matrix
//! with a same-shaped validity matrix and supports the masked reductions
//! the basis rotation needs: per-band means over each band's own valid
//! set, and biased covariance entries over pairwise-intersected valid
//! sets. Each entry's denominator is the count of samples actually
//! contributing to that entry, never a single global count.

use crate::block::{TileBlock, ValidityMask};
use crate::error::{Error, Result};
use ndarray::Array2;

/// A 2-D value matrix paired with a same-shaped validity matrix.
///
/// Rows are bands, columns are flattened pixel samples. Derived from a
/// block per tile; never persisted across tiles.
#[derive(Debug, Clone)]
pub struct MaskedMatrix {
    values: Array2<f64>,
    valid: Array2<bool>,
}

impl MaskedMatrix {
    /// Pair values with their validity. Shapes must match.
    pub fn new(values: Array2<f64>, valid: Array2<bool>) -> Result<Self> {
        if values.dim() != valid.dim() {
            let (er, ec) = values.dim();
            let (ar, ac) = valid.dim();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(Self { values, valid })
    }

    /// Flatten the first `bands` bands of a block into a masked stack.
    ///
    /// `validity` must be the joint per-band validity of the same block
    /// (see [`ValidityMask::joint`]), carrying at least `bands` planes.
    pub fn from_block(
        block: &TileBlock<f64>,
        validity: &ValidityMask,
        bands: usize,
    ) -> Result<Self> {
        let (block_bands, rows, cols) = block.shape();
        if bands > block_bands {
            return Err(Error::BandOutOfRange {
                band: bands,
                bands: block_bands,
            });
        }
        if bands > validity.bands() {
            return Err(Error::BandOutOfRange {
                band: bands,
                bands: validity.bands(),
            });
        }
        if validity.rows() != rows || validity.cols() != cols {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: validity.rows(),
                ac: validity.cols(),
            });
        }

        let samples = rows * cols;
        let values = Array2::from_shape_fn((bands, samples), |(b, k)| unsafe {
            block.get_unchecked(b, k / cols, k % cols)
        });
        let valid = Array2::from_shape_fn((bands, samples), |(b, k)| {
            validity.is_valid(b, k / cols, k % cols)
        });

        Ok(Self { values, valid })
    }

    /// Number of bands (rows)
    pub fn bands(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples per band (columns)
    pub fn samples(&self) -> usize {
        self.values.ncols()
    }

    /// Count of valid samples in one band
    pub fn valid_count(&self, band: usize) -> usize {
        self.valid.row(band).iter().filter(|&&v| v).count()
    }

    /// Count of samples jointly valid in two bands
    pub fn pair_count(&self, band_a: usize, band_b: usize) -> usize {
        let a = self.valid.row(band_a);
        let b = self.valid.row(band_b);
        a.iter().zip(b.iter()).filter(|&(&x, &y)| x && y).count()
    }

    /// Mean over the band's own valid set.
    ///
    /// A band with zero valid samples is a statistical underflow, not a
    /// zero mean.
    pub fn masked_mean(&self, band: usize) -> Result<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (&v, &ok) in self.values.row(band).iter().zip(self.valid.row(band).iter()) {
            if ok {
                sum += v;
                count += 1;
            }
        }
        if count == 0 {
            return Err(Error::StatisticalUnderflow {
                band_a: band,
                band_b: band,
            });
        }
        Ok(sum / count as f64)
    }

    /// Masked means for every band
    pub fn masked_means(&self) -> Result<Vec<f64>> {
        (0..self.bands()).map(|b| self.masked_mean(b)).collect()
    }

    /// Biased (divide-by-N) covariance of two mean-centered bands over
    /// their pairwise-intersected valid set.
    pub fn masked_covariance(
        &self,
        band_a: usize,
        band_b: usize,
        mean_a: f64,
        mean_b: f64,
    ) -> Result<f64> {
        let va = self.values.row(band_a);
        let vb = self.values.row(band_b);
        let ma = self.valid.row(band_a);
        let mb = self.valid.row(band_b);

        let mut sum = 0.0;
        let mut count = 0usize;
        for k in 0..self.samples() {
            if ma[k] && mb[k] {
                sum += (va[k] - mean_a) * (vb[k] - mean_b);
                count += 1;
            }
        }
        if count == 0 {
            return Err(Error::StatisticalUnderflow { band_a, band_b });
        }
        Ok(sum / count as f64)
    }

    /// The full masked covariance matrix, symmetric by construction.
    ///
    /// Diagonal entries use the valid count of the band alone; off-diagonal
    /// entries use the pairwise-intersected count. Any zero count fails the
    /// tile.
    pub fn covariance_matrix(&self) -> Result<Array2<f64>> {
        let n = self.bands();
        let means = self.masked_means()?;

        let mut cov = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let c = self.masked_covariance(i, j, means[i], means[j])?;
                cov[(i, j)] = c;
                cov[(j, i)] = c;
            }
        }
        Ok(cov)
    }
}
