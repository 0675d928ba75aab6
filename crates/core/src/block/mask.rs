//! Per-pixel validity masks and halo-aware mask reduction

use crate::block::{PixelElement, TileBlock};
use crate::error::{Error, Result};
use ndarray::{Array2, Array3, ArrayView2};

/// Per-band, per-pixel validity signal aligned to a [`TileBlock`].
///
/// Stored as 0/1 bytes, matching the wire form the host delivers; any
/// nonzero entry counts as valid. The mask is one of two independent
/// invalidity signals (the other is the block's nodata sentinel) and
/// the two are not guaranteed consistent, so consumers combine them with
/// [`ValidityMask::joint`] rather than trusting either alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    data: Array3<u8>,
}

impl ValidityMask {
    /// Mask marking every pixel valid (the "host supplied no mask" case)
    pub fn all_valid(bands: usize, rows: usize, cols: usize) -> Self {
        Self {
            data: Array3::from_elem((bands, rows, cols), 1),
        }
    }

    /// Mask marking every pixel invalid
    pub fn all_invalid(bands: usize, rows: usize, cols: usize) -> Self {
        Self {
            data: Array3::zeros((bands, rows, cols)),
        }
    }

    /// Create a mask from existing 0/1 data
    pub fn from_array(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// Create a single-band mask from a 2-D plane
    pub fn from_plane(plane: Array2<u8>) -> Self {
        Self {
            data: plane.insert_axis(ndarray::Axis(0)),
        }
    }

    /// Number of band planes
    pub fn bands(&self) -> usize {
        self.data.dim().0
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.dim().1
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.dim().2
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Whether the pixel is usable
    pub fn is_valid(&self, band: usize, row: usize, col: usize) -> bool {
        self.data[(band, row, col)] != 0
    }

    /// Mark a pixel valid or invalid
    pub fn set(&mut self, band: usize, row: usize, col: usize, valid: bool) -> Result<()> {
        let (bands, rows, cols) = self.shape();
        if band >= bands {
            return Err(Error::BandOutOfRange { band, bands });
        }
        if row >= rows || col >= cols {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            });
        }
        self.data[(band, row, col)] = valid as u8;
        Ok(())
    }

    /// View of a single band plane
    pub fn band(&self, band: usize) -> Result<ArrayView2<'_, u8>> {
        if band >= self.bands() {
            return Err(Error::BandOutOfRange {
                band,
                bands: self.bands(),
            });
        }
        Ok(self.data.index_axis(ndarray::Axis(0), band))
    }

    /// Reference to the underlying array
    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    /// Count of valid pixels in one band plane
    pub fn valid_count(&self, band: usize) -> Result<usize> {
        Ok(self.band(band)?.iter().filter(|&&v| v != 0).count())
    }

    /// Joint per-band validity of a block under both invalidity signals.
    ///
    /// A pixel of band `b` is valid iff the host mask (when present) marks
    /// it valid AND its raw value is not the nodata sentinel. Only the
    /// first `bands` bands are examined. The host mask may carry either a
    /// single shared plane or one plane per block band.
    pub fn joint<T: PixelElement>(
        block: &TileBlock<T>,
        mask: Option<&ValidityMask>,
        bands: usize,
    ) -> Result<ValidityMask> {
        let (block_bands, rows, cols) = block.shape();
        if bands > block_bands {
            return Err(Error::BandOutOfRange {
                band: bands,
                bands: block_bands,
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
            if m.bands() != 1 && m.bands() < bands {
                return Err(Error::BandOutOfRange {
                    band: bands,
                    bands: m.bands(),
                });
            }
        }

        let data = Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
            let mask_ok = match mask {
                // A 1-band mask is shared by every block band.
                Some(m) if m.bands() == 1 => m.is_valid(0, r, c),
                Some(m) => m.is_valid(b, r, c),
                None => true,
            };
            let value_ok = !block.is_nodata(unsafe { block.get_unchecked(b, r, c) });
            (mask_ok && value_ok) as u8
        });

        Ok(ValidityMask { data })
    }

    /// AND-combine all band planes into a single joint-validity plane
    pub fn combined(&self) -> ValidityMask {
        let (bands, rows, cols) = self.shape();
        let plane = Array2::from_shape_fn((rows, cols), |(r, c)| {
            (0..bands).all(|b| self.is_valid(b, r, c)) as u8
        });
        ValidityMask::from_plane(plane)
    }

    /// AND-reduce each band plane over the full `(1 + 2·radius)²`
    /// neighborhood and crop `radius` rows/cols from every edge.
    ///
    /// An output pixel is valid only if its entire input neighborhood,
    /// diagonals included, was valid. `radius = 0` is an exact copy.
    pub fn erode(&self, radius: usize) -> Result<ValidityMask> {
        let (bands, rows, cols) = self.shape();
        if rows <= 2 * radius || cols <= 2 * radius {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let r = radius as isize;
        let data = Array3::from_shape_fn(
            (bands, rows - 2 * radius, cols - 2 * radius),
            |(b, row, col)| {
                let (cr, cc) = (row + radius, col + radius);
                let mut valid = true;
                for dr in -r..=r {
                    for dc in -r..=r {
                        let nr = (cr as isize + dr) as usize;
                        let nc = (cc as isize + dc) as usize;
                        if !self.is_valid(b, nr, nc) {
                            valid = false;
                        }
                    }
                }
                valid as u8
            },
        );

        Ok(ValidityMask { data })
    }

    /// Broadcast a single-band mask to `bands` identical output planes
    pub fn replicate(&self, bands: usize) -> Result<ValidityMask> {
        if self.bands() != 1 {
            return Err(Error::BandOutOfRange {
                band: self.bands(),
                bands: 1,
            });
        }
        let (_, rows, cols) = self.shape();
        let data =
            Array3::from_shape_fn((bands, rows, cols), |(_, r, c)| self.data[(0, r, c)]);
        Ok(ValidityMask { data })
    }
}
