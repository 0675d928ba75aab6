//! Multi-band pixel block type

use crate::block::PixelElement;
use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView2, ArrayView3};

/// A rectangular, possibly multi-band block of raster samples.
///
/// `TileBlock<T>` stores values of type `T` in a `(bands, rows, cols)`
/// grid. When a handler negotiated a halo, `rows`/`cols` include the
/// padding on every edge; the halo width itself is part of the handler
/// configuration, not of the block. A block is immutable once handed to a
/// transform.
///
/// # Type Parameters
///
/// - `T`: The sample value type, must implement [`PixelElement`]
///
/// # Example
///
/// ```
/// use rastile_core::block::TileBlock;
///
/// // 3 bands of 64x64 pixels, filled with zeros
/// let mut block: TileBlock<f32> = TileBlock::new(3, 64, 64);
/// block.set(0, 10, 20, 42.0).unwrap();
/// assert_eq!(block.get(0, 10, 20).unwrap(), 42.0);
/// ```
#[derive(Debug, Clone)]
pub struct TileBlock<T: PixelElement> {
    /// Samples stored band-major, then row-major within each band
    data: Array3<T>,
    /// Nodata sentinel; a sample equal to this value is invalid
    nodata: Option<T>,
}

impl<T: PixelElement> TileBlock<T> {
    /// Create a new block filled with zeros
    pub fn new(bands: usize, rows: usize, cols: usize) -> Self {
        Self {
            data: Array3::zeros((bands, rows, cols)),
            nodata: None,
        }
    }

    /// Create a new block filled with a specific value
    pub fn filled(bands: usize, rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array3::from_elem((bands, rows, cols), value),
            nodata: None,
        }
    }

    /// Create a block from existing band-major data
    pub fn from_shape_vec(bands: usize, rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != bands * rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array3::from_shape_vec((bands, rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data: array,
            nodata: None,
        })
    }

    /// Create a block from an ndarray
    pub fn from_array(data: Array3<T>) -> Self {
        Self { data, nodata: None }
    }

    // Dimensions

    /// Number of bands
    pub fn bands(&self) -> usize {
        self.data.dim().0
    }

    /// Number of rows (halo included)
    pub fn rows(&self) -> usize {
        self.data.dim().1
    }

    /// Number of columns (halo included)
    pub fn cols(&self) -> usize {
        self.data.dim().2
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (band, row, col)
    pub fn get(&self, band: usize, row: usize, col: usize) -> Result<T> {
        self.data
            .get((band, row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (band, row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure band/row/col are in range
    pub unsafe fn get_unchecked(&self, band: usize, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((band, row, col)) }
    }

    /// Set value at (band, row, col)
    pub fn set(&mut self, band: usize, row: usize, col: usize, value: T) -> Result<()> {
        if band >= self.bands() {
            return Err(Error::BandOutOfRange {
                band,
                bands: self.bands(),
            });
        }
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(band, row, col)] = value;
        Ok(())
    }

    /// View of a single band
    pub fn band(&self, band: usize) -> Result<ArrayView2<'_, T>> {
        if band >= self.bands() {
            return Err(Error::BandOutOfRange {
                band,
                bands: self.bands(),
            });
        }
        Ok(self.data.index_axis(ndarray::Axis(0), band))
    }

    /// View of the underlying data
    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    /// Reference to the underlying array
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array3<T> {
        &mut self.data
    }

    /// Consume the block and return the underlying array
    pub fn into_array(self) -> Array3<T> {
        self.data
    }

    // Nodata

    /// Get the nodata sentinel
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the nodata sentinel
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check if a value equals the nodata sentinel (NaN included for floats)
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Convert samples to another negotiated pixel type.
    ///
    /// Fails if any sample is not representable in the target type.
    pub fn cast<U: PixelElement>(&self) -> Result<TileBlock<U>> {
        let (bands, rows, cols) = self.shape();
        let mut out = Vec::with_capacity(self.len());
        for &v in self.data.iter() {
            let f = v
                .to_f64()
                .ok_or_else(|| Error::UnsupportedPixelValue(format!("{v:?}")))?;
            let u = U::from_f64(f).ok_or_else(|| Error::UnsupportedPixelValue(format!("{v:?}")))?;
            out.push(u);
        }
        let mut block = TileBlock::from_shape_vec(bands, rows, cols, out)?;
        block.nodata = match self.nodata {
            Some(nd) => nd.to_f64().and_then(U::from_f64),
            None => None,
        };
        Ok(block)
    }

    /// Basic statistics over all bands (min, max, mean, valid count)
    pub fn statistics(&self) -> BlockStatistics<T> {
        let mut min = None;
        let mut max = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.is_none() || value < min.unwrap() {
                min = Some(value);
            }
            if max.is_none() || value > max.unwrap() {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        BlockStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a block
#[derive(Debug, Clone)]
pub struct BlockStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
