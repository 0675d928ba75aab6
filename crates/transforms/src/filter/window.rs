//! Local moving-window moments shared by the filter handlers

use ndarray::{Array2, ArrayView2};

/// Sample with indices clamped to the plane edges
#[inline]
pub(crate) fn clamped(plane: &ArrayView2<'_, f64>, row: isize, col: isize) -> f64 {
    let (rows, cols) = plane.dim();
    let r = row.clamp(0, rows as isize - 1) as usize;
    let c = col.clamp(0, cols as isize - 1) as usize;
    plane[(r, c)]
}

/// Local mean and population variance over a `(2·radius + 1)²` window.
///
/// Edge windows are filled by clamping, so every output pixel averages a
/// full window.
pub(crate) fn local_moments(
    plane: &ArrayView2<'_, f64>,
    radius: usize,
) -> (Array2<f64>, Array2<f64>) {
    let (rows, cols) = plane.dim();
    let r = radius as isize;
    let n = ((2 * radius + 1) * (2 * radius + 1)) as f64;

    let mut mean = Array2::<f64>::zeros((rows, cols));
    let mut var = Array2::<f64>::zeros((rows, cols));

    for row in 0..rows {
        for col in 0..cols {
            let mut sum = 0.0;
            let mut sum_sq = 0.0;
            for dr in -r..=r {
                for dc in -r..=r {
                    let v = clamped(plane, row as isize + dr, col as isize + dc);
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let m = sum / n;
            mean[(row, col)] = m;
            var[(row, col)] = (sum_sq / n - m * m).max(0.0);
        }
    }

    (mean, var)
}

/// Force a window size odd, matching the original handlers' behavior of
/// bumping even sizes up by one.
pub(crate) fn odd_window(size: usize) -> usize {
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_local_moments_constant_plane() {
        let plane = Array2::from_elem((4, 4), 3.0);
        let (mean, var) = local_moments(&plane.view(), 1);
        assert_abs_diff_eq!(mean[(2, 2)], 3.0);
        assert_abs_diff_eq!(var[(2, 2)], 0.0);
    }

    #[test]
    fn test_local_moments_center() {
        let plane = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0]
        ];
        let (mean, var) = local_moments(&plane.view(), 1);
        assert_abs_diff_eq!(mean[(1, 1)], 5.0);
        // population variance of 1..9
        assert_abs_diff_eq!(var[(1, 1)], 60.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_odd_window() {
        assert_eq!(odd_window(3), 3);
        assert_eq!(odd_window(4), 5);
    }
}
