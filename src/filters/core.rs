//! Core utilities shared by the mask filters.
//!
//! This module provides:
//! - Gaussian kernel generation from a pixel radius
//! - Clipped kernel sums along a row, shared by every blur variant so
//!   they agree bit for bit

use ndarray::ArrayView2;

/// Generate a normalized 1D Gaussian kernel of size `2 * radius + 1`.
///
/// Weight `i` is `exp(-(radius - i)² / 2σ²)` with `σ = radius`.
///
/// # Arguments
/// * `radius` - Half-width of the kernel in pixels
///
/// # Returns
/// Normalized kernel summing to 1
pub fn gaussian_kernel(radius: usize) -> Vec<f64> {
    if radius == 0 {
        return vec![1.0];
    }

    let sigma = radius as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = radius as f64 - i as f64;
            (-d * d / two_sigma_sq).exp()
        })
        .collect();

    let sum: f64 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Kernel index range `[start, end)` in offset space for position `pos`
/// on an axis of length `len`, clipped at the edges.
#[inline]
pub(crate) fn clipped_span(pos: usize, radius: usize, len: usize) -> (isize, isize) {
    let r = radius as isize;
    let p = pos as isize;
    let start = if p - r > 0 { -r } else { -p };
    let end = if p + r < len as isize { r + 1 } else { len as isize - p };
    (start, end)
}

/// Weighted horizontal sum of a binary mask row around `(x, y)`.
#[inline]
pub(crate) fn row_sum(data: ArrayView2<u8>, kernel: &[f64], x: usize, y: usize) -> f64 {
    let radius = kernel.len() / 2;
    let (start, end) = clipped_span(x, radius, data.dim().1);
    let mut val = 0.0;
    for i in start..end {
        let sx = (x as isize + i) as usize;
        val += data[[y, sx]] as f64 * kernel[(i + radius as isize) as usize];
    }
    val
}

/// Weighted vertical sum at row `y` of a column given by `value(row)`.
#[inline]
pub(crate) fn column_sum(
    kernel: &[f64],
    y: usize,
    height: usize,
    mut value: impl FnMut(usize) -> f64,
) -> f64 {
    let radius = kernel.len() / 2;
    let (start, end) = clipped_span(y, radius, height);
    let mut val = 0.0;
    for i in start..end {
        let sy = (y as isize + i) as usize;
        val += value(sy) * kernel[(i + radius as isize) as usize];
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        for radius in 1..6 {
            let k = gaussian_kernel(radius);
            assert_eq!(k.len(), 2 * radius + 1);
            let sum: f64 = k.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
            for i in 0..k.len() {
                assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-15);
            }
            // Peak in the middle
            assert!(k[radius] > k[0]);
        }
    }

    #[test]
    fn test_zero_radius_is_identity() {
        assert_eq!(gaussian_kernel(0), vec![1.0]);
    }

    #[test]
    fn test_clipped_span() {
        assert_eq!(clipped_span(0, 2, 10), (0, 3));
        assert_eq!(clipped_span(5, 2, 10), (-2, 3));
        assert_eq!(clipped_span(9, 2, 10), (-2, 1));
    }

    #[test]
    fn test_row_sum_full_row() {
        let data = Array2::<u8>::ones((1, 9));
        let k = gaussian_kernel(2);
        assert!((row_sum(data.view(), &k, 4, 0) - 1.0).abs() < 1e-12);
        // Clipped at the left edge: only the center and right half remain
        let edge = row_sum(data.view(), &k, 0, 0);
        assert!(edge < 1.0 && edge > 0.5);
    }
}
