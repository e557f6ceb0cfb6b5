//! Gaussian smoothing of binary masks.
//!
//! Blurs a mask with a separable Gaussian and re-binarizes at 0.5, which
//! rounds off jagged selection edges and closes pinholes. Only the mask's
//! bounds are processed; everything outside is taken as 0.

use ndarray::Array2;
use rayon::prelude::*;

use super::core::{column_sum, gaussian_kernel, row_sum};
use crate::error::Result;
use crate::selection::mask::{Bounds, Mask};

/// Blur-then-threshold over the whole bounds.
///
/// Uses separable 2-pass convolution, rows first, then columns.
/// Both passes run row-parallel.
///
/// # Arguments
/// * `mask` - Binary mask to smooth
/// * `radius` - Kernel half-width in pixels (0 returns a copy)
///
/// # Returns
/// New mask with the same size and bounds
pub fn gaussian_blur(mask: &Mask, radius: usize) -> Result<Mask> {
    if radius == 0 || mask.data.is_empty() {
        return Ok(mask.clone());
    }
    let (width, height) = mask.size();
    let bounds = mask.bounds;
    let kernel = gaussian_kernel(radius);
    let data = mask.data.view();

    // Horizontal pass
    let mut temp = vec![0.0f64; width * height];
    temp.par_chunks_mut(width)
        .enumerate()
        .filter(|(y, _)| *y >= bounds.min_y && *y <= bounds.max_y)
        .for_each(|(y, row)| {
            for x in bounds.min_x..=bounds.max_x {
                row[x] = row_sum(data, &kernel, x, y);
            }
        });

    // Vertical pass
    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width)
        .enumerate()
        .filter(|(y, _)| *y >= bounds.min_y && *y <= bounds.max_y)
        .for_each(|(y, row)| {
            for x in bounds.min_x..=bounds.max_x {
                let val = column_sum(&kernel, y, height, |sy| temp[sy * width + x]);
                row[x] = (val > 0.5) as u8;
            }
        });

    Ok(Mask {
        data: Array2::from_shape_vec((height, width), out)?,
        bounds,
    })
}

/// Blur-then-threshold restricted to the region border.
///
/// Pixels farther than `radius` from the border of the selection cannot
/// change under [`gaussian_blur`], so only the neighbourhoods of border
/// pixels are recomputed and everything else is copied. Without `visited`
/// the result is identical to [`gaussian_blur`].
///
/// # Arguments
/// * `mask` - Binary mask to smooth
/// * `radius` - Kernel half-width in pixels
/// * `visited` - Pixels that are copied unchanged even near the border
pub fn gaussian_blur_border_only(
    mask: &Mask,
    radius: usize,
    visited: Option<&Mask>,
) -> Result<Mask> {
    if let Some(v) = visited {
        mask.check_size(v)?;
    }
    if radius == 0 || mask.data.is_empty() {
        return Ok(mask.clone());
    }

    let (width, height) = mask.size();
    let bounds = mask.bounds;
    let kernel = gaussian_kernel(radius);
    let data = mask.data.view();

    // Lazily filled horizontal pass, NaN = not computed yet
    let mut row_cache = vec![f64::NAN; width * height];
    let mut scheduled = vec![false; width * height];
    let mut out = mask.data.clone();

    let r = radius as isize;
    for (bx, by) in border_pixels(mask) {
        for dy in -r..=r {
            let sy = by as isize + dy;
            if sy < 0 || sy >= height as isize {
                continue;
            }
            for dx in -r..=r {
                let sx = bx as isize + dx;
                if sx < 0 || sx >= width as isize {
                    continue;
                }
                let (x, y) = (sx as usize, sy as usize);
                let idx = y * width + x;
                if scheduled[idx] {
                    continue;
                }
                scheduled[idx] = true;
                if !bounds.contains(x, y) || visited.is_some_and(|v| v.get(x, y)) {
                    continue;
                }

                let val = column_sum(&kernel, y, height, |row| {
                    horizontal(&mut row_cache, data, &kernel, &bounds, width, x, row)
                });
                out[[y, x]] = (val > 0.5) as u8;
            }
        }
    }

    Ok(Mask { data: out, bounds })
}

/// Horizontal pass value at `(x, y)`, 0 outside the bounds.
fn horizontal(
    cache: &mut [f64],
    data: ndarray::ArrayView2<u8>,
    kernel: &[f64],
    bounds: &Bounds,
    width: usize,
    x: usize,
    y: usize,
) -> f64 {
    if !bounds.contains(x, y) {
        return 0.0;
    }
    let slot = &mut cache[y * width + x];
    if slot.is_nan() {
        *slot = row_sum(data, kernel, x, y);
    }
    *slot
}

/// Set pixels with an unset 8-neighbour, or lying on the image edge.
pub fn border_pixels(mask: &Mask) -> Vec<(usize, usize)> {
    let (width, height) = mask.size();
    let b = mask.bounds;
    let mut border = Vec::new();
    if width == 0 || height == 0 {
        return border;
    }

    for y in b.min_y..=b.max_y.min(height.saturating_sub(1)) {
        for x in b.min_x..=b.max_x.min(width.saturating_sub(1)) {
            if !mask.get(x, y) {
                continue;
            }
            if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                border.push((x, y));
                continue;
            }
            let open = (y - 1..=y + 1)
                .any(|ny| (x - 1..=x + 1).any(|nx| !mask.get(nx, ny)));
            if open {
                border.push((x, y));
            }
        }
    }

    border
}
