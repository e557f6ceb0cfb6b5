//! Magic wand segmentation.
//!
//! Grows a binary mask from a seed pixel by color similarity, either
//! spatially (scanline flood fill) or globally (every pixel of the window).

use std::collections::VecDeque;

use ndarray::Array2;
use rayon::prelude::*;

use super::mask::{Bounds, Mask};
use super::window::{color_matches, PixelWindow};
use crate::error::Result;

/// A horizontal span waiting to be scanned.
///
/// Pixels strictly between `left` and `right` are tested. `dir` is the
/// vertical direction the fill was travelling when the span was queued.
#[derive(Clone, Copy, Debug)]
struct Run {
    y: usize,
    left: isize,
    right: isize,
    dir: isize,
}

/// Running bounds of accepted pixels.
struct Extent {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl Extent {
    fn empty(width: usize, height: usize) -> Self {
        Self {
            min_x: width,
            min_y: height,
            max_x: 0,
            max_y: 0,
        }
    }

    #[inline]
    fn add(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn into_bounds(self, seed_x: usize, seed_y: usize) -> Bounds {
        if self.min_x > self.max_x || self.min_y > self.max_y {
            // Nothing accepted: a degenerate box at the seed still holds
            // every (zero) set pixel.
            Bounds::new(seed_x, seed_y, seed_x, seed_y)
        } else {
            Bounds::new(self.min_x, self.min_y, self.max_x, self.max_y)
        }
    }
}

/// Scanline flood fill from a seed pixel.
///
/// A pixel joins the region when each of its R, G, B samples differs from
/// the seed's by at most `color_threshold`. Connectivity is 4-neighbour.
///
/// # Arguments
/// * `window` - Raster window to segment
/// * `x`, `y` - Seed pixel in window coordinates
/// * `color_threshold` - Per-channel tolerance (negative selects nothing)
/// * `visited` - Pixels to treat as already processed (e.g. a prior selection)
/// * `include_border` - Also select the rejected pixels bordering the region
///
/// # Returns
/// `Ok(None)` if the seed is already in `visited`.
pub fn flood_fill(
    window: &PixelWindow,
    x: usize,
    y: usize,
    color_threshold: i32,
    visited: Option<&Mask>,
    include_border: bool,
) -> Result<Option<Mask>> {
    window.check_seed(x, y)?;
    let width = window.width();
    let height = window.height();

    // Scratch buffer owned by this call; the caller's mask is never touched.
    let mut seen: Array2<u8> = match visited {
        Some(mask) => {
            mask.check_dims(width, height)?;
            mask.data.clone()
        }
        None => Array2::zeros((height, width)),
    };
    if seen[[y, x]] != 0 {
        return Ok(None);
    }

    let sample = window.color(x, y);
    let mut result = Array2::<u8>::zeros((height, width));
    let mut extent = Extent::empty(width, height);
    let w = width as isize;

    let mut stack = VecDeque::new();
    stack.push_back(Run {
        y,
        left: x as isize - 1,
        right: x as isize + 1,
        dir: 1,
    });
    // The seed has no parent row, so the pixel directly above it gets its
    // own span.
    if y > 0 {
        stack.push_back(Run {
            y: y - 1,
            left: x as isize - 1,
            right: x as isize + 1,
            dir: -1,
        });
    }

    while let Some(run) = stack.pop_front() {
        let row = run.y;
        let mut cx = run.left + 1;

        while cx < run.right {
            let px = cx as usize;
            if seen[[row, px]] != 0 {
                cx += 1;
                continue;
            }
            seen[[row, px]] = 1;

            if !color_matches(window.color(px, row), sample, color_threshold) {
                if include_border {
                    result[[row, px]] = 1;
                    extent.add(px, row);
                }
                cx += 1;
                continue;
            }
            result[[row, px]] = 1;
            extent.add(px, row);

            // Walk left along the row
            let mut xl = cx - 1;
            while xl > -1 {
                let lx = xl as usize;
                if seen[[row, lx]] != 0 {
                    break;
                }
                seen[[row, lx]] = 1;
                let matched = color_matches(window.color(lx, row), sample, color_threshold);
                if matched || include_border {
                    result[[row, lx]] = 1;
                    extent.add(lx, row);
                }
                if !matched {
                    break;
                }
                xl -= 1;
            }

            // Walk right along the row
            let mut xr = cx + 1;
            while xr < w {
                let rx = xr as usize;
                if seen[[row, rx]] != 0 {
                    break;
                }
                seen[[row, rx]] = 1;
                let matched = color_matches(window.color(rx, row), sample, color_threshold);
                if matched || include_border {
                    result[[row, rx]] = 1;
                    extent.add(rx, row);
                }
                if !matched {
                    break;
                }
                xr += 1;
            }

            // Row behind the travel direction: only the part of the new span
            // reaching beyond the parent span is unscanned.
            let back = row as isize - run.dir;
            if back >= 0 && back < height as isize {
                if xl < run.left {
                    stack.push_back(Run {
                        y: back as usize,
                        left: xl,
                        right: run.left + 1,
                        dir: -run.dir,
                    });
                }
                if run.right < xr {
                    stack.push_back(Run {
                        y: back as usize,
                        left: run.right - 1,
                        right: xr,
                        dir: -run.dir,
                    });
                }
            }

            let ahead = row as isize + run.dir;
            if ahead >= 0 && ahead < height as isize {
                stack.push_back(Run {
                    y: ahead as usize,
                    left: xl,
                    right: xr,
                    dir: run.dir,
                });
            }

            cx = xr;
        }
    }

    Ok(Some(Mask {
        data: result,
        bounds: extent.into_bounds(x, y),
    }))
}

/// Companion masks for [`threshold_mask`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThresholdOptions<'m> {
    /// OR'd into the result.
    pub append: Option<&'m Mask>,
    /// Pixels excluded from the test.
    pub ignore: Option<&'m Mask>,
}

/// Non-contiguous selection: every pixel of the window within the tolerance
/// of the seed color, regardless of adjacency.
///
/// # Returns
/// `Ok(None)` if the seed is in the `ignore` mask. Bounds always cover the
/// whole window.
pub fn threshold_mask(
    window: &PixelWindow,
    x: usize,
    y: usize,
    color_threshold: i32,
    options: &ThresholdOptions,
) -> Result<Option<Mask>> {
    window.check_seed(x, y)?;
    let width = window.width();
    let height = window.height();
    for companion in [options.append, options.ignore].into_iter().flatten() {
        companion.check_dims(width, height)?;
    }

    if let Some(ignore) = options.ignore {
        if ignore.get(x, y) {
            return Ok(None);
        }
    }

    let sample = window.color(x, y);
    let mut flat = vec![0u8; width * height];
    flat.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out)| {
            for (col, value) in out.iter_mut().enumerate() {
                let ignored = options.ignore.is_some_and(|m| m.get(col, row));
                let appended = options.append.is_some_and(|m| m.get(col, row));
                let matched =
                    !ignored && color_matches(window.color(col, row), sample, color_threshold);
                *value = (matched || appended) as u8;
            }
        });

    let data = Array2::from_shape_vec((height, width), flat)?;
    Ok(Some(Mask {
        data,
        bounds: Bounds::full(width, height),
    }))
}
