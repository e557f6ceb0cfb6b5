//! Morphology on binary masks: single-step dilation.

use ndarray::Array2;

use crate::selection::mask::{Bounds, Mask};

// ============================================================================
// Dilate
// ============================================================================

/// Grow a mask by one pixel in all 8 directions.
///
/// A cell becomes set if it or any of its (edge-clipped) 3x3 neighbours is
/// set. One pass only; call repeatedly for thicker growth.
///
/// # Arguments
/// * `mask` - Binary mask to grow
///
/// # Returns
/// New mask, bounds widened by one pixel and clamped to the grid
pub fn dilate(mask: &Mask) -> Mask {
    let (width, height) = mask.size();
    let mut output = Array2::<u8>::zeros((height, width));
    if width == 0 || height == 0 {
        return Mask {
            data: output,
            bounds: mask.bounds,
        };
    }

    let b = mask.bounds;
    let bounds = Bounds::new(
        b.min_x.saturating_sub(1),
        b.min_y.saturating_sub(1),
        (b.max_x + 1).min(width - 1),
        (b.max_y + 1).min(height - 1),
    );

    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            let y0 = y.saturating_sub(1);
            let y1 = (y + 1).min(height - 1);
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(width - 1);

            let hit = (y0..=y1).any(|sy| (x0..=x1).any(|sx| mask.data[[sy, sx]] != 0));
            if hit {
                output[[y, x]] = 1;
            }
        }
    }

    Mask {
        data: output,
        bounds,
    }
}
