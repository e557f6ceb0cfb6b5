//! Magic wand selection driver.
//!
//! Runs one click of the wand: segment the window, smooth the mask, merge
//! it with the running selection and extract simplified outlines.

use kurbo::Point;

use super::contour::{trace_contours, Contour};
use super::magic_wand::{flood_fill, threshold_mask, ThresholdOptions};
use super::mask::{combine, CombineMode, Mask};
use super::simplify::simplify_contours;
use super::window::PixelWindow;
use crate::error::Result;
use crate::filters::blur::{gaussian_blur, gaussian_blur_border_only};
use crate::filters::morphology::dilate;

/// How candidate pixels are found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillMode {
    /// Contiguous region around the seed.
    #[default]
    Flood,
    /// Every similar pixel of the window.
    Global,
}

/// How the new region combines with the running selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Replace,
    Accumulate,
    Erase,
}

/// Wand parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct WandSettings {
    /// Per-channel color tolerance.
    pub color_threshold: i32,
    pub fill: FillMode,
    pub mode: SelectionMode,
    /// Select the anti-aliased pixels bordering a flood region.
    pub include_border: bool,
    /// Smoothing radius, 0 disables blurring.
    pub blur_radius: usize,
    pub simplify_tolerance: f64,
    /// Contours shorter than this are not simplified.
    pub simplify_min_count: usize,
    /// Grow the eraser region by one pixel before erasing.
    pub dilate_eraser: bool,
}

impl Default for WandSettings {
    fn default() -> Self {
        Self {
            color_threshold: 15,
            fill: FillMode::Flood,
            mode: SelectionMode::Replace,
            include_border: true,
            blur_radius: 5,
            simplify_tolerance: 1.0,
            simplify_min_count: 30,
            dilate_eraser: true,
        }
    }
}

/// Result of one wand click.
#[derive(Clone, Debug)]
pub struct Selection {
    /// Selection mask in window coordinates.
    pub mask: Mask,
    /// Simplified outlines, translated by the caller's origin.
    pub contours: Vec<Contour>,
}

/// Run the wand at a seed pixel.
///
/// # Arguments
/// * `window` - Raster window to segment
/// * `x`, `y` - Seed pixel in window coordinates
/// * `previous` - Running selection for accumulate and erase modes
/// * `origin` - Window origin, added to every contour point
/// * `settings` - Wand parameters
///
/// # Returns
/// `Ok(None)` when the click changes nothing: the seed is already part of
/// the accumulated selection, or there is nothing to erase from.
pub fn select(
    window: &PixelWindow,
    x: usize,
    y: usize,
    previous: Option<&Mask>,
    origin: Point,
    settings: &WandSettings,
) -> Result<Option<Selection>> {
    let mask = match settings.mode {
        SelectionMode::Replace => {
            let Some(region) = segment(window, x, y, None, settings)? else {
                return Ok(None);
            };
            smooth(&region, settings.blur_radius)?
        }
        SelectionMode::Accumulate => {
            let Some(previous) = previous else {
                return select(
                    window,
                    x,
                    y,
                    None,
                    origin,
                    &WandSettings {
                        mode: SelectionMode::Replace,
                        ..settings.clone()
                    },
                );
            };
            let Some(region) = segment(window, x, y, Some(previous), settings)? else {
                log::debug!("seed ({}, {}) already selected", x, y);
                return Ok(None);
            };
            let region = gaussian_blur_border_only(&region, settings.blur_radius, Some(previous))?;
            combine(&region, previous, CombineMode::Union)?
        }
        SelectionMode::Erase => {
            let Some(previous) = previous else {
                log::debug!("nothing to erase");
                return Ok(None);
            };
            let Some(region) = segment(window, x, y, None, settings)? else {
                return Ok(None);
            };
            let mut eraser = smooth(&region, settings.blur_radius)?;
            if settings.dilate_eraser {
                eraser = dilate(&eraser);
            }
            let mut erased = combine(previous, &eraser, CombineMode::Erase)?;
            erased.shrink_bounds();
            erased
        }
    };

    let traced = trace_contours(&mask, origin);
    let contours = simplify_contours(
        &traced,
        settings.simplify_tolerance,
        settings.simplify_min_count,
    );
    log::debug!(
        "{:?} selection: {} px, {} contours",
        settings.mode,
        mask.count(),
        contours.len()
    );

    Ok(Some(Selection { mask, contours }))
}

/// Segment the window. `previous` marks pixels already selected.
fn segment(
    window: &PixelWindow,
    x: usize,
    y: usize,
    previous: Option<&Mask>,
    settings: &WandSettings,
) -> Result<Option<Mask>> {
    let region = match settings.fill {
        FillMode::Flood => flood_fill(
            window,
            x,
            y,
            settings.color_threshold,
            previous,
            settings.include_border,
        )?,
        FillMode::Global => threshold_mask(
            window,
            x,
            y,
            settings.color_threshold,
            &ThresholdOptions {
                append: previous,
                ignore: previous,
            },
        )?,
    };
    if let Some(region) = &region {
        log::debug!("{:?} fill: {} px", settings.fill, region.count());
    }
    Ok(region)
}

fn smooth(mask: &Mask, radius: usize) -> Result<Mask> {
    if radius == 0 {
        return Ok(mask.clone());
    }
    gaussian_blur(mask, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// White RGB image with black rectangles `(x0, y0, x1, y1)`, inclusive.
    fn image(width: usize, height: usize, rects: &[(usize, usize, usize, usize)]) -> Array3<u8> {
        let mut img = Array3::<u8>::from_elem((height, width, 3), 255);
        for &(x0, y0, x1, y1) in rects {
            for y in y0..=y1 {
                for x in x0..=x1 {
                    for c in 0..3 {
                        img[[y, x, c]] = 0;
                    }
                }
            }
        }
        img
    }

    fn sharp(mode: SelectionMode) -> WandSettings {
        WandSettings {
            color_threshold: 10,
            mode,
            include_border: false,
            blur_radius: 0,
            simplify_min_count: 0,
            dilate_eraser: false,
            ..WandSettings::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let s = WandSettings::default();
        assert_eq!(s.color_threshold, 15);
        assert_eq!(s.fill, FillMode::Flood);
        assert_eq!(s.mode, SelectionMode::Replace);
        assert_eq!(s.blur_radius, 5);
        assert_eq!(s.simplify_min_count, 30);
    }

    #[test]
    fn test_replace_black_square() {
        let img = image(10, 10, &[(4, 4, 6, 6)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let sel = select(&window, 5, 5, None, Point::ZERO, &sharp(SelectionMode::Replace))
            .unwrap()
            .unwrap();
        assert_eq!(sel.mask.count(), 9);
        assert_eq!(sel.contours.len(), 1);
        let ring = &sel.contours[0];
        assert!(!ring.inner);
        assert_eq!(
            ring.points,
            vec![
                Point::new(4.0, 4.0),
                Point::new(6.0, 4.0),
                Point::new(6.0, 6.0),
                Point::new(4.0, 6.0),
            ]
        );
        assert_eq!(ring.initial_count, 8);
        assert_eq!(ring.pixel_area(), 9);
    }

    #[test]
    fn test_origin_is_applied() {
        let img = image(10, 10, &[(4, 4, 6, 6)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let sel = select(
            &window,
            5,
            5,
            None,
            Point::new(100.0, 50.0),
            &sharp(SelectionMode::Replace),
        )
        .unwrap()
        .unwrap();
        assert_eq!(sel.contours[0].points[0], Point::new(104.0, 54.0));
    }

    #[test]
    fn test_replace_with_blur_keeps_large_region() {
        let img = image(40, 40, &[(5, 5, 34, 34)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let settings = WandSettings {
            include_border: false,
            ..WandSettings::default()
        };
        let sel = select(&window, 20, 20, None, Point::ZERO, &settings)
            .unwrap()
            .unwrap();
        // Corners get rounded off, the middle stays
        assert!(sel.mask.get(20, 20));
        assert!(!sel.mask.get(5, 5));
        assert!(sel.mask.count() < 900);
        assert!(sel.mask.count() > 800);
        assert_eq!(sel.contours.iter().filter(|c| !c.inner).count(), 1);
    }

    #[test]
    fn test_accumulate_adds_second_region() {
        let img = image(20, 10, &[(1, 1, 4, 4), (10, 2, 15, 6)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let first = select(&window, 2, 2, None, Point::ZERO, &sharp(SelectionMode::Replace))
            .unwrap()
            .unwrap();
        let second = select(
            &window,
            12,
            4,
            Some(&first.mask),
            Point::ZERO,
            &sharp(SelectionMode::Accumulate),
        )
        .unwrap()
        .unwrap();
        assert_eq!(second.mask.count(), 16 + 30);
        assert_eq!(second.contours.len(), 2);
    }

    #[test]
    fn test_accumulate_inside_selection_is_noop() {
        let img = image(10, 10, &[(4, 4, 6, 6)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let first = select(&window, 5, 5, None, Point::ZERO, &sharp(SelectionMode::Replace))
            .unwrap()
            .unwrap();
        let again = select(
            &window,
            4,
            6,
            Some(&first.mask),
            Point::ZERO,
            &sharp(SelectionMode::Accumulate),
        )
        .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_accumulate_without_previous_replaces() {
        let img = image(10, 10, &[(4, 4, 6, 6)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let sel = select(&window, 5, 5, None, Point::ZERO, &sharp(SelectionMode::Accumulate))
            .unwrap()
            .unwrap();
        assert_eq!(sel.mask.count(), 9);
    }

    #[test]
    fn test_erase_cuts_hole() {
        let img = image(12, 12, &[(4, 4, 6, 6)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let previous = Mask::from_data(ndarray::Array2::ones((12, 12)));

        let sel = select(
            &window,
            5,
            5,
            Some(&previous),
            Point::ZERO,
            &sharp(SelectionMode::Erase),
        )
        .unwrap()
        .unwrap();
        assert_eq!(sel.mask.count(), 144 - 9);
        assert_eq!(sel.contours.iter().filter(|c| c.inner).count(), 1);

        let dilated = select(
            &window,
            5,
            5,
            Some(&previous),
            Point::ZERO,
            &WandSettings {
                dilate_eraser: true,
                ..sharp(SelectionMode::Erase)
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(dilated.mask.count(), 144 - 25);
    }

    #[test]
    fn test_erase_without_previous_is_noop() {
        let img = image(10, 10, &[(4, 4, 6, 6)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let sel = select(&window, 5, 5, None, Point::ZERO, &sharp(SelectionMode::Erase)).unwrap();
        assert!(sel.is_none());
    }

    #[test]
    fn test_global_fill_selects_disconnected_regions() {
        let img = image(20, 10, &[(1, 1, 3, 3), (10, 5, 12, 7)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let settings = WandSettings {
            fill: FillMode::Global,
            ..sharp(SelectionMode::Replace)
        };
        let sel = select(&window, 2, 2, None, Point::ZERO, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(sel.mask.count(), 18);
        assert_eq!(sel.contours.len(), 2);
    }

    #[test]
    fn test_global_accumulate_keeps_previous() {
        let img = image(20, 10, &[(1, 1, 3, 3)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let mut prev = ndarray::Array2::<u8>::zeros((10, 20));
        prev[[9, 19]] = 1;
        let previous = Mask::from_data(prev);
        let settings = WandSettings {
            fill: FillMode::Global,
            ..sharp(SelectionMode::Accumulate)
        };
        let sel = select(&window, 2, 2, Some(&previous), Point::ZERO, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(sel.mask.count(), 10);
        assert!(sel.mask.get(19, 9));

        let again = select(&window, 19, 9, Some(&previous), Point::ZERO, &settings).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_global_erase_cuts_every_match() {
        let img = image(20, 10, &[(1, 1, 3, 3), (10, 5, 12, 7)]);
        let window = PixelWindow::new(img.view()).unwrap();
        let previous = Mask::from_data(ndarray::Array2::ones((10, 20)));
        let settings = WandSettings {
            fill: FillMode::Global,
            ..sharp(SelectionMode::Erase)
        };
        let sel = select(&window, 2, 2, Some(&previous), Point::ZERO, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(sel.mask.count(), 200 - 18);
        assert!(!sel.mask.get(11, 6));
        assert_eq!(sel.contours.iter().filter(|c| c.inner).count(), 2);
        assert_eq!(sel.contours.iter().filter(|c| !c.inner).count(), 1);
    }

    #[test]
    fn test_seed_out_of_bounds() {
        let img = image(10, 10, &[]);
        let window = PixelWindow::new(img.view()).unwrap();
        assert!(select(&window, 10, 0, None, Point::ZERO, &WandSettings::default()).is_err());
    }
}
