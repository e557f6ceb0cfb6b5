//! Wandpath
//!
//! Magic wand selection and vector path offsetting, with Python bindings via
//! PyO3 and WASM bindings for JavaScript.
//!
//! ## Selection
//! A click on a [`PixelWindow`] is grown into a binary [`Mask`] by flood
//! fill or global color thresholding, smoothed with a Gaussian blur, traced
//! into outer and inner [`Contour`]s and simplified. See [`select`].
//!
//! ## Offsetting
//! [`offset`] grows or shrinks a closed [`PathItem`]; [`offset_stroke`]
//! builds the outline of a stroke along any path. Both work on cubic
//! Bézier paths and never fail: unstable boolean steps fall back to their
//! input, reported through [`OffsetOutcome`].
//!
//! ## Coordinates
//! Pixel and path coordinates are y-down. Closed paths with positive
//! signed area run clockwise on screen.

pub mod error;
pub mod filters;
pub mod path;
pub mod selection;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Error, Result};
pub use path::offset::{offset, offset_with_outcome, OffsetOptions, OffsetOutcome, StrokeJoin};
pub use path::stroke::{offset_stroke, offset_stroke_with_outcome, StrokeCap, StrokeOptions};
pub use path::{CompoundPath, Path, PathItem, Segment};
pub use selection::{
    select, Bounds, Contour, FillMode, Mask, PixelWindow, Selection, SelectionMode, WandSettings,
};

pub use kurbo;

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use kurbo::Point;
    use log::warn;
    use ndarray::ArrayView2;
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::path::FLATTEN_TOLERANCE;
    use crate::selection::{flood_fill, simplify_contours, trace_contours};
    use crate::{
        offset_stroke_with_outcome, offset_with_outcome, select, Contour, FillMode, Mask,
        OffsetOptions, Path, PathItem, PixelWindow, SelectionMode, StrokeCap, StrokeJoin,
        StrokeOptions, WandSettings,
    };

    type Ring = Vec<(f64, f64)>;

    fn parse_fill(name: &str) -> PyResult<FillMode> {
        match name {
            "flood" => Ok(FillMode::Flood),
            "global" => Ok(FillMode::Global),
            other => Err(PyValueError::new_err(format!("unknown fill mode '{other}'"))),
        }
    }

    fn parse_mode(name: &str) -> PyResult<SelectionMode> {
        match name {
            "replace" => Ok(SelectionMode::Replace),
            "accumulate" => Ok(SelectionMode::Accumulate),
            "erase" => Ok(SelectionMode::Erase),
            other => Err(PyValueError::new_err(format!("unknown selection mode '{other}'"))),
        }
    }

    fn parse_join(name: &str) -> PyResult<StrokeJoin> {
        match name {
            "miter" => Ok(StrokeJoin::Miter),
            "round" => Ok(StrokeJoin::Round),
            "bevel" => Ok(StrokeJoin::Bevel),
            other => Err(PyValueError::new_err(format!("unknown join '{other}'"))),
        }
    }

    fn parse_cap(name: &str) -> PyResult<StrokeCap> {
        match name {
            "butt" => Ok(StrokeCap::Butt),
            "round" => Ok(StrokeCap::Round),
            other => Err(PyValueError::new_err(format!("unknown cap '{other}'"))),
        }
    }

    /// Host masks may use any nonzero value for set pixels.
    fn binary_mask(data: ArrayView2<'_, u8>) -> Mask {
        Mask::from_data(data.mapv(|v| u8::from(v != 0)))
    }

    fn contour_rings(contours: &[Contour]) -> Vec<(bool, Ring)> {
        contours
            .iter()
            .map(|c| (c.inner, c.points.iter().map(|p| (p.x, p.y)).collect()))
            .collect()
    }

    fn item_from_rings(rings: &[Ring], closed: bool) -> PathItem {
        PathItem::from_paths(
            rings
                .iter()
                .map(|ring| {
                    let points: Vec<Point> = ring.iter().map(|&(x, y)| Point::new(x, y)).collect();
                    Path::from_points(&points, closed)
                })
                .collect(),
        )
    }

    fn item_to_rings(item: &PathItem) -> Vec<Ring> {
        item.paths()
            .iter()
            .map(|path| {
                path.flatten(FLATTEN_TOLERANCE)
                    .into_iter()
                    .map(|p| (p.x, p.y))
                    .collect()
            })
            .collect()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Flood fill from a seed pixel.
    ///
    /// # Arguments
    /// * `image` - Window pixels (H, W, C), 1 to 4 channels
    /// * `x`, `y` - Seed pixel
    /// * `threshold` - Maximum per-channel color distance
    /// * `include_border` - Also take the first non-matching pixel of each run
    ///
    /// # Returns
    /// (H, W) mask of 0/1, or None when nothing was filled
    #[pyfunction]
    #[pyo3(signature = (image, x, y, threshold=15, include_border=true))]
    pub fn magic_wand_fill<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        x: usize,
        y: usize,
        threshold: i32,
        include_border: bool,
    ) -> PyResult<Option<Bound<'py, PyArray2<u8>>>> {
        let window = PixelWindow::new(image.as_array())?;
        let mask = flood_fill(&window, x, y, threshold, None, include_border)?;
        Ok(mask.map(|m| m.data.into_pyarray(py)))
    }

    /// Run the full wand pipeline for one click.
    ///
    /// # Returns
    /// (mask, [(inner, [(x, y), ...]), ...]) or None when the click changed
    /// nothing
    #[pyfunction]
    #[pyo3(signature = (
        image, x, y, previous=None, origin_x=0.0, origin_y=0.0, threshold=15,
        fill="flood", mode="replace", include_border=true, blur_radius=5,
        tolerance=1.0, min_count=30, dilate_eraser=true
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn magic_wand_select<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        x: usize,
        y: usize,
        previous: Option<PyReadonlyArray2<'py, u8>>,
        origin_x: f64,
        origin_y: f64,
        threshold: i32,
        fill: &str,
        mode: &str,
        include_border: bool,
        blur_radius: usize,
        tolerance: f64,
        min_count: usize,
        dilate_eraser: bool,
    ) -> PyResult<Option<(Bound<'py, PyArray2<u8>>, Vec<(bool, Ring)>)>> {
        let settings = WandSettings {
            color_threshold: threshold,
            fill: parse_fill(fill)?,
            mode: parse_mode(mode)?,
            include_border,
            blur_radius,
            simplify_tolerance: tolerance,
            simplify_min_count: min_count,
            dilate_eraser,
        };
        let window = PixelWindow::new(image.as_array())?;
        let previous = previous.map(|p| binary_mask(p.as_array()));
        let origin = Point::new(origin_x, origin_y);

        let selection = select(&window, x, y, previous.as_ref(), origin, &settings)?;
        Ok(selection.map(|s| {
            let rings = contour_rings(&s.contours);
            (s.mask.data.into_pyarray(py), rings)
        }))
    }

    /// Trace and simplify the outlines of a mask.
    #[pyfunction]
    #[pyo3(signature = (mask, origin_x=0.0, origin_y=0.0, tolerance=1.0, min_count=30))]
    pub fn mask_contours(
        mask: PyReadonlyArray2<'_, u8>,
        origin_x: f64,
        origin_y: f64,
        tolerance: f64,
        min_count: usize,
    ) -> Vec<(bool, Ring)> {
        let mask = binary_mask(mask.as_array());
        let traced = trace_contours(&mask, Point::new(origin_x, origin_y));
        contour_rings(&simplify_contours(&traced, tolerance, min_count))
    }

    // ========================================================================
    // Offsetting
    // ========================================================================

    /// Grow (positive distance) or shrink polygon rings.
    ///
    /// Holes are recognised by nesting. Returns the flattened result rings.
    #[pyfunction]
    #[pyo3(signature = (rings, distance, join="miter", limit=10.0, closed=true))]
    pub fn offset_path(
        rings: Vec<Ring>,
        distance: f64,
        join: &str,
        limit: f64,
        closed: bool,
    ) -> PyResult<Vec<Ring>> {
        let options = OffsetOptions {
            join: parse_join(join)?,
            limit,
        };
        let outcome = offset_with_outcome(&item_from_rings(&rings, closed), distance, &options);
        if outcome.fell_back {
            warn!("offset by {distance} fell back to an unmodified operand");
        }
        Ok(item_to_rings(&outcome.item))
    }

    /// Outline of a stroke along polylines.
    #[pyfunction]
    #[pyo3(signature = (rings, distance, join="miter", cap="butt", limit=10.0, closed=false))]
    pub fn stroke_path(
        rings: Vec<Ring>,
        distance: f64,
        join: &str,
        cap: &str,
        limit: f64,
        closed: bool,
    ) -> PyResult<Vec<Ring>> {
        let options = StrokeOptions {
            join: parse_join(join)?,
            cap: parse_cap(cap)?,
            limit,
        };
        let outcome =
            offset_stroke_with_outcome(&item_from_rings(&rings, closed), distance, &options);
        if outcome.fell_back {
            warn!("stroke of width {} fell back to an unmodified operand", distance.abs() * 2.0);
        }
        Ok(item_to_rings(&outcome.item))
    }

    // ========================================================================
    // Module Registration
    // ========================================================================

    #[pymodule]
    pub fn wandpath(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Selection
        m.add_function(wrap_pyfunction!(magic_wand_fill, m)?)?;
        m.add_function(wrap_pyfunction!(magic_wand_select, m)?)?;
        m.add_function(wrap_pyfunction!(mask_contours, m)?)?;

        // Offsetting
        m.add_function(wrap_pyfunction!(offset_path, m)?)?;
        m.add_function(wrap_pyfunction!(stroke_path, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::wandpath;
