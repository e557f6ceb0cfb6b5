//! WebAssembly exports for the wand and the offset engine.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! ## Ring Encoding
//!
//! Outlines cross the boundary as flat `f64` arrays:
//! `[num_rings, len1, x1, y1, x2, y2, ..., len2, ...]`. Contour output adds
//! an inner flag before each length: `[num, inner1, len1, x1, y1, ...]`.

use kurbo::Point;
use log::warn;
use ndarray::Array2;
use wasm_bindgen::prelude::*;

use crate::path::FLATTEN_TOLERANCE;
use crate::selection::{simplify_contours, trace_contours};
use crate::{
    offset_stroke_with_outcome, offset_with_outcome, select, Contour, Error, FillMode, Mask,
    OffsetOptions, Path, PathItem, PixelWindow, SelectionMode, StrokeCap, StrokeJoin,
    StrokeOptions, WandSettings,
};

fn to_js(err: Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn binary_mask(data: Vec<u8>, width: usize, height: usize) -> Result<Mask, JsValue> {
    let data = Array2::from_shape_vec((height, width), data).map_err(|e| to_js(e.into()))?;
    Ok(Mask::from_data(data.mapv(|v| u8::from(v != 0))))
}

fn join_from_code(code: u8) -> StrokeJoin {
    match code {
        1 => StrokeJoin::Round,
        2 => StrokeJoin::Bevel,
        _ => StrokeJoin::Miter,
    }
}

/// Decode `[num_rings, len, x, y, ...]` into polylines.
///
/// Counts are untrusted: `None` when they run past the end of `data`.
fn decode_rings(data: &[f64], closed: bool) -> Option<PathItem> {
    let (&count, mut rest) = data.split_first()?;

    let mut paths = Vec::new();
    for _ in 0..count as usize {
        let (&len, tail) = rest.split_first()?;
        let end = (len as usize)
            .checked_mul(2)
            .filter(|&end| end <= tail.len())?;
        let points: Vec<Point> = tail[..end]
            .chunks_exact(2)
            .map(|xy| Point::new(xy[0], xy[1]))
            .collect();
        paths.push(Path::from_points(&points, closed));
        rest = &tail[end..];
    }
    Some(PathItem::from_paths(paths))
}

fn rings_from_js(data: &[f64], closed: bool) -> Result<PathItem, JsValue> {
    decode_rings(data, closed).ok_or_else(|| JsValue::from_str("malformed ring array"))
}

fn encode_item(item: &PathItem) -> Vec<f64> {
    let mut result = vec![item.paths().len() as f64];
    for path in item.paths() {
        let points = path.flatten(FLATTEN_TOLERANCE);
        result.push(points.len() as f64);
        for p in points {
            result.push(p.x);
            result.push(p.y);
        }
    }
    result
}

fn encode_contours(contours: &[Contour]) -> Vec<f64> {
    let mut result = vec![contours.len() as f64];
    for contour in contours {
        result.push(if contour.inner { 1.0 } else { 0.0 });
        result.push(contour.points.len() as f64);
        for p in &contour.points {
            result.push(p.x);
            result.push(p.y);
        }
    }
    result
}

// ============================================================================
// Selection
// ============================================================================

/// Run the wand for one click and return the new selection mask.
///
/// # Arguments
/// * `data` - Flat window pixels (length = width * height * bytes_per_sample)
/// * `previous` - Previous selection mask (length = width * height), if any
/// * `global` - Threshold the whole window instead of flood filling
/// * `mode` - 0 = replace, 1 = accumulate, 2 = erase
///
/// # Returns
/// Flat 0/1 mask, or an empty array when the click changed nothing
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn magic_wand_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    bytes_per_sample: usize,
    x: usize,
    y: usize,
    previous: Option<Vec<u8>>,
    threshold: i32,
    global: bool,
    mode: u8,
    blur_radius: usize,
) -> Result<Vec<u8>, JsValue> {
    let settings = WandSettings {
        color_threshold: threshold,
        fill: if global { FillMode::Global } else { FillMode::Flood },
        mode: match mode {
            1 => SelectionMode::Accumulate,
            2 => SelectionMode::Erase,
            _ => SelectionMode::Replace,
        },
        blur_radius,
        ..WandSettings::default()
    };
    let window = PixelWindow::from_raw(data, width, height, bytes_per_sample).map_err(to_js)?;
    let previous = previous
        .map(|p| binary_mask(p, width, height))
        .transpose()?;

    let selection = select(&window, x, y, previous.as_ref(), Point::ZERO, &settings)
        .map_err(to_js)?;
    Ok(selection
        .map(|s| s.mask.data.into_raw_vec_and_offset().0)
        .unwrap_or_default())
}

/// Trace and simplify the outlines of a mask.
///
/// # Returns
/// Flat array: [num_contours, inner1, len1, x1, y1, ..., inner2, len2, ...]
#[wasm_bindgen]
pub fn mask_contours_wasm(
    mask: Vec<u8>,
    width: usize,
    height: usize,
    origin_x: f64,
    origin_y: f64,
    tolerance: f64,
    min_count: usize,
) -> Result<Vec<f64>, JsValue> {
    let mask = binary_mask(mask, width, height)?;
    let traced = trace_contours(&mask, Point::new(origin_x, origin_y));
    Ok(encode_contours(&simplify_contours(&traced, tolerance, min_count)))
}

// ============================================================================
// Offsetting
// ============================================================================

/// Grow or shrink rings.
///
/// # Arguments
/// * `rings` - Flat ring array
/// * `join` - 0 = miter, 1 = round, 2 = bevel
#[wasm_bindgen]
pub fn offset_path_wasm(
    rings: &[f64],
    distance: f64,
    join: u8,
    limit: f64,
    closed: bool,
) -> Result<Vec<f64>, JsValue> {
    let options = OffsetOptions {
        join: join_from_code(join),
        limit,
    };
    let outcome = offset_with_outcome(&rings_from_js(rings, closed)?, distance, &options);
    if outcome.fell_back {
        warn!("offset by {distance} fell back to an unmodified operand");
    }
    Ok(encode_item(&outcome.item))
}

/// Outline of a stroke along rings.
///
/// # Arguments
/// * `cap` - 0 = butt, 1 = round
#[wasm_bindgen]
pub fn stroke_path_wasm(
    rings: &[f64],
    distance: f64,
    join: u8,
    cap: u8,
    limit: f64,
    closed: bool,
) -> Result<Vec<f64>, JsValue> {
    let options = StrokeOptions {
        join: join_from_code(join),
        cap: if cap == 1 { StrokeCap::Round } else { StrokeCap::Butt },
        limit,
    };
    let outcome = offset_stroke_with_outcome(&rings_from_js(rings, closed)?, distance, &options);
    if outcome.fell_back {
        warn!("stroke of width {} fell back to an unmodified operand", distance.abs() * 2.0);
    }
    Ok(encode_item(&outcome.item))
}
