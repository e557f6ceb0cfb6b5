//! Stroke outlines.
//!
//! Open paths become a ribbon: the offset on each side, stitched at the
//! ends by a cap. Closed paths become a washer: the outward offset with the
//! inward offset cut out of it.

use std::f64::consts::PI;

use geo::MultiPolygon;
use kurbo::{CubicBez, Point};
use log::debug;

use super::boolean::{self, Resolved};
use super::geometry::{arc, is_degenerate, line, polygon_area, polyline_self_intersects};
use super::offset::{offset_chain, offset_with_outcome, OffsetOptions, OffsetOutcome, StrokeJoin};
use super::{Path, PathItem, FLATTEN_TOLERANCE};

/// How the ends of an open stroke are closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeCap {
    /// Straight across the endpoint.
    #[default]
    Butt,
    /// Half circle around the endpoint.
    Round,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeOptions {
    pub join: StrokeJoin,
    pub cap: StrokeCap,
    pub limit: f64,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            join: StrokeJoin::Miter,
            cap: StrokeCap::Butt,
            limit: 10.0,
        }
    }
}

impl StrokeOptions {
    fn offset_options(&self) -> OffsetOptions {
        OffsetOptions {
            join: self.join,
            limit: self.limit,
        }
    }
}

/// Outline of a stroke reaching `distance` to either side of the path.
pub fn offset_stroke(item: &PathItem, distance: f64, options: &StrokeOptions) -> PathItem {
    offset_stroke_with_outcome(item, distance, options).item
}

/// [`offset_stroke`], also reporting whether a boolean step fell back.
pub fn offset_stroke_with_outcome(
    item: &PathItem,
    distance: f64,
    options: &StrokeOptions,
) -> OffsetOutcome {
    let half = distance.abs();
    if half == 0.0 || item.is_empty() {
        return OffsetOutcome {
            item: PathItem::default(),
            fell_back: false,
        };
    }

    let mut fell_back = false;
    let mut curved: Vec<Path> = Vec::new();
    let mut shapes: Vec<MultiPolygon<f64>> = Vec::new();

    for path in item.paths().iter().filter(|path| !path.is_empty()) {
        if path.closed {
            let resolved = washer(path, half, options);
            fell_back |= resolved.fell_back;
            shapes.push(resolved.shape);
            continue;
        }
        match ribbon(path, half, options) {
            Some(Ribbon::Curved(outline)) => curved.push(outline),
            Some(Ribbon::Loops(resolved)) => {
                fell_back |= resolved.fell_back;
                shapes.push(resolved.shape);
            }
            None => {}
        }
    }

    if shapes.is_empty() && curved.len() == 1 {
        return OffsetOutcome {
            item: PathItem::from_paths(curved),
            fell_back,
        };
    }

    let pieces = curved
        .iter()
        .map(|outline| boolean::polygon(&outline.flatten(FLATTEN_TOLERANCE)))
        .chain(shapes);
    let merged = boolean::union_all(pieces);
    let out = boolean::multi_polygon_to_item(&merged.shape);
    debug!(
        "Stroke of width {}: {} path(s) in, {} path(s) out",
        half * 2.0,
        item.paths().len(),
        out.paths().len()
    );
    OffsetOutcome {
        item: out,
        fell_back: fell_back || merged.fell_back,
    }
}

/// Closed path stroked as the band between its outward and inward offsets.
fn washer(path: &Path, half: f64, options: &StrokeOptions) -> Resolved {
    let source = PathItem::Simple(path.clone());
    let offset_options = options.offset_options();
    let outer = offset_with_outcome(&source, half, &offset_options);
    let inner = offset_with_outcome(&source, -half, &offset_options);

    let outer_shape = boolean::item_to_multi_polygon(&outer.item);
    let inner_shape = boolean::item_to_multi_polygon(&inner.item);
    let band = boolean::difference(&outer_shape.shape, &inner_shape.shape);
    Resolved {
        shape: band.shape,
        fell_back: outer.fell_back
            || inner.fell_back
            || outer_shape.fell_back
            || inner_shape.fell_back
            || band.fell_back,
    }
}

enum Ribbon {
    /// Simple outline that keeps its curves.
    Curved(Path),
    Loops(Resolved),
}

fn reverse(c: &CubicBez) -> CubicBez {
    CubicBez::new(c.p3, c.p2, c.p1, c.p0)
}

fn cap(style: StrokeCap, center: Point, from: Point, to: Point, half: f64) -> Vec<CubicBez> {
    match style {
        StrokeCap::Butt => vec![line(from, to)],
        StrokeCap::Round => {
            let mut pieces = arc(center, from, PI, half);
            if let Some(first) = pieces.first_mut() {
                first.p1 += from - first.p0;
                first.p0 = from;
            }
            if let Some(last) = pieces.last_mut() {
                last.p2 += to - last.p3;
                last.p3 = to;
            }
            pieces
        }
    }
}

/// Open path stroked as one closed outline around it.
fn ribbon(path: &Path, half: f64, options: &StrokeOptions) -> Option<Ribbon> {
    let curves = path.curves();
    let sources: Vec<&CubicBez> = curves.iter().filter(|c| !is_degenerate(c)).collect();
    let start = sources.first()?.p0;
    let end = sources.last()?.p3;

    let offset_options = options.offset_options();
    let left = offset_chain(&curves, half, &offset_options, false);
    let right = offset_chain(&curves, -half, &offset_options, false);
    let left_start = left.first()?.p0;
    let left_end = left.last()?.p3;
    let right_start = right.first()?.p0;
    let right_end = right.last()?.p3;

    let mut outline = left;
    outline.extend(cap(options.cap, end, left_end, right_end, half));
    outline.extend(right.iter().rev().map(reverse));
    outline.extend(cap(options.cap, start, right_start, left_start, half));

    let path = Path::from_curves(&outline, true);
    let flat = path.flatten(FLATTEN_TOLERANCE);
    if !polyline_self_intersects(&flat, true) && polygon_area(&flat) > 0.0 {
        return Some(Ribbon::Curved(path));
    }

    let loops = boolean::resolve_loops(&flat, 1.0, None);
    Some(Ribbon::Loops(boolean::union_all(
        loops.iter().map(|ring| boolean::polygon(ring)),
    )))
}
