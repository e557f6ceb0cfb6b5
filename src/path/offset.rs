//! Path offsetting.
//!
//! Every curve is offset with the Tiller-Hanson construction and refined
//! by halving wherever the midpoint strays from the true offset. Offset
//! curves are stitched together with a join, the resulting ring is cut
//! into simple loops, and loops that do not belong to the offset shape are
//! discarded. Compound paths are offset ring by ring and recombined by
//! nesting level.

use kurbo::{CubicBez, ParamCurve, Point, Vec2};
use log::{debug, trace};

use super::boolean::{self, keep_loop, resolve_loops};
use super::geometry::{
    arc, cubic_self_intersects, curve_intersection, is_degenerate, is_line, line,
    line_intersection, normal_at, polyline_self_intersects, segment_intersection, tangent_at,
    turn_angle, EPSILON,
};
use super::{Path, PathItem, FLATTEN_TOLERANCE};

/// Halvings allowed per source curve.
pub const MAX_SUBDIVISION_DEPTH: u32 = 8;
/// Offset ends closer than this fraction of the distance are merged.
pub const MERGE_FRACTION: f64 = 0.1;

/// How offset curves meet at a corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeJoin {
    /// Extend both sides to a point, bevelled past the limit.
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OffsetOptions {
    pub join: StrokeJoin,
    /// Longest miter, as a multiple of the offset distance.
    pub limit: f64,
}

impl Default for OffsetOptions {
    fn default() -> Self {
        Self {
            join: StrokeJoin::Miter,
            limit: 10.0,
        }
    }
}

/// Offset result with a flag for boolean fallbacks.
#[derive(Clone, Debug)]
pub struct OffsetOutcome {
    pub item: PathItem,
    /// True when a boolean step ran out of retries and kept its input.
    pub fell_back: bool,
}

impl OffsetOutcome {
    fn unchanged(item: &PathItem) -> Self {
        Self {
            item: item.clone(),
            fell_back: false,
        }
    }
}

/// Grow (positive `distance`) or shrink a shape.
///
/// Open paths return the offset polyline on the normal side.
pub fn offset(item: &PathItem, distance: f64, options: &OffsetOptions) -> PathItem {
    offset_with_outcome(item, distance, options).item
}

/// [`offset`], also reporting whether a boolean step fell back.
///
/// Closed children are offset together as one shape; open children are
/// offset chain by chain and appended after it.
pub fn offset_with_outcome(item: &PathItem, distance: f64, options: &OffsetOptions) -> OffsetOutcome {
    if distance == 0.0 || item.is_empty() {
        return OffsetOutcome::unchanged(item);
    }
    let (closed, open): (Vec<&Path>, Vec<&Path>) =
        item.paths().iter().partition(|path| path.closed);
    if open.is_empty() {
        return offset_closed(item, distance, options);
    }

    let chains = open.iter().map(|path| {
        let curves = offset_chain(&path.curves(), distance, options, false);
        Path::from_curves(&curves, false)
    });
    if closed.is_empty() {
        return OffsetOutcome {
            item: PathItem::from_paths(chains.collect()),
            fell_back: false,
        };
    }

    let shape = PathItem::from_paths(closed.into_iter().cloned().collect());
    let outcome = offset_closed(&shape, distance, options);
    let mut paths = outcome.item.paths().to_vec();
    paths.extend(chains);
    OffsetOutcome {
        item: PathItem::from_paths(paths),
        fell_back: outcome.fell_back,
    }
}

fn snap_start(c: &mut CubicBez, p: Point) {
    let delta = p - c.p0;
    c.p0 = p;
    c.p1 += delta;
}

fn snap_end(c: &mut CubicBez, p: Point) {
    let delta = p - c.p3;
    c.p3 = p;
    c.p2 += delta;
}

/// Tiller-Hanson offset of one curve, appended to `out`.
fn offset_curve(c: &CubicBez, distance: f64, depth: u32, out: &mut Vec<CubicBez>) {
    let q0 = c.p0 + normal_at(c, 0.0) * distance;
    let q3 = c.p3 + normal_at(c, 1.0) * distance;
    if is_line(c) {
        out.push(line(q0, q3));
        return;
    }

    let chord = (c.p3 - c.p0).hypot();
    let scale = if chord > EPSILON {
        (q3 - q0).hypot() / chord
    } else {
        1.0
    };
    let candidate = CubicBez::new(q0, q0 + (c.p1 - c.p0) * scale, q3 + (c.p2 - c.p3) * scale, q3);

    let ideal = c.eval(0.5) + normal_at(c, 0.5) * distance;
    let deviation = (candidate.eval(0.5) - ideal).hypot();
    let tolerance = (distance.abs() / 10.0).min(1.0);

    if deviation > tolerance && !cubic_self_intersects(&candidate) {
        if depth < MAX_SUBDIVISION_DEPTH {
            let (left, right) = c.subdivide();
            offset_curve(&left, distance, depth + 1, out);
            offset_curve(&right, distance, depth + 1, out);
            return;
        }
        trace!("Offset subdivision capped, deviation {deviation:.3}");
    }
    out.push(candidate);
}

/// Trim applied to one offset curve once all joins are known.
#[derive(Clone, Copy, Debug)]
struct Trim {
    start: f64,
    end: f64,
    start_point: Option<Point>,
    end_point: Option<Point>,
}

impl Default for Trim {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
            start_point: None,
            end_point: None,
        }
    }
}

impl Trim {
    fn apply(&self, c: &CubicBez) -> CubicBez {
        if is_line(c) {
            return line(
                self.start_point.unwrap_or(c.p0),
                self.end_point.unwrap_or(c.p3),
            );
        }
        let mut out = if self.start == 0.0 && self.end == 1.0 {
            *c
        } else {
            c.subsegment(self.start..self.end)
        };
        if let Some(p) = self.start_point {
            snap_start(&mut out, p);
        }
        if let Some(p) = self.end_point {
            snap_end(&mut out, p);
        }
        out
    }
}

/// How the end of one offset curve meets the start of the next.
struct Joint {
    /// New end parameter and point for the first curve.
    end: Option<(f64, Point)>,
    /// New start parameter and point for the second curve.
    start: Option<(f64, Point)>,
    connector: Vec<CubicBez>,
}

fn join(
    a: &CubicBez,
    b: &CubicBez,
    vertex: Point,
    tangents: (Vec2, Vec2),
    distance: f64,
    options: &OffsetOptions,
) -> Joint {
    let gap = (b.p0 - a.p3).hypot();
    if gap <= MERGE_FRACTION * distance.abs() {
        let mid = a.p3.midpoint(b.p0);
        return Joint {
            end: Some((1.0, mid)),
            start: Some((0.0, mid)),
            connector: Vec::new(),
        };
    }

    let crossing = if is_line(a) && is_line(b) {
        segment_intersection(a.p0, a.p3, b.p0, b.p3).map(|(s, u)| (s, u, a.p0.lerp(a.p3, s)))
    } else {
        curve_intersection(a, b).map(|(ta, tb)| (ta, tb, a.eval(ta)))
    };
    if let Some((ta, tb, x)) = crossing {
        return Joint {
            end: Some((ta, x)),
            start: Some((tb, x)),
            connector: Vec::new(),
        };
    }

    let (tangent_in, tangent_out) = tangents;
    let angle = turn_angle(tangent_in, tangent_out);
    let connector = if angle * distance < 0.0 {
        // Inner side of the corner, the ends only need closing
        vec![line(a.p3, b.p0)]
    } else {
        match options.join {
            StrokeJoin::Miter => match line_intersection(a.p3, tangent_in, b.p0, tangent_out) {
                Some(m) if (m - vertex).hypot() <= options.limit * distance.abs() => {
                    vec![line(a.p3, m), line(m, b.p0)]
                }
                _ => vec![line(a.p3, b.p0)],
            },
            StrokeJoin::Round => {
                let mut pieces = arc(vertex, a.p3, angle, distance.abs());
                if let Some(first) = pieces.first_mut() {
                    snap_start(first, a.p3);
                }
                if let Some(last) = pieces.last_mut() {
                    snap_end(last, b.p0);
                }
                pieces
            }
            StrokeJoin::Bevel => vec![line(a.p3, b.p0)],
        }
    };
    Joint {
        end: None,
        start: None,
        connector,
    }
}

/// Offset a chain of curves and join the pieces. Closed chains are also
/// joined from the last curve back to the first.
pub(crate) fn offset_chain(
    curves: &[CubicBez],
    distance: f64,
    options: &OffsetOptions,
    closed: bool,
) -> Vec<CubicBez> {
    let sources: Vec<&CubicBez> = curves.iter().filter(|c| !is_degenerate(c)).collect();
    let n = sources.len();
    if n == 0 {
        return Vec::new();
    }

    let mut groups: Vec<Vec<CubicBez>> = sources
        .iter()
        .map(|c| {
            let mut pieces = Vec::new();
            offset_curve(c, distance, 0, &mut pieces);
            for k in 1..pieces.len() {
                let p = pieces[k - 1].p3;
                snap_start(&mut pieces[k], p);
            }
            pieces
        })
        .collect();

    let mut trims: Vec<Vec<Trim>> = groups.iter().map(|g| vec![Trim::default(); g.len()]).collect();
    let mut connectors: Vec<Vec<CubicBez>> = vec![Vec::new(); n];

    let joins = if closed { n } else { n - 1 };
    for i in 0..joins {
        let j = (i + 1) % n;
        let last = groups[i].len() - 1;
        let a = groups[i][last];
        let b = groups[j][0];
        let tangents = (tangent_at(sources[i], 1.0), tangent_at(sources[j], 0.0));

        let joint = join(&a, &b, sources[j].p0, tangents, distance, options);
        if let Some((t, p)) = joint.end {
            trims[i][last].end = t;
            trims[i][last].end_point = Some(p);
        }
        if let Some((t, p)) = joint.start {
            trims[j][0].start = t;
            trims[j][0].start_point = Some(p);
        }
        connectors[i] = joint.connector;
    }

    for (group, group_trims) in groups.iter_mut().zip(&trims) {
        for (c, trim) in group.iter_mut().zip(group_trims) {
            *c = trim.apply(c);
        }
    }

    let mut out = Vec::new();
    for (group, connector) in groups.into_iter().zip(connectors) {
        out.extend(group);
        out.extend(connector);
    }
    out
}

/// Offset of one closed ring, before recombination.
enum RingOffset {
    Curved(Path),
    Loops(Vec<Vec<Point>>),
}

/// Offset a ring oriented for its nesting level. `sign` is the orientation
/// the result must keep, `outline` the flattened source ring.
fn offset_ring(
    ring: &Path,
    outline: &[Point],
    sign: f64,
    distance: f64,
    options: &OffsetOptions,
) -> RingOffset {
    let curves = offset_chain(&ring.curves(), distance, options, true);
    if curves.is_empty() {
        return RingOffset::Loops(Vec::new());
    }
    let raw = Path::from_curves(&curves, true);
    let flat = raw.flatten(FLATTEN_TOLERANCE);

    let clearance = distance.abs() - FLATTEN_TOLERANCE;
    let inside = (distance * sign < 0.0).then_some((outline, clearance));

    if !polyline_self_intersects(&flat, true) {
        return if keep_loop(&flat, sign, inside) {
            RingOffset::Curved(raw)
        } else {
            RingOffset::Loops(Vec::new())
        };
    }
    RingOffset::Loops(resolve_loops(&flat, sign, inside))
}

/// Flatten ring offsets and combine them by nesting level.
fn recombine(results: Vec<(usize, RingOffset)>) -> boolean::Resolved {
    let mut fell_back = false;
    let mut layers = Vec::with_capacity(results.len());
    for (depth, result) in results {
        let shape = match result {
            RingOffset::Curved(path) => boolean::polygon(&path.flatten(FLATTEN_TOLERANCE)),
            RingOffset::Loops(loops) if loops.is_empty() => continue,
            RingOffset::Loops(loops) => {
                let merged = boolean::union_all(loops.iter().map(|l| boolean::polygon(l)));
                fell_back |= merged.fell_back;
                merged.shape
            }
        };
        layers.push((depth, shape));
    }
    let composed = boolean::compose(layers);
    boolean::Resolved {
        shape: composed.shape,
        fell_back: fell_back || composed.fell_back,
    }
}

fn offset_closed(item: &PathItem, distance: f64, options: &OffsetOptions) -> OffsetOutcome {
    let sources: Vec<&Path> = item
        .paths()
        .iter()
        .filter(|path| path.closed && !path.is_empty())
        .collect();
    let Some(first) = sources.first() else {
        return OffsetOutcome::unchanged(item);
    };
    let reverse_back = !first.is_clockwise();
    let mut fell_back = false;

    let mut rings: Vec<Path> = Vec::new();
    for path in sources {
        if path.is_self_intersecting() {
            let resolved = boolean::self_union(&path.flatten(FLATTEN_TOLERANCE));
            fell_back |= resolved.fell_back;
            rings.extend(boolean::multi_polygon_to_paths(&resolved.shape));
        } else {
            rings.push(path.clone());
        }
    }

    let outlines: Vec<Vec<Point>> = rings.iter().map(|p| p.flatten(FLATTEN_TOLERANCE)).collect();
    let depths = boolean::nesting_depths(&outlines);

    let mut results: Vec<(usize, RingOffset)> = Vec::with_capacity(rings.len());
    for ((ring, outline), &depth) in rings.iter().zip(&outlines).zip(&depths) {
        let clockwise = depth % 2 == 0;
        let oriented = if ring.is_clockwise() == clockwise {
            ring.clone()
        } else {
            ring.reversed()
        };
        let sign = if clockwise { 1.0 } else { -1.0 };
        results.push((depth, offset_ring(&oriented, outline, sign, distance, options)));
    }

    let mut item_out = match results.pop() {
        Some((_, RingOffset::Curved(path))) if results.is_empty() => PathItem::Simple(path),
        last => {
            results.extend(last);
            let composed = recombine(results);
            fell_back |= composed.fell_back;
            boolean::multi_polygon_to_item(&composed.shape)
        }
    };

    if reverse_back {
        item_out = match item_out {
            PathItem::Simple(path) => PathItem::Simple(path.reversed()),
            PathItem::Compound(mut compound) => {
                for child in compound.children.iter_mut() {
                    *child = child.reversed();
                }
                PathItem::Compound(compound)
            }
        };
    }

    debug!(
        "Offset by {distance}: {} ring(s) in, {} path(s) out",
        rings.len(),
        item_out.paths().len()
    );
    OffsetOutcome {
        item: item_out,
        fell_back,
    }
}
