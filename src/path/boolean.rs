//! Polygon booleans for offset clean-up.
//!
//! Offsets are flattened to polygons and recombined with `geo`'s boolean
//! operations. Near-coincident edges can make a boolean result collapse;
//! such results are detected by area bounds and retried with one operand
//! nudged by a small epsilon. When every retry fails the first operand is
//! returned unchanged and the caller is told so.

use geo::{Area, BooleanOps, Coord, InteriorPoint, LineString, MultiPolygon, Polygon, Translate};
use kurbo::Point;
use log::trace;

use super::geometry::{distance_to_outline, polygon_area, segment_intersection, winding_number};
use super::{Path, PathItem, FLATTEN_TOLERANCE};

/// Attempts after the first before a boolean op gives up.
pub const MAX_RETRIES: usize = 10;
/// Nudge applied per retry, in coordinate units.
pub const RETRY_EPSILON: f64 = 0.01;
/// Loops with less area than this are dropped.
pub const SLIVER_AREA: f64 = 0.01;

/// Result of a boolean step.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub shape: MultiPolygon<f64>,
    /// True when retries ran out and `shape` is the unmodified operand.
    pub fell_back: bool,
}

impl Resolved {
    fn exact(shape: MultiPolygon<f64>) -> Self {
        Self {
            shape,
            fell_back: false,
        }
    }
}

pub fn empty() -> MultiPolygon<f64> {
    MultiPolygon::new(Vec::new())
}

fn to_ring(points: &[Point]) -> LineString<f64> {
    LineString::from(
        points
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>(),
    )
}

/// Ring points without the closing duplicate.
fn from_ring(ring: &LineString<f64>) -> Vec<Point> {
    let mut points: Vec<Point> = ring.coords().map(|c| Point::new(c.x, c.y)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Single polygon from a closed polyline.
pub fn polygon(points: &[Point]) -> MultiPolygon<f64> {
    if points.len() < 3 {
        return empty();
    }
    MultiPolygon::new(vec![Polygon::new(to_ring(points), Vec::new())])
}

fn is_finite(shape: &MultiPolygon<f64>) -> bool {
    shape.iter().all(|poly| {
        poly.exterior()
            .coords()
            .chain(poly.interiors().iter().flat_map(|ring| ring.coords()))
            .all(|c| c.x.is_finite() && c.y.is_finite())
    })
}

fn area_tolerance(a: f64, b: f64) -> f64 {
    (a + b) * 1e-3 + SLIVER_AREA
}

fn with_retry<F, V>(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>, op: F, valid: V) -> Resolved
where
    F: Fn(&MultiPolygon<f64>, &MultiPolygon<f64>) -> MultiPolygon<f64>,
    V: Fn(f64) -> bool,
{
    for attempt in 0..=MAX_RETRIES {
        let nudged;
        let operand = if attempt == 0 {
            b
        } else {
            let eps = RETRY_EPSILON * attempt as f64;
            nudged = b.translate(eps, eps);
            &nudged
        };

        let shape = op(a, operand);
        if is_finite(&shape) && valid(shape.unsigned_area()) {
            return Resolved::exact(shape);
        }
        trace!("Boolean result rejected on attempt {}", attempt + 1);
    }
    trace!("Boolean retries exhausted, keeping first operand");
    Resolved {
        shape: a.clone(),
        fell_back: true,
    }
}

/// Union of two shapes.
pub fn union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Resolved {
    if b.0.is_empty() {
        return Resolved::exact(a.clone());
    }
    if a.0.is_empty() {
        return Resolved::exact(b.clone());
    }
    let area_a = a.unsigned_area();
    let area_b = b.unsigned_area();
    let tol = area_tolerance(area_a, area_b);
    with_retry(
        a,
        b,
        |x, y| x.union(y),
        |area| area >= area_a.max(area_b) - tol && area <= area_a + area_b + tol,
    )
}

/// `a` with `b` cut away.
pub fn difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Resolved {
    if a.0.is_empty() || b.0.is_empty() {
        return Resolved::exact(a.clone());
    }
    let area_a = a.unsigned_area();
    let area_b = b.unsigned_area();
    let tol = area_tolerance(area_a, area_b);
    with_retry(
        a,
        b,
        |x, y| x.difference(y),
        |area| area >= area_a - area_b - tol && area <= area_a + tol,
    )
}

pub fn union_all<I>(shapes: I) -> Resolved
where
    I: IntoIterator<Item = MultiPolygon<f64>>,
{
    let mut acc = Resolved::exact(empty());
    for shape in shapes {
        let next = union(&acc.shape, &shape);
        acc = Resolved {
            shape: next.shape,
            fell_back: acc.fell_back || next.fell_back,
        };
    }
    acc
}

/// First crossing of two non-adjacent edges, as `(edge_i, edge_j, point)`
/// with `edge_i < edge_j`.
fn first_crossing(ring: &[Point]) -> Option<(usize, usize, Point)> {
    let n = ring.len();
    if n < 4 {
        return None;
    }
    for i in 0..n {
        let a0 = ring[i];
        let a1 = ring[(i + 1) % n];
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let hit = segment_intersection(a0, a1, ring[j], ring[(j + 1) % n]);
            if let Some((t, u)) = hit {
                // Half-open edges so a shared vertex counts once
                if t < 1.0 && u < 1.0 {
                    return Some((i, j, a0.lerp(a1, t)));
                }
            }
        }
    }
    None
}

fn push_distinct(points: &mut Vec<Point>, p: Point) {
    if points.last() != Some(&p) {
        points.push(p);
    }
}

/// Split a closed polyline at its crossings into simple loops.
pub fn split_self_intersections(points: &[Point]) -> Vec<Vec<Point>> {
    let mut pending = vec![points.to_vec()];
    let mut loops = Vec::new();

    while let Some(ring) = pending.pop() {
        let Some((i, j, x)) = first_crossing(&ring) else {
            if ring.len() >= 3 {
                loops.push(ring);
            }
            continue;
        };

        let mut inner = vec![x];
        for &p in &ring[i + 1..=j] {
            push_distinct(&mut inner, p);
        }

        let mut outer = ring[..=i].to_vec();
        push_distinct(&mut outer, x);
        for &p in &ring[j + 1..] {
            push_distinct(&mut outer, p);
        }

        pending.push(inner);
        pending.push(outer);
    }

    loops
}

fn interior_point(points: &[Point]) -> Option<Point> {
    let poly = Polygon::new(to_ring(points), Vec::new());
    poly.interior_point().map(|p| Point::new(p.x(), p.y()))
}

/// Whether a simple loop belongs to an offset result.
///
/// The loop must run with orientation `sign` and carry more than a sliver
/// of area. With `inside` set to `(outline, clearance)` it must also lie
/// within `outline` and its interior must keep at least `clearance` from it,
/// which rejects the inverted loops an over-shrunk outline folds into.
pub fn keep_loop(ring: &[Point], sign: f64, inside: Option<(&[Point], f64)>) -> bool {
    let area = polygon_area(ring);
    if area * sign <= 0.0 || area.abs() <= SLIVER_AREA {
        return false;
    }
    match inside {
        Some((outline, clearance)) => interior_point(ring).is_some_and(|p| {
            winding_number(outline, p) != 0 && distance_to_outline(outline, p) >= clearance
        }),
        None => true,
    }
}

/// Loops of a self-intersecting ring that pass [`keep_loop`].
pub fn resolve_loops(
    points: &[Point],
    sign: f64,
    inside: Option<(&[Point], f64)>,
) -> Vec<Vec<Point>> {
    split_self_intersections(points)
        .into_iter()
        .filter(|ring| keep_loop(ring, sign, inside))
        .collect()
}

/// Clockwise outline of everything a self-intersecting ring encloses.
pub fn self_union(points: &[Point]) -> Resolved {
    let loops = split_self_intersections(points)
        .into_iter()
        .filter(|ring| polygon_area(ring).abs() > SLIVER_AREA)
        .map(|mut ring| {
            if polygon_area(&ring) < 0.0 {
                ring.reverse();
            }
            polygon(&ring)
        });
    union_all(loops)
}

/// How many of the other rings enclose each ring.
pub fn nesting_depths(rings: &[Vec<Point>]) -> Vec<usize> {
    rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let Some(&probe) = ring.first() else {
                return 0;
            };
            rings
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && winding_number(other, probe) != 0)
                .count()
        })
        .collect()
}

/// Combine nested shapes: even depths add, odd depths cut.
pub fn compose(layers: Vec<(usize, MultiPolygon<f64>)>) -> Resolved {
    let mut layers = layers;
    layers.sort_by_key(|(depth, _)| *depth);

    let mut acc = Resolved::exact(empty());
    for (depth, shape) in layers {
        let next = if depth % 2 == 0 {
            union(&acc.shape, &shape)
        } else {
            difference(&acc.shape, &shape)
        };
        acc = Resolved {
            shape: next.shape,
            fell_back: acc.fell_back || next.fell_back,
        };
    }
    acc
}

/// Closed paths of a shape: exteriors clockwise, holes counter-clockwise.
pub fn multi_polygon_to_paths(shape: &MultiPolygon<f64>) -> Vec<Path> {
    let mut paths = Vec::new();
    for poly in shape.iter() {
        let mut exterior = from_ring(poly.exterior());
        let area = polygon_area(&exterior);
        if area.abs() <= SLIVER_AREA {
            continue;
        }
        if area < 0.0 {
            exterior.reverse();
        }
        paths.push(Path::from_points(&exterior, true));

        for ring in poly.interiors() {
            let mut hole = from_ring(ring);
            let area = polygon_area(&hole);
            if area.abs() <= SLIVER_AREA {
                continue;
            }
            if area > 0.0 {
                hole.reverse();
            }
            paths.push(Path::from_points(&hole, true));
        }
    }
    paths
}

pub fn multi_polygon_to_item(shape: &MultiPolygon<f64>) -> PathItem {
    PathItem::from_paths(multi_polygon_to_paths(shape))
}

/// Filled region of an item's closed paths, holes found by nesting.
pub fn item_to_multi_polygon(item: &PathItem) -> Resolved {
    let rings: Vec<Vec<Point>> = item
        .paths()
        .iter()
        .filter(|path| path.closed)
        .map(|path| path.flatten(FLATTEN_TOLERANCE))
        .filter(|ring| ring.len() >= 3)
        .collect();
    let depths = nesting_depths(&rings);
    compose(
        depths
            .into_iter()
            .zip(&rings)
            .map(|(depth, ring)| (depth, polygon(ring)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_union_and_difference_areas() {
        let a = polygon(&rect(0.0, 0.0, 10.0, 10.0));
        let b = polygon(&rect(5.0, 5.0, 15.0, 15.0));

        let u = union(&a, &b);
        assert!(!u.fell_back);
        assert!((u.shape.unsigned_area() - 175.0).abs() < 1e-6);

        let d = difference(&a, &b);
        assert!(!d.fell_back);
        assert!((d.shape.unsigned_area() - 75.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_operands() {
        let a = polygon(&rect(0.0, 0.0, 2.0, 2.0));
        assert!((union(&empty(), &a).shape.unsigned_area() - 4.0).abs() < 1e-12);
        assert!((difference(&a, &empty()).shape.unsigned_area() - 4.0).abs() < 1e-12);
        assert!(difference(&empty(), &a).shape.0.is_empty());
    }

    #[test]
    fn test_difference_can_erase_everything() {
        let a = polygon(&rect(2.0, 2.0, 4.0, 4.0));
        let b = polygon(&rect(0.0, 0.0, 10.0, 10.0));
        let d = difference(&a, &b);
        assert!(!d.fell_back);
        assert!(d.shape.unsigned_area() < 1e-9);
    }

    #[test]
    fn test_split_bowtie() {
        let bowtie = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        let loops = split_self_intersections(&bowtie);
        assert_eq!(loops.len(), 2);
        let mut areas: Vec<f64> = loops.iter().map(|l| polygon_area(l)).collect();
        areas.sort_by(f64::total_cmp);
        assert!((areas[0] + 25.0).abs() < 1e-9);
        assert!((areas[1] - 25.0).abs() < 1e-9);

        assert_eq!(resolve_loops(&bowtie, 1.0, None).len(), 1);
        assert_eq!(resolve_loops(&bowtie, -1.0, None).len(), 1);

        let merged = self_union(&bowtie);
        assert!((merged.shape.unsigned_area() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_simple_ring_is_not_split() {
        let square = rect(0.0, 0.0, 3.0, 3.0);
        let loops = split_self_intersections(&square);
        assert_eq!(loops, vec![square]);
    }

    #[test]
    fn test_resolve_loops_inside_filter() {
        let bowtie = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        // Only the right-hand triangle lies within this outline
        let outline = rect(5.0, 0.0, 20.0, 10.0);
        let kept = resolve_loops(&bowtie, 1.0, Some((&outline, 0.0)));
        let dropped = resolve_loops(&bowtie, -1.0, Some((&outline, 0.0)));
        assert_eq!(kept.len() + dropped.len(), 1);
        // Too close to the outline once a clearance is required
        assert!(resolve_loops(&bowtie, -1.0, Some((&outline, 6.0))).is_empty());
    }

    #[test]
    fn test_nesting_and_compose() {
        let rings = vec![
            rect(0.0, 0.0, 10.0, 10.0),
            rect(2.0, 2.0, 8.0, 8.0),
            rect(4.0, 4.0, 6.0, 6.0),
        ];
        assert_eq!(nesting_depths(&rings), vec![0, 1, 2]);

        let layers = nesting_depths(&rings)
            .into_iter()
            .zip(&rings)
            .map(|(d, r)| (d, polygon(r)))
            .collect();
        let shape = compose(layers).shape;
        assert!((shape.unsigned_area() - (100.0 - 36.0 + 4.0)).abs() < 1e-6);
    }

    #[test]
    fn test_paths_round_trip_orientation() {
        let outer = polygon(&rect(0.0, 0.0, 10.0, 10.0));
        let hole = polygon(&rect(3.0, 3.0, 7.0, 7.0));
        let washer = difference(&outer, &hole).shape;

        let paths = multi_polygon_to_paths(&washer);
        assert_eq!(paths.len(), 2);
        assert!(paths[0].signed_area() > 0.0);
        assert!(paths[1].signed_area() < 0.0);

        let item = multi_polygon_to_item(&washer);
        assert!((item.area() - 84.0).abs() < 1e-6);
        let back = item_to_multi_polygon(&item);
        assert!((back.shape.unsigned_area() - 84.0).abs() < 1e-6);
    }
}
