//! Curve geometry used by the offset engine.
//!
//! Tangents and normals, intersections between segments and curves,
//! circular arcs as cubic pieces, and polyline winding tests.

use std::f64::consts::FRAC_PI_2;

use kurbo::{CubicBez, ParamCurve, ParamCurveDeriv, Point, Vec2};

use crate::selection::simplify::distance_to_segment;

/// Lengths below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Samples per curve for the coarse intersection pass.
const COARSE_SAMPLES: usize = 32;
/// Samples per refinement window.
const REFINE_SAMPLES: usize = 8;
const REFINE_ROUNDS: usize = 5;

/// Straight segment as a cubic with handles on the anchors.
pub fn line(p0: Point, p1: Point) -> CubicBez {
    CubicBez::new(p0, p0, p1, p1)
}

pub fn is_line(c: &CubicBez) -> bool {
    c.p1 == c.p0 && c.p2 == c.p3
}

/// True when the control polygon has no length.
pub fn is_degenerate(c: &CubicBez) -> bool {
    (c.p1 - c.p0).hypot() + (c.p2 - c.p1).hypot() + (c.p3 - c.p2).hypot() < EPSILON
}

/// Unit tangent at `t`.
///
/// Handles that sit on their anchor give a zero derivative at the ends, so
/// those fall back to the direction of the remaining control points.
pub fn tangent_at(c: &CubicBez, t: f64) -> Vec2 {
    let d = c.deriv().eval(t).to_vec2();
    if d.hypot() > EPSILON {
        return d.normalize();
    }
    let fallbacks = if t < 0.5 {
        [c.p2 - c.p0, c.p3 - c.p0]
    } else {
        [c.p3 - c.p1, c.p3 - c.p0]
    };
    fallbacks
        .into_iter()
        .find(|v| v.hypot() > EPSILON)
        .map(Vec2::normalize)
        .unwrap_or(Vec2::ZERO)
}

/// Unit normal at `t`, pointing out of a clockwise path.
pub fn normal_at(c: &CubicBez, t: f64) -> Vec2 {
    let tangent = tangent_at(c, t);
    Vec2::new(tangent.y, -tangent.x)
}

/// Signed angle from direction `a` to direction `b`, positive when turning
/// clockwise on screen.
pub fn turn_angle(a: Vec2, b: Vec2) -> f64 {
    a.cross(b).atan2(a.dot(b))
}

/// Intersection of the infinite lines through `p` along `dp` and through `q`
/// along `dq`.
pub fn line_intersection(p: Point, dp: Vec2, q: Point, dq: Vec2) -> Option<Point> {
    let denom = dp.cross(dq);
    if denom.abs() < EPSILON {
        return None;
    }
    let s = (q - p).cross(dq) / denom;
    Some(p + dp * s)
}

/// Parameters `(t, u)` where segments `a0`-`a1` and `b0`-`b1` cross.
/// Parallel segments never intersect.
pub fn segment_intersection(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<(f64, f64)> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = r.cross(s);
    if denom.abs() < EPSILON * EPSILON {
        return None;
    }
    let qp = b0 - a0;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

/// Sample `c` on `[from, to]` as a polyline with `n` segments.
fn sample(c: &CubicBez, from: f64, to: f64, n: usize) -> Vec<(f64, Point)> {
    (0..=n)
        .map(|i| {
            let t = from + (to - from) * i as f64 / n as f64;
            (t, c.eval(t))
        })
        .collect()
}

/// All crossings between two sampled polylines as curve parameters.
fn polyline_crossings(a: &[(f64, Point)], b: &[(f64, Point)]) -> Vec<(f64, f64)> {
    let mut hits = Vec::new();
    for wa in a.windows(2) {
        for wb in b.windows(2) {
            if let Some((s, u)) = segment_intersection(wa[0].1, wa[1].1, wb[0].1, wb[1].1) {
                let ta = wa[0].0 + (wa[1].0 - wa[0].0) * s;
                let tb = wb[0].0 + (wb[1].0 - wb[0].0) * u;
                hits.push((ta, tb));
            }
        }
    }
    hits
}

/// Crossing of two consecutive curves, as parameters on each.
///
/// When several crossings exist the one nearest the end of `a` and the
/// start of `b` wins, since that is where consecutive offsets overlap.
pub fn curve_intersection(a: &CubicBez, b: &CubicBez) -> Option<(f64, f64)> {
    let coarse = polyline_crossings(
        &sample(a, 0.0, 1.0, COARSE_SAMPLES),
        &sample(b, 0.0, 1.0, COARSE_SAMPLES),
    );
    let (mut ta, mut tb) = coarse
        .into_iter()
        .min_by(|x, y| ((1.0 - x.0) + x.1).total_cmp(&((1.0 - y.0) + y.1)))?;

    let mut span = 1.0 / COARSE_SAMPLES as f64;
    for _ in 0..REFINE_ROUNDS {
        let a_range = ((ta - span).max(0.0), (ta + span).min(1.0));
        let b_range = ((tb - span).max(0.0), (tb + span).min(1.0));
        let refined = polyline_crossings(
            &sample(a, a_range.0, a_range.1, REFINE_SAMPLES),
            &sample(b, b_range.0, b_range.1, REFINE_SAMPLES),
        );
        let Some(best) = refined.into_iter().min_by(|x, y| {
            ((x.0 - ta).abs() + (x.1 - tb).abs()).total_cmp(&((y.0 - ta).abs() + (y.1 - tb).abs()))
        }) else {
            break;
        };
        ta = best.0;
        tb = best.1;
        span /= 4.0;
    }
    Some((ta, tb))
}

/// Circular arc around `center` starting at `from` and sweeping `sweep`
/// radians (positive is clockwise on screen), split into quarter-turn
/// cubic pieces.
pub fn arc(center: Point, from: Point, sweep: f64, radius: f64) -> Vec<CubicBez> {
    let start = (from - center).atan2();
    let pieces = (sweep.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / pieces as f64;
    let k = 4.0 / 3.0 * (step / 4.0).tan() * radius;

    (0..pieces)
        .map(|i| {
            let a0 = start + step * i as f64;
            let a1 = a0 + step;
            let d0 = Vec2::from_angle(a0);
            let d1 = Vec2::from_angle(a1);
            let p0 = center + d0 * radius;
            let p3 = center + d1 * radius;
            CubicBez::new(
                p0,
                p0 + Vec2::new(-d0.y, d0.x) * k,
                p3 - Vec2::new(-d1.y, d1.x) * k,
                p3,
            )
        })
        .collect()
}

/// True when any two non-adjacent edges of the polyline touch.
pub fn polyline_self_intersects(points: &[Point], closed: bool) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }
    let edges = if closed { n } else { n - 1 };
    for i in 0..edges {
        let a0 = points[i];
        let a1 = points[(i + 1) % n];
        for j in i + 2..edges {
            if closed && i == 0 && j == edges - 1 {
                continue;
            }
            let b0 = points[j];
            let b1 = points[(j + 1) % n];
            if segment_intersection(a0, a1, b0, b1).is_some() {
                return true;
            }
        }
    }
    false
}

/// True when the curve loops over itself.
pub fn cubic_self_intersects(c: &CubicBez) -> bool {
    if is_line(c) {
        return false;
    }
    let points: Vec<Point> = sample(c, 0.0, 1.0, 16).into_iter().map(|(_, p)| p).collect();
    polyline_self_intersects(&points, false)
}

/// Winding number of the closed polyline around `p`.
pub fn winding_number(points: &[Point], p: Point) -> i32 {
    let n = points.len();
    let mut winding = 0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let side = (b - a).cross(p - a);
        if a.y <= p.y {
            if b.y > p.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Distance from `p` to the nearest edge of a closed polyline.
pub fn distance_to_outline(points: &[Point], p: Point) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| distance_to_segment(p, points[i], points[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Shoelace area of a closed polyline, positive when clockwise on screen.
pub fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_tangent_of_line_with_collapsed_handles() {
        let c = line(pt(0.0, 0.0), pt(4.0, 0.0));
        assert_eq!(tangent_at(&c, 0.0), Vec2::new(1.0, 0.0));
        assert_eq!(tangent_at(&c, 1.0), Vec2::new(1.0, 0.0));
        // Top edge of a clockwise square points up, out of the square
        assert_eq!(normal_at(&c, 0.5), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_turn_angle_sign() {
        let right = Vec2::new(1.0, 0.0);
        let down = Vec2::new(0.0, 1.0);
        assert!((turn_angle(right, down) - FRAC_PI_2).abs() < 1e-12);
        assert!((turn_angle(down, right) + FRAC_PI_2).abs() < 1e-12);
        assert!(turn_angle(right, right).abs() < 1e-12);
    }

    #[test]
    fn test_line_intersection() {
        let p = line_intersection(pt(0.0, 0.0), Vec2::new(1.0, 0.0), pt(3.0, -2.0), Vec2::new(0.0, 1.0));
        assert_eq!(p, Some(pt(3.0, 0.0)));
        assert!(line_intersection(pt(0.0, 0.0), Vec2::new(1.0, 0.0), pt(0.0, 1.0), Vec2::new(2.0, 0.0)).is_none());
    }

    #[test]
    fn test_segment_intersection() {
        let hit = segment_intersection(pt(0.0, 0.0), pt(2.0, 2.0), pt(0.0, 2.0), pt(2.0, 0.0));
        let (t, u) = hit.unwrap();
        assert!((t - 0.5).abs() < 1e-12 && (u - 0.5).abs() < 1e-12);
        assert!(segment_intersection(pt(0.0, 0.0), pt(1.0, 0.0), pt(2.0, -1.0), pt(2.0, 1.0)).is_none());
    }

    #[test]
    fn test_curve_intersection_of_crossing_lines() {
        let a = line(pt(0.0, 0.0), pt(10.0, 0.0));
        let b = line(pt(8.0, -2.0), pt(8.0, 5.0));
        let (ta, tb) = curve_intersection(&a, &b).unwrap();
        assert!((a.eval(ta) - pt(8.0, 0.0)).hypot() < 1e-6);
        assert!((b.eval(tb) - pt(8.0, 0.0)).hypot() < 1e-6);
    }

    #[test]
    fn test_curve_intersection_refines_on_curves() {
        let a = CubicBez::new(pt(0.0, 0.0), pt(3.0, 4.0), pt(7.0, 4.0), pt(10.0, 0.0));
        let b = line(pt(5.0, -1.0), pt(5.0, 10.0));
        let (ta, _) = curve_intersection(&a, &b).unwrap();
        assert!((a.eval(ta).x - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_quarter_arc() {
        let pieces = arc(pt(0.0, 0.0), pt(1.0, 0.0), FRAC_PI_2, 1.0);
        assert_eq!(pieces.len(), 1);
        let c = pieces[0];
        assert!((c.p3 - pt(0.0, 1.0)).hypot() < 1e-12);
        let mid = c.eval(0.5);
        assert!((mid.to_vec2().hypot() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_half_arc_splits_into_quarters() {
        let pieces = arc(pt(5.0, 5.0), pt(6.0, 5.0), -PI, 1.0);
        assert_eq!(pieces.len(), 2);
        assert!((pieces[1].p3 - pt(4.0, 5.0)).hypot() < 1e-12);
        // Negative sweep goes counter-clockwise on screen, through y = 4
        assert!((pieces[0].p3 - pt(5.0, 4.0)).hypot() < 1e-12);
    }

    #[test]
    fn test_polyline_self_intersects() {
        let square = [pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
        assert!(!polyline_self_intersects(&square, true));
        let bowtie = [pt(0.0, 0.0), pt(1.0, 1.0), pt(1.0, 0.0), pt(0.0, 1.0)];
        assert!(polyline_self_intersects(&bowtie, true));
        // Open zigzag never closes back over itself
        let zigzag = [pt(0.0, 0.0), pt(1.0, 1.0), pt(2.0, 0.0), pt(3.0, 1.0)];
        assert!(!polyline_self_intersects(&zigzag, false));
    }

    #[test]
    fn test_cubic_loop_detected() {
        let looped = CubicBez::new(pt(0.0, 0.0), pt(12.0, 8.0), pt(-2.0, 8.0), pt(10.0, 0.0));
        assert!(cubic_self_intersects(&looped));
        let arch = CubicBez::new(pt(0.0, 0.0), pt(3.0, 4.0), pt(7.0, 4.0), pt(10.0, 0.0));
        assert!(!cubic_self_intersects(&arch));
    }

    #[test]
    fn test_winding_and_area() {
        let square = [pt(0.0, 0.0), pt(4.0, 0.0), pt(4.0, 4.0), pt(0.0, 4.0)];
        assert_eq!(polygon_area(&square), 16.0);
        assert_ne!(winding_number(&square, pt(2.0, 2.0)), 0);
        assert_eq!(winding_number(&square, pt(5.0, 2.0)), 0);
        assert!((distance_to_outline(&square, pt(1.0, 2.0)) - 1.0).abs() < 1e-12);
        assert!((distance_to_outline(&square, pt(7.0, 4.0)) - 3.0).abs() < 1e-12);
        let reversed: Vec<Point> = square.iter().rev().copied().collect();
        assert_eq!(polygon_area(&reversed), -16.0);
        assert_eq!(
            winding_number(&reversed, pt(2.0, 2.0)),
            -winding_number(&square, pt(2.0, 2.0))
        );
    }
}
