//! Polyline reduction for traced contours.
//!
//! Douglas-Peucker simplification with an explicit work stack, so long
//! contours cannot overflow the call stack.

use kurbo::Point;

use super::contour::Contour;

/// Distance from `p` to the segment `a`-`b`.
///
/// Perpendicular distance when the foot of the perpendicular falls on the
/// segment, otherwise the distance to the nearer endpoint.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let d = b - a;
    let length_sq = d.hypot2();
    if length_sq < 1e-12 {
        // Segment is essentially a point
        return p.distance(a);
    }
    let t = (p - a).dot(d) / length_sq;
    if t <= 0.0 {
        p.distance(a)
    } else if t >= 1.0 {
        p.distance(b)
    } else {
        (p - a).cross(d).abs() / length_sq.sqrt()
    }
}

/// Indices of the points kept by Douglas-Peucker, in original order.
fn douglas_peucker(points: &[Point], tolerance: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_idx = first;
        for i in first + 1..last {
            let dist = distance_to_segment(points[i], points[first], points[last]);
            if dist > max_dist {
                max_dist = dist;
                max_idx = i;
            }
        }

        if max_dist > tolerance {
            keep[max_idx] = true;
            stack.push((first, max_idx));
            stack.push((max_idx, last));
        }
    }

    (0..n).filter(|&i| keep[i]).collect()
}

/// Indices kept when simplifying a closed ring.
///
/// The ring is cut at its first point and at the point farthest from it,
/// and each half is reduced on its own, so the closing edge is simplified
/// like any other.
fn douglas_peucker_closed(points: &[Point], tolerance: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }

    let start = points[0];
    let split = (1..n)
        .max_by(|&a, &b| start.distance(points[a]).total_cmp(&start.distance(points[b])))
        .unwrap_or(0);
    if points[split] == start {
        return (0..n).collect();
    }

    let mut kept = douglas_peucker(&points[..=split], tolerance);
    let back: Vec<Point> = points[split..].iter().copied().chain([start]).collect();
    let tail = douglas_peucker(&back, tolerance);
    // Skip the shared split point and the closing copy of the start
    kept.extend(tail[1..tail.len() - 1].iter().map(|&i| split + i));
    kept
}

/// Simplify traced contours.
///
/// Contours are treated as closed rings. The first point is always kept.
///
/// # Arguments
/// * `contours` - Contours to reduce
/// * `tolerance` - Maximum distance of a dropped point from the result
/// * `min_point_count` - Contours with fewer points pass through unchanged
///
/// # Returns
/// New contours with `initial_count` set to the input point count
pub fn simplify_contours(
    contours: &[Contour],
    tolerance: f64,
    min_point_count: usize,
) -> Vec<Contour> {
    contours
        .iter()
        .map(|contour| {
            let initial_count = contour.points.len();
            let points = if initial_count < min_point_count {
                contour.points.clone()
            } else {
                douglas_peucker_closed(&contour.points, tolerance)
                    .into_iter()
                    .map(|i| contour.points[i])
                    .collect()
            };
            Contour {
                label: contour.label,
                inner: contour.inner,
                points,
                initial_count,
            }
        })
        .collect()
}
