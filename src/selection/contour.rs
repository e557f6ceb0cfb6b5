//! Contour extraction from binary masks.
//!
//! Traces region boundaries with Moore-neighbour tracing. Each region
//! yields one outer contour, and each hole inside a region one inner
//! contour. Points lie on pixel centers, so a contour is a closed ring of
//! integer lattice points. The closing edge back to the first point is
//! implicit; the first point is not repeated.

use kurbo::Point;
use ndarray::Array2;

use super::mask::{pad, Mask};

/// Moore neighborhood directions (8-connected, clockwise from right)
const DIRECTIONS: [(isize, isize); 8] = [
    (1, 0),   // 0: right
    (1, 1),   // 1: down-right
    (0, 1),   // 2: down
    (-1, 1),  // 3: down-left
    (-1, 0),  // 4: left
    (-1, -1), // 5: up-left
    (0, -1),  // 6: up
    (1, -1),  // 7: up-right
];

/// Label of background pixels already inspected by a trace.
const SEEN_BACKGROUND: i32 = -1;

/// One traced boundary ring.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    /// Trace label, unique within one [`trace_contours`] call.
    pub label: usize,
    /// True for hole boundaries.
    pub inner: bool,
    pub points: Vec<Point>,
    /// Point count before simplification.
    pub initial_count: usize,
}

impl Contour {
    pub fn new(label: usize, inner: bool, points: Vec<Point>) -> Self {
        let initial_count = points.len();
        Self {
            label,
            inner,
            points,
            initial_count,
        }
    }

    /// Number of pixel centers enclosed by the ring, boundary included.
    ///
    /// Uses Pick's theorem, so points must lie on the integer lattice (as
    /// traced, before any translation by a fractional origin).
    pub fn pixel_area(&self) -> usize {
        let pts = &self.points;
        if pts.is_empty() {
            return 0;
        }
        let mut twice_area = 0i64;
        let mut boundary = 0i64;
        for (a, b) in ring_edges(pts) {
            let (ax, ay) = lattice(a);
            let (bx, by) = lattice(b);
            twice_area += ax * by - bx * ay;
            boundary += gcd((bx - ax).abs(), (by - ay).abs());
        }
        // I + B = A + B/2 + 1
        ((twice_area.abs() + boundary) / 2 + 1) as usize
    }
}

/// Trace all contours of a mask.
///
/// # Arguments
/// * `mask` - Binary mask, only its bounds are scanned
/// * `origin` - Offset added to every output point
///
/// # Returns
/// Contours in label order: regions and holes as first met by a
/// row-major scan
pub fn trace_contours(mask: &Mask, origin: Point) -> Vec<Contour> {
    let padded = pad(mask);
    let src = &padded.data;
    let (h, w) = src.dim();
    // 0 = untouched, label > 0 = traced boundary pixel, -1 = seen background
    let mut labels = Array2::<i32>::zeros((h, w));
    let mut contours = Vec::new();
    let mut label = 0usize;

    let b = padded.bounds;
    for y in b.min_y..=b.max_y.min(h - 2) {
        for x in b.min_x..=b.max_x.min(w - 2) {
            if src[[y, x]] == 0 {
                continue;
            }
            for inner in [false, true] {
                let start = if inner {
                    // Unseen background below: a hole not yet traced
                    src[[y + 1, x]] == 0 && labels[[y + 1, x]] == 0
                } else {
                    // Untraced pixel with background above: a new region
                    labels[[y, x]] == 0 && src[[y - 1, x]] == 0
                };
                if !start {
                    continue;
                }
                label += 1;
                let ring = trace_ring(src, &mut labels, (x, y), inner, label as i32);
                let points = ring
                    .into_iter()
                    .map(|(px, py)| {
                        Point::new(
                            px as f64 - 1.0 + origin.x,
                            py as f64 - 1.0 + origin.y,
                        )
                    })
                    .collect();
                contours.push(Contour::new(label, inner, points));
            }
        }
    }

    log::trace!("traced {} contours", contours.len());
    contours
}

/// Walk one boundary starting at `first` (padded coordinates).
fn trace_ring(
    src: &Array2<u8>,
    labels: &mut Array2<i32>,
    first: (usize, usize),
    inner: bool,
    label: i32,
) -> Vec<(usize, usize)> {
    let mut dir = if inner { 2 } else { 6 };
    let mut points = Vec::new();
    let mut previous = first;
    let mut current = first;
    let mut second: Option<(usize, usize)> = None;

    let (h, w) = src.dim();
    let max_steps = 4 * w * h;

    for _ in 0..max_steps {
        labels[[current.1, current.0]] = label;

        // Clockwise sweep, first set neighbour is the next boundary pixel
        let mut next = None;
        for _ in 0..8 {
            dir = (dir + 1) % 8;
            let (dx, dy) = DIRECTIONS[dir];
            let nx = (current.0 as isize + dx) as usize;
            let ny = (current.1 as isize + dy) as usize;
            if src[[ny, nx]] != 0 {
                labels[[ny, nx]] = label;
                next = Some((nx, ny));
                break;
            }
            labels[[ny, nx]] = SEEN_BACKGROUND;
        }

        let Some(next) = next else {
            // Isolated pixel
            return vec![first];
        };

        current = next;
        match second {
            Some(second) if previous == first && current == second => break,
            Some(_) => {}
            None => second = Some(next),
        }
        points.push(previous);
        previous = current;
        // Resume two steps clockwise of the direction back to `previous`
        dir = (dir + 5) % 8;
    }

    points
}

/// Paint contours back into a mask.
///
/// Contours are applied in order: outer rings set every pixel on or
/// inside the ring, inner rings clear the pixels strictly inside.
/// For traced masks this reproduces the mask up to boundary ambiguities
/// of 8-connectivity.
///
/// # Arguments
/// * `contours` - Rings in the coordinate space given by `origin`
/// * `width`, `height` - Output grid size
/// * `origin` - Offset that was added when tracing
pub fn rasterize_contours(
    contours: &[Contour],
    width: usize,
    height: usize,
    origin: Point,
) -> Mask {
    let mut data = Array2::<u8>::zeros((height, width));

    for contour in contours {
        let ring: Vec<(i64, i64)> = contour
            .points
            .iter()
            .map(|p| lattice(Point::new(p.x - origin.x, p.y - origin.y)))
            .collect();
        if ring.is_empty() {
            continue;
        }

        let min_x = ring.iter().map(|p| p.0).min().unwrap_or(0).max(0);
        let min_y = ring.iter().map(|p| p.1).min().unwrap_or(0).max(0);
        let max_x = ring.iter().map(|p| p.0).max().unwrap_or(-1).min(width as i64 - 1);
        let max_y = ring.iter().map(|p| p.1).max().unwrap_or(-1).min(height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let on_ring = on_boundary(&ring, x, y);
                let cell = &mut data[[y as usize, x as usize]];
                if contour.inner {
                    if !on_ring && crosses_odd(&ring, x, y) {
                        *cell = 0;
                    }
                } else if on_ring || crosses_odd(&ring, x, y) {
                    *cell = 1;
                }
            }
        }
    }

    Mask::from_data(data)
}

fn ring_edges(points: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = points.len();
    (0..n).map(move |i| (points[i], points[(i + 1) % n]))
}

#[inline]
fn lattice(p: Point) -> (i64, i64) {
    (p.x.round() as i64, p.y.round() as i64)
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn on_boundary(ring: &[(i64, i64)], x: i64, y: i64) -> bool {
    let n = ring.len();
    (0..n).any(|i| {
        let (ax, ay) = ring[i];
        let (bx, by) = ring[(i + 1) % n];
        let cross = (bx - ax) * (y - ay) - (by - ay) * (x - ax);
        cross == 0
            && x >= ax.min(bx)
            && x <= ax.max(bx)
            && y >= ay.min(by)
            && y <= ay.max(by)
    })
}

/// Even-odd crossing test, half-open in y.
fn crosses_odd(ring: &[(i64, i64)], x: i64, y: i64) -> bool {
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let (ax, ay) = ring[i];
        let (bx, by) = ring[(i + 1) % n];
        if (ay > y) != (by > y) {
            let t = (y - ay) as f64 / (by - ay) as f64;
            let cx = ax as f64 + t * (bx - ax) as f64;
            if (x as f64) < cx {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> Mask {
        let height = rows.len();
        let width = rows[0].len();
        let mut data = Array2::<u8>::zeros((height, width));
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    data[[y, x]] = 1;
                }
            }
        }
        Mask::from_data(data)
    }

    fn assert_round_trip(mask: &Mask) {
        let contours = trace_contours(mask, Point::ZERO);
        let back = rasterize_contours(&contours, mask.width(), mask.height(), Point::ZERO);
        assert_eq!(back.data, mask.data);
    }

    #[test]
    fn test_square_contour() {
        let mask = mask_from_rows(&[
            ".....",
            ".###.",
            ".###.",
            ".###.",
            ".....",
        ]);
        let contours = trace_contours(&mask, Point::ZERO);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(!c.inner);
        assert_eq!(c.label, 1);
        // 8 perimeter pixels, start not repeated
        assert_eq!(c.points.len(), 8);
        assert_ne!(c.points.first(), c.points.last());
        assert_eq!(c.points[0], Point::new(1.0, 1.0));
        assert_eq!(c.pixel_area(), 9);
    }

    #[test]
    fn test_origin_offset() {
        let mask = mask_from_rows(&["##", "##"]);
        let contours = trace_contours(&mask, Point::new(10.0, 20.0));
        assert_eq!(contours[0].points[0], Point::new(10.0, 20.0));
        let back = rasterize_contours(&contours, 2, 2, Point::new(10.0, 20.0));
        assert_eq!(back.count(), 4);
    }

    #[test]
    fn test_ring_has_inner_contour() {
        let mask = mask_from_rows(&[
            ".....",
            ".###.",
            ".#.#.",
            ".###.",
            ".....",
        ]);
        let contours = trace_contours(&mask, Point::ZERO);
        assert_eq!(contours.len(), 2);
        assert!(!contours[0].inner);
        assert!(contours[1].inner);
        assert_ne!(contours[0].label, contours[1].label);
        assert_round_trip(&mask);
    }

    #[test]
    fn test_single_pixel() {
        let mask = mask_from_rows(&["...", ".#.", "..."]);
        let contours = trace_contours(&mask, Point::ZERO);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points, vec![Point::new(1.0, 1.0)]);
        assert_eq!(contours[0].pixel_area(), 1);
        assert_round_trip(&mask);
    }

    #[test]
    fn test_two_pixel_line() {
        let mask = mask_from_rows(&["....", ".##.", "...."]);
        let contours = trace_contours(&mask, Point::ZERO);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].pixel_area(), 2);
        assert_round_trip(&mask);
    }

    #[test]
    fn test_empty_mask() {
        let mask = Mask::new(6, 4);
        assert!(trace_contours(&mask, Point::ZERO).is_empty());
    }

    #[test]
    fn test_mask_touching_edges() {
        let mask = mask_from_rows(&["###", "###"]);
        let contours = trace_contours(&mask, Point::ZERO);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].pixel_area(), 6);
        assert_round_trip(&mask);
    }

    #[test]
    fn test_island_in_hole() {
        let mask = mask_from_rows(&[
            ".........",
            ".#######.",
            ".#.....#.",
            ".#.###.#.",
            ".#.###.#.",
            ".#.###.#.",
            ".#.....#.",
            ".#######.",
            ".........",
        ]);
        let contours = trace_contours(&mask, Point::ZERO);
        let outer = contours.iter().filter(|c| !c.inner).count();
        let inner = contours.iter().filter(|c| c.inner).count();
        assert_eq!(outer, 2);
        assert_eq!(inner, 1);
        assert_round_trip(&mask);
    }

    #[test]
    fn test_u_shape_and_two_regions() {
        let mask = mask_from_rows(&[
            "..........",
            ".#..#..##.",
            ".#..#..##.",
            ".####.....",
            "..........",
        ]);
        let contours = trace_contours(&mask, Point::ZERO);
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(|c| !c.inner));
        assert_round_trip(&mask);
    }

    #[test]
    fn test_pixel_area_of_inner_ring() {
        let mask = mask_from_rows(&[
            ".......",
            ".#####.",
            ".#...#.",
            ".#...#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        let contours = trace_contours(&mask, Point::ZERO);
        let hole = contours.iter().find(|c| c.inner).unwrap();
        // Hole of 9 pixels plus the 12 rim pixels the ring passes through
        assert_eq!(hole.pixel_area(), 21);
        assert_round_trip(&mask);
    }
}
