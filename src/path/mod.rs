//! Vector paths and the offset engine.
//!
//! Paths are sequences of [`Segment`]s in the usual editor form: an anchor
//! point with incoming and outgoing handles stored relative to the anchor.
//! Each pair of consecutive segments spans one cubic Bézier curve.
//!
//! Coordinates are y-down. A closed path with positive [`Path::signed_area`]
//! runs clockwise on screen.

pub mod boolean;
pub mod geometry;
pub mod offset;
pub mod stroke;

use kurbo::{BezPath, CubicBez, ParamCurveArea, PathEl, Point, QuadBez, Rect, Shape, Vec2};

use self::geometry::{is_line, line, winding_number};

/// Flattening tolerance used wherever curves become polygons.
pub const FLATTEN_TOLERANCE: f64 = 0.05;

/// An anchor point with relative Bézier handles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub point: Point,
    pub handle_in: Vec2,
    pub handle_out: Vec2,
}

impl Segment {
    pub fn new(point: Point, handle_in: Vec2, handle_out: Vec2) -> Self {
        Self {
            point,
            handle_in,
            handle_out,
        }
    }

    /// A segment without handles.
    pub fn corner(point: Point) -> Self {
        Self::new(point, Vec2::ZERO, Vec2::ZERO)
    }
}

/// A single open or closed path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
    pub closed: bool,
}

impl Path {
    pub fn new(segments: Vec<Segment>, closed: bool) -> Self {
        Self { segments, closed }
    }

    /// Polyline through `points`.
    pub fn from_points(points: &[Point], closed: bool) -> Self {
        Self::new(points.iter().copied().map(Segment::corner).collect(), closed)
    }

    /// Path through a chain of cubic curves, each starting where the
    /// previous one ends. For closed paths the last curve ends at the first
    /// curve's start.
    pub fn from_curves(curves: &[CubicBez], closed: bool) -> Self {
        let n = curves.len();
        if n == 0 {
            return Self::new(Vec::new(), closed);
        }

        let mut segments = Vec::with_capacity(n + 1);
        for (i, c) in curves.iter().enumerate() {
            let handle_in = if i > 0 {
                curves[i - 1].p2 - curves[i - 1].p3
            } else if closed {
                curves[n - 1].p2 - curves[n - 1].p3
            } else {
                Vec2::ZERO
            };
            segments.push(Segment::new(c.p0, handle_in, c.p1 - c.p0));
        }
        if !closed {
            let last = curves[n - 1];
            segments.push(Segment::new(last.p3, last.p2 - last.p3, Vec2::ZERO));
        }

        Self::new(segments, closed)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The cubic curves between consecutive segments.
    pub fn curves(&self) -> Vec<CubicBez> {
        let n = self.segments.len();
        if n == 0 {
            return Vec::new();
        }
        let count = if self.closed { n } else { n - 1 };
        (0..count)
            .map(|i| {
                let a = &self.segments[i];
                let b = &self.segments[(i + 1) % n];
                CubicBez::new(
                    a.point,
                    a.point + a.handle_out,
                    b.point + b.handle_in,
                    b.point,
                )
            })
            .collect()
    }

    /// Enclosed area, positive for clockwise paths. Open paths have none.
    pub fn signed_area(&self) -> f64 {
        if !self.closed {
            return 0.0;
        }
        self.curves().iter().map(|c| c.signed_area()).sum()
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() >= 0.0
    }

    /// Same geometry traversed backwards.
    pub fn reversed(&self) -> Path {
        let segments = self
            .segments
            .iter()
            .rev()
            .map(|s| Segment::new(s.point, s.handle_out, s.handle_in))
            .collect();
        Path::new(segments, self.closed)
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut bez = BezPath::new();
        self.append_to(&mut bez);
        bez
    }

    fn append_to(&self, bez: &mut BezPath) {
        let Some(first) = self.segments.first() else {
            return;
        };
        bez.move_to(first.point);
        for c in self.curves() {
            if is_line(&c) {
                bez.line_to(c.p3);
            } else {
                bez.curve_to(c.p1, c.p2, c.p3);
            }
        }
        if self.closed {
            bez.close_path();
        }
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        if self.segments.is_empty() {
            return None;
        }
        Some(self.to_bez_path().bounding_box())
    }

    /// Polyline approximation. Closed paths do not repeat the first point.
    pub fn flatten(&self, tolerance: f64) -> Vec<Point> {
        let mut points: Vec<Point> = Vec::new();
        kurbo::flatten(self.to_bez_path(), tolerance, |el| match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => {
                if points.last() != Some(&p) {
                    points.push(p);
                }
            }
            _ => {}
        });
        if self.closed && points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        points
    }

    pub fn is_self_intersecting(&self) -> bool {
        geometry::polyline_self_intersects(&self.flatten(FLATTEN_TOLERANCE), self.closed)
    }

    /// Nonzero winding test on the flattened outline.
    pub fn contains(&self, point: Point) -> bool {
        self.closed && winding_number(&self.flatten(FLATTEN_TOLERANCE), point) != 0
    }
}

/// Several closed paths forming one shape. Outer boundaries run clockwise,
/// holes counter-clockwise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundPath {
    pub children: Vec<Path>,
}

/// Input and output of the offset engine.
#[derive(Clone, Debug, PartialEq)]
pub enum PathItem {
    Simple(Path),
    Compound(CompoundPath),
}

impl Default for PathItem {
    fn default() -> Self {
        PathItem::Compound(CompoundPath::default())
    }
}

impl From<Path> for PathItem {
    fn from(path: Path) -> Self {
        PathItem::Simple(path)
    }
}

impl PathItem {
    /// Wrap paths, collapsing a single path to [`PathItem::Simple`].
    pub fn from_paths(mut paths: Vec<Path>) -> Self {
        if paths.len() == 1 {
            if let Some(path) = paths.pop() {
                return PathItem::Simple(path);
            }
        }
        PathItem::Compound(CompoundPath { children: paths })
    }

    pub fn paths(&self) -> &[Path] {
        match self {
            PathItem::Simple(path) => std::slice::from_ref(path),
            PathItem::Compound(compound) => &compound.children,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths().iter().all(Path::is_empty)
    }

    /// Sum of the children's signed areas, so holes subtract.
    pub fn area(&self) -> f64 {
        self.paths().iter().map(Path::signed_area).sum()
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        self.paths()
            .iter()
            .filter_map(Path::bounding_box)
            .reduce(|a, b| a.union(b))
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut bez = BezPath::new();
        for path in self.paths() {
            path.append_to(&mut bez);
        }
        bez
    }

    /// Convert a kurbo path; each subpath becomes one child.
    pub fn from_bez_path(bez: &BezPath) -> Self {
        let mut paths = Vec::new();
        let mut curves: Vec<CubicBez> = Vec::new();
        let mut start = Point::ZERO;
        let mut current = Point::ZERO;

        for el in bez.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    if !curves.is_empty() {
                        paths.push(Path::from_curves(&curves, false));
                        curves.clear();
                    }
                    start = p;
                    current = p;
                }
                PathEl::LineTo(p) => {
                    curves.push(line(current, p));
                    current = p;
                }
                PathEl::QuadTo(a, p) => {
                    curves.push(QuadBez::new(current, a, p).raise());
                    current = p;
                }
                PathEl::CurveTo(a, b, p) => {
                    curves.push(CubicBez::new(current, a, b, p));
                    current = p;
                }
                PathEl::ClosePath => {
                    if current.distance(start) > 1e-9 {
                        curves.push(line(current, start));
                    } else if let Some(last) = curves.last_mut() {
                        last.p3 = start;
                    }
                    if !curves.is_empty() {
                        paths.push(Path::from_curves(&curves, true));
                        curves.clear();
                    }
                    current = start;
                }
            }
        }
        if !curves.is_empty() {
            paths.push(Path::from_curves(&curves, false));
        }

        Self::from_paths(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Circle;

    fn square(x: f64, y: f64, size: f64) -> Path {
        Path::from_points(
            &[
                Point::new(x, y),
                Point::new(x + size, y),
                Point::new(x + size, y + size),
                Point::new(x, y + size),
            ],
            true,
        )
    }

    #[test]
    fn test_square_area_and_orientation() {
        let sq = square(0.0, 0.0, 2.0);
        assert!((sq.signed_area() - 4.0).abs() < 1e-12);
        assert!(sq.is_clockwise());
        let rev = sq.reversed();
        assert!((rev.signed_area() + 4.0).abs() < 1e-12);
        assert!(!rev.is_clockwise());
    }

    #[test]
    fn test_open_path_has_no_area() {
        let p = Path::from_points(&[Point::new(0.0, 0.0), Point::new(5.0, 5.0)], false);
        assert_eq!(p.signed_area(), 0.0);
        assert_eq!(p.curves().len(), 1);
    }

    #[test]
    fn test_curves_round_trip() {
        let circle = PathItem::from_bez_path(&Circle::new((0.0, 0.0), 3.0).to_path(1e-3));
        let PathItem::Simple(path) = circle else {
            panic!("expected a single path");
        };
        assert!(path.closed);
        let rebuilt = Path::from_curves(&path.curves(), true);
        assert_eq!(rebuilt.segments.len(), path.segments.len());
        for (a, b) in rebuilt.segments.iter().zip(&path.segments) {
            assert_eq!(a.point, b.point);
            assert!((a.handle_in - b.handle_in).hypot() < 1e-9);
            assert!((a.handle_out - b.handle_out).hypot() < 1e-9);
        }
        let expected = std::f64::consts::PI * 9.0;
        assert!((path.signed_area().abs() - expected).abs() < 1e-2);
    }

    #[test]
    fn test_bez_path_conversion() {
        let rect = Rect::new(0.0, 0.0, 4.0, 3.0).to_path(0.1);
        let item = PathItem::from_bez_path(&rect);
        assert_eq!(item.paths().len(), 1);
        assert!((item.area().abs() - 12.0).abs() < 1e-12);
        let back = PathItem::from_bez_path(&item.to_bez_path());
        assert_eq!(back, item);
    }

    #[test]
    fn test_multiple_subpaths_become_compound() {
        let mut bez = square(0.0, 0.0, 10.0).to_bez_path();
        for el in square(3.0, 3.0, 4.0).reversed().to_bez_path().elements() {
            bez.push(*el);
        }
        let item = PathItem::from_bez_path(&bez);
        assert!(matches!(item, PathItem::Compound(_)));
        assert!((item.area() - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box() {
        let item = PathItem::from_paths(vec![square(0.0, 0.0, 1.0), square(5.0, 2.0, 1.0)]);
        let bb = item.bounding_box().unwrap();
        assert_eq!(bb, Rect::new(0.0, 0.0, 6.0, 3.0));
        assert!(PathItem::default().bounding_box().is_none());
    }

    #[test]
    fn test_flatten_and_contains() {
        let sq = square(0.0, 0.0, 4.0);
        assert_eq!(sq.flatten(FLATTEN_TOLERANCE).len(), 4);
        assert!(sq.contains(Point::new(2.0, 2.0)));
        assert!(!sq.contains(Point::new(5.0, 2.0)));
    }

    #[test]
    fn test_self_intersection() {
        let bowtie = Path::from_points(
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 10.0),
            ],
            true,
        );
        assert!(bowtie.is_self_intersecting());
        assert!(!square(0.0, 0.0, 1.0).is_self_intersecting());
    }
}
