//! Polygons, point-in-region testers, lasso filtering and shape classifiers.

use crate::path::Vertex;
use crate::point::{Bounds, Point};

/// Number of sides used to approximate an ellipse.
pub const CIRCLE_SIDES: usize = 32;

/// Cell index of the 0 degree ellipse vertex.
pub const I000: usize = 0;
/// Cell index of the 90 degree ellipse vertex.
pub const I090: usize = CIRCLE_SIDES / 4;
/// Cell index of the 180 degree ellipse vertex.
pub const I180: usize = CIRCLE_SIDES / 2;
/// Cell index of the 270 degree ellipse vertex.
pub const I270: usize = CIRCLE_SIDES / 4 * 3;

/// Maximum lasso deviation from straight, in pixels, before a point is kept.
pub const BENDPX: f64 = 1.5;

/// Absolute tolerance for shape classification.
pub const ALMOST_EQ_EPSILON: f64 = 1e-6;

pub const SQRT2: f64 = std::f64::consts::SQRT_2;
pub const COS45: f64 = std::f64::consts::FRAC_1_SQRT_2;
pub const SIN45: f64 = std::f64::consts::FRAC_1_SQRT_2;

pub fn almost_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= ALMOST_EQ_EPSILON
}

pub fn points_almost_eq(a: Point, b: Point) -> bool {
    almost_eq(a.x, b.x) && almost_eq(a.y, b.y)
}

/// An ordered list of vertices starting with a move, plus a subtract flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
    /// This polygon's area is removed from, not added to, the combined region.
    pub subtract: bool,
}

impl Polygon {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            subtract: false,
        }
    }

    /// Build a polyline or closed polygon from points.
    ///
    /// Closed polygons end with an explicit line back to the first point and a
    /// close vertex.
    pub fn from_points(points: &[Point], closed: bool) -> Self {
        let mut vertices = Vec::with_capacity(points.len() + 2);
        for (i, p) in points.iter().enumerate() {
            vertices.push(if i == 0 { Vertex::Move(*p) } else { Vertex::Line(*p) });
        }
        if closed && !points.is_empty() {
            let first = points[0];
            if points.len() == 1 || points[points.len() - 1] != first {
                vertices.push(Vertex::Line(first));
            }
            vertices.push(Vertex::Close);
        }
        Self::new(vertices)
    }

    pub fn with_subtract(mut self, subtract: bool) -> Self {
        self.subtract = subtract;
        self
    }

    /// Vertices that carry coordinates (everything but close commands).
    pub fn cell(&self) -> Vec<Vertex> {
        self.vertices.iter().copied().filter(|v| !v.is_close()).collect()
    }

    /// Endpoints of the cell, in order.
    pub fn points(&self) -> Vec<Point> {
        self.vertices.iter().filter_map(Vertex::end).collect()
    }

    /// Endpoints without a trailing repeat of the first point.
    pub fn ring(&self) -> Vec<Point> {
        let mut pts = self.points();
        if pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        pts
    }

    pub fn is_closed(&self) -> bool {
        self.vertices.last().is_some_and(Vertex::is_close)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Bounds over vertex endpoints; control points are not included.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(self.points())
    }

    pub fn is_rect(&self) -> bool {
        points_on_rectangle(&self.points())
    }

    pub fn is_ellipse(&self) -> bool {
        points_on_ellipse(&self.points())
    }

    /// Move every coordinate, control points included.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for v in &mut self.vertices {
            *v = v.map_points(|p| p.translate(dx, dy));
        }
    }

    /// Area enclosed by the endpoint ring (absolute value).
    pub fn area(&self) -> f64 {
        ring_area(&self.ring()).abs()
    }
}

/// Signed shoelace area of a ring.
pub fn ring_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Classic crossing-number test; boundary points may fall either way.
pub fn point_in_ring(p: Point, ring: &[Point]) -> bool {
    let mut inside = false;
    if ring.is_empty() {
        return false;
    }
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from a point to a segment.
pub fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

fn on_ring_boundary(p: Point, ring: &[Point], tolerance: f64) -> bool {
    (0..ring.len()).any(|i| segment_distance(p, ring[i], ring[(i + 1) % ring.len()]) <= tolerance)
}

/// Subtract flag of a polygon given the polygons listed before it.
///
/// Every previous polygon that contains a vertex of this one toggles the flag.
/// Vertices lying on a previous polygon's boundary do not count.
pub fn subtract_flag(ring: &[Point], previous: &[Vec<Point>]) -> bool {
    let mut subtract = false;
    for prev in previous {
        let inside = ring
            .iter()
            .any(|p| !on_ring_boundary(*p, prev, ALMOST_EQ_EPSILON) && point_in_ring(*p, prev));
        if inside {
            subtract = !subtract;
        }
    }
    subtract
}

/// Recompute subtract flags across a list of polygons, in order.
pub fn assign_subtract_flags(polygons: &mut [Polygon]) {
    let rings: Vec<Vec<Point>> = polygons.iter().map(Polygon::ring).collect();
    for (i, polygon) in polygons.iter_mut().enumerate() {
        polygon.subtract = subtract_flag(&rings[i], &rings[..i]);
    }
}

/// Point-in-polygon tester over a closed ring of points.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonTester {
    pts: Vec<Point>,
    bounds: Bounds,
    is_rect: bool,
    degenerate: bool,
    pub subtract: bool,
}

impl PolygonTester {
    /// Build a tester; the ring is closed if it is not already.
    pub fn new(points: &[Point]) -> Self {
        let mut pts = points.to_vec();
        if let (Some(first), Some(last)) = (pts.first().copied(), pts.last().copied())
            && first != last
        {
            pts.push(first);
        }

        let bounds = Bounds::from_points(pts.iter().copied());

        let is_rect = pts.len() == 5
            && ((pts[0].x == pts[1].x
                && pts[2].x == pts[3].x
                && pts[0].y == pts[3].y
                && pts[1].y == pts[2].y)
                || (pts[0].y == pts[1].y
                    && pts[2].y == pts[3].y
                    && pts[0].x == pts[3].x
                    && pts[1].x == pts[2].x));

        let degenerate = pts.windows(2).all(|w| w[0] == w[1]);

        Self {
            pts,
            bounds,
            is_rect,
            degenerate,
            subtract: false,
        }
    }

    /// Tester for a polygon's endpoint ring, carrying its subtract flag.
    pub fn from_polygon(polygon: &Polygon) -> Self {
        let mut tester = Self::new(&polygon.points());
        tester.subtract = polygon.subtract;
        tester
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn is_rect(&self) -> bool {
        self.is_rect
    }

    /// All points are identical.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Closed ring of points (first point repeated at the end).
    pub fn points(&self) -> &[Point] {
        &self.pts
    }

    fn outside_bounds(&self, pt: Point) -> bool {
        !pt.x.is_finite()
            || !pt.y.is_finite()
            || pt.x < self.bounds.xmin
            || pt.x > self.bounds.xmax
            || pt.y < self.bounds.ymin
            || pt.y > self.bounds.ymax
    }

    /// Is the point inside the polygon, edges included.
    ///
    /// With `omit_first_edge`, points exactly on the first edge are outside, so
    /// adjacent polygons do not both claim a shared edge.
    pub fn contains(&self, pt: Point, omit_first_edge: bool) -> bool {
        if self.pts.is_empty() || self.outside_bounds(pt) {
            return false;
        }

        if self.is_rect {
            if omit_first_edge {
                let on_first_edge = if self.pts[0].x == self.pts[1].x {
                    pt.x == self.pts[0].x
                } else {
                    pt.y == self.pts[0].y
                };
                if on_first_edge {
                    return false;
                }
            }
            return true;
        }

        let (x, y) = (pt.x, pt.y);
        let mut x1 = self.pts[0].x;
        let mut y1 = self.pts[0].y;
        let mut crossings = 0usize;

        for i in 1..self.pts.len() {
            // Count crossings of a vertical ray going up from the point
            let (x0, y0) = (x1, y1);
            x1 = self.pts[i].x;
            y1 = self.pts[i].y;
            let xmini = x0.min(x1);

            if x < xmini || x > x0.max(x1) || y > y0.max(y1) {
                continue;
            } else if y < y0.min(y1) {
                if x != xmini {
                    crossings += 1;
                }
            } else {
                let ycross = if x1 == x0 {
                    y
                } else {
                    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
                };

                if y == ycross {
                    return !(i == 1 && omit_first_edge);
                }
                if y <= ycross && x != xmini {
                    crossings += 1;
                }
            }
        }

        crossings % 2 == 1
    }
}

/// Tester matching one point of one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointTester {
    pub trace: usize,
    pub point_number: usize,
    pub subtract: bool,
}

/// Session-scoped selection definition.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionDef {
    Polygon(Polygon),
    Point(PointTester),
}

impl SelectionDef {
    pub fn subtract(&self) -> bool {
        match self {
            SelectionDef::Polygon(p) => p.subtract,
            SelectionDef::Point(p) => p.subtract,
        }
    }
}

/// A read-only point-containment predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Tester {
    Polygon(PolygonTester),
    Point(PointTester),
    Multi(MultiTester),
}

impl Tester {
    /// Bounds of the tested area; point testers report an empty box at the origin.
    pub fn bounds(&self) -> Bounds {
        match self {
            Tester::Polygon(t) => t.bounds(),
            Tester::Point(_) => Bounds {
                xmin: 0.0,
                xmax: 0.0,
                ymin: 0.0,
                ymax: 0.0,
            },
            Tester::Multi(t) => t.bounds,
        }
    }

    pub fn subtract(&self) -> bool {
        match self {
            Tester::Polygon(t) => t.subtract,
            Tester::Point(t) => t.subtract,
            Tester::Multi(_) => false,
        }
    }

    pub fn is_rect(&self) -> bool {
        matches!(self, Tester::Polygon(t) if t.is_rect())
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Tester::Polygon(t) if t.is_degenerate())
    }

    /// Is the point selected.
    ///
    /// `point_number` and `trace` identify the data point; only point testers
    /// look at them.
    pub fn contains(&self, pt: Point, omit_first_edge: bool, point_number: usize, trace: usize) -> bool {
        match self {
            Tester::Polygon(t) => t.contains(pt, omit_first_edge),
            Tester::Point(t) => t.trace == trace && t.point_number == point_number,
            Tester::Multi(t) => t.contains(pt, omit_first_edge, point_number, trace),
        }
    }
}

/// Ordered combination of testers.
///
/// A point is selected when the last tester containing it is not a subtract
/// tester; later additive testers can re-include points an earlier subtract
/// tester excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTester {
    testers: Vec<Tester>,
    bounds: Bounds,
}

impl MultiTester {
    pub fn contains(&self, pt: Point, omit_first_edge: bool, point_number: usize, trace: usize) -> bool {
        let mut contained = false;
        for tester in &self.testers {
            if tester.contains(pt, omit_first_edge, point_number, trace) {
                contained = !tester.subtract();
            }
        }
        contained
    }

    pub fn testers(&self) -> &[Tester] {
        &self.testers
    }
}

/// Tester for a single definition.
pub fn tester_for(def: &SelectionDef) -> Tester {
    match def {
        SelectionDef::Polygon(p) => Tester::Polygon(PolygonTester::from_polygon(p)),
        SelectionDef::Point(p) => Tester::Point(*p),
    }
}

/// Combine definitions into one tester; `None` for an empty list.
pub fn multi_tester(defs: &[SelectionDef]) -> Option<Tester> {
    let first = defs.first()?;
    let origin = match first {
        SelectionDef::Polygon(p) => p.points().first().copied().unwrap_or_default(),
        SelectionDef::Point(_) => Point::default(),
    };
    let mut bounds = Bounds::EMPTY.extend(origin);
    let mut testers = Vec::with_capacity(defs.len());

    for def in defs {
        let tester = tester_for(def);
        if let Tester::Polygon(t) = &tester {
            bounds = bounds.union(t.bounds());
        }
        testers.push(tester);
    }

    Some(Tester::Multi(MultiTester { testers, bounds }))
}

/// Tester over already merged polygons (single polygon testers stay plain).
pub fn merged_tester(polygons: &[Polygon]) -> Option<Tester> {
    match polygons {
        [] => None,
        [single] => Some(Tester::Polygon(PolygonTester::from_polygon(single))),
        _ => {
            let defs: Vec<SelectionDef> = polygons.iter().cloned().map(SelectionDef::Polygon).collect();
            multi_tester(&defs)
        }
    }
}

/// Is the run of points between `start` and `end` bent by more than `tolerance`.
pub fn is_segment_bent(pts: &[Point], start: usize, end: usize, tolerance: f64) -> bool {
    let start_pt = pts[start];
    let seg = (pts[end].x - start_pt.x, pts[end].y - start_pt.y);
    let seg_squared = seg.0 * seg.0 + seg.1 * seg.1;
    let seg_len = seg_squared.sqrt();
    let unit_perp = (-seg.1 / seg_len, seg.0 / seg_len);

    for p in &pts[start + 1..end] {
        let part = (p.x - start_pt.x, p.y - start_pt.y);
        let parallel = part.0 * seg.0 + part.1 * seg.1;
        let perp = part.0 * unit_perp.0 + part.1 * unit_perp.1;
        if parallel < 0.0 || parallel > seg_squared || perp.abs() > tolerance {
            return true;
        }
    }
    false
}

/// Incremental polyline simplifier for freeform lasso input.
#[derive(Debug, Clone)]
pub struct LassoFilter {
    raw: Vec<Point>,
    filtered: Vec<Point>,
    done_raw: usize,
    done_filtered: usize,
    tolerance: f64,
}

impl LassoFilter {
    /// Start filtering from at least one point.
    pub fn new(start: Point, tolerance: f64) -> Self {
        Self {
            raw: vec![start],
            filtered: vec![start],
            done_raw: 0,
            done_filtered: 0,
            tolerance,
        }
    }

    /// Filter a whole list of points.
    pub fn from_points(points: &[Point], tolerance: f64) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut filter = Self::new(*first, tolerance);
        for p in rest {
            filter.add_point(*p);
        }
        Some(filter)
    }

    /// Add a raw point and refilter the unsettled tail.
    pub fn add_point(&mut self, pt: Point) {
        self.raw.push(pt);
        let prev_len = self.filtered.len();
        let mut i_last = self.done_raw;
        self.filtered.truncate(self.done_filtered + 1);

        for i in i_last + 1..self.raw.len() {
            if i == self.raw.len() - 1 || is_segment_bent(&self.raw, i_last, i + 1, self.tolerance) {
                self.filtered.push(self.raw[i]);
                if self.filtered.len() + 2 < prev_len {
                    self.done_raw = i;
                    self.done_filtered = self.filtered.len() - 1;
                }
                i_last = i;
            }
        }
    }

    pub fn raw(&self) -> &[Point] {
        &self.raw
    }

    pub fn filtered(&self) -> &[Point] {
        &self.filtered
    }
}

fn dist(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Four axis-aligned corners plus a closing point, nonzero area.
///
/// Rotated quads are not rectangles.
pub fn points_on_rectangle(cell: &[Point]) -> bool {
    if cell.len() != 5 {
        return false;
    }

    let coords: [fn(&Point) -> f64; 2] = [|p| p.x, |p| p.y];
    for c in coords {
        let e01 = c(&cell[0]) - c(&cell[1]);
        let e32 = c(&cell[3]) - c(&cell[2]);
        if !almost_eq(e01, e32) {
            return false;
        }
        let e03 = c(&cell[0]) - c(&cell[3]);
        let e12 = c(&cell[1]) - c(&cell[2]);
        if !almost_eq(e03, e12) {
            return false;
        }
    }

    if !almost_eq(cell[0].x, cell[1].x) && !almost_eq(cell[0].x, cell[3].x) {
        return false;
    }

    dist(cell[0], cell[1]) * dist(cell[0], cell[3]) != 0.0
}

/// Symmetry check standing in for "is an ellipse approximation".
pub fn points_on_ellipse(cell: &[Point]) -> bool {
    if cell.len() != CIRCLE_SIDES + 1 {
        return false;
    }

    let len = CIRCLE_SIDES;
    for i in 0..len {
        let k = (len * 2 - i) % len;
        let k2 = (len / 2 + k) % len;
        let i2 = (len / 2 + i) % len;
        if !almost_eq(dist(cell[i], cell[i2]), dist(cell[k], cell[k2])) {
            return false;
        }
    }
    true
}

/// Grow a drag box so an inscribed ellipse passes through the drag corner.
///
/// Returns the two opposite corners of the bounding box.
pub fn ellipse_over(p0: Point, p1: Point) -> (Point, Point) {
    let mut dx = p1.x - p0.x;
    let mut dy = p1.y - p0.y;
    let x0 = p0.x - dx;
    let y0 = p0.y - dy;
    let cx = (x0 + p1.x) / 2.0;
    let cy = (y0 + p1.y) / 2.0;
    dx *= SQRT2;
    dy *= SQRT2;
    (Point::new(cx - dx, cy - dy), Point::new(cx + dx, cy + dy))
}

/// Points of the live line or ellipse between two drag positions.
pub fn handle_ellipse(is_ellipse: bool, start: Point, end: Point) -> Vec<Point> {
    if !is_ellipse {
        return vec![start, end];
    }

    let (a, b) = ellipse_over(start, end);
    let cx = (b.x + a.x) / 2.0;
    let cy = (b.y + a.y) / 2.0;
    let mut rx = (b.x - a.x) / 2.0;
    let mut ry = (b.y - a.y) / 2.0;

    // make a circle when one dimension is zero
    if rx == 0.0 {
        ry /= SQRT2;
        rx = ry;
    }
    if ry == 0.0 {
        rx /= SQRT2;
        ry = rx;
    }

    (0..CIRCLE_SIDES)
        .map(|i| {
            let t = i as f64 * 2.0 * std::f64::consts::PI / CIRCLE_SIDES as f64;
            Point::new(cx + rx * t.cos(), cy + ry * t.sin())
        })
        .collect()
}

/// Corners of an axis-aligned box in drag order.
pub fn rect_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
    vec![
        Point::new(x0, y0),
        Point::new(x0, y1),
        Point::new(x1, y1),
        Point::new(x1, y0),
    ]
}

/// Flatten several polygons into one closed point list.
///
/// Each ring is followed by its first point. The result is flagged as a
/// rectangle (with its bounds) when it is a single axis-aligned box.
pub fn cast_multi_polygon(polygons: &[Polygon]) -> (Vec<Point>, Option<Bounds>) {
    let mut pts = Vec::new();
    for polygon in polygons {
        let ring = polygon.ring();
        if let Some(first) = ring.first().copied() {
            pts.extend(ring);
            pts.push(first);
        }
    }

    let is_rect = pts.len() == 5
        && pts[0] == pts[4]
        && ((pts[0].x == pts[1].x
            && pts[2].x == pts[3].x
            && pts[0].y == pts[3].y
            && pts[1].y == pts[2].y)
            || (pts[0].y == pts[1].y
                && pts[2].y == pts[3].y
                && pts[0].x == pts[3].x
                && pts[1].x == pts[2].x));

    let rect = is_rect.then(|| Bounds {
        xmin: pts[0].x.min(pts[2].x),
        xmax: pts[0].x.max(pts[2].x),
        ymin: pts[0].y.min(pts[2].y),
        ymax: pts[0].y.max(pts[2].y),
    });
    (pts, rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn pts(list: &[(f64, f64)]) -> Vec<Point> {
        list.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_tester_closes_ring_and_bounds() {
        let t = PolygonTester::new(&pts(&[(0.0, 0.0), (4.0, 0.0), (2.0, 3.0)]));
        assert_eq!(t.points().len(), 4);
        let b = t.bounds();
        assert_eq!((b.xmin, b.xmax, b.ymin, b.ymax), (0.0, 4.0, 0.0, 3.0));
        assert!(!t.is_rect());
    }

    #[test]
    fn test_triangle_contains() {
        let t = PolygonTester::new(&pts(&[(0.0, 0.0), (4.0, 0.0), (2.0, 3.0)]));
        assert!(t.contains(Point::new(2.0, 1.0), false));
        assert!(!t.contains(Point::new(0.5, 2.0), false));
        assert!(!t.contains(Point::new(10.0, 1.0), false));
        // on an edge counts as inside
        assert!(t.contains(Point::new(2.0, 0.0), false));
        // unless it is the first edge and we omit it
        assert!(!t.contains(Point::new(2.0, 0.0), true));
    }

    #[test]
    fn test_rect_fast_path() {
        let t = PolygonTester::new(&rect_points(0.0, 0.0, 4.0, 2.0));
        assert!(t.is_rect());
        assert!(t.contains(Point::new(1.0, 1.0), false));
        assert!(t.contains(Point::new(0.0, 1.0), false));
        assert!(!t.contains(Point::new(0.0, 1.0), true));
        assert!(!t.contains(Point::new(5.0, 1.0), false));
        assert!(!t.contains(Point::new(f64::NAN, 1.0), false));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape
        let t = PolygonTester::new(&pts(&[
            (0.0, 0.0),
            (0.0, 3.0),
            (1.0, 3.0),
            (1.0, 1.0),
            (2.0, 1.0),
            (2.0, 3.0),
            (3.0, 3.0),
            (3.0, 0.0),
        ]));
        assert!(t.contains(Point::new(0.5, 2.0), false));
        assert!(!t.contains(Point::new(1.5, 2.0), false));
        assert!(t.contains(Point::new(1.5, 0.5), false));
    }

    #[test]
    fn test_degenerate_tester() {
        let t = PolygonTester::new(&pts(&[(1.0, 1.0), (1.0, 1.0)]));
        assert!(t.is_degenerate());
        let t = PolygonTester::new(&pts(&[(1.0, 1.0), (2.0, 1.0)]));
        assert!(!t.is_degenerate());
    }

    #[test]
    fn test_multi_tester_subtract_priority() {
        let big = Polygon::from_points(&rect_points(0.0, 0.0, 10.0, 10.0), true);
        let hole = Polygon::from_points(&rect_points(2.0, 2.0, 8.0, 8.0), true).with_subtract(true);
        let island = Polygon::from_points(&rect_points(4.0, 4.0, 6.0, 6.0), true);

        let defs = vec![SelectionDef::Polygon(big.clone()), SelectionDef::Polygon(hole.clone())];
        let tester = multi_tester(&defs).unwrap();
        assert!(tester.contains(Point::new(1.0, 1.0), false, 0, 0));
        assert!(!tester.contains(Point::new(5.0, 5.0), false, 0, 0));

        let defs = vec![
            SelectionDef::Polygon(big),
            SelectionDef::Polygon(hole),
            SelectionDef::Polygon(island),
        ];
        let tester = multi_tester(&defs).unwrap();
        // a later additive tester re-includes the point
        assert!(tester.contains(Point::new(5.0, 5.0), false, 0, 0));
        assert!(!tester.contains(Point::new(3.0, 3.0), false, 0, 0));
        let b = tester.bounds();
        assert_eq!((b.xmin, b.xmax), (0.0, 10.0));
    }

    #[test]
    fn test_multi_tester_order_of_subtracts() {
        let a = Polygon::from_points(&rect_points(0.0, 0.0, 10.0, 10.0), true);
        let s1 = Polygon::from_points(&rect_points(0.0, 0.0, 6.0, 6.0), true).with_subtract(true);
        let s2 = Polygon::from_points(&rect_points(4.0, 4.0, 10.0, 10.0), true).with_subtract(true);
        let defs = vec![
            SelectionDef::Polygon(a.clone()),
            SelectionDef::Polygon(s1.clone()),
            SelectionDef::Polygon(s2.clone()),
        ];
        let tester = multi_tester(&defs).unwrap();
        assert!(!tester.contains(Point::new(5.0, 5.0), false, 0, 0));
        assert!(tester.contains(Point::new(8.0, 1.0), false, 0, 0));

        // an additive polygon listed before the subtracts does not win
        let defs = vec![
            SelectionDef::Polygon(a),
            SelectionDef::Polygon(s1),
            SelectionDef::Polygon(Polygon::from_points(&rect_points(4.5, 4.5, 5.5, 5.5), true)),
            SelectionDef::Polygon(s2),
        ];
        let tester = multi_tester(&defs).unwrap();
        assert!(!tester.contains(Point::new(5.0, 5.0), false, 0, 0));
    }

    #[test]
    fn test_point_tester_matches_trace_and_number() {
        let def = SelectionDef::Point(PointTester {
            trace: 1,
            point_number: 7,
            subtract: false,
        });
        let tester = multi_tester(&[def]).unwrap();
        assert!(tester.contains(Point::new(100.0, 100.0), false, 7, 1));
        assert!(!tester.contains(Point::new(100.0, 100.0), false, 7, 0));
        assert!(!tester.contains(Point::new(100.0, 100.0), false, 6, 1));
        assert!(multi_tester(&[]).is_none());
    }

    #[test]
    fn test_is_segment_bent() {
        let line = pts(&[(0.0, 0.0), (1.0, 0.1), (2.0, 0.0)]);
        assert!(!is_segment_bent(&line, 0, 2, 1.5));
        let bent = pts(&[(0.0, 0.0), (1.0, 3.0), (2.0, 0.0)]);
        assert!(is_segment_bent(&bent, 0, 2, 1.5));
        // going backwards is bent
        let back = pts(&[(0.0, 0.0), (-1.0, 0.0), (2.0, 0.0)]);
        assert!(is_segment_bent(&back, 0, 2, 1.5));
    }

    #[test]
    fn test_lasso_filter_drops_straight_points() {
        let mut filter = LassoFilter::new(Point::new(0.0, 0.0), BENDPX);
        for i in 1..=10 {
            filter.add_point(Point::new(i as f64, 0.0));
        }
        assert_eq!(filter.raw().len(), 11);
        assert_eq!(filter.filtered(), &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);

        filter.add_point(Point::new(10.0, 10.0));
        assert_eq!(
            filter.filtered(),
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]
        );
    }

    #[test]
    fn test_lasso_filter_from_points() {
        let f = LassoFilter::from_points(&pts(&[(0.0, 0.0), (5.0, 0.2), (10.0, 0.0)]), BENDPX).unwrap();
        assert_eq!(f.filtered().len(), 2);
        assert!(LassoFilter::from_points(&[], BENDPX).is_none());
    }

    #[test]
    fn test_rectangle_classifier() {
        let mut cell = rect_points(1.0, 1.0, 5.0, 7.0);
        cell.push(cell[0]);
        assert!(points_on_rectangle(&cell));

        // zero width
        let mut flat = rect_points(1.0, 1.0, 1.0, 7.0);
        flat.push(flat[0]);
        assert!(!points_on_rectangle(&flat));

        // rotated square
        let diamond = pts(&[(0.0, 1.0), (1.0, 2.0), (2.0, 1.0), (1.0, 0.0), (0.0, 1.0)]);
        assert!(!points_on_rectangle(&diamond));

        assert!(!points_on_rectangle(&cell[..4]));
    }

    #[test]
    fn test_ellipse_classifier_accepts_drawn_ellipse() {
        let mut cell = handle_ellipse(true, Point::new(50.0, 50.0), Point::new(80.0, 60.0));
        assert_eq!(cell.len(), CIRCLE_SIDES);
        cell.push(cell[0]);
        assert!(points_on_ellipse(&cell));

        cell[3].x += 1.0;
        assert!(!points_on_ellipse(&cell));
    }

    #[test]
    fn test_handle_ellipse_zero_dimension_makes_circle() {
        let cell = handle_ellipse(true, Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        let centre = Point::new(0.0, 0.0);
        let r0 = cell[I000].distance(centre);
        let r90 = cell[I090].distance(centre);
        assert!(approx_eq(r0, r90));
        assert!(approx_eq(r0, 10.0));
    }

    #[test]
    fn test_handle_ellipse_line_mode() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(handle_ellipse(false, a, b), vec![a, b]);
    }

    #[test]
    fn test_ellipse_over() {
        let (a, b) = ellipse_over(Point::new(10.0, 10.0), Point::new(12.0, 13.0));
        // centred on the start point
        assert!(approx_eq((a.x + b.x) / 2.0, 10.0));
        assert!(approx_eq((a.y + b.y) / 2.0, 10.0));
        assert!(approx_eq(b.x - a.x, 4.0 * SQRT2));
    }

    #[test]
    fn test_subtract_flags_for_nested_rings() {
        let mut polys = vec![
            Polygon::from_points(&rect_points(0.0, 0.0, 10.0, 10.0), true),
            Polygon::from_points(&rect_points(2.0, 2.0, 8.0, 8.0), true),
            Polygon::from_points(&rect_points(4.0, 4.0, 6.0, 6.0), true),
            Polygon::from_points(&rect_points(20.0, 0.0, 30.0, 10.0), true),
        ];
        assign_subtract_flags(&mut polys);
        let flags: Vec<bool> = polys.iter().map(|p| p.subtract).collect();
        assert_eq!(flags, vec![false, true, false, false]);
    }

    #[test]
    fn test_polygon_from_points_and_ring() {
        let p = Polygon::from_points(&rect_points(0.0, 0.0, 2.0, 2.0), true);
        assert_eq!(p.vertices.len(), 6);
        assert!(p.is_closed());
        assert_eq!(p.points().len(), 5);
        assert_eq!(p.ring().len(), 4);
        assert!(p.is_rect());
        assert!(approx_eq(p.area(), 4.0));

        let line = Polygon::from_points(&pts(&[(0.0, 0.0), (1.0, 1.0)]), false);
        assert!(!line.is_closed());
        assert_eq!(line.cell().len(), 2);
    }

    #[test]
    fn test_cast_multi_polygon() {
        let rect = Polygon::from_points(&rect_points(1.0, 2.0, 3.0, 4.0), true);
        let (flat, bounds) = cast_multi_polygon(std::slice::from_ref(&rect));
        assert_eq!(flat.len(), 5);
        let b = bounds.unwrap();
        assert_eq!((b.xmin, b.xmax, b.ymin, b.ymax), (1.0, 3.0, 2.0, 4.0));

        let (flat, bounds) = cast_multi_polygon(&[rect.clone(), rect]);
        assert_eq!(flat.len(), 10);
        assert!(bounds.is_none());
    }
}
