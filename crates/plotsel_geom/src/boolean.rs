//! Union and difference of polygon regions.
//!
//! A region is a list of non-crossing rings read with the even-odd rule. It is
//! split into pieces, each a filled outline plus the holes directly inside it,
//! and pieces are combined with closed polyline booleans from
//! `cavalier_contours`. A self-crossing lasso is first cut into simple loops at
//! its crossings. Curved vertices contribute only their endpoints.

use cavalier_contours::polyline::{BooleanOp, PlineSource, PlineSourceMut, Polyline};

use crate::point::{Bounds, Point};
use crate::polygon::{Polygon, assign_subtract_flags, points_almost_eq, ring_area};

type Pline = Polyline<f64>;

/// Relative tolerance for comparing areas of polyline results.
const AREA_TOLERANCE: f64 = 1e-6;

/// Union of a region (list of polygons) with one more polygon.
pub fn union(existing: &[Polygon], next: &Polygon) -> Vec<Polygon> {
    if existing.is_empty() && simple_loops(&next.ring()).len() == 1 {
        let mut only = next.clone();
        only.subtract = false;
        return vec![only];
    }
    let mut pieces = pieces_of(existing);
    for shape in lasso_pieces(next) {
        pieces = union_piece(pieces, shape);
    }
    finish(&pieces, "union")
}

/// Region minus one polygon.
pub fn difference(existing: &[Polygon], next: &Polygon) -> Vec<Polygon> {
    if existing.is_empty() {
        return Vec::new();
    }
    let mut pieces = pieces_of(existing);
    for shape in lasso_pieces(next) {
        pieces = difference_piece(pieces, &shape);
    }
    finish(&pieces, "difference")
}

/// Merge a new polygon into a region, adding or subtracting its area.
///
/// The result lists containers before the rings they contain, each tagged with
/// its subtract flag.
pub fn merge(existing: &[Polygon], next: &Polygon, subtract: bool) -> Vec<Polygon> {
    if subtract {
        difference(existing, next)
    } else {
        union(existing, next)
    }
}

/// One filled outline and the holes directly inside it.
#[derive(Debug, Clone)]
struct Piece {
    outer: Pline,
    holes: Vec<Pline>,
}

impl Piece {
    fn solid(outer: Pline) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }
}

fn cross(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

/// Closed counter clockwise polyline through a ring, or `None` when the ring
/// encloses no area.
fn to_pline(ring: &[Point]) -> Option<Pline> {
    let mut pts = ring.to_vec();
    pts.dedup_by(|a, b| points_almost_eq(*a, *b));
    while pts.len() > 1 && pts.first().zip(pts.last()).is_some_and(|(a, b)| points_almost_eq(*a, *b)) {
        pts.pop();
    }
    let area = ring_area(&pts);
    if pts.len() < 3 || area.abs() <= f64::EPSILON {
        return None;
    }
    if area < 0.0 {
        pts.reverse();
    }
    let mut pline = Polyline::new_closed();
    for p in pts {
        pline.add(p.x, p.y, 0.0);
    }
    Some(pline)
}

fn raw_points(pline: &Pline) -> Vec<Point> {
    pline.vertex_data.iter().map(|v| Point::new(v.x, v.y)).collect()
}

fn abs_area(pline: &Pline) -> f64 {
    pline.area().abs()
}

fn same_area(a: f64, b: f64) -> bool {
    (a - b).abs() <= AREA_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Outlines with the same vertex set, in any starting order.
fn same_outline(a: &Pline, b: &Pline) -> bool {
    let (pa, pb) = (raw_points(a), raw_points(b));
    pa.len() == pb.len()
        && same_area(abs_area(a), abs_area(b))
        && pa.iter().all(|p| pb.iter().any(|q| points_almost_eq(*p, *q)))
}

/// Positive and negative result polylines of a boolean, all counter clockwise.
fn boolean(a: &Pline, b: &Pline, op: BooleanOp) -> (Vec<Pline>, Vec<Pline>) {
    let result = a.boolean(b, op);
    let pos = result.pos_plines.iter().filter_map(|r| to_pline(&raw_points(&r.pline))).collect();
    let neg = result.neg_plines.iter().filter_map(|r| to_pline(&raw_points(&r.pline))).collect();
    (pos, neg)
}

/// Split a region into pieces. Each hole goes to the smallest outline whose
/// bounds hold it.
fn pieces_of(polygons: &[Polygon]) -> Vec<Piece> {
    let mut pieces: Vec<Piece> = Vec::new();
    let mut holes: Vec<Pline> = Vec::new();
    for polygon in polygons {
        let Some(pline) = to_pline(&polygon.ring()) else {
            continue;
        };
        if polygon.subtract {
            holes.push(pline);
        } else {
            pieces.push(Piece::solid(pline));
        }
    }

    for hole in holes {
        let hole_bounds = Bounds::from_points(raw_points(&hole));
        let hole_area = abs_area(&hole);
        let owner = pieces
            .iter_mut()
            .filter(|p| abs_area(&p.outer) > hole_area && holds(Bounds::from_points(raw_points(&p.outer)), hole_bounds))
            .min_by(|a, b| abs_area(&a.outer).total_cmp(&abs_area(&b.outer)));
        match owner {
            Some(piece) => piece.holes.push(hole),
            None => log::debug!("Dropping a hole that lies outside every outline"),
        }
    }
    pieces
}

fn holds(outer: Bounds, inner: Bounds) -> bool {
    let tol = 1e-9 * outer.width().max(outer.height()).max(1.0);
    outer.xmin <= inner.xmin + tol
        && outer.ymin <= inner.ymin + tol
        && outer.xmax >= inner.xmax - tol
        && outer.ymax >= inner.ymax - tol
}

/// Pieces of a drawn polygon, cut into simple loops and read even-odd.
fn lasso_pieces(polygon: &Polygon) -> Vec<Piece> {
    let mut loops: Vec<Polygon> = simple_loops(&polygon.ring())
        .iter()
        .filter(|l| l.len() >= 3 && ring_area(l).abs() > f64::EPSILON)
        .map(|l| Polygon::from_points(l, true))
        .collect();
    loops.sort_by(|a, b| b.area().total_cmp(&a.area()));
    assign_subtract_flags(&mut loops);
    pieces_of(&loops)
}

/// Where segment `b0-b1` properly crosses segment `a0-a1`: the parameter along
/// `b` and the crossing point. Shared endpoints and parallel runs do not count.
fn crossing(a0: Point, a1: Point, b0: Point, b1: Point, tol: f64) -> Option<(f64, Point)> {
    let r = (a1.x - a0.x, a1.y - a0.y);
    let s = (b1.x - b0.x, b1.y - b0.y);
    let r_len = r.0.hypot(r.1);
    let s_len = s.0.hypot(s.1);
    let denom = cross(r.0, r.1, s.0, s.1);
    if denom.abs() <= 1e-12 * r_len * s_len {
        return None;
    }
    let qp = (b0.x - a0.x, b0.y - a0.y);
    let t = cross(qp.0, qp.1, s.0, s.1) / denom;
    let u = cross(qp.0, qp.1, r.0, r.1) / denom;
    let interior = |t: f64, len: f64| t * len > tol && (1.0 - t) * len > tol;
    (interior(t, r_len) && interior(u, s_len)).then(|| (u, Point::new(a0.x + t * r.0, a0.y + t * r.1)))
}

/// Cut a ring into loops that do not cross themselves, splitting at every
/// crossing. A simple ring comes back as a single loop.
fn simple_loops(ring: &[Point]) -> Vec<Vec<Point>> {
    if ring.len() < 3 {
        return vec![ring.to_vec()];
    }
    let bounds = Bounds::from_points(ring.iter().copied());
    let tol = 1e-9 * bounds.width().max(bounds.height()).max(1.0);

    let mut loops = Vec::new();
    let mut path: Vec<Point> = vec![ring[0]];
    for k in 1..=ring.len() {
        let target = ring[k % ring.len()];
        loop {
            let Some(&last) = path.last() else {
                break;
            };
            let hit = (0..path.len().saturating_sub(1))
                .filter_map(|i| crossing(path[i], path[i + 1], last, target, tol).map(|(u, x)| (u, i, x)))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            match hit {
                Some((_, i, x)) => {
                    let mut cut = vec![x];
                    cut.extend_from_slice(&path[i + 1..]);
                    loops.push(cut);
                    path.truncate(i + 1);
                    path.push(x);
                }
                None => {
                    path.push(target);
                    break;
                }
            }
        }
    }
    path.pop();
    loops.push(path);
    loops
}

/// Pieces minus a simple outline.
fn subtract(pieces: Vec<Piece>, cut: &Pline) -> Vec<Piece> {
    let mut out = Vec::new();
    for piece in pieces {
        if same_outline(&piece.outer, cut) {
            continue;
        }
        let (pos, neg) = boolean(&piece.outer, cut, BooleanOp::Not);
        if !neg.is_empty() {
            // the cut lies inside the outline and becomes a hole
            let (holes, islands) = absorb(piece.holes, cut.clone());
            out.push(Piece {
                outer: piece.outer,
                holes,
            });
            out.extend(islands.into_iter().map(Piece::solid));
            continue;
        }
        for outer in pos {
            let mut parts = vec![Piece::solid(outer)];
            for hole in &piece.holes {
                parts = subtract(parts, hole);
            }
            out.extend(parts);
        }
    }
    out
}

/// Merge a new hole with the holes it overlaps. Area enclosed between merged
/// holes comes back as islands.
fn absorb(holes: Vec<Pline>, hole: Pline) -> (Vec<Pline>, Vec<Pline>) {
    let mut merged = hole;
    let mut islands = Vec::new();
    let mut rest = holes;
    loop {
        let mut kept = Vec::new();
        let mut grew = false;
        for other in rest {
            let (mut pos, neg) = boolean(&merged, &other, BooleanOp::Or);
            if pos.len() == 1
                && let Some(outline) = pos.pop()
            {
                merged = outline;
                islands.extend(neg);
                grew = true;
            } else {
                kept.push(other);
            }
        }
        rest = kept;
        if !grew {
            break;
        }
    }
    rest.push(merged);
    (rest, islands)
}

/// Pieces clipped to a simple outline.
fn intersect(pieces: &[Piece], clip: &Pline) -> Vec<Piece> {
    let mut out = Vec::new();
    for piece in pieces {
        let (pos, _) = boolean(&piece.outer, clip, BooleanOp::And);
        for outer in pos {
            let mut parts = vec![Piece::solid(outer)];
            for hole in &piece.holes {
                parts = subtract(parts, hole);
            }
            out.extend(parts);
        }
    }
    out
}

/// Pieces minus a piece: what falls in the piece's holes survives.
fn difference_piece(pieces: Vec<Piece>, shape: &Piece) -> Vec<Piece> {
    let mut out = subtract(pieces.clone(), &shape.outer);
    for hole in &shape.holes {
        out.extend(intersect(&pieces, hole));
    }
    out
}

fn union_piece(pieces: Vec<Piece>, shape: Piece) -> Vec<Piece> {
    let rest = difference_piece(pieces, &shape);
    join(rest, shape)
}

/// Add a piece to pieces it does not overlap, fusing outlines that share edges.
fn join(pieces: Vec<Piece>, piece: Piece) -> Vec<Piece> {
    let mut acc = piece;
    let mut rest = pieces;
    loop {
        let mut kept = Vec::new();
        let mut grew = false;
        for other in rest {
            match fuse(&acc, &other) {
                Some(fused) => {
                    acc = fused;
                    grew = true;
                }
                None => kept.push(other),
            }
        }
        rest = kept;
        if !grew {
            break;
        }
    }
    rest.push(acc);
    rest
}

/// Fuse two pieces whose filled areas do not overlap, if they touch along an
/// edge or one exactly fills a hole of the other.
fn fuse(a: &Piece, b: &Piece) -> Option<Piece> {
    let (mut pos, neg) = boolean(&a.outer, &b.outer, BooleanOp::Or);
    if pos.len() != 1 {
        return None;
    }
    let outer = pos.pop()?;
    let area = abs_area(&outer);
    if same_area(area, abs_area(&a.outer)) {
        return fill_hole(a, b);
    }
    if same_area(area, abs_area(&b.outer)) {
        return fill_hole(b, a);
    }
    let mut holes = a.holes.clone();
    holes.extend(b.holes.iter().cloned());
    holes.extend(neg);
    Some(Piece { outer, holes })
}

/// `host` with the hole that `inner` exactly covers filled in.
fn fill_hole(host: &Piece, inner: &Piece) -> Option<Piece> {
    let inner_area = abs_area(&inner.outer);
    let index = host.holes.iter().position(|h| {
        same_area(abs_area(h), inner_area) && boolean(h, &inner.outer, BooleanOp::Not).0.is_empty()
    })?;
    let mut holes = host.holes.clone();
    holes.remove(index);
    holes.extend(inner.holes.iter().cloned());
    Some(Piece {
        outer: host.outer.clone(),
        holes,
    })
}

/// Flatten pieces into polygons, largest first, with subtract flags.
fn finish(pieces: &[Piece], op: &str) -> Vec<Polygon> {
    let mut rings: Vec<Vec<Point>> = pieces
        .iter()
        .flat_map(|p| std::iter::once(&p.outer).chain(p.holes.iter()))
        .map(|pline| {
            let pts = raw_points(pline);
            let bounds = Bounds::from_points(pts.iter().copied());
            simplify(pts, 1e-9 * bounds.width().max(bounds.height()).max(1.0))
        })
        .filter(|r| r.len() >= 3)
        .collect();
    rings.sort_by(|r1, r2| ring_area(r2).abs().total_cmp(&ring_area(r1).abs()));

    let mut polygons: Vec<Polygon> = rings.iter().map(|r| Polygon::from_points(r, true)).collect();
    assign_subtract_flags(&mut polygons);
    log::trace!("{} produced {} polygon(s)", op, polygons.len());
    polygons
}

/// Drop repeated points and vertices lying on a straight run.
fn simplify(mut ring: Vec<Point>, tol: f64) -> Vec<Point> {
    loop {
        let n = ring.len();
        if n < 3 {
            return ring;
        }
        let removable = (0..n).find(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let (ax, ay) = (cur.x - prev.x, cur.y - prev.y);
            let (bx, by) = (next.x - cur.x, next.y - cur.y);
            let la = ax.hypot(ay);
            let lb = bx.hypot(by);
            la <= tol || lb <= tol || cross(ax, ay, bx, by).abs() <= tol * (la + lb)
        });
        match removable {
            Some(i) => {
                ring.remove(i);
            }
            None => return ring,
        }
    }
}
