//! Edit handles of the active region.
//!
//! The mesh holds the active region's outline in absolute pixels. Dragging a
//! handle works on a snapshot taken when the drag starts, so every move is
//! computed from the original outline rather than accumulated.

use plotsel_geom::polygon::{I000, I090, I180, I270, almost_eq, point_in_ring, points_on_rectangle, segment_distance};
use plotsel_geom::{Point, Polygon, Vertex};

use crate::config::DragMode;
use crate::document::Document;
use crate::interaction::newshape::edit_mode;
use crate::layout::Layout;
use crate::region::{Region, RegionType};
use crate::store::RegionKind;

/// Grab distance of every handle, in pixels.
pub const HANDLE_RADIUS: f64 = 5.0;

/// A grabbed part of the outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// One vertex of a cell
    Vertex { cell: usize, vertex: usize },
    /// Edge from a vertex to the next one, on rectangle selections
    Edge { cell: usize, vertex: usize },
    /// The whole region
    Group,
}

#[derive(Debug, Clone)]
pub struct OutlineMesh {
    pub kind: RegionKind,
    pub index: usize,
    mode: DragMode,
    edges: bool,
    polygons: Vec<Polygon>,
    snapshot: Vec<Polygon>,
    drag: Option<Handle>,
}

impl OutlineMesh {
    /// Mesh over one region; `None` when the region cannot be edited.
    pub fn for_region(kind: RegionKind, index: usize, region: &Region, layout: &Layout) -> Option<Self> {
        if !region.editable {
            return None;
        }
        let polygons = region.pixel_polygons(layout);
        if polygons.is_empty() {
            log::warn!("{} item {} has no outline to edit", kind.name(), index);
            return None;
        }
        let mode = edit_mode(region);
        Some(Self {
            kind,
            index,
            mode,
            edges: kind == RegionKind::Selections && region.kind() == RegionType::Rect,
            snapshot: polygons.clone(),
            polygons,
            drag: None,
        })
    }

    /// Mesh over whichever region is active, shapes first.
    pub fn for_active(doc: &Document) -> Option<Self> {
        [RegionKind::Shapes, RegionKind::Selections].into_iter().find_map(|kind| {
            let store = doc.store(kind);
            let index = store.active()?;
            Self::for_region(kind, index, store.region(index)?, doc.layout())
        })
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn dragging(&self) -> Option<Handle> {
        self.drag
    }

    pub fn is_ellipse(&self) -> bool {
        self.mode == DragMode::DrawCircle
    }

    fn is_rect(&self) -> bool {
        self.mode == DragMode::DrawRect
    }

    /// Vertex handles with their positions.
    pub fn vertex_handles(&self) -> Vec<(Handle, Point)> {
        let mut handles = Vec::new();
        for (i, polygon) in self.polygons.iter().enumerate() {
            let pts = editable_points(polygon);
            for (j, p) in pts.iter().enumerate() {
                if self.is_ellipse() && ![I000, I090, I180, I270].contains(&j) {
                    continue;
                }
                handles.push((Handle::Vertex { cell: i, vertex: j }, *p));
            }
        }
        handles
    }

    /// Midpoint handles of rectangle selection edges.
    pub fn edge_handles(&self) -> Vec<(Handle, Point)> {
        if !self.edges {
            return Vec::new();
        }
        let mut handles = Vec::new();
        for (i, polygon) in self.polygons.iter().enumerate() {
            let pts = editable_points(polygon);
            for j in 0..pts.len() {
                let next = pts[(j + 1) % pts.len()];
                let mid = Point::new((pts[j].x + next.x) / 2.0, (pts[j].y + next.y) / 2.0);
                handles.push((Handle::Edge { cell: i, vertex: j }, mid));
            }
        }
        handles
    }

    /// Handle under an absolute pixel position.
    pub fn hit(&self, p: Point) -> Option<Handle> {
        let near = |(_, q): &(Handle, Point)| q.distance(p) <= HANDLE_RADIUS;
        if let Some((handle, _)) = self.vertex_handles().into_iter().find(near) {
            return Some(handle);
        }
        if let Some((handle, _)) = self.edge_handles().into_iter().find(near) {
            return Some(handle);
        }
        self.polygons
            .iter()
            .any(|polygon| {
                let pts = polygon.points();
                let on_stroke = pts.windows(2).any(|s| segment_distance(p, s[0], s[1]) <= HANDLE_RADIUS);
                on_stroke || (polygon.is_closed() && point_in_ring(p, &polygon.ring()))
            })
            .then_some(Handle::Group)
    }

    pub fn begin_drag(&mut self, handle: Handle) {
        self.snapshot = self.polygons.clone();
        self.drag = Some(handle);
    }

    /// Move the dragged handle by a displacement from where the drag began.
    pub fn drag_to(&mut self, dx: f64, dy: f64) {
        let Some(handle) = self.drag else {
            return;
        };
        match handle {
            Handle::Group => {
                self.polygons = self.snapshot.clone();
                for polygon in &mut self.polygons {
                    polygon.translate(dx, dy);
                }
            }
            Handle::Edge { cell, vertex } => {
                let pts = match self.snapshot.get(cell) {
                    Some(polygon) => editable_points(polygon),
                    None => return,
                };
                if pts.is_empty() {
                    return;
                }
                let next = pts[(vertex + 1) % pts.len()];
                let vertical = almost_eq(pts[vertex].x, next.x);
                let (dx, dy) = if vertical { (dx, 0.0) } else { (0.0, dy) };
                self.move_rect_vertex(cell, vertex, dx, dy);
            }
            Handle::Vertex { cell, vertex } => {
                let on_rect = self
                    .snapshot
                    .get(cell)
                    .is_some_and(|polygon| self.is_rect() || points_on_rectangle(&polygon.points()));
                if on_rect {
                    self.move_rect_vertex(cell, vertex, dx, dy);
                } else {
                    self.move_vertex(cell, vertex, dx, dy);
                }
            }
        }
    }

    /// Move a rectangle corner together with every vertex sharing its x or y.
    fn move_rect_vertex(&mut self, cell: usize, vertex: usize, dx: f64, dy: f64) {
        let (Some(original), Some(polygon)) = (self.snapshot.get(cell), self.polygons.get_mut(cell)) else {
            return;
        };
        let Some(p0) = vertex_index(original, vertex).and_then(|i| original.vertices[i].end()) else {
            return;
        };
        for (v, orig) in polygon.vertices.iter_mut().zip(&original.vertices) {
            if let Some(q) = orig.end() {
                let x = if q.x == p0.x { p0.x + dx } else { q.x };
                let y = if q.y == p0.y { p0.y + dy } else { q.y };
                *v = orig.with_end(Point::new(x, y));
            }
        }
        if !points_on_rectangle(&polygon.points()) {
            log::debug!("Rejected rectangle edit of cell {}", cell);
            *polygon = original.clone();
        }
    }

    fn move_vertex(&mut self, cell: usize, vertex: usize, dx: f64, dy: f64) {
        let (Some(original), Some(polygon)) = (self.snapshot.get(cell), self.polygons.get_mut(cell)) else {
            return;
        };
        let Some(index) = vertex_index(original, vertex) else {
            return;
        };
        let Some(p0) = original.vertices[index].end() else {
            return;
        };
        let moved = Point::new(p0.x + dx, p0.y + dy);
        polygon.vertices[index] = original.vertices[index].with_end(moved);
        if index == 0
            && let Some(last) = closing_index(original)
        {
            polygon.vertices[last] = original.vertices[last].with_end(moved);
        }
    }

    /// Finish the drag, keeping the moved outline.
    pub fn end_drag(&mut self) -> Option<Handle> {
        self.drag.take()
    }

    /// Drop the moved outline and go back to the pre-drag one.
    pub fn restore(&mut self) {
        self.polygons = self.snapshot.clone();
        self.drag = None;
    }

    /// Remove one vertex of a path; rectangles and ellipses keep theirs.
    ///
    /// Returns false when nothing was removed.
    pub fn remove_vertex(&mut self, cell: usize, vertex: usize) -> bool {
        if self.is_rect() || self.is_ellipse() {
            return false;
        }
        let Some(polygon) = self.polygons.get_mut(cell) else {
            return false;
        };
        let editable = editable_points(polygon).len();
        if vertex >= editable || editable < 3 {
            return false;
        }
        let Some(index) = vertex_index(polygon, vertex) else {
            return false;
        };
        let old_first = polygon.vertices.first().and_then(Vertex::end);

        let mut vertices = polygon.vertices.clone();
        vertices.remove(index);
        if index == 0
            && let Some(first) = vertices.first().and_then(Vertex::end)
        {
            vertices[0] = vertices[0].into_move();
            // lines closing back to the removed start now close to the new one
            for i in 1..vertices.len() {
                let closes = vertices[i].is_close() && matches!(vertices[i - 1], Vertex::Line(_));
                if closes && vertices[i - 1].end() == old_first {
                    vertices[i - 1] = vertices[i - 1].with_end(first);
                }
            }
        }
        polygon.vertices = vertices;
        self.snapshot = self.polygons.clone();
        log::debug!("Removed vertex {} of cell {}", vertex, cell);
        true
    }
}

/// Position in `vertices` of the `n`th vertex that has an endpoint. Handles
/// count endpoints, so close commands in the middle of a cell are skipped.
fn vertex_index(polygon: &Polygon, n: usize) -> Option<usize> {
    polygon
        .vertices
        .iter()
        .enumerate()
        .filter(|(_, v)| v.end().is_some())
        .nth(n)
        .map(|(i, _)| i)
}

/// Position in `vertices` of the explicit line back to the first point of a
/// closed cell.
fn closing_index(polygon: &Polygon) -> Option<usize> {
    if !polygon.is_closed() {
        return None;
    }
    let first = polygon.vertices.first()?.end()?;
    let last = polygon.vertices.len().checked_sub(2).filter(|&i| i > 0)?;
    let v = polygon.vertices[last];
    (v.end() == Some(first) && matches!(v, Vertex::Line(_))).then_some(last)
}

/// Endpoints that get a handle: every cell vertex but the closing duplicate.
fn editable_points(polygon: &Polygon) -> Vec<Point> {
    let mut pts = polygon.points();
    if closing_index(polygon).is_some() {
        pts.pop();
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InteractionConfig;
    use crate::region::RegionInput;
    use crate::store::RegionEdit;
    use plotsel_geom::Surface;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn document() -> Document {
        let layout = Layout::single(Surface::new(0.0, 0.0, 100.0, 100.0), [0.0, 10.0], [0.0, 10.0]);
        Document::new(InteractionConfig::default(), layout)
    }

    fn active_mesh(doc: &mut Document, kind: RegionKind, mut input: RegionInput) -> OutlineMesh {
        input.editable = Some(true);
        doc.relayout(kind, vec![RegionEdit::Insert { index: 0, input }]).unwrap();
        doc.store_mut(kind).activate(0).unwrap();
        OutlineMesh::for_active(doc).unwrap()
    }

    #[test]
    fn test_rect_corner_drag_mirrors() {
        let mut doc = document();
        let mut mesh = active_mesh(&mut doc, RegionKind::Shapes, RegionInput::rect("x", "y", 2.0, 2.0, 6.0, 6.0));
        assert_eq!(mesh.vertex_handles().len(), 4);
        assert!(mesh.edge_handles().is_empty());

        // (20, 80) is the x0,y0 corner
        let handle = mesh.hit(Point::new(21.0, 79.0)).unwrap();
        assert_eq!(handle, Handle::Vertex { cell: 0, vertex: 0 });
        mesh.begin_drag(handle);
        mesh.drag_to(-10.0, 5.0);
        let b = mesh.polygons()[0].bounds();
        assert!(approx_eq(b.xmin, 10.0) && approx_eq(b.xmax, 60.0));
        assert!(approx_eq(b.ymin, 40.0) && approx_eq(b.ymax, 85.0));
        assert!(points_on_rectangle(&mesh.polygons()[0].points()));
    }

    #[test]
    fn test_collapsed_rect_restored() {
        let mut doc = document();
        let mut mesh = active_mesh(&mut doc, RegionKind::Shapes, RegionInput::rect("x", "y", 2.0, 2.0, 6.0, 6.0));
        let before = mesh.polygons().to_vec();
        mesh.begin_drag(Handle::Vertex { cell: 0, vertex: 0 });
        mesh.drag_to(40.0, 0.0);
        assert_eq!(mesh.polygons(), &before[..]);
    }

    #[test]
    fn test_selection_edge_moves_one_axis() {
        let mut doc = document();
        let mut mesh = active_mesh(&mut doc, RegionKind::Selections, RegionInput::rect("x", "y", 2.0, 2.0, 6.0, 6.0));
        assert_eq!(mesh.edge_handles().len(), 4);

        // edge from (20,80) to (60,80) is horizontal
        mesh.begin_drag(Handle::Edge { cell: 0, vertex: 0 });
        mesh.drag_to(7.0, -10.0);
        let b = mesh.polygons()[0].bounds();
        assert!(approx_eq(b.xmin, 20.0) && approx_eq(b.xmax, 60.0));
        assert!(approx_eq(b.ymin, 40.0) && approx_eq(b.ymax, 70.0));
    }

    #[test]
    fn test_group_drag_translates_from_snapshot() {
        let mut doc = document();
        let mut mesh = active_mesh(&mut doc, RegionKind::Shapes, RegionInput::path("x", "y", "M1,1L5,1L3,4Z"));
        assert_eq!(mesh.hit(Point::new(30.0, 80.0)), Some(Handle::Group));
        mesh.begin_drag(Handle::Group);
        mesh.drag_to(10.0, 0.0);
        mesh.drag_to(20.0, 0.0);
        let pts = mesh.polygons()[0].points();
        assert!(approx_eq(pts[0].x, 30.0) && approx_eq(pts[0].y, 90.0));
        assert_eq!(mesh.end_drag(), Some(Handle::Group));
    }

    #[test]
    fn test_first_vertex_drag_moves_closing_point() {
        let mut doc = document();
        let mut mesh = active_mesh(&mut doc, RegionKind::Shapes, RegionInput::path("x", "y", "M1,1L5,1L3,4Z"));
        assert_eq!(mesh.vertex_handles().len(), 3);
        mesh.begin_drag(Handle::Vertex { cell: 0, vertex: 0 });
        mesh.drag_to(-5.0, 0.0);
        let pts = mesh.polygons()[0].points();
        assert_eq!(pts.first(), pts.last());
        assert!(approx_eq(pts[0].x, 5.0));
    }

    #[test]
    fn test_remove_vertex() {
        let mut doc = document();
        let mut mesh = active_mesh(&mut doc, RegionKind::Shapes, RegionInput::path("x", "y", "M1,1L5,1L5,5L1,5Z"));
        assert!(mesh.remove_vertex(0, 0));
        let polygon = &mesh.polygons()[0];
        assert!(matches!(polygon.vertices[0], Vertex::Move(_)));
        assert_eq!(polygon.ring().len(), 3);
        assert_eq!(polygon.points().first(), polygon.points().last());

        let mut rect = active_mesh(&mut document(), RegionKind::Shapes, RegionInput::rect("x", "y", 1.0, 1.0, 5.0, 5.0));
        assert!(!rect.remove_vertex(0, 1));
    }

    #[test]
    fn test_vertices_after_inner_close() {
        let mut doc = document();
        let path = "M1,1L5,1L5,5ZL1,8L3,8Z";
        let mut mesh = active_mesh(&mut doc, RegionKind::Shapes, RegionInput::path("x", "y", path));
        let handles = mesh.vertex_handles();
        assert_eq!(handles.len(), 6);
        assert_eq!(handles[4], (Handle::Vertex { cell: 0, vertex: 4 }, Point::new(10.0, 20.0)));

        mesh.begin_drag(Handle::Vertex { cell: 0, vertex: 4 });
        mesh.drag_to(10.0, 0.0);
        mesh.end_drag();
        let polygon = &mesh.polygons()[0];
        assert!(polygon.vertices[4].is_close());
        let pts = polygon.points();
        assert!(approx_eq(pts[4].x, 20.0) && approx_eq(pts[4].y, 20.0));
        assert!(approx_eq(pts[5].x, 30.0) && approx_eq(pts[5].y, 20.0));

        assert!(mesh.remove_vertex(0, 4));
        let polygon = &mesh.polygons()[0];
        assert_eq!(polygon.vertices.iter().filter(|v| v.is_close()).count(), 2);
        let pts = polygon.points();
        assert_eq!(pts.len(), 6);
        assert!(approx_eq(pts[4].x, 30.0) && approx_eq(pts[4].y, 20.0));
    }

    #[test]
    fn test_ellipse_exposes_cardinal_vertices() {
        let mut doc = document();
        let mut input = RegionInput::rect("x", "y", 2.0, 2.0, 6.0, 6.0);
        input.kind = Some(RegionType::Circle);
        let mesh = active_mesh(&mut doc, RegionKind::Shapes, input);
        assert!(mesh.is_ellipse());
        assert_eq!(mesh.vertex_handles().len(), 4);
    }

    #[test]
    fn test_non_editable_shape_has_no_mesh() {
        let doc = document();
        let region = Region::resolve(
            &RegionInput::rect("x", "y", 1.0, 1.0, 2.0, 2.0),
            doc.layout(),
            &RegionKind::Shapes.defaults(),
        );
        assert!(OutlineMesh::for_region(RegionKind::Shapes, 0, &region, doc.layout()).is_none());
    }
}
