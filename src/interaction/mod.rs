//! Pointer-driven selection, drawing and region editing.
//!
//! [`Interaction`] routes pointer events for one document. A press lands on
//! one of three things, checked in order: a handle of the active region's
//! outline, the outline of another region, or the plot area of a subplot in a
//! select or draw mode. Everything that changes the document goes through
//! [`Document::relayout`].

pub mod context;
pub mod gesture;
pub mod newshape;
pub mod reselect;
pub mod session;
pub mod throttle;

#[cfg(test)]
mod scenarios;

use plotsel_geom::polygon::{point_in_ring, segment_distance};
use plotsel_geom::{Point, Polygon};
use web_time::Instant;

use crate::config::{DragMode, InteractionConfig};
use crate::document::Document;
use crate::error::{PlotselError, PlotselResult};
use crate::events::{NoopEvents, SelectionEventData, SelectionEvents};
use crate::outline::{HANDLE_RADIUS, Handle, OutlineMesh};
use crate::region::{Region, RegionInput};
use crate::store::{RegionEdit, RegionKind};

use context::{InteractionContext, PendingDeselect};
use gesture::{Gesture, GestureEnd, PointerEvent};
use newshape::edit_fields;
use session::SelectSession;

/// Apply edits to the document and re-run selections after a selection change.
///
/// Failures are logged; the caller carries on as if nothing was committed.
pub(crate) fn commit<E: SelectionEvents>(
    doc: &mut Document,
    ctx: &mut InteractionContext,
    events: &mut E,
    kind: RegionKind,
    edits: Vec<RegionEdit>,
) -> bool {
    match doc.relayout(kind, edits) {
        Ok(()) => {
            if kind == RegionKind::Selections {
                reselect::reselect(doc, ctx, events, true);
            }
            true
        }
        Err(e) => {
            log::error!("Commit to {} failed: {}", kind.name(), e);
            ctx.no_emit_selected_at_start = false;
            false
        }
    }
}

/// A handle drag on the active region.
#[derive(Debug, Clone)]
struct EditSession {
    kind: RegionKind,
    index: usize,
    handle: Handle,
    original: RegionInput,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Selecting(SelectSession),
    Editing(EditSession),
    /// Press on an inactive region; a click activates it
    RegionClick { kind: RegionKind, index: usize },
}

/// Interaction state machine for one document.
pub struct Interaction<E: SelectionEvents = NoopEvents> {
    context: InteractionContext,
    gesture: Gesture,
    state: State,
    events: E,
}

impl Interaction<NoopEvents> {
    /// Interaction that discards every event.
    pub fn silent(uid: impl Into<String>, config: &InteractionConfig) -> Self {
        Self::new(uid, config, NoopEvents)
    }
}

impl<E: SelectionEvents> Interaction<E> {
    pub fn new(uid: impl Into<String>, config: &InteractionConfig, events: E) -> Self {
        Self {
            context: InteractionContext::new(uid),
            gesture: Gesture::new(config.double_click_delay_ms, config.min_drag),
            state: State::Idle,
            events,
        }
    }

    pub fn context(&self) -> &InteractionContext {
        &self.context
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn into_events(self) -> E {
        self.events
    }

    /// A gesture is in progress.
    pub fn is_busy(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    pub fn pointer_down(&mut self, doc: &mut Document, ev: &PointerEvent) {
        if self.is_busy() {
            self.cancel(doc);
        }
        let p = Point::new(ev.x, ev.y);

        if let Some(mesh) = self.context.outline.as_mut()
            && let Some(handle) = mesh.hit(p)
            && let Some(original) = doc.store(mesh.kind).input(mesh.index).cloned()
        {
            log::debug!("Grabbed {:?} of {} item {}", handle, mesh.kind.name(), mesh.index);
            mesh.begin_drag(handle);
            self.state = State::Editing(EditSession {
                kind: mesh.kind,
                index: mesh.index,
                handle,
                original,
            });
            self.gesture.press(ev, None);
            return;
        }

        let mode = doc.config.dragmode;
        if !mode.is_select_mode() && !mode.is_draw_mode() {
            self.gesture.press(ev, None);
            return;
        }

        if let Some((kind, index)) = region_at(doc, p) {
            self.state = State::RegionClick { kind, index };
            self.gesture.press(ev, None);
            return;
        }

        let Some(subplot) = doc.layout.subplot_at(ev.x, ev.y).cloned() else {
            self.gesture.press(ev, None);
            return;
        };
        if let Some(session) = SelectSession::start(doc, &mut self.context, &mut self.events, ev, &subplot) {
            self.state = State::Selecting(session);
        }
        let min_drag = mode.is_free_mode().then_some(1.0);
        self.gesture.press(ev, min_drag);
    }

    pub fn pointer_move(&mut self, doc: &mut Document, ev: &PointerEvent) {
        let Some((dx, dy)) = self.gesture.motion(ev) else {
            return;
        };
        match &mut self.state {
            State::Selecting(session) => {
                session.move_to(doc, &mut self.context, &mut self.events, dx, dy, ev.time);
            }
            State::Editing(edit) => {
                let Some(mesh) = self.context.outline.as_mut() else {
                    return;
                };
                mesh.drag_to(dx, dy);
                if mesh.is_ellipse() && matches!(edit.handle, Handle::Vertex { .. }) {
                    match edited_input(doc, edit.kind, edit.index, &edit.original, mesh.polygons()) {
                        Ok(input) => {
                            if let Err(e) = doc.preview(edit.kind, edit.index, input) {
                                log::debug!("Ellipse preview failed: {}", e);
                            }
                        }
                        Err(e) => log::debug!("Ellipse preview skipped: {}", e),
                    }
                }
            }
            State::Idle | State::RegionClick { .. } => {}
        }
    }

    pub fn pointer_up(&mut self, doc: &mut Document, ev: &PointerEvent) {
        let end = self.gesture.release(ev);
        let state = std::mem::take(&mut self.state);
        let inside = {
            let s = doc.layout.surface;
            ev.x >= s.l && ev.x <= s.l + s.w && ev.y >= s.t && ev.y <= s.t + s.h
        };

        match (state, end) {
            (State::Selecting(session), GestureEnd::Done) if inside => {
                session.done(doc, &mut self.context, &mut self.events, ev.time);
            }
            (State::Selecting(session), GestureEnd::Click(n)) => {
                session.click(doc, &mut self.context, &mut self.events, n, ev.time);
            }
            (State::Selecting(session), _) => {
                log::debug!("Drag released outside the surface");
                session.cancel(doc, &mut self.context, &mut self.events);
            }
            (State::Editing(edit), GestureEnd::Done) => self.finish_edit(doc, edit),
            (State::Editing(edit), GestureEnd::Click(n)) => self.click_handle(doc, edit, n),
            (State::Editing(edit), GestureEnd::Ignored) => self.abort_edit(doc, edit),
            (State::RegionClick { kind, index }, GestureEnd::Click(_)) => {
                if let Err(e) = self.activate(doc, kind, index) {
                    log::warn!("Could not activate {} item {}: {}", kind.name(), index, e);
                }
            }
            (State::RegionClick { .. } | State::Idle, _) => {}
        }
    }

    /// Run throttled selecting events that are due.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) {
        let key = self.context.select_key();
        for due in self.context.throttle.tick(now) {
            if due == key
                && let State::Selecting(session) = &mut self.state
            {
                session.flush_selecting(doc, &mut self.events);
            }
        }
    }

    /// Drop the gesture in progress without committing it.
    pub fn cancel(&mut self, doc: &mut Document) {
        self.gesture.reset();
        match std::mem::take(&mut self.state) {
            State::Selecting(session) => session.cancel(doc, &mut self.context, &mut self.events),
            State::Editing(edit) => self.abort_edit(doc, edit),
            State::Idle | State::RegionClick { .. } => {}
        }
    }

    /// Switch drag mode, dropping the outline and any active region.
    pub fn set_dragmode(&mut self, doc: &mut Document, mode: DragMode) {
        self.cancel(doc);
        self.context.clear_outline();
        doc.shapes.deactivate();
        doc.selections.deactivate();
        doc.config.dragmode = mode;
        log::info!("Drag mode: {:?}", mode);
    }

    /// Toggle a region active; the other list is deactivated.
    pub fn activate(&mut self, doc: &mut Document, kind: RegionKind, index: usize) -> PlotselResult<Option<usize>> {
        let other = match kind {
            RegionKind::Shapes => RegionKind::Selections,
            RegionKind::Selections => RegionKind::Shapes,
        };
        let active = doc.store_mut(kind).activate(index)?;
        doc.store_mut(other).deactivate();
        self.context.outline = active.and_then(|_| OutlineMesh::for_active(doc));
        Ok(active)
    }

    /// Erase the active shape, or else the active selection.
    pub fn erase_active(&mut self, doc: &mut Document) -> bool {
        for kind in [RegionKind::Shapes, RegionKind::Selections] {
            if let Some(index) = doc.store(kind).active() {
                return self.erase(doc, kind, index);
            }
        }
        false
    }

    /// Re-run persisted selections and emit the result.
    pub fn reselect(&mut self, doc: &mut Document) -> SelectionEventData {
        reselect::reselect(doc, &mut self.context, &mut self.events, true)
    }

    fn erase(&mut self, doc: &mut Document, kind: RegionKind, index: usize) -> bool {
        if kind == RegionKind::Selections
            && let Some((xref, yref)) = doc.selections.region(index).and_then(Region::subplot_axes)
        {
            self.context.deselect = Some(PendingDeselect {
                xref: xref.to_string(),
                yref: yref.to_string(),
            });
        }
        self.context.outline = None;
        let ok = commit(doc, &mut self.context, &mut self.events, kind, vec![RegionEdit::Remove { index }]);
        if !ok {
            self.context.deselect = None;
        }
        ok
    }

    fn finish_edit(&mut self, doc: &mut Document, edit: EditSession) {
        let Some(mesh) = self.context.outline.as_mut() else {
            return;
        };
        mesh.end_drag();
        let polygons = mesh.polygons().to_vec();
        self.commit_outline(doc, &edit, &polygons);
    }

    fn abort_edit(&mut self, doc: &mut Document, edit: EditSession) {
        if let Some(mesh) = self.context.outline.as_mut() {
            mesh.restore();
        }
        if let Err(e) = doc.preview(edit.kind, edit.index, edit.original) {
            log::debug!("Nothing to restore: {}", e);
        }
    }

    fn click_handle(&mut self, doc: &mut Document, edit: EditSession, num_clicks: u32) {
        if let Some(mesh) = self.context.outline.as_mut() {
            mesh.restore();
        }
        if num_clicks != 2 {
            return;
        }
        match edit.handle {
            Handle::Vertex { cell, vertex } => {
                let Some(mesh) = self.context.outline.as_mut() else {
                    return;
                };
                if mesh.remove_vertex(cell, vertex) {
                    let polygons = mesh.polygons().to_vec();
                    self.commit_outline(doc, &edit, &polygons);
                }
            }
            Handle::Group => {
                let erasable = match edit.kind {
                    RegionKind::Selections => doc.config.dragmode.is_select_mode(),
                    RegionKind::Shapes => true,
                };
                if erasable {
                    self.erase(doc, edit.kind, edit.index);
                }
            }
            Handle::Edge { .. } => {}
        }
    }

    /// Write edited outline polygons back to the region as field edits.
    fn commit_outline(&mut self, doc: &mut Document, edit: &EditSession, polygons: &[Polygon]) {
        let fields = doc
            .store(edit.kind)
            .region(edit.index)
            .ok_or_else(|| PlotselError::index_out_of_range(edit.index, doc.store(edit.kind).len()))
            .and_then(|region| edit_fields(region, &doc.layout, polygons));

        if let Err(e) = doc.preview(edit.kind, edit.index, edit.original.clone()) {
            log::debug!("Nothing to restore: {}", e);
        }

        match fields {
            Ok(fields) => {
                let mut edited = edit.original.clone();
                for field in fields.iter().cloned() {
                    edited.set(field);
                }
                if edited != edit.original {
                    let edits = fields
                        .into_iter()
                        .map(|field| RegionEdit::Modify {
                            index: edit.index,
                            field,
                        })
                        .collect();
                    commit(doc, &mut self.context, &mut self.events, edit.kind, edits);
                }
            }
            Err(e) => log::warn!("Edit of {} item {} rejected: {}", edit.kind.name(), edit.index, e),
        }
        self.context.outline = OutlineMesh::for_active(doc);
    }
}

/// Input of a region with its geometry moved onto edited polygons.
fn edited_input(
    doc: &Document,
    kind: RegionKind,
    index: usize,
    original: &RegionInput,
    polygons: &[Polygon],
) -> PlotselResult<RegionInput> {
    let store = doc.store(kind);
    let region = store
        .region(index)
        .ok_or_else(|| PlotselError::index_out_of_range(index, store.len()))?;
    let mut input = original.clone();
    for field in edit_fields(region, &doc.layout, polygons)? {
        input.set(field);
    }
    Ok(input)
}

fn is_visible_fill(color: &str) -> bool {
    fill_alpha(color) > 0.0
}

/// Alpha of a CSS color; unreadable colors count as opaque.
fn fill_alpha(color: &str) -> f64 {
    let c = color.trim().to_ascii_lowercase();
    if c.is_empty() || c == "transparent" || c == "none" {
        return 0.0;
    }
    if let Some(hex) = c.strip_prefix('#') {
        let digits = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
        return match hex.len() {
            4 => hex.get(3..4).and_then(digits).map_or(1.0, |a| a / 15.0),
            8 => hex.get(6..8).and_then(digits).map_or(1.0, |a| a / 255.0),
            _ => 1.0,
        };
    }
    let Some(args) = c
        .split_once('(')
        .and_then(|(_, rest)| rest.strip_suffix(')'))
    else {
        return 1.0;
    };
    let parts: Vec<&str> = args
        .split([',', '/', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    match parts.get(3) {
        Some(alpha) => match alpha.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().map_or(1.0, |v| v / 100.0),
            None => alpha.parse::<f64>().unwrap_or(1.0),
        },
        None => 1.0,
    }
}

/// Topmost inactive region whose outline is under an absolute pixel.
///
/// Selections only count in select modes; shapes must be editable. Closed
/// shapes with a visible fill are hit inside as well.
fn region_at(doc: &Document, p: Point) -> Option<(RegionKind, usize)> {
    let kinds: &[RegionKind] = if doc.config.dragmode.is_select_mode() {
        &[RegionKind::Selections, RegionKind::Shapes]
    } else {
        &[RegionKind::Shapes]
    };

    for &kind in kinds {
        let store = doc.store(kind);
        for (index, region) in store.regions().iter().enumerate().rev() {
            if !region.editable || store.active() == Some(index) {
                continue;
            }
            let filled = kind == RegionKind::Shapes && region.fillcolor.as_deref().is_some_and(is_visible_fill);
            let hit = region.pixel_polygons(&doc.layout).iter().any(|polygon| {
                let pts = polygon.points();
                pts.windows(2).any(|s| segment_distance(p, s[0], s[1]) <= HANDLE_RADIUS)
                    || (filled && polygon.is_closed() && point_in_ring(p, &polygon.ring()))
            });
            if hit {
                return Some((kind, index));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EmittedEvent, RecordedEvents};
    use crate::layout::Layout;
    use plotsel_geom::{Position, Surface};
    use web_time::Duration;

    fn document(mode: DragMode) -> Document {
        let layout = Layout::single(Surface::new(0.0, 0.0, 100.0, 100.0), [0.0, 10.0], [0.0, 10.0]);
        Document::new(InteractionConfig::default().with_dragmode(mode), layout)
    }

    fn editable_rect(doc: &mut Document) {
        let mut input = RegionInput::rect("x", "y", 2.0, 2.0, 6.0, 6.0);
        input.editable = Some(true);
        doc.relayout(RegionKind::Shapes, vec![RegionEdit::Insert { index: 0, input }])
            .unwrap();
    }

    fn num(p: &Option<Position>) -> f64 {
        p.as_ref().and_then(Position::as_number).unwrap_or(f64::NAN)
    }

    #[test]
    fn test_click_on_shape_activates_it() {
        let mut doc = document(DragMode::DrawRect);
        editable_rect(&mut doc);
        let mut it = Interaction::silent("plot", &doc.config);
        let t0 = Instant::now();

        // stroke of the left edge at x = 20
        let ev = PointerEvent::new(20.0, 60.0, t0);
        it.pointer_down(&mut doc, &ev);
        it.pointer_up(&mut doc, &ev);
        assert_eq!(doc.shapes().active(), Some(0));
        assert!(it.context().outline.is_some());
    }

    #[test]
    fn test_vertex_drag_commits_edit() {
        let mut doc = document(DragMode::DrawRect);
        editable_rect(&mut doc);
        let mut it = Interaction::silent("plot", &doc.config);
        it.activate(&mut doc, RegionKind::Shapes, 0).unwrap();
        let t0 = Instant::now();

        // x1,y1 corner sits at (60, 40)
        it.pointer_down(&mut doc, &PointerEvent::new(60.0, 40.0, t0));
        let up = PointerEvent::new(80.0, 40.0, t0 + Duration::from_millis(50));
        it.pointer_move(&mut doc, &up);
        it.pointer_up(&mut doc, &up);

        let input = doc.shapes().input(0).unwrap();
        assert!((num(&input.x1) - 8.0).abs() < 1e-9);
        assert!((num(&input.x0) - 2.0).abs() < 1e-9);
        assert_eq!(doc.history().undo_count(), 2);
        assert!(!it.is_busy());
    }

    #[test]
    fn test_double_click_group_erases_shape() {
        let mut doc = document(DragMode::DrawRect);
        editable_rect(&mut doc);
        let mut it = Interaction::silent("plot", &doc.config);
        it.activate(&mut doc, RegionKind::Shapes, 0).unwrap();
        let t0 = Instant::now();

        for ms in [0, 100] {
            let ev = PointerEvent::new(30.0, 80.0, t0 + Duration::from_millis(ms));
            it.pointer_down(&mut doc, &ev);
            it.pointer_up(&mut doc, &ev);
        }
        assert!(doc.shapes().is_empty());
        assert!(it.context().outline.is_none());
    }

    #[test]
    fn test_set_dragmode_cancels_drag() {
        let mut doc = document(DragMode::Select);
        let mut it = Interaction::new("plot", &doc.config, RecordedEvents::new());
        let t0 = Instant::now();
        it.pointer_down(&mut doc, &PointerEvent::new(10.0, 10.0, t0));
        it.pointer_move(&mut doc, &PointerEvent::new(50.0, 50.0, t0 + Duration::from_millis(10)));
        assert!(it.context().draft.is_some());

        it.set_dragmode(&mut doc, DragMode::Lasso);
        assert!(!it.is_busy());
        assert!(it.context().draft.is_none());
        assert!(doc.selections().is_empty());
        assert_eq!(doc.config.dragmode, DragMode::Lasso);
        assert!(
            !it.events()
                .events
                .iter()
                .any(|e| matches!(e, EmittedEvent::Selected(_)))
        );
    }

    #[test]
    fn test_commit_failure_returns_to_idle() {
        let mut doc = document(DragMode::DrawRect);
        doc.read_only = true;
        let mut it = Interaction::silent("plot", &doc.config);
        let t0 = Instant::now();
        it.pointer_down(&mut doc, &PointerEvent::new(10.0, 10.0, t0));
        let up = PointerEvent::new(50.0, 50.0, t0 + Duration::from_millis(10));
        it.pointer_move(&mut doc, &up);
        it.pointer_up(&mut doc, &up);
        assert!(doc.shapes().is_empty());
        assert!(!it.is_busy());
        assert!(!it.context().outlining);
    }

    #[test]
    fn test_visible_fill() {
        assert!(!is_visible_fill("rgba(0,0,0,0)"));
        assert!(!is_visible_fill("rgba(0, 0, 0, 0)"));
        assert!(!is_visible_fill("rgba(0, 0, 0, 0.0)"));
        assert!(!is_visible_fill("#0000"));
        assert!(!is_visible_fill("#12345600"));
        assert!(!is_visible_fill("rgb(10 20 30 / 0%)"));
        assert!(!is_visible_fill("Transparent"));
        assert!(is_visible_fill("rgba(0,0,0,0.5)"));
        assert!(is_visible_fill("hsla(120, 50%, 50%, 0.2)"));
        assert!(is_visible_fill("#ff0000"));
        assert!(is_visible_fill("#f00f"));
        assert!(is_visible_fill("steelblue"));
    }
}
