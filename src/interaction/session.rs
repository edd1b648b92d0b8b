//! One select or draw drag on a subplot, from press to done or click.

use plotsel_geom::polygon::{PolygonTester, cast_multi_polygon, handle_ellipse, rect_points};
use plotsel_geom::{Bounds, DecodeContext, LassoFilter, Point, PointTester, Polygon, SelectionDef, Tester, merge, multi_tester};
use web_time::{Duration, Instant};

use super::commit;
use super::context::{Draft, InteractionContext};
use super::gesture::{HoverPoint, PointerEvent};
use super::newshape::{new_selection, new_shape};
use super::reselect::{fill_range_items, preview_subplot, reselect, same_point};
use super::throttle::ThrottleCall;
use crate::config::{DragMode, DrawDirection, SelectDirection};
use crate::document::Document;
use crate::events::{SelectionEventData, SelectionEvents};
use crate::hittest::{
    deselect_subplot, determine_search_traces, do_select, is_only_one_point_selected, is_point_selected,
    update_selected_state,
};
use crate::layout::Subplot;
use crate::outline::OutlineMesh;
use crate::region::RegionInput;
use crate::store::{RegionEdit, RegionKind};

/// Direction a rectangle-like drag is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Full-height band following x
    H,
    /// Full-width band following y
    V,
    D,
}

/// Selecting event waiting on the throttle.
#[derive(Debug, Clone)]
struct PendingSelecting {
    tester: Option<Tester>,
    outline: Vec<Point>,
    rect: Option<Bounds>,
    extra: Vec<crate::events::SelectedPoint>,
    preview: SelectionEventData,
}

/// State of one drag on a subplot in a select or draw mode.
#[derive(Debug)]
pub struct SelectSession {
    mode: DragMode,
    subplot: Subplot,
    /// Press position in subplot-local pixels
    x0: f64,
    y0: f64,
    pw: f64,
    ph: f64,
    subtract: bool,
    immediate: bool,
    clear_subplot_selections: bool,
    shift: bool,
    hover: Option<HoverPoint>,
    filter: Option<LassoFilter>,
    current: Option<Polygon>,
    merged: Vec<Polygon>,
    pending: Option<PendingSelecting>,
    data: Option<SelectionEventData>,
    saved_draft: Option<Draft>,
    saved_outlining: bool,
}

impl SelectSession {
    /// Begin a drag at `ev` on `subplot`; `None` when its axes are unknown.
    pub fn start<E: SelectionEvents>(
        doc: &mut Document,
        ctx: &mut InteractionContext,
        events: &mut E,
        ev: &PointerEvent,
        subplot: &Subplot,
    ) -> Option<Self> {
        let (xa, ya) = doc.layout.subplot_axes(&subplot.id)?;
        let (x0, y0) = (ev.x - xa.offset, ev.y - ya.offset);
        let (pw, ph) = (xa.length, ya.length);
        let mode = doc.config.dragmode;
        let immediate = mode.is_select_mode() && doc.config.is_immediate();
        let subtract = ev.modifiers.alt && !mode.is_open_mode();

        let saved_draft = ctx.draft.clone();
        let saved_outlining = ctx.outlining;

        coerce_selections_cache(doc, ctx, events, ev, subplot, mode);

        let filter = mode
            .is_free_mode()
            .then(|| LassoFilter::new(Point::new(x0, y0), doc.config.bend_tolerance));

        log::debug!(
            "Start {:?} on {} at ({:.1}, {:.1}), subtract {}",
            mode,
            subplot.id,
            x0,
            y0,
            subtract
        );

        Some(Self {
            mode,
            subplot: subplot.clone(),
            x0,
            y0,
            pw,
            ph,
            subtract,
            immediate,
            clear_subplot_selections: immediate && !ev.modifiers.shift,
            shift: ev.modifiers.shift,
            hover: ev.hover,
            filter,
            current: None,
            merged: Vec::new(),
            pending: None,
            data: None,
            saved_draft,
            saved_outlining,
        })
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn subplot(&self) -> &Subplot {
        &self.subplot
    }

    /// Drop every persisted selection of this subplot, once, on the first move.
    fn clear_subplot_selections<E: SelectionEvents>(
        &mut self,
        doc: &mut Document,
        ctx: &mut InteractionContext,
        events: &mut E,
    ) {
        if !std::mem::take(&mut self.clear_subplot_selections) {
            return;
        }
        let (xref, yref) = (&self.subplot.xaxis, &self.subplot.yaxis);
        deselect_subplot(&mut doc.traces, &doc.layout, xref, yref);

        let kept = kept_selections(doc, xref, yref);
        if kept.len() < doc.selections.len() {
            ctx.no_emit_selected_at_start = true;
            commit(doc, ctx, events, RegionKind::Selections, vec![RegionEdit::ReplaceAll { inputs: kept }]);
        }
    }

    /// Pointer moved by `(dx, dy)` from the press position.
    pub fn move_to<E: SelectionEvents>(
        &mut self,
        doc: &mut Document,
        ctx: &mut InteractionContext,
        events: &mut E,
        dx: f64,
        dy: f64,
        now: Instant,
    ) {
        self.clear_subplot_selections(doc, ctx, events);

        let x1 = (self.x0 + dx).clamp(0.0, self.pw);
        let y1 = (self.y0 + dy).clamp(0.0, self.ph);

        let pts = if self.mode.is_rect_mode() {
            self.rect_outline(doc, x1, y1)
        } else {
            match self.filter.as_mut() {
                Some(filter) => {
                    filter.add_point(Point::new(x1, y1));
                    filter.filtered().to_vec()
                }
                None => return,
            }
        };

        let current = Polygon::from_points(&pts, !self.mode.is_open_mode()).with_subtract(self.subtract);
        let cached = ctx.cache(&self.subplot.id).filter(|c| !c.defs.is_empty());
        let tester = match cached {
            Some(cache) => {
                self.merged = merge(&cache.merged, &current, self.subtract);
                let mut defs = cache.defs.clone();
                defs.push(SelectionDef::Polygon(current.clone()));
                multi_tester(&defs)
            }
            None => {
                self.merged = vec![current.clone()];
                Some(Tester::Polygon(PolygonTester::from_polygon(&current)))
            }
        };
        self.current = Some(current);

        ctx.draft = Some(Draft {
            subplot: self.subplot.id.clone(),
            polygons: self.merged.clone(),
        });
        ctx.outlining = true;

        if !self.mode.is_select_mode() {
            return;
        }

        let extra = reselect(doc, ctx, events, false).points;
        let (tester, points) = preview_subplot(doc, &self.subplot.xaxis, &self.subplot.yaxis, &self.merged, tester);
        let (outline, rect) = match &self.filter {
            Some(filter) => (filter.filtered().to_vec(), None),
            None => cast_multi_polygon(&self.merged),
        };
        self.pending = Some(PendingSelecting {
            tester,
            outline,
            rect,
            extra,
            preview: SelectionEventData::with_points(points),
        });

        let key = ctx.select_key();
        let interval = Duration::from_millis(doc.config.select_delay_ms);
        if ctx.throttle.throttle(&key, interval, now) == ThrottleCall::Run {
            self.flush_selecting(doc, events);
        }
    }

    /// Corners, line ends or ellipse points of a rectangle-mode drag.
    fn rect_outline(&self, doc: &Document, x1: f64, y1: f64) -> Vec<Point> {
        let (x0, y0, pw, ph) = (self.x0, self.y0, self.pw, self.ph);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let ellipse = self.mode.is_ellipse_mode();
        let line_or_ellipse = ellipse || self.mode.is_line_mode();
        let band = |len: f64| (if ellipse { len / 2.0 } else { 0.0 }, len);

        let (direction, start, end) = if self.mode.is_select_mode() {
            let min_select = doc.config.min_select;
            let direction = match doc.config.selectdirection {
                SelectDirection::H => Direction::H,
                SelectDirection::V => Direction::V,
                SelectDirection::D => Direction::D,
                SelectDirection::Any if dy < (dx * 0.6).min(min_select) => Direction::H,
                SelectDirection::Any if dx < (dy * 0.6).min(min_select) => Direction::V,
                SelectDirection::Any => Direction::D,
            };
            let (start, end) = match direction {
                Direction::H => band(ph),
                Direction::V => band(pw),
                Direction::D => (0.0, 0.0),
            };
            (direction, start, end)
        } else {
            match doc.config.newshape.drawdirection {
                DrawDirection::Vertical => {
                    let (s, e) = band(ph);
                    (Direction::H, s, e)
                }
                DrawDirection::Horizontal => {
                    let (s, e) = band(pw);
                    (Direction::V, s, e)
                }
                DrawDirection::Ortho if dx < dy => (Direction::H, y0, y1),
                DrawDirection::Ortho => (Direction::V, x0, x1),
                DrawDirection::Diagonal => (Direction::D, 0.0, 0.0),
            }
        };

        match direction {
            Direction::H if line_or_ellipse => {
                handle_ellipse(ellipse, Point::new(x1, start), Point::new(x1, end))
            }
            Direction::H => rect_points(x0, start, x1, end),
            Direction::V if line_or_ellipse => {
                handle_ellipse(ellipse, Point::new(start, y1), Point::new(end, y1))
            }
            Direction::V => rect_points(start, y0, end, y1),
            Direction::D if line_or_ellipse => handle_ellipse(ellipse, Point::new(x0, y0), Point::new(x1, y1)),
            Direction::D => rect_points(x0, y0, x1, y1),
        }
    }

    /// Emit the pending selecting event.
    pub fn flush_selecting<E: SelectionEvents>(&mut self, doc: &mut Document, events: &mut E) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some((xa, ya)) = doc.layout.subplot_axes(&self.subplot.id) else {
            return;
        };
        let search = determine_search_traces(&doc.traces, &doc.layout, &[xa.id.as_str()], &[ya.id.as_str()]);
        let mut points = do_select(&mut doc.traces, &search, pending.tester.as_ref());
        for p in pending.extra {
            if !points.iter().any(|q| same_point(q, &p)) {
                points.push(p);
            }
        }

        let mut data = pending.preview;
        if !points.is_empty() {
            data.points = points;
        }
        fill_range_items(&mut data, xa, ya, &pending.outline, pending.rect);
        events.on_selecting(&data);
        self.data = Some(data);
    }

    /// The drag ended past the drag threshold.
    pub fn done<E: SelectionEvents>(
        mut self,
        doc: &mut Document,
        ctx: &mut InteractionContext,
        events: &mut E,
        now: Instant,
    ) {
        let key = ctx.select_key();
        if ctx.throttle.done(&key, now) || self.pending.is_some() {
            self.flush_selecting(doc, events);
        }
        ctx.throttle.clear(&key);

        if !self.immediate
            && let Some(current) = self.current.take()
        {
            let cache = ctx.cache_mut(&self.subplot.id);
            cache.defs.push(SelectionDef::Polygon(current));
            cache.merged = std::mem::take(&mut self.merged);
        }

        if self.immediate || self.mode.is_draw_mode() {
            clear_selections_cache(doc, ctx, events, &self.subplot, self.mode, self.immediate);
        }

        if self.mode.is_select_mode() {
            events.on_selected(self.data.as_ref());
        }
    }

    /// The gesture ended without a drag.
    pub fn click<E: SelectionEvents>(
        self,
        doc: &mut Document,
        ctx: &mut InteractionContext,
        events: &mut E,
        num_clicks: u32,
        now: Instant,
    ) {
        if doc.shapes.active().is_some() {
            doc.shapes.deactivate();
            ctx.outline = None;
            return;
        }
        if self.mode.is_draw_mode() {
            return;
        }

        let key = ctx.select_key();
        ctx.throttle.done(&key, now);
        ctx.throttle.clear(&key);

        let (xref, yref) = (self.subplot.xaxis.as_str(), self.subplot.yaxis.as_str());
        let clickmode = doc.config.clickmode;

        if num_clicks == 2 {
            ctx.draft = None;
            let search = determine_search_traces(&doc.traces, &doc.layout, &[xref], &[yref]);
            let searched = !search.is_empty();
            for info in &search {
                if let Some(trace) = doc.traces.get_mut(info.trace) {
                    trace.select_points(info, None);
                }
            }
            update_selected_state(&mut doc.traces, &search, None);
            clear_selections_cache(doc, ctx, events, &self.subplot, self.mode, false);
            events.on_deselect();

            if searched {
                let kept = kept_selections(doc, xref, yref);
                if kept.len() < doc.selections.len() {
                    ctx.no_emit_selected_at_start = true;
                    commit(doc, ctx, events, RegionKind::Selections, vec![RegionEdit::ReplaceAll { inputs: kept }]);
                }
            }
            return;
        }

        if clickmode.select {
            self.select_on_click(doc, ctx, events);
        }
        if clickmode.is_event_only() {
            events.on_selected(None);
        }
    }

    /// Toggle the hovered point in or out of the selection.
    fn select_on_click<E: SelectionEvents>(&self, doc: &mut Document, ctx: &mut InteractionContext, events: &mut E) {
        let Some(hover) = self.hover else {
            return;
        };
        let (xref, yref) = (self.subplot.xaxis.as_str(), self.subplot.yaxis.as_str());
        let send_events = doc.config.clickmode.event;
        let search = determine_search_traces(&doc.traces, &doc.layout, &[xref], &[yref]);
        if !search.iter().any(|s| s.trace == hover.trace) {
            return;
        }

        let selected = is_point_selected(&doc.traces, hover.trace, hover.point_number);
        if is_only_one_point_selected(&doc.traces, &search) && selected {
            ctx.draft = None;
            for info in &search {
                if let Some(trace) = doc.traces.get_mut(info.trace) {
                    trace.select_points(info, None);
                }
            }
            update_selected_state(&mut doc.traces, &search, None);
            clear_selections_cache(doc, ctx, events, &self.subplot, self.mode, false);
            if send_events {
                events.on_deselect();
            }
            return;
        }

        let def = SelectionDef::Point(PointTester {
            trace: hover.trace,
            point_number: hover.point_number,
            subtract: self.shift && selected,
        });
        let cache = ctx.cache_mut(&self.subplot.id);
        let mut defs = cache.defs.clone();
        defs.push(def.clone());
        let tester = multi_tester(&defs);

        let points = do_select(&mut doc.traces, &search, tester.as_ref());
        update_selected_state(&mut doc.traces, &search, Some(&points));
        ctx.cache_mut(&self.subplot.id).defs.push(def);
        log::debug!("Click selection: {} points", points.len());

        if send_events {
            events.on_selected(Some(&SelectionEventData::with_points(points)));
        }
    }

    /// Drop the drag without committing anything.
    pub fn cancel<E: SelectionEvents>(self, doc: &mut Document, ctx: &mut InteractionContext, events: &mut E) {
        let key = ctx.select_key();
        ctx.throttle.clear(&key);
        ctx.draft = self.saved_draft;
        ctx.outlining = self.saved_outlining;
        if self.mode.is_select_mode() {
            reselect(doc, ctx, events, false);
        }
        log::debug!("Cancelled {:?} on {}", self.mode, self.subplot.id);
    }
}

/// Selections not on the subplot of two axes.
fn kept_selections(doc: &Document, xref: &str, yref: &str) -> Vec<RegionInput> {
    doc.selections
        .inputs()
        .iter()
        .zip(doc.selections.regions())
        .filter(|(_, r)| r.subplot_axes() != Some((xref, yref)))
        .map(|(input, _)| input.clone())
        .collect()
}

/// Keep the accumulated definitions of a modifier drag on the same subplot;
/// otherwise commit the displayed outline and start over.
fn coerce_selections_cache<E: SelectionEvents>(
    doc: &mut Document,
    ctx: &mut InteractionContext,
    events: &mut E,
    ev: &PointerEvent,
    subplot: &Subplot,
    mode: DragMode,
) {
    let same_subplot = ctx.last_selected_subplot() == Some(subplot.id.as_str());
    let modifier = (ev.modifiers.shift || ev.modifiers.alt) && !mode.is_open_mode();
    let has_cache = ctx.cache(&subplot.id).is_some();

    if same_subplot && modifier && has_cache {
        log::trace!("Reusing selection definitions on {}", subplot.id);
    } else if !modifier || !has_cache {
        clear_selections_cache(doc, ctx, events, subplot, mode, false);
    }

    ctx.select_subplot(&subplot.id);
}

/// Commit the displayed outline as a new region and forget the definitions.
///
/// Draw modes add a shape, select modes a selection; in immediate mode the
/// new selection becomes active.
pub(crate) fn clear_selections_cache<E: SelectionEvents>(
    doc: &mut Document,
    ctx: &mut InteractionContext,
    events: &mut E,
    subplot: &Subplot,
    mode: DragMode,
    immediate: bool,
) {
    doc.shapes.deactivate();
    doc.selections.deactivate();
    ctx.outline = None;

    let draft = match ctx.draft.take() {
        Some(draft) if ctx.outlining && draft.subplot == subplot.id => Some(draft),
        other => {
            ctx.draft = other;
            None
        }
    };

    if let Some(draft) = draft
        && (mode.is_draw_mode() || mode.is_select_mode())
    {
        let input = doc.layout.subplot_axes(&subplot.id).map(|(xa, ya)| {
            let dctx = DecodeContext::for_axes(xa, ya, doc.layout.surface);
            if mode.is_draw_mode() {
                new_shape(&draft.polygons, mode, &dctx, &doc.config.newshape, &xa.id, &ya.id)
            } else {
                new_selection(&draft.polygons, mode, &dctx, &doc.config.newselection, &xa.id, &ya.id)
            }
        });

        if let Some(input) = input {
            let kind = if mode.is_draw_mode() {
                RegionKind::Shapes
            } else {
                ctx.no_emit_selected_at_start = true;
                RegionKind::Selections
            };
            let index = doc.store(kind).len();
            let ok = commit(doc, ctx, events, kind, vec![RegionEdit::Insert { index, input }]);
            if ok && immediate && kind == RegionKind::Selections {
                doc.selections.activate_last();
                ctx.outline = OutlineMesh::for_active(doc);
            }
        }
        ctx.outlining = false;
    }

    ctx.reset_cache(&subplot.id);
}
