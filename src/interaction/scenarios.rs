//! End-to-end pointer sessions against a document.

use plotsel_geom::{Axis, Position, Surface};
use web_time::{Duration, Instant};

use super::Interaction;
use super::gesture::{Modifiers, PointerEvent};
use crate::config::{ClickMode, DragMode, InteractionConfig, NewSelectionMode};
use crate::document::Document;
use crate::events::{EmittedEvent, RecordedEvents};
use crate::hittest::ScatterTrace;
use crate::layout::Layout;
use crate::region::{RegionInput, RegionType};
use crate::store::{RegionEdit, RegionKind};

const EPSILON: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn num(p: &Option<Position>) -> f64 {
    p.as_ref().and_then(Position::as_number).unwrap_or(f64::NAN)
}

fn sorted(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Drives one interaction with a clock that moves forward between gestures.
struct Session {
    doc: Document,
    it: Interaction<RecordedEvents>,
    now: Instant,
}

impl Session {
    fn new(config: InteractionConfig, layout: Layout) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let doc = Document::new(config, layout);
        let it = Interaction::new("plot", &doc.config, RecordedEvents::new());
        Self {
            doc,
            it,
            now: Instant::now(),
        }
    }

    fn single(config: InteractionConfig) -> Self {
        Self::new(
            config,
            Layout::single(Surface::new(0.0, 0.0, 200.0, 200.0), [0.0, 10.0], [0.0, 10.0]),
        )
    }

    fn step(&mut self, ms: u64) -> Instant {
        self.now += Duration::from_millis(ms);
        self.now
    }

    /// Press at the first point, move through the rest and release at the last.
    fn drag(&mut self, path: &[(f64, f64)], modifiers: Modifiers) {
        let t = self.step(1000);
        let (x, y) = path[0];
        self.it
            .pointer_down(&mut self.doc, &PointerEvent::new(x, y, t).with_modifiers(modifiers));
        for &(x, y) in &path[1..] {
            let t = self.step(10);
            self.it
                .pointer_move(&mut self.doc, &PointerEvent::new(x, y, t).with_modifiers(modifiers));
            self.it.tick(&mut self.doc, t);
        }
        let (x, y) = path[path.len() - 1];
        let t = self.now;
        self.it
            .pointer_up(&mut self.doc, &PointerEvent::new(x, y, t).with_modifiers(modifiers));
    }

    fn click_event(&mut self, ev: PointerEvent) {
        self.it.pointer_down(&mut self.doc, &ev);
        self.it.pointer_up(&mut self.doc, &ev);
    }

    fn click(&mut self, x: f64, y: f64) {
        let t = self.step(1000);
        self.click_event(PointerEvent::new(x, y, t));
    }

    fn double_click(&mut self, x: f64, y: f64) {
        let t = self.step(1000);
        self.click_event(PointerEvent::new(x, y, t));
        let t = self.step(100);
        self.click_event(PointerEvent::new(x, y, t));
    }

    fn events(&self) -> &RecordedEvents {
        self.it.events()
    }

    fn selected(&self, trace: usize) -> Vec<usize> {
        let mut points = self.doc.traces[trace]
            .selected_points()
            .map(<[usize]>::to_vec)
            .unwrap_or_default();
        points.sort_unstable();
        points
    }
}

/// Closed loop around a rectangle, walked in 10 px steps.
fn square_loop(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<(f64, f64)> {
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0 + 4.0)];
    let mut path = vec![corners[0]];
    for pair in corners.windows(2) {
        let ((ax, ay), (bx, by)) = (pair[0], pair[1]);
        let steps = ((bx - ax).abs().max((by - ay).abs()) / 10.0).ceil().max(1.0) as usize;
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            path.push((ax + (bx - ax) * t, ay + (by - ay) * t));
        }
    }
    path
}

fn gradual(mode: DragMode) -> InteractionConfig {
    let mut config = InteractionConfig::default().with_dragmode(mode);
    config.newselection.mode = NewSelectionMode::Gradual;
    config
}

#[test]
fn test_box_select_commits_rect_selection() {
    let mut s = Session::new(
        InteractionConfig::default().with_dragmode(DragMode::Select),
        Layout::single(Surface::new(80.0, 100.0, 200.0, 200.0), [0.0, 10.0], [0.0, 10.0]),
    );
    s.doc.traces.push(Box::new(ScatterTrace::new(
        vec![3.0, 5.0, 9.0],
        vec![5.0, 6.0, 9.0],
    )));

    s.drag(&[(130.0, 150.0), (180.0, 190.0), (230.0, 220.0)], Modifiers::NONE);

    assert_eq!(s.doc.selections().len(), 1);
    let input = s.doc.selections().input(0).unwrap();
    assert_eq!(input.kind, Some(RegionType::Rect));
    assert!(approx_eq(num(&input.x0), 2.5));
    assert!(approx_eq(num(&input.x1), 7.5));
    assert!(approx_eq(num(&input.y0), 7.5));
    assert!(approx_eq(num(&input.y1), 4.0));

    // immediate mode keeps the new selection active
    assert_eq!(s.doc.selections().active(), Some(0));
    assert!(s.it.context().outline.is_some());
    assert_eq!(s.selected(0), vec![0, 1]);

    let events = s.events();
    assert!(events.count_selecting() >= 1);
    let selected: Vec<_> = events
        .events
        .iter()
        .filter(|e| matches!(e, EmittedEvent::Selected(_)))
        .collect();
    assert_eq!(selected.len(), 1);
    let Some(Some(data)) = events.last_selected() else {
        panic!("expected a selected event with data");
    };
    assert_eq!(data.points.len(), 2);
    let range = data.range.as_ref().unwrap();
    assert!(approx_eq(range["x"][0], 2.5) && approx_eq(range["x"][1], 7.5));
    assert!(approx_eq(range["y"][0], 4.0) && approx_eq(range["y"][1], 7.5));
}

#[test]
fn test_gradual_lasso_with_subtract() {
    let mut s = Session::single(gradual(DragMode::Lasso));
    s.doc.traces.push(Box::new(ScatterTrace::new(
        vec![2.0, 5.0, 8.0],
        vec![2.0, 5.0, 8.0],
    )));

    s.drag(&square_loop(20.0, 20.0, 180.0, 180.0), Modifiers::NONE);
    assert!(s.doc.selections().is_empty());
    assert_eq!(s.selected(0), vec![0, 1, 2]);

    s.drag(&square_loop(80.0, 80.0, 120.0, 120.0), Modifiers::shift_alt());
    assert!(s.doc.selections().is_empty());
    assert_eq!(s.selected(0), vec![0, 2]);
    let Some(Some(data)) = s.events().last_selected() else {
        panic!("expected a selected event with data");
    };
    let mut numbers: Vec<_> = data.points.iter().map(|p| p.point_number).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, vec![0, 2]);
    assert!(data.lasso_points.is_some());

    // a plain press commits the accumulated outline as one selection
    s.click(190.0, 190.0);
    assert_eq!(s.doc.selections().len(), 1);
    let region = s.doc.selections().region(0).unwrap();
    assert_eq!(region.kind(), RegionType::Path);
    assert_eq!(region.pixel_polygons(s.doc.layout()).len(), 2);
    assert_eq!(s.selected(0), vec![0, 2]);
}

#[test]
fn test_repeated_shift_box_is_idempotent() {
    let mut s = Session::single(gradual(DragMode::Select));
    s.doc.traces.push(Box::new(ScatterTrace::new(vec![5.0, 9.5], vec![5.0, 9.5])));

    let path = [(40.0, 40.0), (100.0, 100.0), (160.0, 160.0)];
    s.drag(&path, Modifiers::NONE);
    s.drag(&path, Modifiers::shift());
    assert_eq!(s.selected(0), vec![0]);

    s.click(190.0, 10.0);
    assert_eq!(s.doc.selections().len(), 1);
    let polygons = s.doc.selections().region(0).unwrap().pixel_polygons(s.doc.layout());
    assert_eq!(polygons.len(), 1);
    let b = polygons[0].bounds();
    assert!(approx_eq(b.xmin, 40.0) && approx_eq(b.xmax, 160.0));
    assert!(approx_eq(b.ymin, 40.0) && approx_eq(b.ymax, 160.0));
    assert_eq!(s.selected(0), vec![0]);
}

#[test]
fn test_double_click_clears_selection() {
    let mut s = Session::single(InteractionConfig::default().with_dragmode(DragMode::Select));
    s.doc.traces.push(Box::new(ScatterTrace::new(vec![5.0], vec![5.0])));

    s.drag(&[(40.0, 40.0), (160.0, 160.0)], Modifiers::NONE);
    assert_eq!(s.doc.selections().len(), 1);
    assert_eq!(s.selected(0), vec![0]);

    s.double_click(190.0, 190.0);
    assert!(s.doc.selections().is_empty());
    assert!(s.doc.traces[0].selected_points().is_none_or(<[usize]>::is_empty));
    assert_eq!(s.events().count_deselect(), 1);
    assert!(s.it.context().outline.is_none());
}

#[test]
fn test_click_toggles_points() {
    let config = InteractionConfig::default()
        .with_dragmode(DragMode::Select)
        .with_clickmode(ClickMode {
            event: true,
            select: true,
        });
    let mut s = Session::single(config);
    s.doc.traces.push(Box::new(ScatterTrace::new(
        vec![1.0, 5.0, 9.0],
        vec![1.0, 5.0, 9.0],
    )));

    let t = s.step(1000);
    s.click_event(PointerEvent::new(100.0, 100.0, t).with_hover(0, 1));
    assert_eq!(s.selected(0), vec![1]);

    let t = s.step(1000);
    s.click_event(
        PointerEvent::new(180.0, 20.0, t)
            .with_hover(0, 2)
            .with_modifiers(Modifiers::shift()),
    );
    assert_eq!(s.selected(0), vec![1, 2]);

    let t = s.step(1000);
    s.click_event(
        PointerEvent::new(100.0, 100.0, t)
            .with_hover(0, 1)
            .with_modifiers(Modifiers::shift()),
    );
    assert_eq!(s.selected(0), vec![2]);

    // clicking the only selected point clears it
    let t = s.step(1000);
    s.click_event(PointerEvent::new(180.0, 20.0, t).with_hover(0, 2));
    assert!(s.selected(0).is_empty());
    assert_eq!(s.events().count_deselect(), 1);
}

#[test]
fn test_selections_on_other_subplot_survive() {
    let ya = Axis::linear("y", [0.0, 10.0], 0.0, 200.0);
    let layout = Layout::new(Surface::new(0.0, 0.0, 400.0, 200.0))
        .with_subplot(Axis::linear("x", [0.0, 10.0], 0.0, 200.0), ya.clone())
        .with_subplot(Axis::linear("x2", [0.0, 10.0], 200.0, 200.0), ya);
    let mut s = Session::new(InteractionConfig::default().with_dragmode(DragMode::Select), layout);
    s.doc.traces.push(Box::new(ScatterTrace::new(vec![5.0], vec![5.0])));
    s.doc
        .traces
        .push(Box::new(ScatterTrace::new(vec![5.0], vec![5.0]).on_axes("x2", "y")));

    s.drag(&[(50.0, 50.0), (150.0, 150.0)], Modifiers::NONE);
    s.drag(&[(250.0, 50.0), (350.0, 150.0)], Modifiers::NONE);
    assert_eq!(s.doc.selections().len(), 2);
    assert_eq!(s.selected(0), vec![0]);
    assert_eq!(s.selected(1), vec![0]);

    // a new box on the first subplot replaces only its own selection
    s.drag(&[(60.0, 60.0), (90.0, 90.0)], Modifiers::NONE);
    assert_eq!(s.doc.selections().len(), 2);
    assert!(s.selected(0).is_empty());
    assert_eq!(s.selected(1), vec![0]);
    assert!(
        s.doc
            .selections()
            .regions()
            .iter()
            .any(|r| r.subplot_axes() == Some(("x2", "y")))
    );
}

#[test]
fn test_draw_circle_shape() {
    let mut s = Session::single(InteractionConfig::default().with_dragmode(DragMode::DrawCircle));
    s.drag(&[(50.0, 50.0), (100.0, 90.0), (150.0, 130.0)], Modifiers::NONE);

    assert_eq!(s.doc.shapes().len(), 1);
    let input = s.doc.shapes().input(0).unwrap();
    assert_eq!(input.kind, Some(RegionType::Circle));
    // centered on the press, passing through the release corner
    let (x0, x1) = sorted(num(&input.x0), num(&input.x1));
    let (y0, y1) = sorted(num(&input.y0), num(&input.y1));
    let sqrt2 = std::f64::consts::SQRT_2;
    assert!(approx_eq((x0 + x1) / 2.0, 2.5) && approx_eq((y0 + y1) / 2.0, 7.5));
    assert!(approx_eq((x1 - x0) / 2.0, 5.0 * sqrt2));
    assert!(approx_eq((y1 - y0) / 2.0, 4.0 * sqrt2));
    assert!(s.events().events.is_empty());
}

#[test]
fn test_rejected_edit_keeps_shape() {
    let mut s = Session::single(InteractionConfig::default().with_dragmode(DragMode::DrawRect));
    let mut input = RegionInput::rect("x", "y", 2.0, 2.0, 6.0, 6.0);
    input.editable = Some(true);
    s.doc
        .relayout(RegionKind::Shapes, vec![RegionEdit::Insert { index: 0, input: input.clone() }])
        .unwrap();
    s.it.activate(&mut s.doc, RegionKind::Shapes, 0).unwrap();
    s.doc.read_only = true;

    // drag the x1,y1 corner
    s.drag(&[(120.0, 80.0), (140.0, 80.0), (160.0, 60.0)], Modifiers::NONE);

    assert_eq!(s.doc.shapes().input(0), Some(&input));
    let mesh = s.it.context().outline.as_ref().unwrap();
    let b = mesh.polygons()[0].bounds();
    assert!(approx_eq(b.xmin, 40.0) && approx_eq(b.xmax, 120.0));
    assert!(approx_eq(b.ymin, 80.0) && approx_eq(b.ymax, 160.0));
    assert!(!s.it.is_busy());
}

#[test]
fn test_release_outside_surface_cancels() {
    let mut s = Session::new(
        InteractionConfig::default().with_dragmode(DragMode::DrawRect),
        Layout::single(Surface::new(50.0, 50.0, 100.0, 100.0), [0.0, 10.0], [0.0, 10.0]),
    );
    s.drag(&[(60.0, 60.0), (120.0, 120.0), (300.0, 300.0)], Modifiers::NONE);
    assert!(s.doc.shapes().is_empty());
    assert!(s.it.context().draft.is_none());
}
