//! Hit-test dispatcher.
//!
//! Routes a tester to every trace on the searched axes and writes back which
//! points each trace has selected. Point matching itself belongs to the trace
//! modules through [`TraceModule::select_points`].

use plotsel_geom::{Axis, Point, Tester};

use crate::events::SelectedPoint;
use crate::layout::Layout;

/// A trace to search, with the axes it is drawn on.
#[derive(Debug, Clone, Copy)]
pub struct SearchInfo<'a> {
    /// Index of the trace in the document (curve number).
    pub trace: usize,
    pub xaxis: &'a Axis,
    pub yaxis: &'a Axis,
}

/// A selectable trace.
pub trait TraceModule {
    fn xaxis(&self) -> &str;

    fn yaxis(&self) -> &str;

    fn is_visible(&self) -> bool {
        true
    }

    /// Points inside the tester, in subplot-local pixels.
    ///
    /// `None` clears any per-point selection styling and returns nothing.
    fn select_points(&mut self, info: &SearchInfo<'_>, tester: Option<&Tester>) -> Vec<SelectedPoint>;

    /// Selected point indices; `None` when the trace has no selection state.
    fn selected_points(&self) -> Option<&[usize]>;

    fn set_selected_points(&mut self, points: Option<Vec<usize>>);
}

/// Visible traces drawn on one of the given axes.
pub fn determine_search_traces<'a>(
    traces: &[Box<dyn TraceModule>],
    layout: &'a Layout,
    xaxes: &[&str],
    yaxes: &[&str],
) -> Vec<SearchInfo<'a>> {
    traces
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_visible())
        .filter(|(_, t)| xaxes.contains(&t.xaxis()) && yaxes.contains(&t.yaxis()))
        .filter_map(|(i, t)| {
            Some(SearchInfo {
                trace: i,
                xaxis: layout.axis(t.xaxis())?,
                yaxis: layout.axis(t.yaxis())?,
            })
        })
        .collect()
}

/// Run a tester over the searched traces and collect the selected points.
pub fn do_select(
    traces: &mut [Box<dyn TraceModule>],
    search: &[SearchInfo<'_>],
    tester: Option<&Tester>,
) -> Vec<SelectedPoint> {
    let mut all = Vec::new();
    for info in search {
        if let Some(trace) = traces.get_mut(info.trace) {
            all.extend(trace.select_points(info, tester));
        }
    }
    all
}

/// Write selection state back to the traces.
///
/// With points every searched trace gets a list (possibly empty); without,
/// every searched trace loses its selection state.
pub fn update_selected_state(
    traces: &mut [Box<dyn TraceModule>],
    search: &[SearchInfo<'_>],
    points: Option<&[SelectedPoint]>,
) {
    match points {
        Some(points) => {
            let mut lists: Vec<(usize, Vec<usize>)> = search.iter().map(|s| (s.trace, Vec::new())).collect();
            for pt in points {
                if let Some((_, list)) = lists.iter_mut().find(|(t, _)| *t == pt.curve_number) {
                    list.push(pt.point_number);
                }
            }
            for (trace, list) in lists {
                if let Some(t) = traces.get_mut(trace) {
                    t.set_selected_points(Some(list));
                }
            }
        }
        None => {
            for info in search {
                if let Some(t) = traces.get_mut(info.trace) {
                    t.set_selected_points(None);
                }
            }
        }
    }
}

/// Exactly one point selected across the searched traces.
pub fn is_only_one_point_selected(traces: &[Box<dyn TraceModule>], search: &[SearchInfo<'_>]) -> bool {
    let mut len = 0;
    for info in search {
        if let Some(selected) = traces.get(info.trace).and_then(|t| t.selected_points()) {
            if selected.len() > 1 {
                return false;
            }
            len += selected.len();
            if len > 1 {
                return false;
            }
        }
    }
    len == 1
}

/// Is a given point of a trace currently selected.
pub fn is_point_selected(traces: &[Box<dyn TraceModule>], trace: usize, point_number: usize) -> bool {
    traces
        .get(trace)
        .and_then(|t| t.selected_points())
        .is_some_and(|s| s.contains(&point_number))
}

/// Clear the selection of every trace on one subplot.
pub fn deselect_subplot(traces: &mut [Box<dyn TraceModule>], layout: &Layout, xaxis: &str, yaxis: &str) {
    let search = determine_search_traces(traces, layout, &[xaxis], &[yaxis]);
    log::debug!("Deselecting subplot {}{} ({} traces)", xaxis, yaxis, search.len());
    for info in &search {
        if let Some(t) = traces.get_mut(info.trace) {
            t.select_points(info, None);
        }
    }
    update_selected_state(traces, &search, None);
}

/// Scatter trace: x/y data tested at its pixel position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub xaxis: String,
    pub yaxis: String,
    pub visible: bool,
    pub selectedpoints: Option<Vec<usize>>,
    /// Per-point flag set by the last select pass
    pub selected: Vec<bool>,
}

impl ScatterTrace {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        let len = x.len().min(y.len());
        Self {
            x,
            y,
            xaxis: "x".to_string(),
            yaxis: "y".to_string(),
            visible: true,
            selectedpoints: None,
            selected: vec![false; len],
        }
    }

    pub fn on_axes(mut self, xaxis: impl Into<String>, yaxis: impl Into<String>) -> Self {
        self.xaxis = xaxis.into();
        self.yaxis = yaxis.into();
        self
    }

    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceModule for ScatterTrace {
    fn xaxis(&self) -> &str {
        &self.xaxis
    }

    fn yaxis(&self) -> &str {
        &self.yaxis
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn select_points(&mut self, info: &SearchInfo<'_>, tester: Option<&Tester>) -> Vec<SelectedPoint> {
        let len = self.len();
        self.selected = vec![false; len];
        let Some(tester) = tester else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for i in 0..len {
            let (x, y) = (self.x[i], self.y[i]);
            let px = Point::new(info.xaxis.pos2p(x), info.yaxis.pos2p(y));
            if !px.x.is_finite() || !px.y.is_finite() {
                continue;
            }
            if tester.contains(px, false, i, info.trace) {
                self.selected[i] = true;
                out.push(SelectedPoint {
                    curve_number: info.trace,
                    point_number: i,
                    x,
                    y,
                });
            }
        }
        out
    }

    fn selected_points(&self) -> Option<&[usize]> {
        self.selectedpoints.as_deref()
    }

    fn set_selected_points(&mut self, points: Option<Vec<usize>>) {
        self.selectedpoints = points;
    }
}
