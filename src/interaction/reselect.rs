//! Re-running persisted selections against the traces.

use std::collections::BTreeMap;

use plotsel_geom::polygon::{assign_subtract_flags, cast_multi_polygon, merged_tester};
use plotsel_geom::{Axis, Bounds, Point, Polygon, Tester, merge};

use super::context::InteractionContext;
use crate::document::Document;
use crate::events::{SelectedPoint, SelectionEventData, SelectionEvents};
use crate::hittest::{SearchInfo, deselect_subplot, determine_search_traces, do_select, update_selected_state};
use crate::layout::Layout;
use crate::region::Region;

/// Polygons of one selection in the local pixels of its subplot.
///
/// `None` when the selection is not on a pair of known axes.
pub fn selection_polygons(region: &Region, layout: &Layout) -> Option<Vec<Polygon>> {
    let (xid, yid) = region.subplot_axes()?;
    let (xa, ya) = (layout.axis(xid)?, layout.axis(yid)?);
    let mut polygons = region.pixel_polygons(layout);
    for polygon in &mut polygons {
        polygon.translate(-xa.offset, -ya.offset);
    }
    assign_subtract_flags(&mut polygons);
    Some(polygons)
}

/// Persisted selection polygons on the subplot of two axes.
pub fn layout_polygons(selections: &[Region], layout: &Layout, xaxis: &str, yaxis: &str) -> Vec<Polygon> {
    selections
        .iter()
        .filter(|r| r.subplot_axes() == Some((xaxis, yaxis)))
        .filter_map(|r| selection_polygons(r, layout))
        .flatten()
        .collect()
}

/// Tester over `polygons` merged in order; `tester` is kept only when there are none.
pub fn add_tester(polygons: &[Polygon], tester: Option<Tester>) -> Option<Tester> {
    let Some((first, rest)) = polygons.split_first() else {
        return tester;
    };
    let mut merged = vec![first.clone()];
    for polygon in rest {
        merged = merge(&merged, polygon, polygon.subtract);
    }
    merged_tester(&merged)
}

/// Attach a geometry summary in axis positions.
///
/// Rectangles report a sorted range per axis, everything else the outline
/// coordinates per axis.
pub fn fill_range_items(
    data: &mut SelectionEventData,
    xaxis: &Axis,
    yaxis: &Axis,
    outline: &[Point],
    rect: Option<Bounds>,
) {
    match rect {
        Some(b) => {
            let sorted = |a: f64, b: f64| if a <= b { [a, b] } else { [b, a] };
            let mut range = BTreeMap::new();
            range.insert(xaxis.id.clone(), sorted(xaxis.p2pos(b.xmin), xaxis.p2pos(b.xmax)));
            range.insert(yaxis.id.clone(), sorted(yaxis.p2pos(b.ymin), yaxis.p2pos(b.ymax)));
            data.range = Some(range);
        }
        None => {
            let mut lasso = BTreeMap::new();
            lasso.insert(xaxis.id.clone(), outline.iter().map(|p| xaxis.p2pos(p.x)).collect());
            lasso.insert(yaxis.id.clone(), outline.iter().map(|p| yaxis.p2pos(p.y)).collect());
            data.lasso_points = Some(lasso);
        }
    }
}

/// Select points on the subplot of two axes by the persisted selections
/// together with the live draft.
///
/// Returns the combined tester and the points it selected.
pub fn preview_subplot(
    doc: &mut Document,
    xaxis: &str,
    yaxis: &str,
    draft: &[Polygon],
    tester: Option<Tester>,
) -> (Option<Tester>, Vec<SelectedPoint>) {
    let mut polygons = layout_polygons(doc.selections.regions(), &doc.layout, xaxis, yaxis);
    let mut draft = draft.to_vec();
    assign_subtract_flags(&mut draft);
    polygons.extend(draft);

    let tester = add_tester(&polygons, tester);
    let search = determine_search_traces(&doc.traces, &doc.layout, &[xaxis], &[yaxis]);
    let points = do_select(&mut doc.traces, &search, tester.as_ref());
    update_selected_state(&mut doc.traces, &search, Some(&points));
    (tester, points)
}

/// Same point of the same trace.
pub fn same_point(a: &SelectedPoint, b: &SelectedPoint) -> bool {
    a.curve_number == b.curve_number && a.point_number == b.point_number
}

/// Re-run every persisted selection against the traces.
///
/// With `may_emit` a selected event carries the result, unless the flag set
/// by the commit that triggered this pass suppresses it. A pending deselect
/// of an erased selection's subplot is settled here as well.
pub fn reselect<E: SelectionEvents>(
    doc: &mut Document,
    ctx: &mut InteractionContext,
    events: &mut E,
    may_emit: bool,
) -> SelectionEventData {
    let layout = &doc.layout;
    let regions = doc.selections.regions();
    let mut points: Vec<SelectedPoint> = Vec::new();
    let mut searched: Vec<SearchInfo<'_>> = Vec::new();

    for subplot in &layout.subplots {
        let polygons = layout_polygons(regions, layout, &subplot.xaxis, &subplot.yaxis);
        if polygons.is_empty() {
            continue;
        }
        let tester = add_tester(&polygons, None);
        let search = determine_search_traces(&doc.traces, layout, &[subplot.xaxis.as_str()], &[subplot.yaxis.as_str()]);
        points.extend(do_select(&mut doc.traces, &search, tester.as_ref()));
        searched.extend(search);
    }
    update_selected_state(&mut doc.traces, &searched, Some(&points));
    log::debug!("Reselect: {} points on {} traces", points.len(), searched.len());

    let mut data = SelectionEventData::with_points(points);
    data.selections = doc.selections.inputs().to_vec();
    let send_events = doc.config.clickmode.event && may_emit;

    if may_emit {
        if let Some(region) = doc.selections.active_region()
            && let Some(polygons) = selection_polygons(region, layout)
            && let Some((xid, yid)) = region.subplot_axes()
            && let (Some(xa), Some(ya)) = (layout.axis(xid), layout.axis(yid))
        {
            let (outline, rect) = cast_multi_polygon(&polygons);
            fill_range_items(&mut data, xa, ya, &outline, rect);
        }

        if ctx.no_emit_selected_at_start {
            ctx.no_emit_selected_at_start = false;
        } else if send_events {
            events.on_selected(Some(&data));
        }
    }

    if let Some(pending) = ctx.deselect.take() {
        let still_selected = searched
            .iter()
            .any(|s| s.xaxis.id == pending.xref && s.yaxis.id == pending.yref);
        if !still_selected {
            deselect_subplot(&mut doc.traces, layout, &pending.xref, &pending.yref);
        }
        if send_events {
            if data.points.is_empty() {
                events.on_deselect();
            } else {
                events.on_selected(Some(&data));
            }
        }
    }

    data
}
