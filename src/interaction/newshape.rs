//! Turning outline polygons into region inputs.
//!
//! Drafted outlines become new shapes or selections; edited outlines of an
//! active region become field edits of that region.

use plotsel_geom::path::{AxisDecode, Dim, encode_with};
use plotsel_geom::polygon::{COS45, I000, I090, I180, I270, SIN45, ellipse_over};
use plotsel_geom::{DecodeContext, Point, Polygon, Position};

use crate::config::{DragMode, NewSelectionConfig, NewShapeConfig};
use crate::error::{PlotselError, PlotselResult};
use crate::layout::Layout;
use crate::region::{AxisRef, LineInput, Region, RegionField, RegionInput, RegionType};

fn position(decode: AxisDecode<'_>, v: f64) -> Position {
    match decode {
        AxisDecode::Range(axis) => axis.format_position(v),
        _ => Position::Number(v),
    }
}

fn corners(ctx: &DecodeContext<'_>, kind: RegionType, p0: Point, p1: Point) -> RegionInput {
    let a = ctx.map(p0);
    let b = ctx.map(p1);
    RegionInput {
        kind: Some(kind),
        x0: Some(position(ctx.x, a.x)),
        y0: Some(position(ctx.y, a.y)),
        x1: Some(position(ctx.x, b.x)),
        y1: Some(position(ctx.y, b.y)),
        ..Default::default()
    }
}

/// Bounding box corners of the ellipse through the four cardinal vertices.
fn ellipse_box(cell: &[Point]) -> (Point, Point) {
    let (a, b, c, d) = (cell[I000], cell[I090], cell[I180], cell[I270]);
    let x0 = (b.x + d.x) / 2.0;
    let y0 = (a.y + c.y) / 2.0;
    let rx = (d.x - b.x + c.x - a.x) / 2.0;
    let ry = (d.y - b.y + c.y - a.y) / 2.0;
    ellipse_over(Point::new(x0, y0), Point::new(x0 + rx * COS45, y0 + ry * SIN45))
}

/// Geometry fields for pixel polygons drawn in `mode`.
///
/// `ctx` maps the polygons' pixels to region positions. A single cell becomes
/// a rect, line or ellipse when the mode asks for one; anything else is a path.
pub fn geometry_from_outline(polygons: &[Polygon], mode: DragMode, ctx: &DecodeContext<'_>) -> RegionInput {
    let cell = match polygons {
        [single] => Some(single.points()),
        _ => None,
    };

    match (cell, mode) {
        (Some(cell), DragMode::DrawRect | DragMode::Select) if cell.len() == 5 => {
            corners(ctx, RegionType::Rect, cell[0], cell[2])
        }
        (Some(cell), DragMode::DrawLine) if cell.len() >= 2 => corners(ctx, RegionType::Line, cell[0], cell[1]),
        (Some(cell), DragMode::DrawCircle) if cell.len() > I270 => {
            let (p0, p1) = ellipse_box(&cell);
            corners(ctx, RegionType::Circle, p0, p1)
        }
        _ => {
            let mapped = ctx.apply(polygons);
            let path = encode_with(&mapped, |v, dim| match dim {
                Dim::X => ctx.format_x(v),
                Dim::Y => ctx.format_y(v),
            });
            RegionInput {
                kind: Some(RegionType::Path),
                path: Some(path),
                ..Default::default()
            }
        }
    }
}

/// New shape input for a drafted outline on a subplot.
pub fn new_shape(
    polygons: &[Polygon],
    mode: DragMode,
    ctx: &DecodeContext<'_>,
    style: &NewShapeConfig,
    xref: &str,
    yref: &str,
) -> RegionInput {
    let mut input = geometry_from_outline(polygons, mode, ctx);
    input.xref = Some(AxisRef::Axis(xref.to_string()));
    input.yref = Some(AxisRef::Axis(yref.to_string()));
    input.editable = Some(true);
    input.opacity = Some(style.opacity);
    input.line = Some(LineInput::from(&style.line));
    if !mode.is_open_mode() {
        input.fillcolor = Some(style.fillcolor.clone());
        input.fillrule = Some(style.fillrule);
    }
    input
}

/// New selection input for a drafted outline on a subplot.
pub fn new_selection(
    polygons: &[Polygon],
    mode: DragMode,
    ctx: &DecodeContext<'_>,
    style: &NewSelectionConfig,
    xref: &str,
    yref: &str,
) -> RegionInput {
    let mode = if mode == DragMode::Select {
        DragMode::Select
    } else {
        DragMode::Lasso
    };
    let mut input = geometry_from_outline(polygons, mode, ctx);
    input.xref = Some(AxisRef::Axis(xref.to_string()));
    input.yref = Some(AxisRef::Axis(yref.to_string()));
    input.line = Some(LineInput::from(&style.line));
    input
}

/// Drag mode an existing region is edited as.
pub fn edit_mode(region: &Region) -> DragMode {
    match region.kind() {
        RegionType::Rect => DragMode::DrawRect,
        RegionType::Circle => DragMode::DrawCircle,
        RegionType::Line => DragMode::DrawLine,
        RegionType::Path if region.is_closed_path() => DragMode::DrawClosedPath,
        RegionType::Path => DragMode::DrawOpenPath,
    }
}

fn unshift(position: Position, shift: f64) -> Position {
    match position {
        Position::Number(v) if shift != 0.0 => Position::Number(v - shift),
        other => other,
    }
}

/// Field edits that move `region` onto edited absolute pixel polygons.
///
/// Category shifts are taken back out so the region redraws where it was
/// dragged.
pub fn edit_fields(region: &Region, layout: &Layout, polygons: &[Polygon]) -> PlotselResult<Vec<RegionField>> {
    let ctx = region.decode_context(layout)?;
    let edited = geometry_from_outline(polygons, edit_mode(region), &ctx);

    match region.kind() {
        RegionType::Path => match edited.path {
            Some(path) => Ok(vec![RegionField::Path(path)]),
            None => Err(PlotselError::invalid_path("edited outline has no path")),
        },
        kind => {
            if edited.kind != Some(kind) {
                return Err(PlotselError::commit_rejected(format!(
                    "edited outline is no longer a {}",
                    kind.name()
                )));
            }
            let (Some(x0), Some(x1), Some(y0), Some(y1)) = (edited.x0, edited.x1, edited.y0, edited.y1) else {
                return Err(PlotselError::commit_rejected("edited outline lost its corners"));
            };
            let s = region.shifts;
            Ok(vec![
                RegionField::X0(unshift(x0, s.x0)),
                RegionField::X1(unshift(x1, s.x1)),
                RegionField::Y0(unshift(y0, s.y0)),
                RegionField::Y1(unshift(y1, s.y1)),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionDefaults;
    use plotsel_geom::polygon::{handle_ellipse, rect_points};
    use plotsel_geom::{Axis, AxisKind, Surface, decode};

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn num(p: &Option<Position>) -> f64 {
        p.as_ref().and_then(Position::as_number).unwrap_or(f64::NAN)
    }

    fn axes() -> (Axis, Axis) {
        (
            Axis::linear("x", [0.0, 10.0], 0.0, 200.0),
            Axis::linear("y", [0.0, 10.0], 0.0, 200.0),
        )
    }

    #[test]
    fn test_rect_draft_becomes_rect() {
        let (xa, ya) = axes();
        let ctx = DecodeContext::for_axes(&xa, &ya, Surface::new(0.0, 0.0, 200.0, 200.0));
        let poly = Polygon::from_points(&rect_points(50.0, 50.0, 150.0, 120.0), true);
        let input = new_shape(&[poly], DragMode::DrawRect, &ctx, &NewShapeConfig::default(), "x", "y");
        assert_eq!(input.kind, Some(RegionType::Rect));
        assert!(approx_eq(num(&input.x0), 2.5));
        assert!(approx_eq(num(&input.x1), 7.5));
        assert!(approx_eq(num(&input.y0), 7.5));
        assert!(approx_eq(num(&input.y1), 4.0));
        assert!(input.fillcolor.is_some());
        assert_eq!(input.editable, Some(true));
    }

    #[test]
    fn test_open_path_has_no_fill() {
        let (xa, ya) = axes();
        let ctx = DecodeContext::for_axes(&xa, &ya, Surface::new(0.0, 0.0, 200.0, 200.0));
        let poly = Polygon::from_points(&[Point::new(0.0, 200.0), Point::new(100.0, 100.0)], false);
        let input = new_shape(&[poly], DragMode::DrawOpenPath, &ctx, &NewShapeConfig::default(), "x", "y");
        assert_eq!(input.kind, Some(RegionType::Path));
        assert_eq!(input.path.as_deref(), Some("M0,0L5,5"));
        assert!(input.fillcolor.is_none());
    }

    #[test]
    fn test_circle_draft_recovers_box() {
        let (xa, ya) = axes();
        let ctx = DecodeContext::for_axes(&xa, &ya, Surface::new(0.0, 0.0, 200.0, 200.0));
        let pts = handle_ellipse(true, Point::new(100.0, 100.0), Point::new(120.0, 110.0));
        let poly = Polygon::from_points(&pts, true);
        let b = poly.bounds();
        let input = new_shape(&[poly], DragMode::DrawCircle, &ctx, &NewShapeConfig::default(), "x", "y");
        assert_eq!(input.kind, Some(RegionType::Circle));
        let xs = [num(&input.x0), num(&input.x1)];
        assert!(approx_eq(xs[0].min(xs[1]), xa.p2pos(b.xmin)));
        assert!(approx_eq(xs[0].max(xs[1]), xa.p2pos(b.xmax)));
    }

    #[test]
    fn test_lasso_selection_is_path_with_dates() {
        let start = plotsel_geom::transform::parse_date("2020-01-01").unwrap();
        let day = 86_400_000.0;
        let xa = Axis::new("x", AxisKind::Date, [start, start + 10.0 * day], 0.0, 100.0);
        let ya = Axis::linear("y", [0.0, 1.0], 0.0, 100.0);
        let ctx = DecodeContext::for_axes(&xa, &ya, Surface::new(0.0, 0.0, 100.0, 100.0));
        let poly = Polygon::from_points(
            &[Point::new(10.0, 100.0), Point::new(20.0, 0.0), Point::new(30.0, 100.0)],
            true,
        );
        let input = new_selection(&[poly], DragMode::Lasso, &ctx, &NewSelectionConfig::default(), "x", "y");
        let path = input.path.unwrap();
        assert!(path.starts_with("M2020-01-02,0L2020-01-03,1"));
        assert!(path.ends_with('Z'));
    }

    #[test]
    fn test_edit_fields_for_rect_region() {
        let layout = Layout::single(Surface::new(80.0, 100.0, 200.0, 200.0), [0.0, 10.0], [0.0, 10.0]);
        let input = RegionInput::rect("x", "y", 2.5, 7.5, 7.5, 4.0);
        let region = Region::resolve(&input, &layout, &RegionDefaults::shape());
        let mut polys = region.pixel_polygons(&layout);
        polys[0].translate(20.0, 0.0);
        let fields = edit_fields(&region, &layout, &polys).unwrap();
        assert_eq!(fields.len(), 4);
        match &fields[0] {
            RegionField::X0(p) => assert!(approx_eq(p.as_number().unwrap(), 3.5)),
            other => panic!("unexpected field {:?}", other),
        }
    }

    #[test]
    fn test_edit_fields_for_category_path() {
        let layout = Layout::new(Surface::new(0.0, 0.0, 300.0, 100.0)).with_subplot(
            Axis::new("x", AxisKind::Category, [-0.5, 2.5], 0.0, 300.0)
                .with_categories(vec!["a".into(), "b".into(), "c".into()]),
            Axis::linear("y", [0.0, 1.0], 0.0, 100.0),
        );
        let mut input = RegionInput::path("x", "y", "Ma,0Lb,1Lc,0Z");
        let region = Region::resolve(&input, &layout, &RegionDefaults::shape());
        let before = region.pixel_polygons(&layout);

        let fields = edit_fields(&region, &layout, &before).unwrap();
        let path = match &fields[..] {
            [RegionField::Path(path)] => path.clone(),
            other => panic!("unexpected fields {:?}", other),
        };
        assert!(path.starts_with("M0,0L1,1L2,0"));

        input.set(RegionField::Path(path));
        let edited = Region::resolve(&input, &layout, &RegionDefaults::shape());
        let after = edited.pixel_polygons(&layout);
        let (a, b) = (before[0].ring(), after[0].ring());
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(&b) {
            assert!(approx_eq(p.x, q.x) && approx_eq(p.y, q.y));
        }
    }

    #[test]
    fn test_edit_fields_reject_lost_rect() {
        let layout = Layout::single(Surface::new(0.0, 0.0, 100.0, 100.0), [0.0, 10.0], [0.0, 10.0]);
        let region = Region::resolve(&RegionInput::rect("x", "y", 1.0, 1.0, 5.0, 5.0), &layout, &RegionDefaults::shape());
        let polys = decode("M0,0L10,10L20,0Z", None);
        assert!(edit_fields(&region, &layout, &polys).is_err());
    }
}
