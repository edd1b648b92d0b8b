//! Region documents.
//!
//! A region is a shape or a selection anchored in data space. The store keeps
//! what the user wrote ([`RegionInput`], every field optional) next to the
//! resolved form ([`Region`]) where every field has a value and the geometry
//! is a tagged [`RegionGeometry`].

use plotsel_geom::path::{AxisDecode, Dim, convert_params};
use plotsel_geom::transform::{DEFAULT_ANCHOR_FRACTION, DEFAULT_PIXEL_POSITIONS, DEFAULT_POSITION_FRACTIONS, format_number};
use plotsel_geom::{Axis, DecodeContext, Frame, Polygon, Position, RefMode, decode};
use serde::{Deserialize, Serialize};

use crate::config::{FillRule, LineStyle};
use crate::error::{PlotselError, PlotselResult};
use crate::layout::Layout;

/// Region type as written in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    Rect,
    /// Ellipse inscribed in the `x0..x1`, `y0..y1` box
    Circle,
    Line,
    Path,
}

impl RegionType {
    pub fn name(&self) -> &'static str {
        match self {
            RegionType::Rect => "rect",
            RegionType::Circle => "circle",
            RegionType::Line => "line",
            RegionType::Path => "path",
        }
    }
}

/// What a region coordinate is measured against.
///
/// Written as an axis id (`x2`), an axis id with a domain suffix
/// (`x2 domain`) or the literal `paper`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AxisRef {
    Axis(String),
    Domain(String),
    Paper,
}

impl AxisRef {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == "paper" {
            AxisRef::Paper
        } else if let Some(id) = text.strip_suffix("domain") {
            AxisRef::Domain(id.trim().to_string())
        } else {
            AxisRef::Axis(text.to_string())
        }
    }

    /// Axis id for axis and domain refs.
    pub fn axis_id(&self) -> Option<&str> {
        match self {
            AxisRef::Axis(id) | AxisRef::Domain(id) => Some(id),
            AxisRef::Paper => None,
        }
    }

    /// Axis id only when positions are on the axis range.
    pub fn range_axis_id(&self) -> Option<&str> {
        match self {
            AxisRef::Axis(id) => Some(id),
            _ => None,
        }
    }
}

impl From<String> for AxisRef {
    fn from(text: String) -> Self {
        AxisRef::parse(&text)
    }
}

impl From<&str> for AxisRef {
    fn from(text: &str) -> Self {
        AxisRef::parse(text)
    }
}

impl From<AxisRef> for String {
    fn from(reference: AxisRef) -> Self {
        match reference {
            AxisRef::Axis(id) => id,
            AxisRef::Domain(id) => format!("{} domain", id),
            AxisRef::Paper => "paper".to_string(),
        }
    }
}

/// How the size of a region follows its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// Positions are on the reference frame
    #[default]
    Scaled,
    /// Positions are pixel offsets from an anchor on the reference frame
    Pixel,
}

/// Line style as written, every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LineInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

impl From<&LineStyle> for LineInput {
    fn from(style: &LineStyle) -> Self {
        Self {
            color: Some(style.color.clone()),
            width: Some(style.width),
            dash: Some(style.dash.clone()),
        }
    }
}

/// A region exactly as supplied by the user or by a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RegionInput {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RegionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xref: Option<AxisRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yref: Option<AxisRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x0: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y0: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xsizemode: Option<SizeMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ysizemode: Option<SizeMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xanchor: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yanchor: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x0shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y0shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fillcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fillrule: Option<FillRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
}

/// One editable field of a region input.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionField {
    X0(Position),
    X1(Position),
    Y0(Position),
    Y1(Position),
    Path(String),
}

impl RegionField {
    pub fn name(&self) -> &'static str {
        match self {
            RegionField::X0(_) => "x0",
            RegionField::X1(_) => "x1",
            RegionField::Y0(_) => "y0",
            RegionField::Y1(_) => "y1",
            RegionField::Path(_) => "path",
        }
    }
}

impl RegionInput {
    /// Rectangle on a pair of axis refs.
    pub fn rect(
        xref: impl Into<AxisRef>,
        yref: impl Into<AxisRef>,
        x0: impl Into<Position>,
        y0: impl Into<Position>,
        x1: impl Into<Position>,
        y1: impl Into<Position>,
    ) -> Self {
        Self {
            kind: Some(RegionType::Rect),
            xref: Some(xref.into()),
            yref: Some(yref.into()),
            x0: Some(x0.into()),
            y0: Some(y0.into()),
            x1: Some(x1.into()),
            y1: Some(y1.into()),
            ..Default::default()
        }
    }

    /// Path region on a pair of axis refs.
    pub fn path(xref: impl Into<AxisRef>, yref: impl Into<AxisRef>, path: impl Into<String>) -> Self {
        Self {
            kind: Some(RegionType::Path),
            xref: Some(xref.into()),
            yref: Some(yref.into()),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Write one field, returning the previous value.
    pub fn set(&mut self, field: RegionField) -> Option<RegionField> {
        match field {
            RegionField::X0(v) => self.x0.replace(v).map(RegionField::X0),
            RegionField::X1(v) => self.x1.replace(v).map(RegionField::X1),
            RegionField::Y0(v) => self.y0.replace(v).map(RegionField::Y0),
            RegionField::Y1(v) => self.y1.replace(v).map(RegionField::Y1),
            RegionField::Path(v) => self.path.replace(v).map(RegionField::Path),
        }
    }

    /// Fill unset corner fields from the resolved region when only some were given.
    pub fn complete_from(&mut self, region: &Region, layout: &Layout) {
        let corners = match &region.geometry {
            RegionGeometry::Path(_) => return,
            RegionGeometry::Rect(c) | RegionGeometry::Ellipse(c) | RegionGeometry::Line(c) => *c,
        };
        let given = [&self.x0, &self.x1, &self.y0, &self.y1]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if given == 0 || given == 4 {
            return;
        }

        let xaxis = region.xref.range_axis_id().and_then(|id| layout.axis(id));
        let yaxis = region.yref.range_axis_id().and_then(|id| layout.axis(id));
        let format = |axis: Option<&Axis>, v: f64| match axis {
            Some(axis) => axis.format_position(v),
            None => Position::Number(v),
        };
        self.x0.get_or_insert_with(|| format(xaxis, corners.x0));
        self.x1.get_or_insert_with(|| format(xaxis, corners.x1));
        self.y0.get_or_insert_with(|| format(yaxis, corners.y0));
        self.y1.get_or_insert_with(|| format(yaxis, corners.y1));
    }
}

/// Box positions of a rect, ellipse or line, as numeric shape positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Corners {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Resolved geometry of a region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionGeometry {
    Rect(Corners),
    Ellipse(Corners),
    Line(Corners),
    /// Path text in data space; dates and category names may appear
    Path(String),
}

impl RegionGeometry {
    pub fn kind(&self) -> RegionType {
        match self {
            RegionGeometry::Rect(_) => RegionType::Rect,
            RegionGeometry::Ellipse(_) => RegionType::Circle,
            RegionGeometry::Line(_) => RegionType::Line,
            RegionGeometry::Path(_) => RegionType::Path,
        }
    }
}

/// Category shifts in serial units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Shifts {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

/// Defaults applied when resolving an input.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDefaults {
    pub opacity: f64,
    pub line: LineStyle,
    pub fillcolor: Option<String>,
    pub editable: bool,
    /// Types this list accepts
    pub kinds: &'static [RegionType],
}

impl RegionDefaults {
    pub fn shape() -> Self {
        Self {
            opacity: 1.0,
            line: LineStyle {
                width: 2.0,
                ..LineStyle::default()
            },
            fillcolor: Some("rgba(0,0,0,0)".to_string()),
            editable: false,
            kinds: &[RegionType::Rect, RegionType::Circle, RegionType::Line, RegionType::Path],
        }
    }

    pub fn selection() -> Self {
        Self {
            opacity: 0.7,
            line: LineStyle::selection(),
            fillcolor: None,
            editable: true,
            kinds: &[RegionType::Rect, RegionType::Path],
        }
    }
}

/// A region with every field resolved against a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub geometry: RegionGeometry,
    pub xref: AxisRef,
    pub yref: AxisRef,
    pub xsizemode: SizeMode,
    pub ysizemode: SizeMode,
    /// Anchor as a position on the reference frame, used in pixel size mode
    pub xanchor: f64,
    pub yanchor: f64,
    pub shifts: Shifts,
    pub opacity: f64,
    pub line: LineStyle,
    pub fillcolor: Option<String>,
    pub fillrule: FillRule,
    pub editable: bool,
}

/// Pixel placement of one coordinate of a region.
#[derive(Debug, Clone, Copy)]
struct Placement<'a> {
    frame: Frame<'a>,
    /// Absolute pixel anchor for pixel-sized regions without a range axis
    pixel_anchor: Option<f64>,
    pixel_sized: bool,
    vertical: bool,
}

impl Placement<'_> {
    fn to_pixel(&self, v: f64, shift: f64) -> f64 {
        match self.pixel_anchor {
            Some(anchor) if self.vertical => anchor - v,
            Some(anchor) => anchor + v,
            None => self.frame.with_shift(shift).to_pixel(v),
        }
    }

    /// Pixel for a path parameter token.
    fn token_to_pixel(&self, token: &str) -> Option<f64> {
        let value = match self.frame {
            Frame::Axis {
                axis,
                mode: RefMode::DataRange,
                ..
            } if !self.pixel_sized => axis.clean_position(&Position::Text(token.to_string())).ok()?,
            _ => token.trim().parse::<f64>().ok()?,
        };
        Some(self.to_pixel(value, 0.0))
    }
}

impl Region {
    /// Resolve an input against the layout, filling every missing field.
    ///
    /// Unknown axis refs fall back to paper and unreadable positions fall
    /// back to their defaults, both with a warning.
    pub fn resolve(input: &RegionInput, layout: &Layout, defaults: &RegionDefaults) -> Region {
        let dflt_kind = if input.path.is_some() {
            RegionType::Path
        } else {
            RegionType::Rect
        };
        let kind = match input.kind {
            Some(kind) if defaults.kinds.contains(&kind) => kind,
            Some(kind) => {
                log::warn!("Region type '{}' not allowed here, using '{}'", kind.name(), dflt_kind.name());
                dflt_kind
            }
            None => dflt_kind,
        };

        let xref = resolve_ref(input.xref.as_ref(), layout, 'x');
        let yref = resolve_ref(input.yref.as_ref(), layout, 'y');
        let xsizemode = input.xsizemode.unwrap_or_default();
        let ysizemode = input.ysizemode.unwrap_or_default();
        let xaxis = xref.range_axis_id().and_then(|id| layout.axis(id));
        let yaxis = yref.range_axis_id().and_then(|id| layout.axis(id));

        let (x0, x1, xanchor) = resolve_positions(
            [input.x0.as_ref(), input.x1.as_ref()],
            input.xanchor.as_ref(),
            xaxis,
            xsizemode,
        );
        let (y0, y1, yanchor) = resolve_positions(
            [input.y0.as_ref(), input.y1.as_ref()],
            input.yanchor.as_ref(),
            yaxis,
            ysizemode,
        );
        let corners = Corners { x0, y0, x1, y1 };

        let geometry = match kind {
            RegionType::Rect => RegionGeometry::Rect(corners),
            RegionType::Circle => RegionGeometry::Ellipse(corners),
            RegionType::Line => RegionGeometry::Line(corners),
            RegionType::Path => {
                let path = input.path.clone().unwrap_or_else(|| {
                    log::warn!("Path region without a path");
                    String::new()
                });
                RegionGeometry::Path(path)
            }
        };

        let line_in = input.line.clone().unwrap_or_default();
        let category_shift = |axis: Option<&Axis>, shift: Option<f64>| match axis {
            Some(axis) if axis.kind == plotsel_geom::AxisKind::Category => shift.unwrap_or(0.0),
            _ => 0.0,
        };

        Region {
            geometry,
            xref,
            yref,
            xsizemode,
            ysizemode,
            xanchor,
            yanchor,
            shifts: Shifts {
                x0: category_shift(xaxis, input.x0shift),
                x1: category_shift(xaxis, input.x1shift),
                y0: category_shift(yaxis, input.y0shift),
                y1: category_shift(yaxis, input.y1shift),
            },
            opacity: input.opacity.unwrap_or(defaults.opacity),
            line: LineStyle {
                color: line_in.color.unwrap_or_else(|| defaults.line.color.clone()),
                width: line_in.width.unwrap_or(defaults.line.width),
                dash: line_in.dash.unwrap_or_else(|| defaults.line.dash.clone()),
            },
            fillcolor: input.fillcolor.clone().or_else(|| defaults.fillcolor.clone()),
            fillrule: input.fillrule.unwrap_or_default(),
            editable: input.editable.unwrap_or(defaults.editable),
        }
    }

    pub fn kind(&self) -> RegionType {
        self.geometry.kind()
    }

    /// Axis ids of the subplot this region lives on, when both refs are axes.
    pub fn subplot_axes(&self) -> Option<(&str, &str)> {
        Some((self.xref.axis_id()?, self.yref.axis_id()?))
    }

    /// A path region ending in `Z`.
    pub fn is_closed_path(&self) -> bool {
        matches!(&self.geometry, RegionGeometry::Path(p) if p.trim_end().ends_with('Z'))
    }

    fn placement<'a>(&self, layout: &'a Layout, dim: Dim) -> Placement<'a> {
        let (reference, sizemode, anchor, vertical) = match dim {
            Dim::X => (&self.xref, self.xsizemode, self.xanchor, false),
            Dim::Y => (&self.yref, self.ysizemode, self.yanchor, true),
        };
        let pixel_sized = sizemode == SizeMode::Pixel;
        let axis = reference.axis_id().and_then(|id| layout.axis(id));

        match (reference, axis) {
            (AxisRef::Axis(_), Some(axis)) => {
                let mode = if pixel_sized {
                    RefMode::PixelAnchored { anchor }
                } else {
                    RefMode::DataRange
                };
                Placement {
                    frame: Frame::resolve(Some(axis), mode, layout.surface, vertical),
                    pixel_anchor: None,
                    pixel_sized,
                    vertical,
                }
            }
            (AxisRef::Domain(_), Some(axis)) => {
                let frame = Frame::resolve(Some(axis), RefMode::DomainFraction, layout.surface, vertical);
                Placement {
                    frame,
                    pixel_anchor: pixel_sized.then(|| frame.to_pixel(anchor)),
                    pixel_sized,
                    vertical,
                }
            }
            _ => {
                let frame = Frame::resolve(None, RefMode::DataRange, layout.surface, vertical);
                Placement {
                    frame,
                    pixel_anchor: pixel_sized.then(|| frame.to_pixel(anchor)),
                    pixel_sized,
                    vertical,
                }
            }
        }
    }

    /// Absolute pixel path of this region as it is drawn.
    pub fn pixel_path(&self, layout: &Layout) -> String {
        let px = self.placement(layout, Dim::X);
        let py = self.placement(layout, Dim::Y);

        let c = match &self.geometry {
            RegionGeometry::Path(text) => {
                return convert_params(text, |t| px.token_to_pixel(t), |t| py.token_to_pixel(t));
            }
            RegionGeometry::Rect(c) | RegionGeometry::Ellipse(c) | RegionGeometry::Line(c) => c,
        };
        let x0 = px.to_pixel(c.x0, self.shifts.x0);
        let x1 = px.to_pixel(c.x1, self.shifts.x1);
        let y0 = py.to_pixel(c.y0, self.shifts.y0);
        let y1 = py.to_pixel(c.y1, self.shifts.y1);
        let n = format_number;

        match &self.geometry {
            RegionGeometry::Line(_) => format!("M{},{}L{},{}", n(x0), n(y0), n(x1), n(y1)),
            RegionGeometry::Rect(_) => {
                format!("M{},{}H{}V{}H{}Z", n(x0), n(y0), n(x1), n(y1), n(x0))
            }
            _ => {
                let cx = (x0 + x1) / 2.0;
                let cy = (y0 + y1) / 2.0;
                let rx = (cx - x0).abs();
                let ry = (cy - y0).abs();
                let arc = format!("A{},{}", n(rx), n(ry));
                let right = format!("{},{}", n(cx + rx), n(cy));
                let top = format!("{},{}", n(cx), n(cy - ry));
                format!("M{right}{arc} 0 1,1 {top}{arc} 0 0,1 {right}Z")
            }
        }
    }

    /// Absolute pixel polygons of this region.
    pub fn pixel_polygons(&self, layout: &Layout) -> Vec<Polygon> {
        decode(&self.pixel_path(layout), None)
    }

    /// Context that turns absolute pixels back into this region's positions.
    pub fn decode_context<'a>(&self, layout: &'a Layout) -> PlotselResult<DecodeContext<'a>> {
        let x = axis_decode(&self.xref, self.xsizemode, self.xanchor, layout)?;
        let y = axis_decode(&self.yref, self.ysizemode, self.yanchor, layout)?;
        Ok(DecodeContext {
            x,
            y,
            surface: layout.surface,
            no_offset: true,
        })
    }
}

fn axis_decode<'a>(
    reference: &AxisRef,
    sizemode: SizeMode,
    anchor: f64,
    layout: &'a Layout,
) -> PlotselResult<AxisDecode<'a>> {
    let axis = match reference.axis_id() {
        Some(id) => Some(layout.axis(id).ok_or_else(|| PlotselError::unknown_axis(id))?),
        None => None,
    };
    match (reference, axis, sizemode) {
        (AxisRef::Axis(_), Some(axis), SizeMode::Scaled) => Ok(AxisDecode::Range(axis)),
        (AxisRef::Axis(_), Some(axis), SizeMode::Pixel) => Ok(AxisDecode::PixelSized { axis, anchor }),
        (_, _, SizeMode::Pixel) => Err(PlotselError::commit_rejected(
            "pixel sized regions can only be edited on an axis range",
        )),
        (AxisRef::Domain(_), Some(axis), SizeMode::Scaled) => Ok(AxisDecode::Domain(axis)),
        _ => Ok(AxisDecode::Paper),
    }
}

fn resolve_ref(reference: Option<&AxisRef>, layout: &Layout, letter: char) -> AxisRef {
    match reference {
        Some(AxisRef::Paper) => AxisRef::Paper,
        Some(r) => match r.axis_id() {
            Some(id) if layout.axis(id).is_some() => r.clone(),
            Some(id) => {
                log::warn!("Unknown axis ref '{}', placing region on paper", id);
                AxisRef::Paper
            }
            None => AxisRef::Paper,
        },
        None => layout
            .axes
            .iter()
            .find(|a| a.id.starts_with(letter))
            .map(|a| AxisRef::Axis(a.id.clone()))
            .unwrap_or(AxisRef::Paper),
    }
}

fn clean_position(position: &Position, axis: Option<&Axis>, dflt: f64) -> f64 {
    let value = match axis {
        Some(axis) => axis.clean_position(position).map_err(|e| e.to_string()),
        None => match position {
            Position::Number(v) => Ok(*v),
            Position::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid position '{}'", text)),
        },
    };
    value.unwrap_or_else(|e| {
        log::warn!("{}, using default {}", e, dflt);
        dflt
    })
}

/// Resolve `(p0, p1, anchor)` for one axis letter.
fn resolve_positions(
    given: [Option<&Position>; 2],
    anchor: Option<&Position>,
    axis: Option<&Axis>,
    sizemode: SizeMode,
) -> (f64, f64, f64) {
    let at_fraction = |f: f64| axis.map(|a| a.default_position(f)).unwrap_or(f);
    let dflt_anchor = at_fraction(DEFAULT_ANCHOR_FRACTION);
    match sizemode {
        SizeMode::Pixel => {
            let p = |i: usize| {
                given[i]
                    .map(|v| clean_position(v, None, DEFAULT_PIXEL_POSITIONS[i]))
                    .unwrap_or(DEFAULT_PIXEL_POSITIONS[i])
            };
            let anchor = anchor
                .map(|a| clean_position(a, axis, dflt_anchor))
                .unwrap_or(dflt_anchor);
            (p(0), p(1), anchor)
        }
        SizeMode::Scaled => {
            let p = |i: usize| {
                let dflt = at_fraction(DEFAULT_POSITION_FRACTIONS[i]);
                given[i].map(|v| clean_position(v, axis, dflt)).unwrap_or(dflt)
            };
            (p(0), p(1), dflt_anchor)
        }
    }
}
