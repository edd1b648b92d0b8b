//! Path notation codec.
//!
//! Polygons are written in the SVG path mini-language: a command letter
//! followed by comma separated parameters. Control points come before the
//! endpoint for `Q`, `S` and `C`. On decode `H`, `V` and `A` are normalized
//! to `L` segments; `Q`, `C`, `T`, `S` and `Z` survive a round trip.

use crate::point::Point;
use crate::polygon::{CIRCLE_SIDES, Polygon, points_almost_eq};
use crate::transform::{Axis, Surface, format_number};

/// Encoding of an empty polygon list.
pub const EMPTY_PATH: &str = "M0,0Z";

/// One path vertex. Every variant except [`Vertex::Close`] ends at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Vertex {
    Move(Point),
    Line(Point),
    Quad { ctrl: Point, to: Point },
    SmoothQuad(Point),
    Cubic { c1: Point, c2: Point, to: Point },
    SmoothCubic { c2: Point, to: Point },
    Close,
}

impl Vertex {
    /// Command letter of this vertex.
    pub fn letter(&self) -> char {
        match self {
            Vertex::Move(_) => 'M',
            Vertex::Line(_) => 'L',
            Vertex::Quad { .. } => 'Q',
            Vertex::SmoothQuad(_) => 'T',
            Vertex::Cubic { .. } => 'C',
            Vertex::SmoothCubic { .. } => 'S',
            Vertex::Close => 'Z',
        }
    }

    /// Endpoint of the vertex.
    pub fn end(&self) -> Option<Point> {
        match *self {
            Vertex::Move(p) | Vertex::Line(p) | Vertex::SmoothQuad(p) => Some(p),
            Vertex::Quad { to, .. } | Vertex::Cubic { to, .. } | Vertex::SmoothCubic { to, .. } => {
                Some(to)
            }
            Vertex::Close => None,
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Vertex::Close)
    }

    /// Replace the endpoint, keeping control points.
    pub fn with_end(self, p: Point) -> Vertex {
        match self {
            Vertex::Move(_) => Vertex::Move(p),
            Vertex::Line(_) => Vertex::Line(p),
            Vertex::SmoothQuad(_) => Vertex::SmoothQuad(p),
            Vertex::Quad { ctrl, .. } => Vertex::Quad { ctrl, to: p },
            Vertex::Cubic { c1, c2, .. } => Vertex::Cubic { c1, c2, to: p },
            Vertex::SmoothCubic { c2, .. } => Vertex::SmoothCubic { c2, to: p },
            Vertex::Close => Vertex::Close,
        }
    }

    /// Same vertex as a move, used when the first vertex of a cell is removed.
    pub fn into_move(self) -> Vertex {
        match self.end() {
            Some(p) => Vertex::Move(p),
            None => self,
        }
    }

    /// Apply a function to every coordinate pair, control points included.
    pub fn map_points(self, mut f: impl FnMut(Point) -> Point) -> Vertex {
        match self {
            Vertex::Move(p) => Vertex::Move(f(p)),
            Vertex::Line(p) => Vertex::Line(f(p)),
            Vertex::SmoothQuad(p) => Vertex::SmoothQuad(f(p)),
            Vertex::Quad { ctrl, to } => Vertex::Quad {
                ctrl: f(ctrl),
                to: f(to),
            },
            Vertex::Cubic { c1, c2, to } => Vertex::Cubic {
                c1: f(c1),
                c2: f(c2),
                to: f(to),
            },
            Vertex::SmoothCubic { c2, to } => Vertex::SmoothCubic {
                c2: f(c2),
                to: f(to),
            },
            Vertex::Close => Vertex::Close,
        }
    }

    /// Coordinate pairs in written order.
    pub fn points(&self) -> Vec<Point> {
        match *self {
            Vertex::Move(p) | Vertex::Line(p) | Vertex::SmoothQuad(p) => vec![p],
            Vertex::Quad { ctrl, to } => vec![ctrl, to],
            Vertex::Cubic { c1, c2, to } => vec![c1, c2, to],
            Vertex::SmoothCubic { c2, to } => vec![c2, to],
            Vertex::Close => Vec::new(),
        }
    }
}

/// Which axis a path parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    X,
    Y,
}

/// Number of parameters a command letter takes.
pub fn num_params(letter: char) -> Option<usize> {
    match letter {
        'M' | 'L' | 'T' => Some(2),
        'H' | 'V' => Some(1),
        'Q' | 'S' => Some(4),
        'C' => Some(6),
        'A' => Some(7),
        'Z' => Some(0),
        _ => None,
    }
}

/// Axis a parameter of a command refers to, `None` for lengths and flags.
pub fn param_dim(letter: char, index: usize) -> Option<Dim> {
    match (letter, index) {
        ('H', 0) => Some(Dim::X),
        ('V', 0) => Some(Dim::Y),
        ('A', 5) => Some(Dim::X),
        ('A', 6) => Some(Dim::Y),
        ('A', _) | ('H', _) | ('V', _) | ('Z', _) => None,
        (_, i) if i % 2 == 0 => Some(Dim::X),
        _ => Some(Dim::Y),
    }
}

/// A raw path segment: command letter and unparsed parameter tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub letter: char,
    pub params: Vec<String>,
}

/// Split path text into segments. Parameters are separated by commas or spaces.
pub fn segments(text: &str) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    let mut token = String::new();

    fn flush(token: &mut String, out: &mut [Segment]) {
        if token.is_empty() {
            return;
        }
        if let Some(seg) = out.last_mut() {
            seg.params.push(std::mem::take(token));
        } else {
            log::warn!("Ignoring path parameter before any command: {}", token);
            token.clear();
        }
    }

    for c in text.chars() {
        if is_command_letter(c) {
            flush(&mut token, &mut out);
            out.push(Segment {
                letter: c,
                params: Vec::new(),
            });
        } else if c == ',' || c.is_whitespace() {
            flush(&mut token, &mut out);
        } else {
            token.push(c);
        }
    }
    flush(&mut token, &mut out);
    out
}

/// Only the upper case commands the decoder reads start a segment. Any other
/// letter stays in its parameter, so category names and exponents survive.
fn is_command_letter(c: char) -> bool {
    num_params(c).is_some()
}

/// Encode polygons with plain numeric parameters.
pub fn encode(polygons: &[Polygon]) -> String {
    encode_with(polygons, |v, _| format_number(v))
}

/// Encode polygons formatting each parameter through `format`.
pub fn encode_with(polygons: &[Polygon], format: impl Fn(f64, Dim) -> String) -> String {
    if polygons.is_empty() {
        return EMPTY_PATH.to_string();
    }

    let mut out = String::new();
    for polygon in polygons {
        for vertex in &polygon.vertices {
            out.push(vertex.letter());
            let params: Vec<String> = vertex
                .points()
                .iter()
                .flat_map(|p| [format(p.x, Dim::X), format(p.y, Dim::Y)])
                .collect();
            out.push_str(&params.join(","));
        }
    }
    out
}

/// Encode polygons in data space, writing dates on date axes.
pub fn encode_for_axes(polygons: &[Polygon], xaxis: &Axis, yaxis: &Axis) -> String {
    encode_with(polygons, |v, dim| match dim {
        Dim::X => xaxis.format_path_param(v),
        Dim::Y => yaxis.format_path_param(v),
    })
}

/// Per-axis pixel to data conversion applied while decoding.
#[derive(Debug, Clone, Copy)]
pub enum AxisDecode<'a> {
    /// Keep coordinates as parsed.
    Identity,
    /// Local pixel to shape position on the axis range.
    Range(&'a Axis),
    /// Local pixel to pixel offset from an anchor (shape position).
    PixelSized { axis: &'a Axis, anchor: f64 },
    /// Local pixel to fraction of the axis domain.
    Domain(&'a Axis),
    /// Surface pixel to whole-surface fraction.
    Paper,
}

/// Coordinate translation applied inline during decode.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub x: AxisDecode<'a>,
    pub y: AxisDecode<'a>,
    pub surface: Surface,
    /// Input pixels are absolute; subtract axis offsets or surface margins first.
    pub no_offset: bool,
}

impl<'a> DecodeContext<'a> {
    /// Context that leaves coordinates untouched.
    pub fn identity() -> Self {
        Self {
            x: AxisDecode::Identity,
            y: AxisDecode::Identity,
            surface: Surface::new(0.0, 0.0, 1.0, 1.0),
            no_offset: false,
        }
    }

    /// Pixel to shape position on a pair of axes.
    pub fn for_axes(xaxis: &'a Axis, yaxis: &'a Axis, surface: Surface) -> Self {
        Self {
            x: AxisDecode::Range(xaxis),
            y: AxisDecode::Range(yaxis),
            surface,
            no_offset: false,
        }
    }

    /// Treat input pixels as absolute surface pixels.
    pub fn absolute(mut self) -> Self {
        self.no_offset = true;
        self
    }

    fn map_x(&self, v: f64) -> f64 {
        match self.x {
            AxisDecode::Identity => v,
            AxisDecode::Range(axis) => axis.p2pos(self.strip_axis_offset(v, axis)),
            AxisDecode::PixelSized { axis, anchor } => {
                self.strip_axis_offset(v, axis) - axis.pos2p(anchor)
            }
            AxisDecode::Domain(axis) => self.strip_axis_offset(v, axis) / axis.length,
            AxisDecode::Paper => {
                let v = if self.no_offset { v - self.surface.l } else { v };
                v / self.surface.w
            }
        }
    }

    fn map_y(&self, v: f64) -> f64 {
        match self.y {
            AxisDecode::Identity => v,
            AxisDecode::Range(axis) => axis.p2pos(self.strip_axis_offset(v, axis)),
            AxisDecode::PixelSized { axis, anchor } => {
                axis.pos2p(anchor) - self.strip_axis_offset(v, axis)
            }
            AxisDecode::Domain(axis) => 1.0 - self.strip_axis_offset(v, axis) / axis.length,
            AxisDecode::Paper => {
                let v = if self.no_offset { v - self.surface.t } else { v };
                1.0 - v / self.surface.h
            }
        }
    }

    fn strip_axis_offset(&self, v: f64, axis: &Axis) -> f64 {
        if self.no_offset { v - axis.offset } else { v }
    }

    /// Translate one pixel point.
    pub fn map(&self, p: Point) -> Point {
        Point::new(self.map_x(p.x), self.map_y(p.y))
    }

    /// Translate already decoded pixel polygons, control points included.
    pub fn apply(&self, polygons: &[Polygon]) -> Vec<Polygon> {
        polygons
            .iter()
            .map(|polygon| Polygon {
                vertices: polygon
                    .vertices
                    .iter()
                    .map(|v| v.map_points(|p| self.map(p)))
                    .collect(),
                subtract: polygon.subtract,
            })
            .collect()
    }

    /// Format a decoded x value for a path string.
    pub fn format_x(&self, v: f64) -> String {
        match self.x {
            AxisDecode::Range(axis) => axis.format_path_param(v),
            _ => format_number(v),
        }
    }

    /// Format a decoded y value for a path string.
    pub fn format_y(&self, v: f64) -> String {
        match self.y {
            AxisDecode::Range(axis) => axis.format_path_param(v),
            _ => format_number(v),
        }
    }
}

/// Decode path text, optionally translating pixels to data inline.
pub fn decode(text: &str, ctx: Option<&DecodeContext<'_>>) -> Vec<Polygon> {
    let plain = |token: &str, _: Dim| token.parse::<f64>().ok();
    match ctx {
        Some(ctx) => decode_inner(text, plain, |p| ctx.map(p)),
        None => decode_inner(text, plain, |p| p),
    }
}

/// Decode a data-space path whose parameters may be dates or category names.
pub fn decode_positions(text: &str, parse: impl Fn(&str, Dim) -> Option<f64>) -> Vec<Polygon> {
    decode_inner(text, parse, |p| p)
}

fn decode_inner(
    text: &str,
    parse: impl Fn(&str, Dim) -> Option<f64>,
    map: impl Fn(Point) -> Point,
) -> Vec<Polygon> {
    let mut polygons: Vec<Polygon> = Vec::new();
    let mut current = Point::default();
    let mut start = Point::default();

    for segment in segments(text) {
        let letter = segment.letter;
        let Some(expected) = num_params(letter) else {
            log::warn!("Ignoring unsupported path command '{}'", letter);
            continue;
        };

        let mut tokens = segment.params;
        if tokens.len() > expected {
            log::warn!("Ignoring extra params in segment {}{}", letter, tokens.join(","));
            tokens.truncate(expected);
        }
        if tokens.len() < expected {
            log::warn!("Skipping path segment '{}' with {} of {} params", letter, tokens.len(), expected);
            continue;
        }

        let mut values = Vec::with_capacity(expected);
        for (i, token) in tokens.iter().enumerate() {
            let value = match param_dim(letter, i) {
                Some(dim) => parse(token, dim),
                None => token.parse::<f64>().ok(),
            };
            match value {
                Some(v) => values.push(v),
                None => break,
            }
        }
        if values.len() < expected {
            log::warn!("Skipping path segment '{}' with unreadable params", letter);
            continue;
        }

        if letter != 'M' && polygons.is_empty() {
            log::warn!("Path segment '{}' before any move command ignored", letter);
            continue;
        }

        let pt = |i: usize| Point::new(values[i], values[i + 1]);
        let mut raw: Vec<Vertex> = Vec::new();
        match letter {
            'M' => {
                polygons.push(Polygon::default());
                current = pt(0);
                start = current;
                raw.push(Vertex::Move(current));
            }
            'L' => {
                current = pt(0);
                raw.push(Vertex::Line(current));
            }
            'T' => {
                current = pt(0);
                raw.push(Vertex::SmoothQuad(current));
            }
            'H' => {
                current = Point::new(values[0], current.y);
                raw.push(Vertex::Line(current));
            }
            'V' => {
                current = Point::new(current.x, values[0]);
                raw.push(Vertex::Line(current));
            }
            'Q' => {
                current = pt(2);
                raw.push(Vertex::Quad {
                    ctrl: pt(0),
                    to: current,
                });
            }
            'S' => {
                current = pt(2);
                raw.push(Vertex::SmoothCubic {
                    c2: pt(0),
                    to: current,
                });
            }
            'C' => {
                current = pt(4);
                raw.push(Vertex::Cubic {
                    c1: pt(0),
                    c2: pt(2),
                    to: current,
                });
            }
            'A' => {
                let (mut rx, mut ry) = (values[0], values[1]);
                if values[3] == 0.0 {
                    rx = -rx;
                    ry = -ry;
                }
                let centre = Point::new(current.x - rx, current.y);
                for k in 1..=CIRCLE_SIDES / 2 {
                    let t = 2.0 * std::f64::consts::PI * k as f64 / CIRCLE_SIDES as f64;
                    let p = Point::new(centre.x + rx * t.cos(), centre.y + ry * t.sin());
                    raw.push(Vertex::Line(p));
                }
                if let Some(last) = raw.last().and_then(Vertex::end) {
                    current = last;
                }
            }
            'Z' => {
                if !points_almost_eq(current, start) {
                    raw.push(Vertex::Line(start));
                    current = start;
                }
                raw.push(Vertex::Close);
            }
            _ => continue,
        }

        if let Some(polygon) = polygons.last_mut() {
            polygon
                .vertices
                .extend(raw.into_iter().map(|v| v.map_points(&map)));
        }
    }

    polygons
}

/// Rewrite every coordinate parameter of a path through per-axis converters.
///
/// Used to turn stored data paths into pixel paths. Extra parameters are
/// dropped with a warning; unreadable parameters are kept as written.
pub fn convert_params(
    text: &str,
    x: impl Fn(&str) -> Option<f64>,
    y: impl Fn(&str) -> Option<f64>,
) -> String {
    let mut out = String::new();
    for segment in segments(text) {
        let letter = segment.letter;
        let expected = num_params(letter).unwrap_or(0);
        let mut params = segment.params;
        if params.len() > expected {
            log::warn!("Ignoring extra params in segment {}{}", letter, params.join(","));
            params.truncate(expected);
        }

        let converted: Vec<String> = params
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let value = match param_dim(letter, i) {
                    Some(Dim::X) => x(token),
                    Some(Dim::Y) => y(token),
                    None => None,
                };
                value.map(format_number).unwrap_or_else(|| token.clone())
            })
            .collect();

        out.push(letter);
        out.push_str(&converted.join(","));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::points_on_ellipse;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn square() -> Polygon {
        Polygon::from_points(
            &[
                Point::new(0.0, 0.0),
                Point::new(0.0, 4.0),
                Point::new(3.0, 4.0),
                Point::new(3.0, 0.0),
            ],
            true,
        )
    }

    #[test]
    fn test_encode_empty_list() {
        assert_eq!(encode(&[]), "M0,0Z");
    }

    #[test]
    fn test_encode_closed_polygon() {
        assert_eq!(encode(&[square()]), "M0,0L0,4L3,4L3,0L0,0Z");
    }

    #[test]
    fn test_curve_control_point_order() {
        let polygon = Polygon::new(vec![
            Vertex::Move(Point::new(0.0, 0.0)),
            Vertex::Quad {
                ctrl: Point::new(1.0, 2.0),
                to: Point::new(3.0, 4.0),
            },
            Vertex::Cubic {
                c1: Point::new(5.0, 6.0),
                c2: Point::new(7.0, 8.0),
                to: Point::new(9.0, 10.0),
            },
            Vertex::SmoothCubic {
                c2: Point::new(11.0, 12.0),
                to: Point::new(13.0, 14.0),
            },
            Vertex::SmoothQuad(Point::new(15.0, 16.0)),
        ]);
        let text = encode(std::slice::from_ref(&polygon));
        assert_eq!(text, "M0,0Q1,2,3,4C5,6,7,8,9,10S11,12,13,14T15,16");
        assert_eq!(decode(&text, None), vec![polygon]);
    }

    #[test]
    fn test_round_trip_multiple_polygons() {
        let mut second = square();
        second.translate(10.5, -2.25);
        let polygons = vec![square(), second];
        assert_eq!(decode(&encode(&polygons), None), polygons);
    }

    #[test]
    fn test_h_v_normalized_to_lines() {
        let polys = decode("M1,1H5V7H1Z", None);
        assert_eq!(polys.len(), 1);
        let letters: String = polys[0].vertices.iter().map(Vertex::letter).collect();
        assert_eq!(letters, "MLLLLZ");
        assert_eq!(polys[0].vertices[2], Vertex::Line(Point::new(5.0, 7.0)));
        // synthesized closing line back to the start
        assert_eq!(polys[0].vertices[4], Vertex::Line(Point::new(1.0, 1.0)));
        assert!(polys[0].is_rect());
    }

    #[test]
    fn test_close_at_start_adds_no_line() {
        let polys = decode("M0,0L2,0L2,2L0,0Z", None);
        assert_eq!(polys[0].vertices.len(), 5);
        assert!(polys[0].vertices[4].is_close());
    }

    #[test]
    fn test_arcs_become_ellipse_cell() {
        // right point, two half arcs back to the right point
        let polys = decode("M20,10A10,5 0 1,1 10,5A10,5 0 0,1 20,10Z", None);
        assert_eq!(polys[0].cell().len(), CIRCLE_SIDES + 1);
        let cell = polys[0].points();
        assert!(points_on_ellipse(&cell));
        let left = cell[16];
        assert!(approx_eq(left.x, 0.0));
        assert!(approx_eq(left.y, 10.0));
    }

    #[test]
    fn test_extra_params_truncated() {
        let polys = decode("M1,2,3L4,5", None);
        assert_eq!(
            polys[0].vertices,
            vec![Vertex::Move(Point::new(1.0, 2.0)), Vertex::Line(Point::new(4.0, 5.0))]
        );
    }

    #[test]
    fn test_missing_params_and_lowercase_letters_skipped() {
        let polys = decode("M1,2L3l1,1L5,6", None);
        assert_eq!(polys[0].vertices.len(), 2);
        assert_eq!(polys[0].vertices[1], Vertex::Line(Point::new(5.0, 6.0)));
    }

    #[test]
    fn test_exponent_and_space_separators() {
        let polys = decode("M 1e2 -2.5E-1 L 3 4", None);
        assert_eq!(polys[0].vertices[0], Vertex::Move(Point::new(100.0, -0.25)));
    }

    #[test]
    fn test_decode_with_axes() {
        let xa = Axis::linear("x", [0.0, 10.0], 80.0, 200.0);
        let ya = Axis::linear("y", [0.0, 10.0], 100.0, 200.0);
        let surface = Surface::new(80.0, 100.0, 200.0, 200.0);
        let ctx = DecodeContext::for_axes(&xa, &ya, surface);
        let polys = decode("M50,50L150,120", Some(&ctx));
        assert_eq!(polys[0].vertices[0], Vertex::Move(Point::new(2.5, 7.5)));
        assert_eq!(polys[0].vertices[1], Vertex::Line(Point::new(7.5, 4.0)));

        let abs = ctx.absolute();
        let polys = decode("M130,150", Some(&abs));
        assert_eq!(polys[0].vertices[0], Vertex::Move(Point::new(2.5, 7.5)));
    }

    #[test]
    fn test_decode_pixel_sized_and_paper() {
        let xa = Axis::linear("x", [0.0, 10.0], 0.0, 200.0);
        let ctx = DecodeContext {
            x: AxisDecode::PixelSized {
                axis: &xa,
                anchor: 5.0,
            },
            y: AxisDecode::Paper,
            surface: Surface::new(0.0, 0.0, 200.0, 200.0),
            no_offset: false,
        };
        let polys = decode("M110,50", Some(&ctx));
        let p = polys[0].vertices[0].end().unwrap();
        assert!(approx_eq(p.x, 10.0));
        assert!(approx_eq(p.y, 0.75));
    }

    #[test]
    fn test_decode_positions_with_dates() {
        let polys = decode_positions("M2020-01-01_12:00,3L2020-01-02,4", |token, dim| match dim {
            Dim::X => crate::transform::parse_date(token),
            Dim::Y => token.parse().ok(),
        });
        assert_eq!(polys[0].vertices.len(), 2);
        let a = polys[0].vertices[0].end().unwrap();
        let b = polys[0].vertices[1].end().unwrap();
        assert!(approx_eq(b.x - a.x, 12.0 * 3600.0 * 1000.0));
    }

    #[test]
    fn test_convert_params_truncates_and_maps() {
        let text = convert_params("M1,2L3,4,5H6V7Z", |t| t.parse::<f64>().ok().map(|v| v * 10.0), |t| {
            t.parse::<f64>().ok().map(|v| -v)
        });
        assert_eq!(text, "M10,-2L30,-4H60V-7Z");
    }

    #[test]
    fn test_convert_params_keeps_category_names() {
        let categories = ["a", "b", "c"];
        let index = |t: &str| categories.iter().position(|c| *c == t).map(|i| i as f64);
        let text = convert_params("Ma,0Lb,1Lc,0Z", index, |t| t.parse::<f64>().ok());
        assert_eq!(text, "M0,0L1,1L2,0Z");

        let segs = segments("Mlow,0Lhigh,1");
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].params, vec!["low", "0"]);
        assert_eq!(segs[1].params, vec!["high", "1"]);
    }

    #[test]
    fn test_segments_tokenizing() {
        let segs = segments("M0 0,1L 2,3 Z");
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].params, vec!["0", "0", "1"]);
        assert_eq!(segs[2].letter, 'Z');
    }
}
