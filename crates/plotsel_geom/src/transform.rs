//! Coordinate mapping between pixel, range, data and normalized surface space.
//!
//! [`Axis::r2p`] and [`Axis::p2r`] work in pixels local to the subplot (no
//! offset), matching how drag gestures report positions. [`Frame`] and
//! [`Axis::to_pixel`] work in absolute surface pixels.
//!
//! Positions at rest are "shape positions": data values for log axes, epoch
//! milliseconds for date axes, serial indices for category axes and plain
//! range values otherwise.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{GeomError, GeomResult};

/// Default placement of positions when none are given, as range fractions.
pub const DEFAULT_POSITION_FRACTIONS: [f64; 2] = [0.25, 0.75];

/// Default positions for pixel-sized regions, in pixels from the anchor.
pub const DEFAULT_PIXEL_POSITIONS: [f64; 2] = [0.0, 10.0];

/// Default anchor placement for pixel-sized regions, as a range fraction.
pub const DEFAULT_ANCHOR_FRACTION: f64 = 0.25;

/// Character that stands in for the space inside date strings in paths.
pub const DATE_SEPARATOR_ESCAPE: char = '_';

/// Supported axis types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    #[default]
    Linear,
    Log,
    Date,
    Category,
}

/// A position value as written in a region document.
///
/// Dates and category names are text, everything else is numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Number(f64),
    Text(String),
}

impl From<f64> for Position {
    fn from(v: f64) -> Self {
        Position::Number(v)
    }
}

impl From<&str> for Position {
    fn from(v: &str) -> Self {
        Position::Text(v.to_string())
    }
}

impl Position {
    /// Numeric value, if this position is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Position::Number(v) => Some(*v),
            Position::Text(_) => None,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Number(v) => write!(f, "{}", v),
            Position::Text(s) => write!(f, "{}", s),
        }
    }
}

/// How a region coordinate relates to its axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefMode {
    /// Coordinate is a shape position on the axis range.
    DataRange,
    /// Coordinate is a pixel offset from an anchor given as a shape position.
    PixelAnchored { anchor: f64 },
    /// Coordinate is a fraction of the axis domain.
    DomainFraction,
}

/// One axis snapshot: type, visible range and pixel placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Axis identifier such as `x`, `x2` or `y`.
    pub id: String,
    pub kind: AxisKind,
    /// Visible range in range units.
    pub range: [f64; 2],
    /// Pixel position of the plot area start along this axis.
    pub offset: f64,
    /// Pixel length of the plot area along this axis.
    pub length: f64,
    /// Category names, indexed by serial number.
    pub categories: Vec<String>,
}

impl Axis {
    pub fn new(
        id: impl Into<String>,
        kind: AxisKind,
        range: [f64; 2],
        offset: f64,
        length: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            range,
            offset,
            length,
            categories: Vec::new(),
        }
    }

    /// Create a linear axis.
    pub fn linear(id: impl Into<String>, range: [f64; 2], offset: f64, length: f64) -> Self {
        Self::new(id, AxisKind::Linear, range, offset, length)
    }

    /// Attach category names (serial number = index).
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Vertical axes have ids starting with `y`; their pixels grow downward.
    pub fn is_vertical(&self) -> bool {
        self.id.starts_with('y')
    }

    /// Check the axis can map pixels in both directions.
    pub fn validate(&self) -> GeomResult<()> {
        let span = self.range[1] - self.range[0];
        if span == 0.0 || !span.is_finite() || self.length <= 0.0 {
            return Err(GeomError::DegenerateRange {
                axis: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Linear coefficients `(m, b)` with `pixel = m * range + b`.
    fn scale(&self) -> (f64, f64) {
        let [r0, r1] = self.range;
        if self.is_vertical() {
            let m = self.length / (r0 - r1);
            (m, -m * r1)
        } else {
            let m = self.length / (r1 - r0);
            (m, -m * r0)
        }
    }

    /// Range value to local pixel.
    pub fn r2p(&self, r: f64) -> f64 {
        let (m, b) = self.scale();
        m * r + b
    }

    /// Local pixel to range value.
    pub fn p2r(&self, p: f64) -> f64 {
        let (m, b) = self.scale();
        (p - b) / m
    }

    /// Shape position to range value.
    pub fn d2r(&self, v: f64) -> f64 {
        match self.kind {
            AxisKind::Log => {
                if v > 0.0 {
                    v.log10()
                } else {
                    f64::NAN
                }
            }
            _ => v,
        }
    }

    /// Range value to shape position.
    pub fn r2d(&self, r: f64) -> f64 {
        match self.kind {
            AxisKind::Log => 10f64.powf(r),
            _ => r,
        }
    }

    /// Shape position to local pixel.
    pub fn pos2p(&self, v: f64) -> f64 {
        self.r2p(self.d2r(v))
    }

    /// Local pixel to shape position.
    pub fn p2pos(&self, p: f64) -> f64 {
        self.r2d(self.p2r(p))
    }

    /// Pixel offset of a category shift; zero on non-category axes.
    pub fn pixel_shift(&self, shift: f64) -> f64 {
        if shift == 0.0 || self.kind != AxisKind::Category {
            return 0.0;
        }
        (self.r2p(1.0) - self.r2p(0.0)) * shift
    }

    /// Shape position placed at a fraction of the visible range.
    pub fn default_position(&self, fraction: f64) -> f64 {
        let [r0, r1] = self.range;
        self.r2d(r0 + fraction * (r1 - r0))
    }

    /// Absolute pixel for a coordinate in the given reference mode.
    pub fn to_pixel(&self, value: f64, mode: RefMode) -> f64 {
        match mode {
            RefMode::DataRange => self.offset + self.pos2p(value),
            RefMode::DomainFraction => {
                let v = if self.is_vertical() { 1.0 - value } else { value };
                self.offset + self.length * v
            }
            RefMode::PixelAnchored { anchor } => {
                let base = self.offset + self.pos2p(anchor);
                if self.is_vertical() {
                    base - value
                } else {
                    base + value
                }
            }
        }
    }

    /// Coordinate in the given reference mode for an absolute pixel.
    pub fn to_data(&self, pixel: f64, mode: RefMode) -> f64 {
        match mode {
            RefMode::DataRange => self.p2pos(pixel - self.offset),
            RefMode::DomainFraction => {
                let q = (pixel - self.offset) / self.length;
                if self.is_vertical() { 1.0 - q } else { q }
            }
            RefMode::PixelAnchored { anchor } => {
                let base = self.offset + self.pos2p(anchor);
                if self.is_vertical() {
                    base - pixel
                } else {
                    pixel - base
                }
            }
        }
    }

    /// Interpret a written position as a numeric shape position.
    pub fn clean_position(&self, position: &Position) -> GeomResult<f64> {
        match (position, self.kind) {
            (Position::Number(v), _) => Ok(*v),
            (Position::Text(text), AxisKind::Date) => parse_date(text)
                .or_else(|| text.trim().parse::<f64>().ok())
                .ok_or_else(|| GeomError::invalid_position(text.as_str(), self.id.as_str())),
            (Position::Text(text), AxisKind::Category) => self
                .categories
                .iter()
                .position(|c| c == text)
                .map(|i| i as f64)
                .or_else(|| text.trim().parse::<f64>().ok())
                .ok_or_else(|| GeomError::invalid_position(text.as_str(), self.id.as_str())),
            (Position::Text(text), _) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| GeomError::invalid_position(text.as_str(), self.id.as_str())),
        }
    }

    /// Written form of a numeric shape position.
    pub fn format_position(&self, value: f64) -> Position {
        match self.kind {
            AxisKind::Date => match format_date(value) {
                Some(text) => Position::Text(text),
                None => Position::Number(value),
            },
            _ => Position::Number(value),
        }
    }

    /// Path parameter text for a numeric shape position; dates are escaped.
    pub fn format_path_param(&self, value: f64) -> String {
        match self.format_position(value) {
            Position::Text(text) => escape_date(&text),
            Position::Number(v) => format_number(v),
        }
    }
}

/// Whole-surface plot area in pixels (`l`, `t`, `w`, `h`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub l: f64,
    pub t: f64,
    pub w: f64,
    pub h: f64,
}

impl Surface {
    pub fn new(l: f64, t: f64, w: f64, h: f64) -> Self {
        Self { l, t, w, h }
    }

    /// Paper fraction to absolute pixel.
    pub fn paper_to_pixel(&self, v: f64, vertical: bool) -> f64 {
        if vertical {
            self.t + self.h * (1.0 - v)
        } else {
            self.l + self.w * v
        }
    }

    /// Absolute pixel to paper fraction.
    pub fn pixel_to_paper(&self, p: f64, vertical: bool) -> f64 {
        if vertical {
            1.0 - (p - self.t) / self.h
        } else {
            (p - self.l) / self.w
        }
    }
}

/// A resolved reference frame for one coordinate of a region.
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    Axis {
        axis: &'a Axis,
        mode: RefMode,
        /// Category shift in serial units
        shift: f64,
    },
    Paper { surface: Surface, vertical: bool },
}

impl<'a> Frame<'a> {
    /// Resolve a frame, falling back to the whole surface when the axis is missing.
    pub fn resolve(axis: Option<&'a Axis>, mode: RefMode, surface: Surface, vertical: bool) -> Self {
        match axis {
            Some(axis) => Frame::Axis {
                axis,
                mode,
                shift: 0.0,
            },
            None => Frame::Paper { surface, vertical },
        }
    }

    /// Apply a category shift (ignored on paper and non-category axes).
    pub fn with_shift(self, shift: f64) -> Self {
        match self {
            Frame::Axis { axis, mode, .. } => Frame::Axis { axis, mode, shift },
            paper => paper,
        }
    }

    pub fn to_pixel(&self, value: f64) -> f64 {
        match self {
            Frame::Axis { axis, mode, shift } => axis.to_pixel(value, *mode) + axis.pixel_shift(*shift),
            Frame::Paper { surface, vertical } => surface.paper_to_pixel(value, *vertical),
        }
    }

    pub fn to_data(&self, pixel: f64) -> f64 {
        match self {
            Frame::Axis { axis, mode, shift } => axis.to_data(pixel - axis.pixel_shift(*shift), *mode),
            Frame::Paper { surface, vertical } => surface.pixel_to_paper(pixel, *vertical),
        }
    }

    pub fn axis(&self) -> Option<&'a Axis> {
        match self {
            Frame::Axis { axis, .. } => Some(*axis),
            Frame::Paper { .. } => None,
        }
    }
}

/// Replace the escape character inside a date with a space.
pub fn unescape_date(text: &str) -> String {
    text.replace(DATE_SEPARATOR_ESCAPE, " ")
}

/// Replace spaces inside a date with the escape character.
pub fn escape_date(text: &str) -> String {
    text.replace(' ', &DATE_SEPARATOR_ESCAPE.to_string())
}

/// Parse a date string into epoch milliseconds (UTC).
pub fn parse_date(text: &str) -> Option<f64> {
    let text = unescape_date(text.trim());
    let datetime = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    let utc = datetime.and_utc();
    Some(utc.timestamp_millis() as f64)
}

/// Format epoch milliseconds as the shortest date string that keeps all set fields.
pub fn format_date(ms: f64) -> Option<String> {
    if !ms.is_finite() {
        return None;
    }
    let datetime = DateTime::from_timestamp_millis(ms.round() as i64)?.naive_utc();
    let time = datetime.time();
    let text = if time.num_seconds_from_midnight() == 0 && time.nanosecond() == 0 {
        datetime.format("%Y-%m-%d").to_string()
    } else if time.second() == 0 && time.nanosecond() == 0 {
        datetime.format("%Y-%m-%d %H:%M").to_string()
    } else if time.nanosecond() == 0 {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        let full = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        full.trim_end_matches('0').to_string()
    };
    Some(text)
}

/// Shortest decimal text for a number, used in path strings.
pub fn format_number(v: f64) -> String {
    if v == 0.0 {
        // Avoid writing "-0"
        return "0".to_string();
    }
    format!("{}", v)
}
