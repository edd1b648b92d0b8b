//! Interaction configuration.
//!
//! Drag mode, direction rules, default styles for new regions and the timing
//! constants of the gesture layer. The whole struct round-trips through JSON.

use serde::{Deserialize, Serialize};

use crate::error::{PlotselError, PlotselResult};

/// Log level setting for the demo binary and hosts that follow the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// What a pointer drag on the plot area does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DragMode {
    /// Rectangle (or band) selection
    Select,
    /// Free-hand selection
    Lasso,
    DrawLine,
    DrawRect,
    DrawCircle,
    DrawOpenPath,
    DrawClosedPath,
    Pan,
    #[default]
    Zoom,
}

impl DragMode {
    pub fn is_select_mode(&self) -> bool {
        matches!(self, DragMode::Select | DragMode::Lasso)
    }

    pub fn is_draw_mode(&self) -> bool {
        matches!(
            self,
            DragMode::DrawLine
                | DragMode::DrawRect
                | DragMode::DrawCircle
                | DragMode::DrawOpenPath
                | DragMode::DrawClosedPath
        )
    }

    /// Lines and open paths are not closed with `Z` and never subtract.
    pub fn is_open_mode(&self) -> bool {
        matches!(self, DragMode::DrawLine | DragMode::DrawOpenPath)
    }

    /// Modes that follow the pointer with a lasso filter.
    pub fn is_free_mode(&self) -> bool {
        matches!(
            self,
            DragMode::Lasso | DragMode::DrawOpenPath | DragMode::DrawClosedPath
        )
    }

    /// Modes that build a box from the drag start and current point.
    pub fn is_rect_mode(&self) -> bool {
        matches!(
            self,
            DragMode::Select | DragMode::DrawLine | DragMode::DrawRect | DragMode::DrawCircle
        )
    }

    pub fn is_line_mode(&self) -> bool {
        matches!(self, DragMode::DrawLine)
    }

    pub fn is_ellipse_mode(&self) -> bool {
        matches!(self, DragMode::DrawCircle)
    }
}

/// Allowed direction of a rectangle selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectDirection {
    /// Horizontal band spanning the full height
    H,
    /// Vertical band spanning the full width
    V,
    /// Free diagonal box
    D,
    /// Pick h, v or d from the drag shape
    #[default]
    Any,
}

/// Allowed direction when drawing a new shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DrawDirection {
    /// Full-width box, the drag sets x only
    Horizontal,
    /// Full-height box, the drag sets y only
    Vertical,
    #[default]
    Diagonal,
    /// Whichever of horizontal or vertical follows the larger drag extent
    Ortho,
}

/// Whether a new selection persists as a layout selection while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewSelectionMode {
    /// Replace previous selections and keep the new one active
    #[default]
    Immediate,
    /// Accumulate selection definitions before committing
    Gradual,
}

/// Click behaviour flags, written as `event`, `select`, `event+select` or `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClickMode {
    /// Clicks emit selected events
    pub event: bool,
    /// Clicks select points
    pub select: bool,
}

impl Default for ClickMode {
    fn default() -> Self {
        Self {
            event: true,
            select: false,
        }
    }
}

impl ClickMode {
    pub const NONE: ClickMode = ClickMode {
        event: false,
        select: false,
    };

    /// Event flag alone, without select.
    pub fn is_event_only(&self) -> bool {
        self.event && !self.select
    }
}

impl TryFrom<String> for ClickMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut mode = ClickMode::NONE;
        if value == "none" {
            return Ok(mode);
        }
        for flag in value.split('+') {
            match flag {
                "event" => mode.event = true,
                "select" => mode.select = true,
                other => return Err(format!("unknown clickmode flag '{}'", other)),
            }
        }
        Ok(mode)
    }
}

impl From<ClickMode> for String {
    fn from(mode: ClickMode) -> Self {
        match (mode.event, mode.select) {
            (true, true) => "event+select",
            (true, false) => "event",
            (false, true) => "select",
            (false, false) => "none",
        }
        .to_string()
    }
}

/// Line style of a region outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    #[serde(default = "default_line_color")]
    pub color: String,
    #[serde(default = "default_line_width")]
    pub width: f64,
    #[serde(default = "default_line_dash")]
    pub dash: String,
}

fn default_line_color() -> String {
    "#444".to_string()
}

fn default_line_width() -> f64 {
    4.0
}

fn default_line_dash() -> String {
    "solid".to_string()
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: default_line_color(),
            width: default_line_width(),
            dash: default_line_dash(),
        }
    }
}

impl LineStyle {
    /// Dotted outline used for selections.
    pub fn selection() -> Self {
        Self {
            color: "#7f7f7f".to_string(),
            width: 1.0,
            dash: "dot".to_string(),
        }
    }
}

/// Fill rule for closed shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    #[default]
    EvenOdd,
    NonZero,
}

/// Style of newly drawn shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShapeConfig {
    #[serde(default)]
    pub line: LineStyle,
    #[serde(default = "default_shape_fill")]
    pub fillcolor: String,
    #[serde(default)]
    pub fillrule: FillRule,
    #[serde(default = "default_shape_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub drawdirection: DrawDirection,
}

fn default_shape_fill() -> String {
    "rgba(0,0,0,0)".to_string()
}

fn default_shape_opacity() -> f64 {
    1.0
}

impl Default for NewShapeConfig {
    fn default() -> Self {
        Self {
            line: LineStyle::default(),
            fillcolor: default_shape_fill(),
            fillrule: FillRule::default(),
            opacity: default_shape_opacity(),
            drawdirection: DrawDirection::default(),
        }
    }
}

/// Style and persistence mode of new selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSelectionConfig {
    #[serde(default = "LineStyle::selection")]
    pub line: LineStyle,
    #[serde(default)]
    pub mode: NewSelectionMode,
}

impl Default for NewSelectionConfig {
    fn default() -> Self {
        Self {
            line: LineStyle::selection(),
            mode: NewSelectionMode::default(),
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Minimum drag extent in pixels before a select box picks a direction.
pub const DEFAULT_MIN_SELECT: f64 = 12.0;

/// Tolerance in pixels used by the lasso point filter.
pub const DEFAULT_BEND_TOLERANCE: f64 = 1.5;

/// Window in milliseconds within which presses count as one click train.
pub const DEFAULT_DOUBLE_CLICK_DELAY_MS: u64 = 300;

/// Minimum pointer travel in pixels before a press becomes a drag.
pub const DEFAULT_MIN_DRAG: f64 = 8.0;

/// Coalescing interval in milliseconds for selecting events.
pub const DEFAULT_SELECT_DELAY_MS: u64 = 100;

/// Configuration of the interaction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub dragmode: DragMode,

    #[serde(default)]
    pub selectdirection: SelectDirection,

    #[serde(default)]
    pub newshape: NewShapeConfig,

    #[serde(default)]
    pub newselection: NewSelectionConfig,

    #[serde(default)]
    pub clickmode: ClickMode,

    #[serde(default = "default_min_select")]
    pub min_select: f64,

    #[serde(default = "default_bend_tolerance")]
    pub bend_tolerance: f64,

    #[serde(default = "default_double_click_delay_ms")]
    pub double_click_delay_ms: u64,

    #[serde(default = "default_min_drag")]
    pub min_drag: f64,

    #[serde(default = "default_select_delay_ms")]
    pub select_delay_ms: u64,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_min_select() -> f64 {
    DEFAULT_MIN_SELECT
}

fn default_bend_tolerance() -> f64 {
    DEFAULT_BEND_TOLERANCE
}

fn default_double_click_delay_ms() -> u64 {
    DEFAULT_DOUBLE_CLICK_DELAY_MS
}

fn default_min_drag() -> f64 {
    DEFAULT_MIN_DRAG
}

fn default_select_delay_ms() -> u64 {
    DEFAULT_SELECT_DELAY_MS
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            dragmode: DragMode::default(),
            selectdirection: SelectDirection::default(),
            newshape: NewShapeConfig::default(),
            newselection: NewSelectionConfig::default(),
            clickmode: ClickMode::default(),
            min_select: DEFAULT_MIN_SELECT,
            bend_tolerance: DEFAULT_BEND_TOLERANCE,
            double_click_delay_ms: DEFAULT_DOUBLE_CLICK_DELAY_MS,
            min_drag: DEFAULT_MIN_DRAG,
            select_delay_ms: DEFAULT_SELECT_DELAY_MS,
            log_level: LogLevel::default(),
        }
    }

    /// Same configuration with another drag mode.
    pub fn with_dragmode(mut self, dragmode: DragMode) -> Self {
        self.dragmode = dragmode;
        self
    }

    /// Same configuration with another click mode.
    pub fn with_clickmode(mut self, clickmode: ClickMode) -> Self {
        self.clickmode = clickmode;
        self
    }

    /// Whether new selections are committed on every drag.
    pub fn is_immediate(&self) -> bool {
        self.newselection.mode == NewSelectionMode::Immediate
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> PlotselResult<Self> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(PlotselError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }
}
