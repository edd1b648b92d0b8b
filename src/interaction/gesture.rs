//! Pointer gesture tracking: click trains, drag threshold and right clicks.

use web_time::{Duration, Instant};

use crate::config::{DEFAULT_DOUBLE_CLICK_DELAY_MS, DEFAULT_MIN_DRAG};

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn shift_alt() -> Self {
        Self {
            shift: true,
            alt: true,
            ..Self::NONE
        }
    }
}

/// Data point under the pointer, as reported by the host's hover logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverPoint {
    pub trace: usize,
    pub point_number: usize,
}

/// Mouse button that started a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Button {
    #[default]
    Primary,
    Secondary,
}

/// One pointer event in absolute surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    pub button: Button,
    pub modifiers: Modifiers,
    pub time: Instant,
    pub hover: Option<HoverPoint>,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, time: Instant) -> Self {
        Self {
            x,
            y,
            button: Button::Primary,
            modifiers: Modifiers::NONE,
            time,
            hover: None,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_hover(mut self, trace: usize, point_number: usize) -> Self {
        self.hover = Some(HoverPoint { trace, point_number });
        self
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.button = button;
        self
    }

    fn is_right_click(&self) -> bool {
        self.button == Button::Secondary || self.modifiers.ctrl
    }
}

/// How a gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEnd {
    /// The pointer moved past the drag threshold.
    Done,
    /// No drag; number of clicks in the current train.
    Click(u32),
    /// Release without a matching press.
    Ignored,
}

/// Tracks one press/move/release sequence and the click train around it.
#[derive(Debug, Clone)]
pub struct Gesture {
    double_click_delay: Duration,
    base_min_drag: f64,
    min_drag: f64,
    start: Option<(f64, f64)>,
    /// Press time that started the current click train
    train_start: Option<Instant>,
    num_clicks: u32,
    dragged: bool,
    right_click: bool,
}

impl Default for Gesture {
    fn default() -> Self {
        Self::new(DEFAULT_DOUBLE_CLICK_DELAY_MS, DEFAULT_MIN_DRAG)
    }
}

impl Gesture {
    pub fn new(double_click_delay_ms: u64, min_drag: f64) -> Self {
        Self {
            double_click_delay: Duration::from_millis(double_click_delay_ms),
            base_min_drag: min_drag,
            min_drag,
            start: None,
            train_start: None,
            num_clicks: 1,
            dragged: false,
            right_click: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    pub fn dragged(&self) -> bool {
        self.dragged
    }

    pub fn num_clicks(&self) -> u32 {
        self.num_clicks
    }

    /// Start a gesture, returning the click count so far.
    ///
    /// `min_drag` overrides the drag threshold for this gesture.
    pub fn press(&mut self, ev: &PointerEvent, min_drag: Option<f64>) -> u32 {
        self.min_drag = min_drag.unwrap_or(self.base_min_drag);
        let in_train = self
            .train_start
            .is_some_and(|t| ev.time.saturating_duration_since(t) < self.double_click_delay);
        if in_train {
            self.num_clicks += 1;
        } else {
            self.num_clicks = 1;
            self.train_start = Some(ev.time);
        }
        self.start = Some((ev.x, ev.y));
        self.dragged = false;
        self.right_click = ev.is_right_click();
        log::trace!("press at ({}, {}), clicks {}", ev.x, ev.y, self.num_clicks);
        self.num_clicks
    }

    /// Displacement from the press point, or `None` when no move should run.
    ///
    /// Each component below the drag threshold is clamped to zero.
    pub fn motion(&mut self, ev: &PointerEvent) -> Option<(f64, f64)> {
        let (x0, y0) = self.start?;
        let clamp = |d: f64| if d.abs() < self.min_drag { 0.0 } else { d };
        let dx = clamp(ev.x - x0);
        let dy = clamp(ev.y - y0);
        if dx != 0.0 || dy != 0.0 {
            self.dragged = true;
        }
        (self.dragged && !self.right_click).then_some((dx, dy))
    }

    /// Finish the gesture.
    pub fn release(&mut self, ev: &PointerEvent) -> GestureEnd {
        if self.start.take().is_none() {
            self.dragged = false;
            return GestureEnd::Ignored;
        }
        let late = self
            .train_start
            .is_some_and(|t| ev.time.saturating_duration_since(t) > self.double_click_delay);
        if late {
            self.num_clicks = self.num_clicks.saturating_sub(1).max(1);
        }

        let end = if self.dragged {
            GestureEnd::Done
        } else {
            GestureEnd::Click(self.num_clicks)
        };
        self.dragged = false;
        end
    }

    /// Drop the gesture without an end event.
    pub fn reset(&mut self) {
        self.start = None;
        self.dragged = false;
    }
}
