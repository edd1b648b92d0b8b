//! Per-document interaction state shared by consecutive gestures.

use std::collections::HashMap;

use plotsel_geom::{Polygon, SelectionDef};

use super::throttle::Throttle;
use crate::outline::OutlineMesh;

/// Selection definitions accumulated on one subplot across modifier drags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubplotSelection {
    pub defs: Vec<SelectionDef>,
    /// Union of the polygon definitions, in subplot-local pixels
    pub merged: Vec<Polygon>,
}

impl SubplotSelection {
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty() && self.merged.is_empty()
    }
}

/// The live outline of an uncommitted drag result.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub subplot: String,
    /// Polygons in subplot-local pixels, as displayed
    pub polygons: Vec<Polygon>,
}

/// Subplot whose trace selection must be cleared after a selection is erased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeselect {
    pub xref: String,
    pub yref: String,
}

/// State that outlives a single gesture.
#[derive(Debug, Default)]
pub struct InteractionContext {
    uid: String,
    cache: HashMap<String, SubplotSelection>,
    last_selected_subplot: Option<String>,
    /// A draft or an active region outline is displayed
    pub outlining: bool,
    pub draft: Option<Draft>,
    /// Active region edit handles
    pub outline: Option<OutlineMesh>,
    /// The next emitting reselect stays silent
    pub no_emit_selected_at_start: bool,
    pub deselect: Option<PendingDeselect>,
    pub throttle: Throttle,
}

impl InteractionContext {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Throttle key for selecting events.
    pub fn select_key(&self) -> String {
        format!("{}-select", self.uid)
    }

    pub fn cache(&self, subplot: &str) -> Option<&SubplotSelection> {
        self.cache.get(subplot)
    }

    pub fn cache_mut(&mut self, subplot: &str) -> &mut SubplotSelection {
        self.cache.entry(subplot.to_string()).or_default()
    }

    pub fn reset_cache(&mut self, subplot: &str) {
        self.cache.insert(subplot.to_string(), SubplotSelection::default());
    }

    pub fn last_selected_subplot(&self) -> Option<&str> {
        self.last_selected_subplot.as_deref()
    }

    /// Record the subplot being selected on; a change drops the displayed outline.
    pub fn select_subplot(&mut self, subplot: &str) {
        if self.last_selected_subplot.as_deref() == Some(subplot) {
            return;
        }
        if let Some(draft) = self.draft.take() {
            log::debug!("Dropping outline on subplot {}", draft.subplot);
        }
        self.outline = None;
        self.outlining = false;
        self.last_selected_subplot = Some(subplot.to_string());
    }

    /// Remove every displayed outline.
    pub fn clear_outline(&mut self) {
        self.draft = None;
        self.outline = None;
        self.outlining = false;
    }

    /// Draft polygons for a subplot, if one is displayed there.
    pub fn draft_for(&self, subplot: &str) -> Option<&[Polygon]> {
        match &self.draft {
            Some(d) if self.outlining && d.subplot == subplot => Some(&d.polygons),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotsel_geom::Point;

    fn square() -> Polygon {
        Polygon::from_points(
            &[
                Point::new(0.0, 0.0),
                Point::new(0.0, 5.0),
                Point::new(5.0, 5.0),
                Point::new(5.0, 0.0),
            ],
            true,
        )
    }

    #[test]
    fn test_subplot_change_drops_draft() {
        let mut ctx = InteractionContext::new("plot");
        ctx.select_subplot("xy");
        ctx.outlining = true;
        ctx.draft = Some(Draft {
            subplot: "xy".into(),
            polygons: vec![square()],
        });
        assert!(ctx.draft_for("xy").is_some());
        assert!(ctx.draft_for("x2y2").is_none());

        ctx.select_subplot("xy");
        assert!(ctx.draft.is_some());
        ctx.select_subplot("x2y2");
        assert!(ctx.draft.is_none());
        assert_eq!(ctx.last_selected_subplot(), Some("x2y2"));
    }

    #[test]
    fn test_cache_per_subplot() {
        let mut ctx = InteractionContext::new("plot");
        ctx.cache_mut("xy").merged.push(square());
        assert!(!ctx.cache("xy").unwrap().is_empty());
        assert!(ctx.cache("x2y").is_none());
        ctx.reset_cache("xy");
        assert!(ctx.cache("xy").unwrap().is_empty());
        assert_eq!(ctx.select_key(), "plot-select");
    }
}
