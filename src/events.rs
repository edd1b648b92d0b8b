//! Selection event interface.
//!
//! The interaction layer reports progress through a [`SelectionEvents`]
//! implementation handed to it at construction.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::region::RegionInput;

/// One selected data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedPoint {
    pub curve_number: usize,
    pub point_number: usize,
    pub x: f64,
    pub y: f64,
}

/// Payload of selecting and selected events.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SelectionEventData {
    pub points: Vec<SelectedPoint>,
    /// Range per axis id, for rectangle selections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<BTreeMap<String, [f64; 2]>>,
    /// Outline coordinates per axis id, for every other selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lasso_points: Option<BTreeMap<String, Vec<f64>>>,
    /// Layout selections at the time of the event
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<RegionInput>,
}

impl SelectionEventData {
    pub fn with_points(points: Vec<SelectedPoint>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }
}

/// Receiver of selection events.
pub trait SelectionEvents {
    /// Selection in progress during a drag.
    fn on_selecting(&mut self, data: &SelectionEventData);

    /// Selection finished; `None` for a click with nothing selected.
    fn on_selected(&mut self, data: Option<&SelectionEventData>);

    /// Selection cleared.
    fn on_deselect(&mut self);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl SelectionEvents for NoopEvents {
    fn on_selecting(&mut self, _data: &SelectionEventData) {}

    fn on_selected(&mut self, _data: Option<&SelectionEventData>) {}

    fn on_deselect(&mut self) {}
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq)]
pub enum EmittedEvent {
    Selecting(SelectionEventData),
    Selected(Option<SelectionEventData>),
    Deselect,
}

/// Keeps every event in order, for tests and scripted sessions.
#[derive(Debug, Clone, Default)]
pub struct RecordedEvents {
    pub events: Vec<EmittedEvent>,
}

impl RecordedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent selected event.
    pub fn last_selected(&self) -> Option<&Option<SelectionEventData>> {
        self.events.iter().rev().find_map(|e| match e {
            EmittedEvent::Selected(data) => Some(data),
            _ => None,
        })
    }

    pub fn count_selecting(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EmittedEvent::Selecting(_)))
            .count()
    }

    pub fn count_deselect(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EmittedEvent::Deselect))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl SelectionEvents for RecordedEvents {
    fn on_selecting(&mut self, data: &SelectionEventData) {
        log::trace!("selecting: {} points", data.points.len());
        self.events.push(EmittedEvent::Selecting(data.clone()));
    }

    fn on_selected(&mut self, data: Option<&SelectionEventData>) {
        log::debug!("selected: {:?} points", data.map(|d| d.points.len()));
        self.events.push(EmittedEvent::Selected(data.cloned()));
    }

    fn on_deselect(&mut self) {
        log::debug!("deselect");
        self.events.push(EmittedEvent::Deselect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_events_order() {
        let mut events = RecordedEvents::new();
        let data = SelectionEventData::with_points(vec![SelectedPoint {
            curve_number: 0,
            point_number: 3,
            x: 1.0,
            y: 2.0,
        }]);
        events.on_selecting(&data);
        events.on_selecting(&data);
        events.on_selected(Some(&data));
        events.on_deselect();
        events.on_selected(None);

        assert_eq!(events.count_selecting(), 2);
        assert_eq!(events.count_deselect(), 1);
        assert_eq!(events.last_selected(), Some(&None));
    }

    #[test]
    fn test_event_data_json() {
        let mut data = SelectionEventData::default();
        data.range = Some(BTreeMap::from([("x".to_string(), [1.0, 2.0])]));
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains(r#""range":{"x":[1.0,2.0]}"#));
        assert!(!json.contains("lasso_points"));
    }
}
