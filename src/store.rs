//! Region persistence store.
//!
//! One store per region list (shapes or selections). Inputs are the source of
//! truth; the resolved list is rebuilt against a layout with
//! [`RegionStore::resolve`] after every edit.

use serde::{Deserialize, Serialize};

use crate::error::{PlotselError, PlotselResult};
use crate::history::RegionCommand;
use crate::layout::Layout;
use crate::region::{Region, RegionDefaults, RegionField, RegionInput};

/// Which region list a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Shapes,
    Selections,
}

impl RegionKind {
    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::Shapes => "shapes",
            RegionKind::Selections => "selections",
        }
    }

    pub fn defaults(&self) -> RegionDefaults {
        match self {
            RegionKind::Shapes => RegionDefaults::shape(),
            RegionKind::Selections => RegionDefaults::selection(),
        }
    }
}

/// A single edit of a region list.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionEdit {
    Insert { index: usize, input: RegionInput },
    Remove { index: usize },
    Modify { index: usize, field: RegionField },
    /// Replace one item wholesale
    Set { index: usize, input: RegionInput },
    /// Replace the whole list
    ReplaceAll { inputs: Vec<RegionInput> },
}

/// Region list with its resolved form and the active item.
#[derive(Debug, Clone)]
pub struct RegionStore {
    kind: RegionKind,
    inputs: Vec<RegionInput>,
    resolved: Vec<Region>,
    active: Option<usize>,
}

impl RegionStore {
    pub fn new(kind: RegionKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            resolved: Vec::new(),
            active: None,
        }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[RegionInput] {
        &self.inputs
    }

    pub fn input(&self, index: usize) -> Option<&RegionInput> {
        self.inputs.get(index)
    }

    /// Resolved regions as of the last [`RegionStore::resolve`].
    pub fn regions(&self) -> &[Region] {
        &self.resolved
    }

    pub fn region(&self, index: usize) -> Option<&Region> {
        self.resolved.get(index)
    }

    fn check_index(&self, index: usize) -> PlotselResult<()> {
        if index >= self.inputs.len() {
            return Err(PlotselError::index_out_of_range(index, self.inputs.len()));
        }
        Ok(())
    }

    /// Insert at `index` (at most the current length).
    pub fn insert(&mut self, index: usize, input: RegionInput) -> PlotselResult<()> {
        if index > self.inputs.len() {
            return Err(PlotselError::index_out_of_range(index, self.inputs.len()));
        }
        self.inputs.insert(index, input);
        if let Some(active) = self.active.as_mut()
            && *active >= index
        {
            *active += 1;
        }
        log::debug!("Inserted {} item {}", self.kind.name(), index);
        Ok(())
    }

    /// Append, returning the new index.
    pub fn push(&mut self, input: RegionInput) -> usize {
        self.inputs.push(input);
        self.inputs.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> PlotselResult<RegionInput> {
        self.check_index(index)?;
        let removed = self.inputs.remove(index);
        if index < self.resolved.len() {
            self.resolved.remove(index);
        }
        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        log::debug!("Removed {} item {}", self.kind.name(), index);
        Ok(removed)
    }

    /// Write one field of an item, returning the item as it was before.
    pub fn modify_item(&mut self, index: usize, field: RegionField) -> PlotselResult<RegionInput> {
        self.check_index(index)?;
        let old = self.inputs[index].clone();
        log::trace!("Modify {}[{}].{}", self.kind.name(), index, field.name());
        self.inputs[index].set(field);
        Ok(old)
    }

    /// Replace one item, returning the previous one.
    pub fn set(&mut self, index: usize, input: RegionInput) -> PlotselResult<RegionInput> {
        self.check_index(index)?;
        Ok(std::mem::replace(&mut self.inputs[index], input))
    }

    /// Replace the whole list, returning the previous one.
    pub fn replace_all(&mut self, inputs: Vec<RegionInput>) -> Vec<RegionInput> {
        if self.active.is_some_and(|a| a >= inputs.len()) {
            self.active = None;
        }
        self.resolved.truncate(inputs.len());
        std::mem::replace(&mut self.inputs, inputs)
    }

    /// Apply an edit and describe it as an undoable command.
    pub fn apply(&mut self, edit: RegionEdit) -> PlotselResult<RegionCommand> {
        let kind = self.kind;
        match edit {
            RegionEdit::Insert { index, input } => {
                self.insert(index, input.clone())?;
                Ok(RegionCommand::Insert { kind, index, input })
            }
            RegionEdit::Remove { index } => {
                let input = self.remove(index)?;
                Ok(RegionCommand::Remove { kind, index, input })
            }
            RegionEdit::Modify { index, field } => {
                let old = self.modify_item(index, field)?;
                let new = self.inputs[index].clone();
                Ok(RegionCommand::Modify { kind, index, old, new })
            }
            RegionEdit::Set { index, input } => {
                let old = self.set(index, input.clone())?;
                Ok(RegionCommand::Modify {
                    kind,
                    index,
                    old,
                    new: input,
                })
            }
            RegionEdit::ReplaceAll { inputs } => {
                let old = self.replace_all(inputs.clone());
                Ok(RegionCommand::Replace { kind, old, new: inputs })
            }
        }
    }

    /// Edits that turn `old` into `new` when applied in order.
    pub fn diff(old: &[RegionInput], new: &[RegionInput]) -> Vec<RegionEdit> {
        let mut edits = Vec::new();
        let common = old.len().min(new.len());
        for i in 0..common {
            if old[i] != new[i] {
                edits.push(RegionEdit::Set {
                    index: i,
                    input: new[i].clone(),
                });
            }
        }
        for (i, input) in new.iter().enumerate().skip(common) {
            edits.push(RegionEdit::Insert {
                index: i,
                input: input.clone(),
            });
        }
        for i in (common..old.len()).rev() {
            edits.push(RegionEdit::Remove { index: i });
        }
        edits
    }

    /// Rebuild the resolved list and complete partially given corners.
    pub fn resolve(&mut self, layout: &Layout) {
        let defaults = self.kind.defaults();
        self.resolved = self
            .inputs
            .iter_mut()
            .map(|input| {
                let region = Region::resolve(input, layout, &defaults);
                input.complete_from(&region, layout);
                region
            })
            .collect();
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_region(&self) -> Option<&Region> {
        self.active.and_then(|i| self.resolved.get(i))
    }

    /// Activate an item; activating the active item deactivates it.
    pub fn activate(&mut self, index: usize) -> PlotselResult<Option<usize>> {
        self.check_index(index)?;
        if self.active == Some(index) {
            self.active = None;
        } else {
            self.active = Some(index);
        }
        log::debug!("Active {}: {:?}", self.kind.name(), self.active);
        Ok(self.active)
    }

    pub fn activate_last(&mut self) -> Option<usize> {
        self.active = self.inputs.len().checked_sub(1);
        self.active
    }

    /// Deactivate, returning the index that was active.
    pub fn deactivate(&mut self) -> Option<usize> {
        self.active.take()
    }

    /// Remove the active item.
    pub fn erase_active(&mut self) -> Option<(usize, RegionInput)> {
        let index = self.active?;
        self.remove(index).ok().map(|input| (index, input))
    }

    /// Serialize the input list to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.inputs)
    }

    /// Replace the list with inputs read from JSON.
    pub fn from_json(kind: RegionKind, json: &str) -> PlotselResult<Self> {
        let inputs: Vec<RegionInput> = serde_json::from_str(json)?;
        let mut store = Self::new(kind);
        store.inputs = inputs;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionGeometry;
    use plotsel_geom::{Position, Surface};

    fn layout() -> Layout {
        Layout::single(Surface::new(0.0, 0.0, 100.0, 100.0), [0.0, 10.0], [0.0, 10.0])
    }

    fn rect(x0: f64) -> RegionInput {
        RegionInput::rect("x", "y", x0, 0.0, x0 + 1.0, 1.0)
    }

    #[test]
    fn test_insert_remove_and_active_tracking() {
        let mut store = RegionStore::new(RegionKind::Shapes);
        store.push(rect(0.0));
        store.push(rect(1.0));
        store.activate(1).unwrap();

        store.insert(0, rect(5.0)).unwrap();
        assert_eq!(store.active(), Some(2));

        store.remove(0).unwrap();
        assert_eq!(store.active(), Some(1));
        store.remove(1).unwrap();
        assert_eq!(store.active(), None);

        assert!(store.remove(4).is_err());
        assert!(store.insert(9, rect(0.0)).is_err());
    }

    #[test]
    fn test_activate_toggles() {
        let mut store = RegionStore::new(RegionKind::Selections);
        store.push(rect(0.0));
        assert_eq!(store.activate(0).unwrap(), Some(0));
        assert_eq!(store.activate(0).unwrap(), None);
        assert_eq!(store.activate_last(), Some(0));
        assert_eq!(store.deactivate(), Some(0));
        assert!(store.erase_active().is_none());
    }

    #[test]
    fn test_modify_item_and_resolve() {
        let mut store = RegionStore::new(RegionKind::Shapes);
        store.push(rect(0.0));
        let old = store
            .modify_item(0, RegionField::X1(Position::Number(4.0)))
            .unwrap();
        assert_eq!(old.x1, Some(Position::Number(1.0)));
        store.resolve(&layout());
        match &store.regions()[0].geometry {
            RegionGeometry::Rect(c) => assert_eq!(c.x1, 4.0),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_diff_apply_reaches_target() {
        let old = vec![rect(0.0), rect(1.0), rect(2.0)];
        let new = vec![rect(0.0), rect(7.0)];
        let mut store = RegionStore::new(RegionKind::Shapes);
        store.replace_all(old.clone());
        for edit in RegionStore::diff(&old, &new) {
            store.apply(edit).unwrap();
        }
        assert_eq!(store.inputs(), new.as_slice());

        let grow = vec![rect(0.0), rect(7.0), rect(8.0), rect(9.0)];
        let edits = RegionStore::diff(&new, &grow);
        assert_eq!(edits.len(), 2);
        for edit in edits {
            store.apply(edit).unwrap();
        }
        assert_eq!(store.inputs(), grow.as_slice());
    }

    #[test]
    fn test_resolve_completes_partial_input() {
        let mut store = RegionStore::new(RegionKind::Shapes);
        store.push(RegionInput {
            x0: Some(Position::Number(1.0)),
            ..Default::default()
        });
        store.resolve(&layout());
        assert_eq!(store.inputs()[0].y1, Some(Position::Number(7.5)));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut store = RegionStore::new(RegionKind::Selections);
        store.push(rect(0.0));
        store.push(RegionInput::path("x", "y", "M0,0L1,1L1,0Z"));
        let json = store.to_json().unwrap();
        let restored = RegionStore::from_json(RegionKind::Selections, &json).unwrap();
        assert_eq!(restored.inputs(), store.inputs());
        assert!(RegionStore::from_json(RegionKind::Shapes, "{").is_err());
    }
}
