//! The region document: layout snapshot, shape and selection lists, traces and
//! edit history.
//!
//! Every persisted change goes through [`Document::relayout`], which applies a
//! list of edits atomically and records them as one undo step.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "config": { "version": 1, "dragmode": "select" },
//!   "shapes": [ { "type": "rect", "xref": "x", "yref": "y", "x0": 1, "x1": 2, "y0": 1, "y1": 2 } ],
//!   "selections": []
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::config::InteractionConfig;
use crate::error::{PlotselError, PlotselResult};
use crate::hittest::TraceModule;
use crate::history::{History, RegionCommand, apply_redo, apply_undo};
use crate::layout::Layout;
use crate::region::{RegionInput, RegionType};
use crate::store::{RegionEdit, RegionKind, RegionStore};

/// Current document file format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// Serialized form of a document. The layout and traces belong to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFile {
    pub version: u32,
    #[serde(default)]
    pub config: InteractionConfig,
    #[serde(default)]
    pub shapes: Vec<RegionInput>,
    #[serde(default)]
    pub selections: Vec<RegionInput>,
}

pub struct Document {
    pub config: InteractionConfig,
    pub(crate) layout: Layout,
    pub(crate) shapes: RegionStore,
    pub(crate) selections: RegionStore,
    /// Selectable traces, indexed by curve number
    pub traces: Vec<Box<dyn TraceModule>>,
    history: History,
    /// Refuse every commit
    pub read_only: bool,
}

impl Document {
    pub fn new(config: InteractionConfig, layout: Layout) -> Self {
        Self {
            config,
            layout,
            shapes: RegionStore::new(RegionKind::Shapes),
            selections: RegionStore::new(RegionKind::Selections),
            traces: Vec::new(),
            history: History::new(),
            read_only: false,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Replace the layout snapshot and re-resolve every region against it.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        self.shapes.resolve(&self.layout);
        self.selections.resolve(&self.layout);
    }

    pub fn shapes(&self) -> &RegionStore {
        &self.shapes
    }

    pub fn selections(&self) -> &RegionStore {
        &self.selections
    }

    pub fn store(&self, kind: RegionKind) -> &RegionStore {
        match kind {
            RegionKind::Shapes => &self.shapes,
            RegionKind::Selections => &self.selections,
        }
    }

    pub(crate) fn store_mut(&mut self, kind: RegionKind) -> &mut RegionStore {
        match kind {
            RegionKind::Shapes => &mut self.shapes,
            RegionKind::Selections => &mut self.selections,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Apply edits to one region list as a single undo step.
    ///
    /// Either every edit lands or the list is left as it was. Paths that
    /// decode to nothing are refused.
    pub fn relayout(&mut self, kind: RegionKind, edits: Vec<RegionEdit>) -> PlotselResult<()> {
        if self.read_only {
            return Err(PlotselError::commit_rejected("document is read-only"));
        }
        if edits.is_empty() {
            return Ok(());
        }

        let count = edits.len();
        let store = match kind {
            RegionKind::Shapes => &mut self.shapes,
            RegionKind::Selections => &mut self.selections,
        };
        let before = store.inputs().to_vec();
        let active_before = store.active();

        let mut commands = Vec::with_capacity(count);
        let mut failure = None;
        for edit in edits {
            match store.apply(edit) {
                Ok(cmd) => commands.push(cmd),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if failure.is_none() {
            store.resolve(&self.layout);
            failure = empty_path(store, &self.layout);
        }

        if let Some(e) = failure {
            store.replace_all(before);
            if let Some(index) = active_before
                && store.active() != Some(index)
                && index < store.len()
            {
                let _ = store.activate(index);
            }
            store.resolve(&self.layout);
            log::warn!("Relayout of {} rolled back: {}", kind.name(), e);
            return Err(e);
        }

        let command = if commands.len() == 1 {
            commands.remove(0)
        } else {
            RegionCommand::Batch {
                description: format!("Edit {} ({} changes)", kind.name(), count),
                commands,
            }
        };
        log::info!("Relayout: {}", command.description());
        self.history.push(command);
        Ok(())
    }

    /// Set one item without recording history, for in-progress edits.
    pub fn preview(&mut self, kind: RegionKind, index: usize, input: RegionInput) -> PlotselResult<()> {
        let store = match kind {
            RegionKind::Shapes => &mut self.shapes,
            RegionKind::Selections => &mut self.selections,
        };
        store.set(index, input)?;
        store.resolve(&self.layout);
        Ok(())
    }

    /// Undo the last relayout. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(cmd) = self.history.pop_undo() else {
            return false;
        };
        apply_undo(&cmd, &mut self.shapes, &mut self.selections);
        self.shapes.resolve(&self.layout);
        self.selections.resolve(&self.layout);
        true
    }

    /// Redo the last undone relayout.
    pub fn redo(&mut self) -> bool {
        let Some(cmd) = self.history.pop_redo() else {
            return false;
        };
        apply_redo(&cmd, &mut self.shapes, &mut self.selections);
        self.shapes.resolve(&self.layout);
        self.selections.resolve(&self.layout);
        true
    }

    pub fn to_file(&self) -> DocumentFile {
        DocumentFile {
            version: DOCUMENT_VERSION,
            config: self.config.clone(),
            shapes: self.shapes.inputs().to_vec(),
            selections: self.selections.inputs().to_vec(),
        }
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_file())
    }

    /// Read a document written by [`Document::to_json`] onto a host layout.
    pub fn from_json(json: &str, layout: Layout) -> PlotselResult<Self> {
        let file: DocumentFile = serde_json::from_str(json)?;
        if file.version > DOCUMENT_VERSION {
            return Err(PlotselError::VersionTooNew {
                file_version: file.version,
                supported_version: DOCUMENT_VERSION,
            });
        }

        let mut doc = Self::new(file.config, layout);
        doc.shapes.replace_all(file.shapes);
        doc.selections.replace_all(file.selections);
        doc.shapes.resolve(&doc.layout);
        doc.selections.resolve(&doc.layout);
        log::info!(
            "Loaded document: {} shapes, {} selections",
            doc.shapes.len(),
            doc.selections.len()
        );
        Ok(doc)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> PlotselResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &std::path::Path, layout: Layout) -> PlotselResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, layout)
    }
}

/// First path region that decodes to no polygon.
fn empty_path(store: &RegionStore, layout: &Layout) -> Option<PlotselError> {
    store
        .regions()
        .iter()
        .enumerate()
        .find(|(_, r)| r.kind() == RegionType::Path && r.pixel_polygons(layout).is_empty())
        .map(|(i, _)| PlotselError::invalid_path(format!("{} item {} has no drawable segment", store.kind().name(), i)))
}
