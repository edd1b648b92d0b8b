//! Undo/Redo history for region edits.
//!
//! Every committed edit is recorded as a [`RegionCommand`] that carries enough
//! information to reverse itself on the shape and selection stores.

use crate::region::RegionInput;
use crate::store::{RegionKind, RegionStore};

// ============================================================================
// Command Types
// ============================================================================

/// A command that can be undone and redone.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionCommand {
    /// Insert a region
    Insert {
        kind: RegionKind,
        index: usize,
        /// The region that was inserted
        input: RegionInput,
    },
    /// Remove a region
    Remove {
        kind: RegionKind,
        index: usize,
        /// The region that was removed (stored for undo)
        input: RegionInput,
    },
    /// Change a region in place
    Modify {
        kind: RegionKind,
        index: usize,
        old: RegionInput,
        new: RegionInput,
    },
    /// Replace a whole region list
    Replace {
        kind: RegionKind,
        old: Vec<RegionInput>,
        new: Vec<RegionInput>,
    },
    /// Batch command - groups multiple commands into one undo step
    Batch {
        description: String,
        commands: Vec<RegionCommand>,
    },
}

impl RegionCommand {
    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            RegionCommand::Insert { kind, .. } => format!("Add {}", item_name(*kind)),
            RegionCommand::Remove { kind, .. } => format!("Delete {}", item_name(*kind)),
            RegionCommand::Modify { kind, .. } => format!("Edit {}", item_name(*kind)),
            RegionCommand::Replace { kind, new, .. } => {
                format!("Replace {} ({} items)", kind.name(), new.len())
            }
            RegionCommand::Batch { description, .. } => description.clone(),
        }
    }
}

fn item_name(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::Shapes => "shape",
        RegionKind::Selections => "selection",
    }
}

// ============================================================================
// History Stack
// ============================================================================

/// Configuration for the history stack
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

/// The undo/redo history stack.
///
/// New commands clear the redo stack. Undo moves a command to the redo stack
/// and redo moves it back.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo_stack: Vec<RegionCommand>,
    redo_stack: Vec<RegionCommand>,
    config: HistoryConfig,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record a command. This clears the redo stack.
    pub fn push(&mut self, command: RegionCommand) {
        log::debug!("History: pushed '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();

        while self.undo_stack.len() > self.config.max_history {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop a command for undoing; it moves to the redo stack.
    pub fn pop_undo(&mut self) -> Option<RegionCommand> {
        let cmd = self.undo_stack.pop()?;
        log::debug!("Undo: '{}'", cmd.description());
        self.redo_stack.push(cmd.clone());
        Some(cmd)
    }

    /// Pop a command for redoing; it moves back to the undo stack.
    pub fn pop_redo(&mut self) -> Option<RegionCommand> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("Redo: '{}'", cmd.description());
        self.undo_stack.push(cmd.clone());
        Some(cmd)
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("History cleared");
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Undo/Redo Execution
// ============================================================================

fn store_for<'a>(
    kind: RegionKind,
    shapes: &'a mut RegionStore,
    selections: &'a mut RegionStore,
) -> &'a mut RegionStore {
    match kind {
        RegionKind::Shapes => shapes,
        RegionKind::Selections => selections,
    }
}

/// Reverse the effect of a command on the stores.
pub fn apply_undo(cmd: &RegionCommand, shapes: &mut RegionStore, selections: &mut RegionStore) {
    match cmd {
        RegionCommand::Insert { kind, index, .. } => {
            // Undo insert = remove
            if let Err(e) = store_for(*kind, shapes, selections).remove(*index) {
                log::warn!("Undo insert failed: {}", e);
            }
        }
        RegionCommand::Remove { kind, index, input } => {
            // Undo remove = insert back at the same index
            if let Err(e) = store_for(*kind, shapes, selections).insert(*index, input.clone()) {
                log::warn!("Undo remove failed: {}", e);
            }
        }
        RegionCommand::Modify { kind, index, old, .. } => {
            if let Err(e) = store_for(*kind, shapes, selections).set(*index, old.clone()) {
                log::warn!("Undo modify failed: {}", e);
            }
        }
        RegionCommand::Replace { kind, old, .. } => {
            store_for(*kind, shapes, selections).replace_all(old.clone());
        }
        RegionCommand::Batch { commands, .. } => {
            // Undo batch in reverse order
            for cmd in commands.iter().rev() {
                apply_undo(cmd, shapes, selections);
            }
        }
    }
}

/// Re-apply a command on the stores.
pub fn apply_redo(cmd: &RegionCommand, shapes: &mut RegionStore, selections: &mut RegionStore) {
    match cmd {
        RegionCommand::Insert { kind, index, input } => {
            if let Err(e) = store_for(*kind, shapes, selections).insert(*index, input.clone()) {
                log::warn!("Redo insert failed: {}", e);
            }
        }
        RegionCommand::Remove { kind, index, .. } => {
            if let Err(e) = store_for(*kind, shapes, selections).remove(*index) {
                log::warn!("Redo remove failed: {}", e);
            }
        }
        RegionCommand::Modify { kind, index, new, .. } => {
            if let Err(e) = store_for(*kind, shapes, selections).set(*index, new.clone()) {
                log::warn!("Redo modify failed: {}", e);
            }
        }
        RegionCommand::Replace { kind, new, .. } => {
            store_for(*kind, shapes, selections).replace_all(new.clone());
        }
        RegionCommand::Batch { commands, .. } => {
            // Redo batch in forward order
            for cmd in commands {
                apply_redo(cmd, shapes, selections);
            }
        }
    }
}
