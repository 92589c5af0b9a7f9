//! Linear undo/redo history.
//!
//! Pure stack mechanics; never touches storage itself. The cursor points at
//! the most recent *applied* entry, or `None` when everything is undone (or
//! the history is empty). Pushing while undone entries exist truncates them —
//! there is no branching.
//!
//! The cursor moves only after a command's undo/redo succeeds, so a failing
//! command can never desynchronize it from the database.

use inkstone_store::ContentDb;
use tracing::debug;

use crate::commands::{Command, Outcome};
use crate::error::EditorError;
use crate::{now_millis, Result};

struct HistoryEntry {
    label: &'static str,
    executed_at: u64,
    command: Box<dyn Command>,
}

/// The undo/redo stack for one editing session.
#[derive(Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    /// Index of the most recent applied entry; `None` = nothing applied.
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an already-executed command as the newest entry, discarding
    /// any undone entries ahead of the cursor.
    pub fn push(&mut self, command: Box<dyn Command>) {
        let keep = self.cursor.map_or(0, |i| i + 1);
        if keep < self.entries.len() {
            debug!(discarded = self.entries.len() - keep, "truncated redo tail");
            self.entries.truncate(keep);
        }
        let label = command.label();
        self.entries.push(HistoryEntry {
            label,
            executed_at: now_millis(),
            command,
        });
        self.cursor = Some(self.entries.len() - 1);
        debug!(label, depth = self.entries.len(), "pushed history entry");
    }

    /// Invert the entry at the cursor. The cursor moves down only if the
    /// command's undo succeeded.
    pub fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let index = self.cursor.ok_or(EditorError::NothingToUndo)?;
        let outcome = self.entries[index].command.undo(db)?;
        self.cursor = index.checked_sub(1);
        debug!(label = self.entries[index].label, "undid");
        Ok(outcome)
    }

    /// Re-apply the entry just above the cursor. The cursor moves up only if
    /// the command's redo succeeded.
    pub fn redo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next >= self.entries.len() {
            return Err(EditorError::NothingToRedo);
        }
        let outcome = self.entries[next].command.redo(db)?;
        self.cursor = Some(next);
        debug!(label = self.entries[next].label, "redid");
        Ok(outcome)
    }

    /// Drop everything. Used on hydration and by history-resetting commands.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |i| i + 1) < self.entries.len()
    }

    /// Label of the entry an undo would invert.
    pub fn undo_label(&self) -> Option<&'static str> {
        self.cursor.map(|i| self.entries[i].label)
    }

    /// Label of the entry a redo would re-apply.
    pub fn redo_label(&self) -> Option<&'static str> {
        let next = self.cursor.map_or(0, |i| i + 1);
        self.entries.get(next).map(|e| e.label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unix millis at which the entry under the cursor was pushed.
    pub fn last_executed_at(&self) -> Option<u64> {
        self.cursor.map(|i| self.entries[i].executed_at)
    }
}
