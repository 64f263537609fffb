//! Undo/redo history of committed cell data changes.

use pipegrid_core::CellIndex;

use crate::cell::CellRecord;
use crate::store::CellStore;

pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    pub index: CellIndex,
    pub before: CellRecord,
    pub after: CellRecord,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub changes: Vec<CellChange>,
}

impl HistoryEntry {
    /// Entry describing every cell that differs between two stores.
    pub fn between(before: &CellStore, after: &CellStore) -> Self {
        let changes = before
            .diff(after)
            .into_iter()
            .map(|index| CellChange {
                index,
                before: before.record(index),
                after: after.record(index),
            })
            .collect();
        Self { changes }
    }

    pub fn indices(&self) -> Vec<CellIndex> {
        self.changes.iter().map(|c| c.index).collect()
    }

    /// Write the `before` side of every change into `store`.
    pub fn revert(&self, store: &CellStore) -> CellStore {
        self.changes
            .iter()
            .fold(store.clone(), |s, c| s.put(c.index, c.before.clone()))
    }

    /// Write the `after` side of every change into `store`.
    pub fn reapply(&self, store: &CellStore) -> CellStore {
        self.changes
            .iter()
            .fold(store.clone(), |s, c| s.put(c.index, c.after.clone()))
    }
}

#[derive(Debug)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record one cell change
    pub fn record_change(&mut self, index: CellIndex, before: CellRecord, after: CellRecord) {
        if before == after {
            return;
        }
        self.push_entry(HistoryEntry {
            changes: vec![CellChange { index, before, after }],
        });
    }

    /// Record several cell changes as a single undoable operation
    pub fn record_batch(&mut self, changes: Vec<CellChange>) {
        if changes.is_empty() {
            return;
        }
        self.push_entry(HistoryEntry { changes });
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the last entry for undo; the caller reverts it
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Pop from the redo stack; the caller reapplies it
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
