use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Index of a cell in the timeline grid (0-based, dense).
pub type CellIndex = usize;

/// An inclusive span of cell indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: CellIndex,
    pub end: CellIndex,
}

impl Span {
    /// Create a new span, automatically normalizing so start <= end.
    pub fn new(a: CellIndex, b: CellIndex) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(index: CellIndex) -> Self {
        Self { start: index, end: index }
    }

    pub fn contains(&self, index: CellIndex) -> bool {
        index >= self.start && index <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn indices(&self) -> impl Iterator<Item = CellIndex> {
        self.start..=self.end
    }
}

/// Modifier keys held during a click on a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickModifiers {
    /// Ctrl/Cmd: toggle membership (or add a range together with `extend`).
    pub toggle: bool,
    /// Shift: select the span from the anchor to the clicked cell.
    pub extend: bool,
}

impl ClickModifiers {
    pub const NONE: Self = Self { toggle: false, extend: false };
    pub const TOGGLE: Self = Self { toggle: true, extend: false };
    pub const EXTEND: Self = Self { toggle: false, extend: true };
}

/// The selection model for bulk operations: a set of cell indices plus the
/// active cell (the one whose editor is open) and the anchor used by shift
/// clicks.
///
/// The set is order-irrelevant. It only lives for one editing session and is
/// never persisted alongside cell data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<CellIndex>,
    active: Option<CellIndex>,
    anchor: Option<CellIndex>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell whose single-cell editing context is open, if any.
    pub fn active(&self) -> Option<CellIndex> {
        self.active
    }

    /// Anchor cell for extending selections.
    pub fn anchor(&self) -> Option<CellIndex> {
        self.anchor
    }

    pub fn contains(&self, index: CellIndex) -> bool {
        self.indices.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = CellIndex> + '_ {
        self.indices.iter().copied()
    }

    /// Dispatch a click according to the held modifiers.
    pub fn apply_click(&mut self, index: CellIndex, modifiers: ClickModifiers) {
        match (modifiers.toggle, modifiers.extend) {
            (false, false) => self.click(index),
            (true, false) => self.toggle(index),
            (false, true) => self.extend_to(index),
            (true, true) => self.add_range_to(index),
        }
    }

    /// Plain click: selection becomes `{index}` and the cell becomes active.
    pub fn click(&mut self, index: CellIndex) {
        self.indices.clear();
        self.indices.insert(index);
        self.active = Some(index);
        self.anchor = Some(index);
    }

    /// Modifier click: toggle membership without touching the active cell.
    pub fn toggle(&mut self, index: CellIndex) {
        if !self.indices.remove(&index) {
            self.indices.insert(index);
        }
        self.anchor = Some(index);
    }

    /// Shift click: replace the selection with the span anchor..=index.
    /// Without an anchor this behaves like a plain click. The anchor stays put.
    pub fn extend_to(&mut self, index: CellIndex) {
        let Some(anchor) = self.anchor else {
            self.click(index);
            return;
        };
        self.indices = Span::new(anchor, index).indices().collect();
    }

    /// Ctrl+shift click: add the span anchor..=index to the selection.
    pub fn add_range_to(&mut self, index: CellIndex) {
        let anchor = self.anchor.unwrap_or(index);
        self.indices.extend(Span::new(anchor, index).indices());
        self.anchor.get_or_insert(index);
    }

    /// Select every index in `span`, replacing the current selection.
    pub fn select_span(&mut self, span: Span) {
        self.indices = span.indices().collect();
        self.anchor = Some(span.start);
    }

    pub fn clear(&mut self) {
        self.indices.clear();
        self.anchor = None;
    }

    /// Forget everything, including the active cell.
    pub fn reset(&mut self) {
        self.clear();
        self.active = None;
    }

    /// Drop indices at or beyond `len` (the visible range shrank).
    pub fn retain_below(&mut self, len: usize) {
        self.indices.retain(|&i| i < len);
        if self.active.is_some_and(|i| i >= len) {
            self.active = None;
        }
        if self.anchor.is_some_and(|i| i >= len) {
            self.anchor = None;
        }
    }

    /// Targets of a bulk operation: the whole selection, or the active cell
    /// when nothing is selected.
    pub fn bulk_targets(&self) -> Vec<CellIndex> {
        if self.indices.is_empty() {
            self.active.into_iter().collect()
        } else {
            self.indices.iter().copied().collect()
        }
    }

    /// Targets of an operation aimed at `index` (a drop or a context menu):
    /// the whole selection when it includes `index`, otherwise just `index`.
    pub fn targets_for(&self, index: CellIndex) -> Vec<CellIndex> {
        if self.indices.contains(&index) {
            self.indices.iter().copied().collect()
        } else {
            vec![index]
        }
    }
}
