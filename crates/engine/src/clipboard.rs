use pipegrid_core::CellIndex;
use serde::{Deserialize, Serialize};

use crate::cell::FieldMap;
use crate::store::CellStore;

/// Snapshot of one cell's data fields, taken by the context menu's copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clipboard {
    pub source_index: CellIndex,
    pub fields: FieldMap,
}

impl Clipboard {
    /// Capture the data fields of `index`. `None` when the cell has none;
    /// meta fields never travel.
    pub fn capture(store: &CellStore, index: CellIndex) -> Option<Self> {
        let record = store.get(index).filter(|r| r.has_data())?;
        Some(Self {
            source_index: index,
            fields: record.data().clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge the snapshot into every target. Keys the snapshot lacks are left
    /// alone.
    pub fn paste_into(&self, store: &CellStore, targets: &[CellIndex]) -> CellStore {
        store.merge_into(targets, &self.fields)
    }
}
