//! Sparse, persistent cell store.
//!
//! Every mutation returns a new store and leaves the receiver untouched. The
//! backing `im::OrdMap` shares structure between versions, so keeping the
//! previous store around (for history, cancellation, or comparison) costs
//! almost nothing.
//!
//! Unknown indices are never an error: they read as empty and writes create
//! them. Records that become empty are dropped from the map, which is
//! indistinguishable from an empty cell for every read.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use im::OrdMap;
use pipegrid_core::CellIndex;
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::cell::{CellRecord, FieldMap};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CellStore {
    cells: OrdMap<CellIndex, CellRecord>,
}

/// How many visible cells hold data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub filled: usize,
    pub total: usize,
    /// `filled / total` as a whole percentage, rounded half up; 0 for an
    /// empty grid.
    pub percent: u8,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: CellIndex) -> Option<&CellRecord> {
        self.cells.get(&index)
    }

    /// Owned copy of a record; empty when the cell was never written.
    pub fn record(&self, index: CellIndex) -> CellRecord {
        self.get(index).cloned().unwrap_or_default()
    }

    /// Data keys of a cell, meta keys excluded.
    pub fn data_keys(&self, index: CellIndex) -> Vec<String> {
        self.get(index)
            .map(|r| r.data_keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_data(&self, index: CellIndex) -> bool {
        self.get(index).is_some_and(CellRecord::has_data)
    }

    /// Number of non-empty records.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, &CellRecord)> {
        self.cells.iter().map(|(i, r)| (*i, r))
    }

    /// Indices holding at least one data field.
    pub fn populated(&self) -> Vec<CellIndex> {
        self.iter().filter(|(_, r)| r.has_data()).map(|(i, _)| i).collect()
    }

    /// Populated indices at or beyond `visible_len`: data the current grid
    /// cannot show.
    pub fn stranded(&self, visible_len: usize) -> Vec<CellIndex> {
        self.iter()
            .filter(|(i, r)| *i >= visible_len && r.has_data())
            .map(|(i, _)| i)
            .collect()
    }

    /// Fill rate of the first `cell_count` cells. Meta-only records and
    /// stranded data do not count.
    pub fn completion(&self, cell_count: usize) -> Completion {
        let filled = self
            .iter()
            .take_while(|(i, _)| *i < cell_count)
            .filter(|(_, r)| r.has_data())
            .count();
        let percent = if cell_count == 0 {
            0
        } else {
            ((filled * 200 + cell_count) / (2 * cell_count)) as u8
        };
        Completion {
            filled,
            total: cell_count,
            percent,
        }
    }

    /// Replace one record wholesale.
    pub fn put(&self, index: CellIndex, record: CellRecord) -> Self {
        let cells = if record.is_empty() {
            self.cells.without(&index)
        } else {
            self.cells.update(index, record)
        };
        Self { cells }
    }

    fn modify(&self, index: CellIndex, f: impl FnOnce(&mut CellRecord)) -> Self {
        let mut record = self.record(index);
        f(&mut record);
        self.put(index, record)
    }

    /// Write one field. Reserved keys become meta writes and never count as
    /// data.
    pub fn set_field(&self, index: CellIndex, key: &str, value: Value) -> Self {
        self.modify(index, |r| r.set(key, value))
    }

    /// Shallow merge of `partial` into the cell; later keys overwrite.
    pub fn merge_fields(&self, index: CellIndex, partial: &FieldMap) -> Self {
        if partial.is_empty() {
            return self.clone();
        }
        self.modify(index, |r| r.merge(partial))
    }

    /// Remove exactly the named keys. Keys the cell lacks are ignored.
    pub fn clear_fields<S: AsRef<str>>(&self, index: CellIndex, keys: &[S]) -> Self {
        if !self.cells.contains_key(&index) {
            return self.clone();
        }
        self.modify(index, |r| {
            for key in keys {
                r.remove(key.as_ref());
            }
        })
    }

    /// Remove every key of the cell, meta included.
    pub fn clear_all(&self, index: CellIndex) -> Self {
        Self {
            cells: self.cells.without(&index),
        }
    }

    /// `merge_fields` over several targets as one new store.
    pub fn merge_into(&self, targets: &[CellIndex], partial: &FieldMap) -> Self {
        targets
            .iter()
            .fold(self.clone(), |store, &i| store.merge_fields(i, partial))
    }

    /// `clear_fields` over several targets as one new store.
    pub fn clear_fields_in<S: AsRef<str>>(&self, targets: &[CellIndex], keys: &[S]) -> Self {
        targets
            .iter()
            .fold(self.clone(), |store, &i| store.clear_fields(i, keys))
    }

    /// `clear_all` over several targets as one new store.
    pub fn clear_all_in(&self, targets: &[CellIndex]) -> Self {
        targets.iter().fold(self.clone(), |store, &i| store.clear_all(i))
    }

    /// Merge every record of `other` into this store, cell by cell.
    pub fn merge_store(&self, other: &CellStore) -> Self {
        other
            .iter()
            .fold(self.clone(), |store, (i, r)| store.merge_fields(i, &r.to_fields()))
    }

    /// Drop every record at or beyond `len`.
    pub fn truncate(&self, len: usize) -> Self {
        Self {
            cells: self
                .cells
                .iter()
                .filter(|(i, _)| **i < len)
                .map(|(i, r)| (*i, r.clone()))
                .collect(),
        }
    }

    /// Indices whose record differs between `self` and `other`, ascending.
    pub fn diff(&self, other: &CellStore) -> Vec<CellIndex> {
        let keys: BTreeSet<CellIndex> = self.cells.keys().chain(other.cells.keys()).copied().collect();
        keys.into_iter()
            .filter(|i| self.get(*i) != other.get(*i))
            .collect()
    }
}

impl FromIterator<(CellIndex, CellRecord)> for CellStore {
    fn from_iter<T: IntoIterator<Item = (CellIndex, CellRecord)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(CellStore::new(), |store, (i, r)| store.put(i, r))
    }
}

// Goes through `put` so a decoded store never holds empty records.
impl<'de> Deserialize<'de> for CellStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = BTreeMap::<IndexKey, CellRecord>::deserialize(deserializer)?;
        Ok(cells.into_iter().map(|(k, r)| (k.0, r)).collect())
    }
}

/// Map key accepting `"3"` as well as `3`. Buffered input (a store nested in
/// an internally tagged enum) hands keys over as strings.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct IndexKey(CellIndex);

impl<'de> Deserialize<'de> for IndexKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = IndexKey;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a cell index")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<IndexKey, E> {
                CellIndex::try_from(v)
                    .map(IndexKey)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<IndexKey, E> {
                CellIndex::try_from(v)
                    .map(IndexKey)
                    .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<IndexKey, E> {
                v.parse()
                    .map(IndexKey)
                    .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_unknown_index_reads_empty() {
        let store = CellStore::new();
        assert!(store.get(42).is_none());
        assert!(store.record(42).is_empty());
        assert!(store.data_keys(42).is_empty());
        assert_eq!(store.clear_fields(42, &["x"]), store);
        assert_eq!(store.clear_all(42), store);
    }

    #[test]
    fn test_mutations_are_pure() {
        let before = CellStore::new().set_field(0, "temperature", json!(20));
        let after = before.set_field(0, "temperature", json!(25));

        assert_eq!(before.get(0).unwrap().get("temperature"), Some(&json!(20)));
        assert_eq!(after.get(0).unwrap().get("temperature"), Some(&json!(25)));
    }

    #[test]
    fn test_set_field_meta_is_not_data() {
        let store = CellStore::new().set_field(3, "label", json!("S4"));
        let record = store.get(3).unwrap();
        assert!(!record.has_data());
        assert_eq!(record.meta().label(), Some("S4"));
        assert!(store.populated().is_empty());
    }

    #[test]
    fn test_merge_overwrites_and_keeps_others() {
        let store = CellStore::new()
            .merge_fields(1, &fields(json!({"temperature": 20, "humidity": 55})))
            .merge_fields(1, &fields(json!({"humidity": 60, "light": "LED"})));

        let record = store.get(1).unwrap();
        assert_eq!(record.get("temperature"), Some(&json!(20)));
        assert_eq!(record.get("humidity"), Some(&json!(60)));
        assert_eq!(record.get("light"), Some(&json!("LED")));
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let store = CellStore::new()
            .merge_fields(0, &fields(json!({"nutrients": ["N", "P"]})))
            .merge_fields(0, &fields(json!({"nutrients": ["K"]})));
        assert_eq!(store.get(0).unwrap().get("nutrients"), Some(&json!(["K"])));
    }

    #[test]
    fn test_clear_fields_exact() {
        let store = CellStore::new().merge_fields(
            0,
            &fields(json!({"label": "Sechage", "temperature": 20, "humidity": 60})),
        );

        let store = store.clear_fields(0, &["temperature"]);
        assert_eq!(store.data_keys(0), vec!["humidity".to_string()]);

        let store = store.clear_fields(0, &["humidity"]);
        let record = store.get(0).unwrap();
        assert!(!record.has_data());
        assert_eq!(record.meta().label(), Some("Sechage"));
    }

    #[test]
    fn test_clear_all_removes_meta() {
        let store = CellStore::new()
            .merge_fields(0, &fields(json!({"temperature": 20, "label": "Sechage"})));
        let store = store.clear_all(0);
        assert!(store.get(0).is_none());
        assert!(store.record(0).is_empty());
    }

    #[test]
    fn test_stranded_and_truncate() {
        let store = CellStore::new()
            .set_field(1, "a", json!(1))
            .set_field(6, "b", json!(2))
            .set_field(7, "label", json!("J+8"));

        assert_eq!(store.stranded(5), vec![6]);
        let cut = store.truncate(5);
        assert_eq!(cut.len(), 1);
        assert!(cut.get(6).is_none());
        assert!(cut.get(7).is_none());
    }

    #[test]
    fn test_diff_lists_changed_indices() {
        let a = CellStore::new().set_field(0, "x", json!(1)).set_field(2, "y", json!(2));
        let b = a.set_field(2, "y", json!(3)).set_field(4, "z", json!(true)).clear_all(0);
        assert_eq!(a.diff(&b), vec![0, 2, 4]);
        assert!(a.diff(&a).is_empty());
    }

    #[test]
    fn test_serde_round_trip() {
        let store = CellStore::new()
            .merge_fields(0, &fields(json!({"label": "Curing", "temperature": 18})))
            .set_field(3, "notes", json!({"smell": "citrus"}));

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["0"]["label"], json!("Curing"));
        let back: CellStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn test_deserialize_drops_empty_records() {
        let store: CellStore = serde_json::from_value(json!({"0": {}, "1": {"x": 1}})).unwrap();
        assert!(store.get(0).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store, CellStore::new().set_field(1, "x", json!(1)));
    }

    #[test]
    fn test_deserialize_inside_tagged_enum() {
        #[derive(Deserialize)]
        #[serde(tag = "kind")]
        enum Wrapped {
            Cells { cells: CellStore },
        }

        let Wrapped::Cells { cells } =
            serde_json::from_value::<Wrapped>(json!({"kind": "Cells", "cells": {"2": {"x": 1}, "4": {}}})).unwrap();
        assert_eq!(cells, CellStore::new().set_field(2, "x", json!(1)));
        assert!(serde_json::from_value::<CellStore>(json!({"-1": {"x": 1}})).is_err());
    }

    #[test]
    fn test_completion_counts_visible_data_only() {
        let store = CellStore::new()
            .set_field(0, "temperature", json!(20))
            .set_field(1, "label", json!("J+2"))
            .set_field(2, "humidity", json!(60))
            .set_field(9, "x", json!(1));

        let c = store.completion(3);
        assert_eq!((c.filled, c.total, c.percent), (2, 3, 67));
        // Index 9 is stranded at length 7.
        assert_eq!(store.completion(7).filled, 2);
        assert_eq!(store.completion(7).percent, 29);
        assert_eq!(store.completion(10).filled, 3);
    }

    #[test]
    fn test_completion_empty_grid_is_zero() {
        let store = CellStore::new().set_field(0, "x", json!(1));
        assert_eq!(store.completion(0), Completion { filled: 0, total: 0, percent: 0 });
        assert_eq!(CellStore::new().completion(4).percent, 0);
        let half = CellStore::new().set_field(0, "x", json!(1));
        assert_eq!(half.completion(2).percent, 50);
    }
}
