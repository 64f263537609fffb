//! Event types emitted by the grid reducer.
//!
//! Events tell a host what changed without diffing state itself. They are
//! also what the tests and the `replay` command inspect to check ordering
//! and rejection paths.

use pipegrid_core::CellIndex;
use serde::Serialize;

use crate::context_menu::DismissReason;
use crate::timeline::TimelineConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GridEvent {
    /// A new timeline configuration was committed.
    ConfigChanged(ConfigChangedEvent),

    /// Cell records changed. Indices are ascending.
    CellsChanged(CellsChangedEvent),

    /// The whole store was swapped out (interval type or pipeline change, or
    /// a preset replace).
    StoreReplaced(StoreReplacedEvent),

    /// The range shrank below populated cells and their data was kept.
    CellsStranded(CellsStrandedEvent),

    /// A drop was refused for lack of permission. No cell changed.
    DropRejected(DropRejectedEvent),

    ClipboardChanged(ClipboardChangedEvent),

    MenuOpened(MenuOpenedEvent),

    MenuClosed(MenuClosedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChangedEvent {
    pub config: TimelineConfig,
    pub cell_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellsChangedEvent {
    pub cells: Vec<CellIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplaceReason {
    IntervalChanged,
    PipelineChanged,
    Preset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReplacedEvent {
    pub reason: ReplaceReason,
    /// Populated cells in the store that was discarded.
    pub discarded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellsStrandedEvent {
    pub cells: Vec<CellIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropRejectedEvent {
    pub target: CellIndex,
    pub field_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardChangedEvent {
    pub source_index: CellIndex,
    pub field_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuOpenedEvent {
    pub anchor_index: CellIndex,
    pub targets: Vec<CellIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuClosedEvent {
    pub reason: DismissReason,
}

/// Simple event collector for hosts and tests.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GridEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = GridEvent>) {
        self.events.extend(events);
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to only CellsChanged events.
    pub fn cells_changed(&self) -> Vec<&CellsChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::CellsChanged(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Filter to only DropRejected events.
    pub fn drop_rejected(&self) -> Vec<&DropRejectedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::DropRejected(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Filter to only StoreReplaced events.
    pub fn store_replaced(&self) -> Vec<&StoreReplacedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::StoreReplaced(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_collector_filtering() {
        let mut collector = EventCollector::new();
        collector.push(GridEvent::CellsChanged(CellsChangedEvent { cells: vec![0, 2] }));
        collector.push(GridEvent::DropRejected(DropRejectedEvent {
            target: 1,
            field_key: "co2".into(),
        }));
        collector.push(GridEvent::CellsChanged(CellsChangedEvent { cells: vec![3] }));

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.cells_changed().len(), 2);
        assert_eq!(collector.drop_rejected()[0].field_key, "co2");
        assert!(collector.store_replaced().is_empty());

        collector.clear();
        assert!(collector.is_empty());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = GridEvent::CellsStranded(CellsStrandedEvent { cells: vec![6] });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"type": "cellsStranded", "cells": [6]}));
    }
}
