//! Stateful editor around the reducer: owns the state, records undo history,
//! and reports committed changes to a host.

use log::debug;
use pipegrid_core::CellIndex;

use crate::events::{CellsChangedEvent, EventCollector, GridEvent, MenuClosedEvent};
use crate::context_menu::{DismissReason, MenuState};
use crate::history::{History, HistoryEntry};
use crate::state::{reduce, Action, EditorContext, GridState, Outcome};
use crate::store::CellStore;
use crate::timeline::TimelineConfig;

/// Receiver of committed changes.
pub trait GridHost {
    fn on_config_change(&mut self, config: &TimelineConfig);

    /// `changed` lists the indices whose records differ, ascending.
    fn on_data_change(&mut self, store: &CellStore, changed: &[CellIndex]);

    fn on_event(&mut self, _event: &GridEvent) {}
}

impl GridHost for EventCollector {
    fn on_config_change(&mut self, _config: &TimelineConfig) {}

    fn on_data_change(&mut self, _store: &CellStore, _changed: &[CellIndex]) {}

    fn on_event(&mut self, event: &GridEvent) {
        self.push(event.clone());
    }
}

pub struct GridEditor<H: GridHost> {
    state: GridState,
    context: EditorContext,
    history: History,
    host: H,
}

impl<H: GridHost> GridEditor<H> {
    pub fn new(config: TimelineConfig, context: EditorContext, host: H) -> Self {
        Self::from_state(GridState::new(config), context, host)
    }

    pub fn from_state(state: GridState, context: EditorContext, host: H) -> Self {
        Self {
            state,
            context,
            history: History::new(),
            host,
        }
    }

    pub fn with_history_capacity(mut self, max_entries: usize) -> Self {
        self.history = History::with_capacity(max_entries);
        self
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EditorContext {
        &mut self.context
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run one action, commit its state, and notify the host.
    pub fn dispatch(&mut self, action: Action) -> Outcome {
        let transition = reduce(&self.state, &action, &self.context);
        let previous = std::mem::replace(&mut self.state, transition.state);

        let config_changed = previous.config != self.state.config;
        if config_changed {
            self.history.clear();
        } else if !transition.changed.is_empty() {
            self.history
                .record_batch(HistoryEntry::between(&previous.store, &self.state.store).changes);
        }

        if config_changed {
            self.host.on_config_change(&self.state.config);
        }
        if !transition.changed.is_empty() {
            self.host.on_data_change(&self.state.store, &transition.changed);
        }
        for event in &transition.events {
            self.host.on_event(event);
        }
        transition.outcome
    }

    /// Revert the last recorded change. Returns false when there is none.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };
        debug!("undo over {} cells", entry.changes.len());
        let store = entry.revert(&self.state.store);
        self.replay(store, entry.indices());
        true
    }

    /// Reapply the last undone change. Returns false when there is none.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };
        debug!("redo over {} cells", entry.changes.len());
        let store = entry.reapply(&self.state.store);
        self.replay(store, entry.indices());
        true
    }

    fn replay(&mut self, store: CellStore, cells: Vec<CellIndex>) {
        self.state.store = store;
        if self.state.menu.is_open() {
            self.state.menu = MenuState::Closed;
            self.host.on_event(&GridEvent::MenuClosed(MenuClosedEvent {
                reason: DismissReason::OutsideClick,
            }));
        }
        self.host.on_data_change(&self.state.store, &cells);
        self.host
            .on_event(&GridEvent::CellsChanged(CellsChangedEvent { cells }));
    }
}
