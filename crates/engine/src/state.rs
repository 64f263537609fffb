//! Grid state and the reducer that advances it.
//!
//! Every user gesture is an [`Action`]. [`reduce`] is a pure function from
//! `(state, action, context)` to a [`Transition`] carrying the next state,
//! the outcome, the emitted events and the cell indices whose records
//! changed. An ignored or denied action returns the input state unchanged.

use log::{debug, info};
use pipegrid_core::{CellIndex, ClickModifiers, Point, Selection, Span};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Catalog, Permissions};
use crate::cell::FieldMap;
use crate::clipboard::Clipboard;
use crate::context_menu::{self, DismissReason, MenuCommand, MenuEffect, MenuState};
use crate::dragdrop::{plan_drop, DragPayload, DropError};
use crate::events::*;
use crate::preset::{apply_template, ApplyMode, PresetData};
use crate::store::{CellStore, Completion};
use crate::timeline::{cell_count, TimelineConfig};

/// What happens when a config change would hide populated cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Apply the change, keep the hidden data, report it.
    #[default]
    Preserve,
    /// Park the change until the host confirms or cancels it.
    Confirm,
}

/// Read-only host inputs of the reducer.
#[derive(Debug, Clone, Default)]
pub struct EditorContext {
    pub catalog: Catalog,
    pub permissions: Permissions,
    pub truncation: TruncationPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingResize {
    pub config: TimelineConfig,
    pub stranded: Vec<CellIndex>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridState {
    pub config: TimelineConfig,
    pub store: CellStore,
    pub selection: Selection,
    pub clipboard: Option<Clipboard>,
    pub menu: MenuState,
    pub pending_resize: Option<PendingResize>,
}

impl GridState {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_store(mut self, store: CellStore) -> Self {
        self.store = store;
        self
    }

    /// Number of visible cells.
    pub fn cell_count(&self) -> usize {
        cell_count(&self.config)
    }

    pub fn completion(&self) -> Completion {
        self.store.completion(self.cell_count())
    }

    fn in_range(&self, index: CellIndex) -> bool {
        index < self.cell_count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    Click {
        index: CellIndex,
        #[serde(default)]
        modifiers: ClickModifiers,
    },
    ClearSelection,
    /// Drop of transfer text (a JSON string) or an already-decoded payload.
    Drop { target: CellIndex, payload: Value },
    SetField { index: CellIndex, key: String, value: Value },
    /// Cell editor save. Applies to the selection when it contains `index`,
    /// to the bulk targets when `index` is absent.
    SetFields {
        #[serde(default)]
        index: Option<CellIndex>,
        fields: FieldMap,
    },
    AssignRange { start: CellIndex, end: CellIndex, fields: FieldMap },
    AssignAll { fields: FieldMap },
    /// Copy data fields of `source` (all, or only `keys`) onto `targets`,
    /// or onto the bulk targets when `targets` is empty.
    AssignFromSource {
        source: CellIndex,
        #[serde(default)]
        targets: Vec<CellIndex>,
        #[serde(default)]
        keys: Option<Vec<String>>,
    },
    /// Clear the bulk targets: the named keys, or every key when absent.
    BulkClear {
        #[serde(default)]
        keys: Option<Vec<String>>,
    },
    OpenMenu { index: CellIndex, anchor: Point },
    Menu(MenuCommand),
    OutsideClick,
    KeyEscape,
    SetConfig { config: TimelineConfig },
    ConfirmTruncation,
    CancelResize,
    ApplyPreset {
        preset: PresetData,
        #[serde(default)]
        mode: ApplyMode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Outcome {
    Applied,
    /// Valid action that changed nothing.
    Unchanged,
    Ignored { reason: String },
    Denied {
        #[serde(rename = "fieldKey")]
        field_key: String,
    },
    NeedsConfirmation { stranded: Vec<CellIndex> },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: GridState,
    pub outcome: Outcome,
    pub events: Vec<GridEvent>,
    /// Indices whose records differ from the input state, ascending.
    pub changed: Vec<CellIndex>,
}

impl Transition {
    fn ignored(state: &GridState, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!("action ignored: {reason}");
        Self {
            state: state.clone(),
            outcome: Outcome::Ignored { reason },
            events: Vec::new(),
            changed: Vec::new(),
        }
    }

    fn unchanged(state: GridState) -> Self {
        Self {
            state,
            outcome: Outcome::Unchanged,
            events: Vec::new(),
            changed: Vec::new(),
        }
    }
}

/// Advance `state` by one action.
pub fn reduce(state: &GridState, action: &Action, ctx: &EditorContext) -> Transition {
    match action {
        Action::Click { index, modifiers } => click(state, *index, *modifiers),
        Action::ClearSelection => {
            let mut step = Step::new(state);
            step.state.selection.reset();
            step.finish()
        }
        Action::Drop { target, payload } => drop_payload(state, *target, payload, ctx),
        Action::SetField { index, key, value } => {
            if !state.in_range(*index) {
                return out_of_range(state, *index);
            }
            if key.trim().is_empty() {
                return Transition::ignored(state, "blank field key");
            }
            let store = state.store.set_field(*index, key, value.clone());
            Step::new(state).commit_store(store).finish()
        }
        Action::SetFields { index, fields } => {
            let targets = match index {
                Some(i) if !state.in_range(*i) => return out_of_range(state, *i),
                Some(i) => state.selection.targets_for(*i),
                None => state.selection.bulk_targets(),
            };
            assign(state, &targets, fields)
        }
        Action::AssignRange { start, end, fields } => {
            let span = Span::new(*start, *end);
            if !state.in_range(span.end) {
                return out_of_range(state, span.end);
            }
            assign(state, &span.indices().collect::<Vec<_>>(), fields)
        }
        Action::AssignAll { fields } => {
            let targets: Vec<CellIndex> = (0..state.cell_count()).collect();
            assign(state, &targets, fields)
        }
        Action::AssignFromSource { source, targets, keys } => {
            assign_from_source(state, *source, targets, keys.as_deref())
        }
        Action::BulkClear { keys } => {
            let targets = state.selection.bulk_targets();
            if targets.is_empty() {
                return Transition::ignored(state, "no targets");
            }
            let store = match keys {
                Some(keys) => state.store.clear_fields_in(&targets, keys),
                None => state.store.clear_all_in(&targets),
            };
            Step::new(state).commit_store(store).finish()
        }
        Action::OpenMenu { index, anchor } => open_menu(state, *index, *anchor),
        Action::Menu(command) => menu_command(state, command),
        Action::OutsideClick => dismiss_menu(state, DismissReason::OutsideClick),
        Action::KeyEscape => dismiss_menu(state, DismissReason::Escape),
        Action::SetConfig { config } => set_config(state, config, ctx.truncation),
        Action::ConfirmTruncation => {
            let Some(pending) = &state.pending_resize else {
                return Transition::ignored(state, "no pending resize");
            };
            let store = state.store.truncate(cell_count(&pending.config));
            let mut step = Step::new(state);
            step.state.pending_resize = None;
            step.apply_config(pending.config.clone())
                .commit_store(store)
                .finish()
        }
        Action::CancelResize => {
            if state.pending_resize.is_none() {
                return Transition::ignored(state, "no pending resize");
            }
            let mut next = state.clone();
            next.pending_resize = None;
            Transition::unchanged(next)
        }
        Action::ApplyPreset { preset, mode } => apply_preset(state, preset, *mode),
    }
}

/// Accumulates the pieces of a transition that does apply.
struct Step {
    base: GridState,
    state: GridState,
    events: Vec<GridEvent>,
}

impl Step {
    fn new(state: &GridState) -> Self {
        Self {
            base: state.clone(),
            state: state.clone(),
            events: Vec::new(),
        }
    }

    fn close_menu(mut self, reason: DismissReason) -> Self {
        if self.state.menu.is_open() {
            self.state.menu = MenuState::Closed;
            self.events.push(GridEvent::MenuClosed(MenuClosedEvent { reason }));
        }
        self
    }

    /// Swap in `store`, emitting `CellsChanged` for the records that differ.
    /// Data mutations dismiss an open menu so its snapshot never goes stale.
    fn commit_store(mut self, store: CellStore) -> Self {
        let cells = self.state.store.diff(&store);
        self.state.store = store;
        if !cells.is_empty() {
            self = self.close_menu(DismissReason::OutsideClick);
            self.events.push(GridEvent::CellsChanged(CellsChangedEvent { cells }));
        }
        self
    }

    fn apply_config(mut self, config: TimelineConfig) -> Self {
        let len = cell_count(&config);
        self.state.selection.retain_below(len);
        self = self.close_menu(DismissReason::OutsideClick);
        self.events.push(GridEvent::ConfigChanged(ConfigChangedEvent {
            config: config.clone(),
            cell_count: len,
        }));
        self.state.config = config;
        self
    }

    fn replace_store(mut self, store: CellStore, reason: ReplaceReason) -> Self {
        let discarded = self.state.store.populated().len();
        info!("cell store replaced ({reason:?}), {discarded} populated cells discarded");
        self.state.selection.reset();
        self = self.close_menu(DismissReason::OutsideClick);
        self.state.pending_resize = None;
        self.events.push(GridEvent::StoreReplaced(StoreReplacedEvent { reason, discarded }));
        self.state.store = store;
        self
    }

    fn event(mut self, event: GridEvent) -> Self {
        self.events.push(event);
        self
    }

    fn finish(self) -> Transition {
        let changed = self.base.store.diff(&self.state.store);
        let outcome = if self.state == self.base && self.events.is_empty() {
            Outcome::Unchanged
        } else {
            Outcome::Applied
        };
        Transition {
            state: self.state,
            outcome,
            events: self.events,
            changed,
        }
    }
}

fn out_of_range(state: &GridState, index: CellIndex) -> Transition {
    Transition::ignored(state, format!("cell {index} is outside the grid"))
}

fn click(state: &GridState, index: CellIndex, modifiers: ClickModifiers) -> Transition {
    if !state.in_range(index) {
        return out_of_range(state, index);
    }
    let mut step = Step::new(state);
    step.state.selection.apply_click(index, modifiers);
    step.close_menu(DismissReason::OutsideClick).finish()
}

fn assign(state: &GridState, targets: &[CellIndex], fields: &FieldMap) -> Transition {
    if fields.is_empty() {
        return Transition::ignored(state, "no fields to assign");
    }
    if targets.is_empty() {
        return Transition::ignored(state, "no targets");
    }
    if let Some(&bad) = targets.iter().find(|&&i| !state.in_range(i)) {
        return out_of_range(state, bad);
    }
    let store = state.store.merge_into(targets, fields);
    Step::new(state).commit_store(store).finish()
}

fn assign_from_source(
    state: &GridState,
    source: CellIndex,
    targets: &[CellIndex],
    keys: Option<&[String]>,
) -> Transition {
    if !state.in_range(source) {
        return out_of_range(state, source);
    }
    let Some(record) = state.store.get(source) else {
        return Transition::ignored(state, "source cell is empty");
    };
    let fields: FieldMap = record
        .data()
        .iter()
        .filter(|(k, _)| keys.map_or(true, |keys| keys.iter().any(|key| key == *k)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let targets: Vec<CellIndex> = if targets.is_empty() {
        state
            .selection
            .bulk_targets()
            .into_iter()
            .filter(|&i| i != source)
            .collect()
    } else {
        targets.to_vec()
    };
    assign(state, &targets, &fields)
}

fn drop_payload(state: &GridState, target: CellIndex, payload: &Value, ctx: &EditorContext) -> Transition {
    if !state.in_range(target) {
        return out_of_range(state, target);
    }
    let Some(payload) = DragPayload::from_value(payload) else {
        return Transition::ignored(state, "malformed drag payload");
    };
    match plan_drop(&payload, target, &state.selection, &ctx.catalog, &ctx.permissions) {
        Ok(plan) => {
            let store = state.store.merge_into(&plan.targets, &plan.fields);
            Step::new(state).commit_store(store).finish()
        }
        Err(DropError::Empty) => Transition::ignored(state, "drag payload carries no fields"),
        Err(DropError::Denied { field_key }) => {
            debug!("drop on cell {target} refused: '{field_key}' needs a higher account tier");
            Transition {
                state: state.clone(),
                outcome: Outcome::Denied {
                    field_key: field_key.clone(),
                },
                events: vec![GridEvent::DropRejected(DropRejectedEvent { target, field_key })],
                changed: Vec::new(),
            }
        }
    }
}

fn open_menu(state: &GridState, index: CellIndex, anchor: Point) -> Transition {
    if !state.in_range(index) {
        return out_of_range(state, index);
    }
    let targets = state.selection.targets_for(index);
    let step = Step::new(state).close_menu(DismissReason::Reopened);
    let mut step = step.event(GridEvent::MenuOpened(MenuOpenedEvent {
        anchor_index: index,
        targets: targets.clone(),
    }));
    step.state.menu = MenuState::open(anchor, index, targets, &state.store);
    step.finish()
}

fn menu_command(state: &GridState, command: &MenuCommand) -> Transition {
    let (menu, effect) = match context_menu::step(&state.menu, command, state.clipboard.as_ref()) {
        Ok(next) => next,
        Err(rejection) => return Transition::ignored(state, rejection.to_string()),
    };
    let bulk = effect.is_bulk();
    let mut step = Step::new(state);
    step.state.menu = menu;
    match effect {
        MenuEffect::None => {}
        MenuEffect::Copy(clipboard) => {
            step = step.event(GridEvent::ClipboardChanged(ClipboardChangedEvent {
                source_index: clipboard.source_index,
                field_count: clipboard.len(),
            }));
            step.state.clipboard = Some(clipboard);
        }
        MenuEffect::Paste { targets, clipboard } => {
            let store = clipboard.paste_into(&step.state.store, &targets);
            step = step.commit_store(store);
        }
        MenuEffect::DeleteAll { targets } => {
            let store = step.state.store.clear_all_in(&targets);
            step = step.commit_store(store);
        }
        MenuEffect::DeleteFields { targets, keys } => {
            let store = step.state.store.clear_fields_in(&targets, &keys);
            step = step.commit_store(store);
        }
    }
    if bulk {
        step.state.selection.clear();
    }
    if state.menu.is_open() && !step.state.menu.is_open() {
        step = step.event(GridEvent::MenuClosed(MenuClosedEvent {
            reason: DismissReason::Completed,
        }));
    }
    step.finish()
}

fn dismiss_menu(state: &GridState, reason: DismissReason) -> Transition {
    if !state.menu.is_open() {
        return Transition::unchanged(state.clone());
    }
    Step::new(state).close_menu(reason).finish()
}

fn set_config(state: &GridState, config: &TimelineConfig, policy: TruncationPolicy) -> Transition {
    if *config == state.config {
        return Transition::unchanged(state.clone());
    }
    if let Err(e) = config.validate() {
        return Transition::ignored(state, e.to_string());
    }

    if !config.same_semantics(&state.config) {
        let reason = if config.interval_type != state.config.interval_type {
            ReplaceReason::IntervalChanged
        } else {
            ReplaceReason::PipelineChanged
        };
        return Step::new(state)
            .replace_store(CellStore::new(), reason)
            .apply_config(config.clone())
            .finish();
    }

    let stranded = state.store.stranded(cell_count(config));
    if stranded.is_empty() {
        let mut step = Step::new(state);
        step.state.pending_resize = None;
        return step.apply_config(config.clone()).finish();
    }

    match policy {
        TruncationPolicy::Preserve => {
            let mut step = Step::new(state);
            step.state.pending_resize = None;
            step.apply_config(config.clone())
                .event(GridEvent::CellsStranded(CellsStrandedEvent { cells: stranded }))
                .finish()
        }
        TruncationPolicy::Confirm => {
            let mut next = state.clone();
            next.pending_resize = Some(PendingResize {
                config: config.clone(),
                stranded: stranded.clone(),
            });
            Transition {
                state: next,
                outcome: Outcome::NeedsConfirmation { stranded },
                events: Vec::new(),
                changed: Vec::new(),
            }
        }
    }
}

fn apply_preset(state: &GridState, preset: &PresetData, mode: ApplyMode) -> Transition {
    match (preset, mode) {
        (PresetData::Pipeline { config, cells }, ApplyMode::Replace) => {
            if let Err(e) = config.validate() {
                return Transition::ignored(state, e.to_string());
            }
            let mut step = Step::new(state).replace_store(cells.clone(), ReplaceReason::Preset);
            if *config != state.config {
                step = step.apply_config(config.clone());
            }
            step.finish()
        }
        (PresetData::Pipeline { config, cells }, ApplyMode::Merge) => {
            if !config.same_semantics(&state.config) {
                return Transition::ignored(state, "preset timeline is incompatible with the grid");
            }
            let store = state.store.merge_store(&cells.truncate(state.cell_count()));
            Step::new(state).commit_store(store).finish()
        }
        (PresetData::Template { .. }, _) => {
            let fields = preset.template_fields().unwrap_or_default();
            if fields.is_empty() {
                return Transition::ignored(state, "empty template");
            }
            let targets = state.selection.bulk_targets();
            if targets.is_empty() {
                return Transition::ignored(state, "no targets");
            }
            let store = apply_template(&state.store, &targets, &fields, mode);
            Step::new(state).commit_store(store).finish()
        }
    }
}
