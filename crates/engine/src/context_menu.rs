//! Per-cell context menu: `Closed -> Open -> FieldPicker -> Closed`.
//!
//! The state machine is pure. [`step`] maps (menu, command) to the next menu
//! state plus a [`MenuEffect`] describing the store/clipboard change the
//! command asks for; the reducer applies the effect. A command that is not
//! available in the current state yields [`MenuRejection`] and no change.

use std::collections::BTreeSet;

use pipegrid_core::{place_menu, CellIndex, MenuPlacement, Point, Size};
use serde::{Deserialize, Serialize};

use crate::cell::CellRecord;
use crate::clipboard::Clipboard;
use crate::store::CellStore;

/// What the menu was opened on, captured at open time.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuContext {
    /// Pointer position of the opening right-click.
    pub anchor: Point,
    pub anchor_index: CellIndex,
    /// Cells the bulk actions apply to.
    pub targets: Vec<CellIndex>,
    /// Anchor cell record at open time.
    pub snapshot: CellRecord,
    /// Union of the targets' data keys, sorted.
    pub field_union: Vec<String>,
    /// Number of targets holding at least one data field.
    pub populated_targets: usize,
}

impl MenuContext {
    pub fn capture(anchor: Point, anchor_index: CellIndex, targets: Vec<CellIndex>, store: &CellStore) -> Self {
        let mut union = BTreeSet::new();
        let mut populated_targets = 0;
        for &target in &targets {
            let keys = store.data_keys(target);
            if !keys.is_empty() {
                populated_targets += 1;
            }
            union.extend(keys);
        }
        Self {
            anchor,
            anchor_index,
            targets,
            snapshot: store.record(anchor_index),
            field_union: union.into_iter().collect(),
            populated_targets,
        }
    }

    pub fn is_bulk(&self) -> bool {
        self.targets.len() > 1
    }

    /// Data fields of the anchor cell.
    pub fn anchor_data_count(&self) -> usize {
        self.snapshot.data_count()
    }

    /// Top-left corner of a menu of `size` opened at the anchor.
    pub fn position(&self, size: Size, viewport: Size, placement: MenuPlacement) -> Point {
        place_menu(self.anchor, size, viewport, placement)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum MenuState {
    #[default]
    Closed,
    Open(MenuContext),
    FieldPicker {
        context: MenuContext,
        checked: BTreeSet<String>,
    },
}

impl MenuState {
    pub fn open(anchor: Point, anchor_index: CellIndex, targets: Vec<CellIndex>, store: &CellStore) -> Self {
        MenuState::Open(MenuContext::capture(anchor, anchor_index, targets, store))
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, MenuState::Closed)
    }

    pub fn context(&self) -> Option<&MenuContext> {
        match self {
            MenuState::Closed => None,
            MenuState::Open(context) | MenuState::FieldPicker { context, .. } => Some(context),
        }
    }

    /// Keys checked in the field picker; empty in other states.
    pub fn checked_fields(&self) -> Vec<&str> {
        match self {
            MenuState::FieldPicker { checked, .. } => checked.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Picker rows: every candidate key with its checked flag.
    pub fn picker_fields(&self) -> Vec<(&str, bool)> {
        match self {
            MenuState::FieldPicker { context, checked } => context
                .field_union
                .iter()
                .map(|k| (k.as_str(), checked.contains(k)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Items of the open menu, for a renderer. Empty unless `Open`.
    pub fn menu_items(&self, clipboard: Option<&Clipboard>) -> Vec<MenuItem> {
        let MenuState::Open(context) = self else {
            return Vec::new();
        };
        let data = context.anchor_data_count();
        let bulk = context.is_bulk().then_some(context.targets.len());
        vec![
            MenuItem {
                kind: MenuItemKind::Copy,
                label: "Copy data",
                enabled: data > 0,
                badge: (data > 0).then_some(data),
            },
            MenuItem {
                kind: MenuItemKind::Paste,
                label: "Paste",
                enabled: clipboard.is_some_and(|c| !c.is_empty()),
                badge: bulk,
            },
            MenuItem {
                kind: MenuItemKind::DeleteFields,
                label: "Delete fields",
                enabled: !context.field_union.is_empty(),
                badge: (!context.field_union.is_empty()).then_some(context.field_union.len()),
            },
            MenuItem {
                kind: MenuItemKind::DeleteAll,
                label: "Delete all",
                enabled: context.populated_targets > 0,
                badge: bulk,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuItemKind {
    Copy,
    Paste,
    DeleteFields,
    DeleteAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub kind: MenuItemKind,
    pub label: &'static str,
    pub enabled: bool,
    pub badge: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "command")]
pub enum MenuCommand {
    Copy,
    Paste,
    DeleteAll,
    OpenFieldPicker,
    ToggleField { key: String },
    SelectAllFields,
    SelectNoFields,
    ConfirmFieldDelete,
    CancelFieldPicker,
}

/// Why the menu closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DismissReason {
    OutsideClick,
    Escape,
    Completed,
    Reopened,
}

/// Store or clipboard change requested by a menu command.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuEffect {
    /// Menu-only transition.
    None,
    Copy(Clipboard),
    Paste { targets: Vec<CellIndex>, clipboard: Clipboard },
    DeleteAll { targets: Vec<CellIndex> },
    DeleteFields { targets: Vec<CellIndex>, keys: Vec<String> },
}

impl MenuEffect {
    /// Effects that write the cell store.
    pub fn is_bulk(&self) -> bool {
        matches!(
            self,
            MenuEffect::Paste { .. } | MenuEffect::DeleteAll { .. } | MenuEffect::DeleteFields { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuRejection {
    Closed,
    WrongState,
    NoData,
    EmptyClipboard,
    UnknownField,
    NothingChecked,
}

impl std::fmt::Display for MenuRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            MenuRejection::Closed => "menu is closed",
            MenuRejection::WrongState => "command not available in this menu state",
            MenuRejection::NoData => "no data fields",
            MenuRejection::EmptyClipboard => "clipboard is empty",
            MenuRejection::UnknownField => "field not offered by the picker",
            MenuRejection::NothingChecked => "no field checked",
        };
        f.write_str(msg)
    }
}

/// Advance the menu by one command.
pub fn step(
    menu: &MenuState,
    command: &MenuCommand,
    clipboard: Option<&Clipboard>,
) -> Result<(MenuState, MenuEffect), MenuRejection> {
    match menu {
        MenuState::Closed => Err(MenuRejection::Closed),
        MenuState::Open(context) => step_open(context, command, clipboard),
        MenuState::FieldPicker { context, checked } => step_picker(context, checked, command),
    }
}

fn step_open(
    context: &MenuContext,
    command: &MenuCommand,
    clipboard: Option<&Clipboard>,
) -> Result<(MenuState, MenuEffect), MenuRejection> {
    let effect = match command {
        MenuCommand::Copy => {
            if !context.snapshot.has_data() {
                return Err(MenuRejection::NoData);
            }
            MenuEffect::Copy(Clipboard {
                source_index: context.anchor_index,
                fields: context.snapshot.data().clone(),
            })
        }
        MenuCommand::Paste => {
            let clipboard = clipboard.filter(|c| !c.is_empty()).ok_or(MenuRejection::EmptyClipboard)?;
            MenuEffect::Paste {
                targets: context.targets.clone(),
                clipboard: clipboard.clone(),
            }
        }
        MenuCommand::DeleteAll => {
            if context.populated_targets == 0 {
                return Err(MenuRejection::NoData);
            }
            MenuEffect::DeleteAll {
                targets: context.targets.clone(),
            }
        }
        MenuCommand::OpenFieldPicker => {
            if context.field_union.is_empty() {
                return Err(MenuRejection::NoData);
            }
            let picker = MenuState::FieldPicker {
                context: context.clone(),
                checked: BTreeSet::new(),
            };
            return Ok((picker, MenuEffect::None));
        }
        _ => return Err(MenuRejection::WrongState),
    };
    Ok((MenuState::Closed, effect))
}

fn step_picker(
    context: &MenuContext,
    checked: &BTreeSet<String>,
    command: &MenuCommand,
) -> Result<(MenuState, MenuEffect), MenuRejection> {
    let picker = |checked: BTreeSet<String>| MenuState::FieldPicker {
        context: context.clone(),
        checked,
    };
    match command {
        MenuCommand::ToggleField { key } => {
            if !context.field_union.contains(key) {
                return Err(MenuRejection::UnknownField);
            }
            let mut next = checked.clone();
            if !next.remove(key) {
                next.insert(key.clone());
            }
            Ok((picker(next), MenuEffect::None))
        }
        MenuCommand::SelectAllFields => {
            Ok((picker(context.field_union.iter().cloned().collect()), MenuEffect::None))
        }
        MenuCommand::SelectNoFields => Ok((picker(BTreeSet::new()), MenuEffect::None)),
        MenuCommand::ConfirmFieldDelete => {
            if checked.is_empty() {
                return Err(MenuRejection::NothingChecked);
            }
            Ok((
                MenuState::Closed,
                MenuEffect::DeleteFields {
                    targets: context.targets.clone(),
                    keys: checked.iter().cloned().collect(),
                },
            ))
        }
        MenuCommand::CancelFieldPicker => Ok((MenuState::Open(context.clone()), MenuEffect::None)),
        _ => Err(MenuRejection::WrongState),
    }
}
