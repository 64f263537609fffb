use pipegrid_core::{ClickModifiers, Point};
use pipegrid_engine::catalog::{Access, AccountTier, Catalog, ContentDescriptor, Permissions};
use pipegrid_engine::cell::FieldMap;
use pipegrid_engine::context_menu::MenuCommand;
use pipegrid_engine::editor::GridEditor;
use pipegrid_engine::events::{EventCollector, GridEvent};
use pipegrid_engine::phases::{PhaseSpec, PipelineKind};
use pipegrid_engine::preset::{ApplyMode, MemoryStore, PresetData, PresetManager};
use pipegrid_engine::state::{Action, EditorContext, Outcome, TruncationPolicy};
use pipegrid_engine::store::CellStore;
use pipegrid_engine::timeline::{index_for, label_for, TimelineConfig};
use serde_json::{json, Value};

fn context(tier: AccountTier) -> EditorContext {
    EditorContext {
        catalog: Catalog::new().with_section(
            "environment",
            "Environment",
            vec![
                ContentDescriptor::new("temperature", json!(20)),
                ContentDescriptor::new("humidity", json!(60)),
                ContentDescriptor::new("co2", json!(800)).with_access(Access::Producer),
            ],
        ),
        permissions: Permissions::new(tier),
        truncation: TruncationPolicy::Preserve,
    }
}

fn editor(config: TimelineConfig) -> GridEditor<EventCollector> {
    GridEditor::new(config, context(AccountTier::Amateur), EventCollector::new())
}

fn fields(value: Value) -> FieldMap {
    serde_json::from_value(value).unwrap()
}

fn click(index: usize, modifiers: ClickModifiers) -> Action {
    Action::Click { index, modifiers }
}

fn open_menu(index: usize) -> Action {
    Action::OpenMenu {
        index,
        anchor: Point::new(200.0, 120.0),
    }
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn custom_phases_index_and_labels() {
    let config = TimelineConfig::phases(PipelineKind::Curing)
        .with_custom_phases(vec![PhaseSpec::named("Sechage"), PhaseSpec::named("Curing")]);

    assert_eq!(index_for(&config), vec![0, 1]);
    let labels: Vec<String> = index_for(&config)
        .into_iter()
        .filter_map(|i| label_for(&config, i))
        .collect();
    assert_eq!(labels, vec!["Sechage", "Curing"]);
}

#[test]
fn temperature_drop_on_one_cell() {
    let mut editor = editor(TimelineConfig::days(7));
    let outcome = editor.dispatch(Action::Drop {
        target: 2,
        payload: json!(r#"{"fieldKey":"temperature","label":"Température","defaultValueShape":20}"#),
    });

    assert_eq!(outcome, Outcome::Applied);
    let store = &editor.state().store;
    assert_eq!(store.get(2).unwrap().to_fields(), fields(json!({"temperature": 20})));
    assert_eq!(store.len(), 1);
}

#[test]
fn humidity_bulk_over_selection() {
    let mut editor = editor(TimelineConfig::days(7));
    editor.dispatch(click(0, ClickModifiers::NONE));
    editor.dispatch(click(3, ClickModifiers::TOGGLE));
    editor.dispatch(click(5, ClickModifiers::TOGGLE));

    // Dropping onto a selected cell applies to the whole selection.
    editor.dispatch(Action::Drop {
        target: 3,
        payload: json!({"key": "humidity", "defaultValue": 60}),
    });

    let store = &editor.state().store;
    for i in [0, 3, 5] {
        assert_eq!(store.get(i).unwrap().get("humidity"), Some(&json!(60)), "cell {i}");
    }
    for i in [1, 2, 4, 6] {
        assert!(store.get(i).is_none(), "cell {i}");
    }
    assert_eq!(editor.host().cells_changed()[0].cells, vec![0, 3, 5]);
}

#[test]
fn copy_then_paste_elsewhere() {
    let mut editor = editor(TimelineConfig::days(4));
    editor.dispatch(Action::SetFields {
        index: Some(0),
        fields: fields(json!({"temperature": 22, "humidity": 55, "label": "J+1"})),
    });
    editor.dispatch(Action::SetField {
        index: 2,
        key: "notes".into(),
        value: json!("keep me"),
    });

    let source = editor.state().store.record(0);

    editor.dispatch(open_menu(0));
    editor.dispatch(Action::Menu(MenuCommand::Copy));
    editor.dispatch(open_menu(2));
    assert_eq!(editor.dispatch(Action::Menu(MenuCommand::Paste)), Outcome::Applied);

    let cell = editor.state().store.get(2).unwrap();
    assert_eq!(
        cell.to_fields(),
        fields(json!({"temperature": 22, "humidity": 55, "notes": "keep me"}))
    );
    assert_eq!(editor.state().store.record(0), source);
    assert_eq!(source.to_fields(), fields(json!({"temperature": 22, "humidity": 55, "label": "J+1"})));
}

#[test]
fn clear_all_over_menu_targets() {
    let mut editor = editor(TimelineConfig::days(4));
    editor.dispatch(Action::AssignAll {
        fields: fields(json!({"light": "LED"})),
    });
    editor.dispatch(click(1, ClickModifiers::NONE));
    editor.dispatch(click(2, ClickModifiers::EXTEND));
    editor.dispatch(open_menu(2));
    editor.dispatch(Action::Menu(MenuCommand::DeleteAll));

    let store = &editor.state().store;
    assert_eq!(store.populated(), vec![0, 3]);
    assert!(editor.state().selection.is_empty());
}

#[test]
fn menu_on_unselected_cell_targets_only_that_cell() {
    let mut editor = editor(TimelineConfig::days(4));
    editor.dispatch(Action::AssignAll {
        fields: fields(json!({"light": "LED"})),
    });
    editor.dispatch(click(0, ClickModifiers::NONE));
    editor.dispatch(click(1, ClickModifiers::TOGGLE));
    editor.dispatch(open_menu(3));
    editor.dispatch(Action::Menu(MenuCommand::DeleteAll));

    assert_eq!(editor.state().store.populated(), vec![0, 1, 2]);
}

#[test]
fn permission_denied_drop_changes_nothing() {
    let mut editor = editor(TimelineConfig::days(3));
    let before = editor.state().clone();
    let outcome = editor.dispatch(Action::Drop {
        target: 0,
        payload: json!({"type": "multi-items", "items": [{"key": "temperature"}, {"key": "co2", "access": "public"}]}),
    });

    assert_eq!(outcome, Outcome::Denied { field_key: "co2".into() });
    assert_eq!(editor.state(), &before);
    assert_eq!(editor.host().drop_rejected().len(), 1);
    assert!(!editor.can_undo());
}

#[test]
fn producer_may_drop_gated_content() {
    let mut editor = GridEditor::new(
        TimelineConfig::days(3),
        context(AccountTier::Producer),
        EventCollector::new(),
    );
    editor.dispatch(Action::Drop {
        target: 1,
        payload: json!({"key": "co2"}),
    });
    assert_eq!(editor.state().store.get(1).unwrap().get("co2"), Some(&json!(800)));
}

#[test]
fn grouped_template_drop() {
    let mut editor = editor(TimelineConfig::weeks(6));
    editor.dispatch(click(1, ClickModifiers::NONE));
    editor.dispatch(click(4, ClickModifiers::EXTEND));
    editor.dispatch(Action::Drop {
        target: 2,
        payload: json!({
            "type": "grouped",
            "group": {"name": "Flower room", "fields": [
                {"key": "light", "value": "HPS"},
                {"key": "photoperiod", "value": "12/12"},
                {"key": "notes", "value": ""}
            ]}
        }),
    });

    let store = &editor.state().store;
    assert_eq!(store.populated(), vec![1, 2, 3, 4]);
    assert_eq!(store.data_keys(3), vec!["light", "photoperiod"]);
}

#[test]
fn preset_round_trip_through_manager() {
    let mut editor = editor(TimelineConfig::days(5));
    editor.dispatch(Action::AssignRange {
        start: 1,
        end: 3,
        fields: fields(json!({"ph": 6.1})),
    });

    let mut presets = PresetManager::new(MemoryStore::new());
    let snapshot = PresetData::pipeline(&editor.state().config, &editor.state().store);
    let id = presets.save("Veg week", snapshot).unwrap();

    let mut other = self::editor(TimelineConfig::weeks(2));
    let outcome = other.dispatch(Action::ApplyPreset {
        preset: presets.load(&id).unwrap(),
        mode: ApplyMode::Replace,
    });
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(other.state().config, TimelineConfig::days(5));
    assert_eq!(other.state().store, editor.state().store);
    assert!(other
        .host()
        .events()
        .iter()
        .any(|e| matches!(e, GridEvent::StoreReplaced(_))));
}

#[test]
fn growing_duration_adds_empty_cells() {
    let mut editor = editor(TimelineConfig::days(3));
    editor.dispatch(Action::SetField {
        index: 2,
        key: "x".into(),
        value: json!(1),
    });
    editor.dispatch(Action::SetConfig {
        config: TimelineConfig::days(6),
    });
    assert_eq!(editor.state().cell_count(), 6);
    assert_eq!(editor.state().store, CellStore::new().set_field(2, "x", json!(1)));
}

#[test]
fn shrink_then_regrow_restores_stranded_data() {
    let mut editor = editor(TimelineConfig::days(10));
    editor.dispatch(Action::SetField {
        index: 8,
        key: "x".into(),
        value: json!(1),
    });

    let outcome = editor.dispatch(Action::SetConfig {
        config: TimelineConfig::days(5),
    });
    assert_eq!(outcome, Outcome::Applied);
    assert!(editor
        .host()
        .events()
        .iter()
        .any(|e| matches!(e, GridEvent::CellsStranded(s) if s.cells == vec![8])));
    assert_eq!(editor.state().store.stranded(5), vec![8]);
    assert_eq!(editor.state().completion().filled, 0);

    editor.dispatch(Action::SetConfig {
        config: TimelineConfig::days(10),
    });
    let state = editor.state();
    assert_eq!(state.cell_count(), 10);
    assert_eq!(state.store.get(8).unwrap().to_fields(), fields(json!({"x": 1})));
    assert!(state.store.stranded(10).is_empty());
    assert_eq!(state.completion().filled, 1);
}
