// End-to-end tests for the pipegrid binary: stdout contract and exit codes.
//
// Run with: cargo test -p pipegrid-cli --test cli_tests -- --nocapture

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};

/// Binary isolated from the user's settings and log env.
fn pipegrid(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pipegrid"));
    cmd.env("PIPEGRID_SETTINGS", home.join("settings.json"))
        .env("PIPEGRID_PRESETS_DIR", home.join("presets"))
        .env_remove("PIPEGRID_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("spawn pipegrid")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout must be one JSON value")
}

fn write(dir: &Path, name: &str, value: &Value) -> String {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

// ===========================================================================
// timeline
// ===========================================================================

#[test]
fn timeline_days_text() {
    let home = tempfile::tempdir().unwrap();
    let output = run(pipegrid(home.path()).args(["timeline", "--interval", "days", "--duration", "3"]));
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "0\tday-1\tJ+1\n1\tday-2\tJ+2\n2\tday-3\tJ+3\n"
    );
}

#[test]
fn timeline_custom_phases_json() {
    let home = tempfile::tempdir().unwrap();
    let output = run(pipegrid(home.path()).args([
        "timeline", "--pipeline", "curing", "--phase", "Sechage", "--phase", "Curing", "--json",
    ]));
    let value = stdout_json(&output);
    assert_eq!(value["cellCount"], json!(2));
    assert_eq!(value["cells"][0]["label"], json!("Sechage"));
    assert_eq!(value["cells"][1]["label"], json!("Curing"));
}

#[test]
fn timeline_from_toml_with_flag_override() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("timeline.toml");
    std::fs::write(&path, "intervalType = \"dates\"\nstartDate = \"2024-03-01\"\nduration = 2\n").unwrap();

    let output = run(pipegrid(home.path()).args(["timeline", "-c", path.to_str().unwrap(), "--duration", "3"]));
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    let ids: Vec<&str> = text.lines().map(|l| l.split('\t').nth(1).unwrap()).collect();
    assert_eq!(ids, vec!["date-2024-03-01", "date-2024-03-02", "date-2024-03-03"]);
}

#[test]
fn timeline_dates_without_start_exits_10() {
    let home = tempfile::tempdir().unwrap();
    let output = run(pipegrid(home.path()).args(["timeline", "--interval", "dates", "--duration", "3"]));
    assert_eq!(output.status.code(), Some(10));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(stderr.contains("hint:"), "stderr: {stderr}");
}

#[test]
fn timeline_phase_flag_on_days_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = run(pipegrid(home.path()).args(["timeline", "--interval", "days", "--phase", "x"]));
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// replay
// ===========================================================================

fn bulk_script() -> Value {
    json!({
        "config": {"intervalType": "days", "duration": 7},
        "steps": [
            {"action": "click", "index": 0},
            {"action": "click", "index": 3, "modifiers": {"toggle": true}},
            {"action": "click", "index": 5, "modifiers": {"toggle": true}},
            {"action": "drop", "target": 3, "payload": {"key": "humidity", "defaultValue": 60}},
            {"action": "setField", "index": 42, "key": "x", "value": 1}
        ]
    })
}

#[test]
fn replay_reports_store_and_outcomes() {
    let home = tempfile::tempdir().unwrap();
    let script = write(home.path(), "script.json", &bulk_script());
    let value = stdout_json(&run(pipegrid(home.path()).args(["replay", &script])));

    assert_eq!(value["cellCount"], json!(7));
    let store = value["store"].as_object().expect("store object");
    assert_eq!(store.len(), 3, "store: {store:?}");
    assert_eq!(value["steps"][3]["outcome"], json!("applied"));
    assert_eq!(value["steps"][4]["outcome"], json!("ignored"));
    assert_eq!(value["steps"][3]["events"][0]["type"], json!("cellsChanged"));
    // Cells 0, 3 and 5 of 7; the write at 42 was ignored.
    assert_eq!(value["completion"], json!({"filled": 3, "total": 7, "percent": 43}));
}

#[test]
fn replay_strict_fails_on_rejected_step() {
    let home = tempfile::tempdir().unwrap();
    let script = write(home.path(), "script.json", &bulk_script());
    let out = home.path().join("report.json");
    let output = run(pipegrid(home.path()).args(["replay", &script, "--strict", "-o", out.to_str().unwrap()]));

    assert_eq!(output.status.code(), Some(21));
    // The report is still written.
    let report: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["steps"].as_array().unwrap().len(), 5);
}

#[test]
fn replay_catalog_gates_content() {
    let home = tempfile::tempdir().unwrap();
    let catalog = write(
        home.path(),
        "catalog.json",
        &json!({"sections": [{"id": "env", "items": [{"fieldKey": "co2", "defaultValueShape": 800, "access": "producer"}]}]}),
    );
    let script = write(
        home.path(),
        "script.json",
        &json!({
            "config": {"intervalType": "weeks", "duration": 2},
            "steps": [{"action": "drop", "target": 0, "payload": {"key": "co2", "access": "public"}}]
        }),
    );

    let value = stdout_json(&run(pipegrid(home.path()).args(["replay", &script, "--catalog", &catalog])));
    assert_eq!(value["steps"][0]["outcome"], json!("denied"));
    assert_eq!(value["steps"][0]["fieldKey"], json!("co2"));
    assert_eq!(value["store"], json!({}));
}

#[test]
fn replay_bad_step_exits_20() {
    let home = tempfile::tempdir().unwrap();
    let script = write(home.path(), "script.json", &json!({"steps": [{"action": "fly"}]}));
    let output = run(pipegrid(home.path()).args(["replay", &script]));
    assert_eq!(output.status.code(), Some(20));
    assert!(output.stdout.is_empty());
}

#[test]
fn replay_missing_file_exits_3() {
    let home = tempfile::tempdir().unwrap();
    let missing = home.path().join("nope.json");
    let output = run(pipegrid(home.path()).args(["replay", missing.to_str().unwrap()]));
    assert_eq!(output.status.code(), Some(3));
}

// ===========================================================================
// preset
// ===========================================================================

#[test]
fn preset_save_list_show_delete() {
    let home = tempfile::tempdir().unwrap();
    let script = write(home.path(), "script.json", &bulk_script());

    let saved = run(pipegrid(home.path()).args(["preset", "save", "Humid week", "--replay", &script]));
    assert!(saved.status.success(), "stderr: {}", String::from_utf8_lossy(&saved.stderr));
    let id = String::from_utf8_lossy(&saved.stdout).trim().to_string();
    assert!(!id.is_empty());

    let list = stdout_json(&run(pipegrid(home.path()).args(["preset", "list", "--json"])));
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], json!("Humid week"));
    assert_eq!(list[0]["kind"], json!("pipeline"));

    let shown = stdout_json(&run(pipegrid(home.path()).args(["preset", "show", &id])));
    assert_eq!(shown["data"]["config"]["intervalType"], json!("days"));

    let deleted = run(pipegrid(home.path()).args(["preset", "delete", &id]));
    assert!(deleted.status.success());
    let again = run(pipegrid(home.path()).args(["preset", "delete", &id]));
    assert_eq!(again.status.code(), Some(30));
}

#[test]
fn preset_save_template_data_in_namespace() {
    let home = tempfile::tempdir().unwrap();
    let data = write(
        home.path(),
        "template.json",
        &json!({"kind": "template", "fields": [{"key": "light", "value": "LED"}]}),
    );

    let saved = run(pipegrid(home.path()).args(["preset", "save", "Lights", "--data", &data, "--namespace", "curing"]));
    assert!(saved.status.success());

    let other = stdout_json(&run(pipegrid(home.path()).args(["preset", "list", "--json"])));
    assert_eq!(other, json!([]));
    let curing = stdout_json(&run(pipegrid(home.path()).args(["preset", "list", "--json", "--namespace", "curing"])));
    assert_eq!(curing[0]["kind"], json!("template"));
}

#[test]
fn preset_blank_name_exits_31() {
    let home = tempfile::tempdir().unwrap();
    let data = write(home.path(), "template.json", &json!({"kind": "template", "fields": []}));
    let output = run(pipegrid(home.path()).args(["preset", "save", "  ", "--data", &data]));
    assert_eq!(output.status.code(), Some(31));
}

#[test]
fn preset_rename_keeps_id() {
    let home = tempfile::tempdir().unwrap();
    let data = write(home.path(), "template.json", &json!({"kind": "template", "fields": []}));
    let saved = run(pipegrid(home.path()).args(["preset", "save", "Veg", "--data", &data]));
    let id = String::from_utf8_lossy(&saved.stdout).trim().to_string();

    let renamed = stdout_json(&run(pipegrid(home.path()).args([
        "preset", "rename", &id, "Flower", "--description", "tent B",
    ])));
    assert_eq!(renamed["id"], json!(id));
    assert_eq!(renamed["name"], json!("Flower"));
    assert_eq!(renamed["description"], json!("tent B"));
    assert!(renamed["updatedAt"].is_string());

    let list = stdout_json(&run(pipegrid(home.path()).args(["preset", "list", "--json"])));
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], json!("Flower"));
    assert!(list[0]["updatedAt"].is_string());

    let blank = run(pipegrid(home.path()).args(["preset", "rename", &id, " "]));
    assert_eq!(blank.status.code(), Some(31));
    let missing = run(pipegrid(home.path()).args(["preset", "rename", "nope", "X"]));
    assert_eq!(missing.status.code(), Some(30));
}
