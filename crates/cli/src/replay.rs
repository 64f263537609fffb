//! Action replay: run a JSON script of grid actions headlessly.
//!
//! Usage: pipegrid replay script.json [--catalog catalog.json] [--strict]
//!
//! ## Script format
//!
//! ```json
//! {
//!   "config": { "intervalType": "days", "duration": 7 },
//!   "tier": "producer",
//!   "truncation": "confirm",
//!   "catalog": { "sections": [] },
//!   "steps": [
//!     { "action": "click", "index": 0 },
//!     { "action": "drop", "target": 0, "payload": { "key": "humidity", "defaultValue": 60 } },
//!     { "history": "undo" }
//!   ]
//! }
//! ```
//!
//! Every field but `steps` is optional. `tier` and `truncation` override the
//! settings file; `--catalog` overrides the script's catalog.

use std::io::Read;
use std::path::Path;

use log::{debug, info};
use pipegrid_config::Settings;
use pipegrid_core::CellIndex;
use pipegrid_engine::catalog::{AccountTier, Catalog};
use pipegrid_engine::editor::GridEditor;
use pipegrid_engine::events::{EventCollector, GridEvent};
use pipegrid_engine::state::{Action, Outcome, TruncationPolicy};
use pipegrid_engine::store::{CellStore, Completion};
use pipegrid_engine::timeline::{cell_count, TimelineConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exit_codes::EXIT_REPLAY_BAD_STEP;
use crate::CliError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default)]
    pub config: TimelineConfig,
    #[serde(default)]
    pub catalog: Option<Catalog>,
    #[serde(default)]
    pub tier: Option<AccountTier>,
    #[serde(default)]
    pub truncation: Option<TruncationPolicy>,
    #[serde(default)]
    pub steps: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOp {
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Action(Action),
    History(HistoryOp),
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepOutcome {
    Action(Outcome),
    History { history: HistoryOp, applied: bool },
}

impl StepOutcome {
    /// Ignored, denied and pending-confirmation steps. A history step with
    /// nothing to undo or redo is not a rejection.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            StepOutcome::Action(
                Outcome::Ignored { .. } | Outcome::Denied { .. } | Outcome::NeedsConfirmation { .. }
            )
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: usize,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<GridEvent>,
}

/// Final state of a replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub config: TimelineConfig,
    pub cell_count: usize,
    pub steps: Vec<StepRecord>,
    pub selection: Vec<CellIndex>,
    pub completion: Completion,
    pub store: CellStore,
}

impl ReplayReport {
    pub fn rejected(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_rejected()).count()
    }
}

/// Read a script from `path`, or from stdin when `path` is `-`.
pub fn load_script(path: &Path) -> Result<Script, CliError> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {e}", path.display())))?
    };
    serde_json::from_str(&text).map_err(|e| CliError::parse(format!("{}: {e}", path.display())))
}

/// Decode one script step. `{"history": ...}` objects are history commands,
/// everything else must be an action.
pub fn parse_step(index: usize, value: &Value) -> Result<Step, CliError> {
    let decoded = match value.get("history") {
        Some(op) => serde_json::from_value(op.clone()).map(Step::History),
        None => serde_json::from_value(value.clone()).map(Step::Action),
    };
    decoded.map_err(|e| CliError {
        code: EXIT_REPLAY_BAD_STEP,
        message: format!("step {index}: {e}"),
        hint: Some("steps are {\"action\": ...} objects or {\"history\": \"undo\" | \"redo\"}".into()),
    })
}

/// Run `script` on a fresh grid. Steps are decoded up front so a malformed
/// step fails the run before anything is applied.
pub fn run(script: Script, settings: &Settings, catalog: Option<Catalog>) -> Result<ReplayReport, CliError> {
    script.config.validate().map_err(CliError::timeline)?;
    let steps = script
        .steps
        .iter()
        .enumerate()
        .map(|(i, v)| parse_step(i, v))
        .collect::<Result<Vec<_>, _>>()?;

    let mut context = settings.editor_context(catalog.or(script.catalog).unwrap_or_default());
    if let Some(tier) = script.tier {
        context.permissions.tier = tier;
    }
    if let Some(truncation) = script.truncation {
        context.truncation = truncation;
    }

    let mut editor = GridEditor::new(script.config, context, EventCollector::new())
        .with_history_capacity(settings.history_max_entries);
    info!("replaying {} steps", steps.len());

    let mut records = Vec::with_capacity(steps.len());
    for (i, step) in steps.into_iter().enumerate() {
        let seen = editor.host().len();
        let outcome = match step {
            Step::Action(action) => StepOutcome::Action(editor.dispatch(action)),
            Step::History(op) => {
                let applied = match op {
                    HistoryOp::Undo => editor.undo(),
                    HistoryOp::Redo => editor.redo(),
                };
                StepOutcome::History { history: op, applied }
            }
        };
        debug!("step {i}: {outcome:?}");
        records.push(StepRecord {
            step: i,
            outcome,
            events: editor.host().events()[seen..].to_vec(),
        });
    }

    let state = editor.state();
    Ok(ReplayReport {
        config: state.config.clone(),
        cell_count: cell_count(&state.config),
        steps: records,
        selection: state.selection.indices().collect(),
        completion: state.completion(),
        store: state.store.clone(),
    })
}
