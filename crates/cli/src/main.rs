// pipegrid CLI - headless timeline grid operations

mod exit_codes;
mod replay;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use pipegrid_config::{FileStore, Settings};
use pipegrid_engine::catalog::Catalog;
use pipegrid_engine::error::{PresetError, TimelineError};
use pipegrid_engine::phases::{PhaseSpec, PipelineKind};
use pipegrid_engine::preset::{PresetData, PresetManager};
use pipegrid_engine::timeline::{index_for, label_for, slot_id, IntervalType, TimelineConfig};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use exit_codes::{
    preset_exit_code, timeline_exit_code, EXIT_ERROR, EXIT_IO, EXIT_PARSE, EXIT_PRESET_NOT_FOUND,
    EXIT_REPLAY_REJECTED, EXIT_SUCCESS, EXIT_USAGE,
};

/// Env var holding an `EnvFilter` directive; overrides `-v`.
const LOG_ENV: &str = "PIPEGRID_LOG";

#[derive(Parser)]
#[command(name = "pipegrid")]
#[command(about = "Timeline grid editor for cultivation pipelines (CLI mode, headless)")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (default: <config dir>/pipegrid/settings.json)
    #[arg(long, global = true, env = "PIPEGRID_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cells of a timeline: index, slot id and label
    #[command(after_help = "\
Examples:
  pipegrid timeline --interval days --duration 7
  pipegrid timeline --interval dates --start 2024-03-01 --end 2024-03-10 --json
  pipegrid timeline --phase Sechage --phase Curing
  pipegrid timeline --config timeline.toml")]
    Timeline {
        /// TOML file with the timeline configuration; flags override its fields
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Interval type: phases, seconds, hours, days, weeks, months, dates
        #[arg(long, value_parser = parse_interval)]
        interval: Option<IntervalType>,

        /// Number of cells
        #[arg(long, short = 'd')]
        duration: Option<u32>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Inclusive end date for a dates timeline (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Pipeline whose default phases apply
        #[arg(long, value_parser = parse_pipeline)]
        pipeline: Option<PipelineKind>,

        /// Custom phase name, repeatable; replaces the default phases
        #[arg(long = "phase")]
        phases: Vec<String>,

        /// Output JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },

    /// Run a JSON action script on a fresh grid and print the result
    #[command(after_help = "\
Examples:
  pipegrid replay script.json
  pipegrid replay script.json --catalog catalog.json --strict
  cat script.json | pipegrid replay - -o result.json")]
    Replay {
        /// Script file, or - for stdin
        script: PathBuf,

        /// Content catalog JSON; overrides the script's catalog
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit non-zero when any step was ignored, denied or left pending
        #[arg(long)]
        strict: bool,
    },

    /// Manage saved presets
    Preset {
        /// Preset store directory (default: settings presets.directory, else the config dir)
        #[arg(long, global = true, env = "PIPEGRID_PRESETS_DIR")]
        dir: Option<PathBuf>,

        /// Preset namespace
        #[arg(long, global = true, default_value = "default")]
        namespace: String,

        #[command(subcommand)]
        command: PresetCommands,
    },
}

#[derive(Subcommand)]
enum PresetCommands {
    /// List presets, oldest first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Print one preset as JSON
    Show { id: String },

    /// Save a preset and print its id
    #[command(after_help = "\
Examples:
  pipegrid preset save \"Veg week\" --data template.json
  pipegrid preset save \"Curing run\" --replay script.json --description \"two jars\"")]
    Save {
        name: String,

        /// Preset data JSON ({\"kind\": \"pipeline\" | \"template\", ...})
        #[arg(long, conflicts_with = "replay", required_unless_present = "replay")]
        data: Option<PathBuf>,

        /// Snapshot the grid a replay script leaves behind
        #[arg(long)]
        replay: Option<PathBuf>,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Rename a preset, keeping its id, and print it as JSON
    #[command(after_help = "\
Examples:
  pipegrid preset rename 3f2c... \"Flower week\"
  pipegrid preset rename 3f2c... \"Flower week\" --description \"tent B\"")]
    Rename {
        id: String,

        name: String,

        /// Replace the description too
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a preset
    Delete { id: String },
}

fn parse_interval(s: &str) -> Result<IntervalType, String> {
    IntervalType::parse(s).ok_or_else(|| {
        let names: Vec<&str> = IntervalType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown interval '{s}' (expected one of: {})", names.join(", "))
    })
}

fn parse_pipeline(s: &str) -> Result<PipelineKind, String> {
    PipelineKind::parse(s).ok_or_else(|| {
        let names: Vec<&str> = PipelineKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown pipeline '{s}' (expected one of: {})", names.join(", "))
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: pipegrid <command> [options]");
            eprintln!("       pipegrid --help for more information");
            Ok(())
        }
        Some(Commands::Timeline {
            config,
            interval,
            duration,
            start,
            end,
            pipeline,
            phases,
            json,
        }) => cmd_timeline(config, interval, duration, start, end, pipeline, phases, json),
        Some(Commands::Replay {
            script,
            catalog,
            output,
            strict,
        }) => cmd_replay(&settings, script, catalog, output, strict),
        Some(Commands::Preset { dir, namespace, command }) => {
            let root = dir.unwrap_or_else(|| settings.presets_dir());
            let presets = PresetManager::with_namespace(FileStore::new(root), namespace);
            match command {
                PresetCommands::List { json } => cmd_preset_list(&presets, json),
                PresetCommands::Show { id } => cmd_preset_show(&presets, &id),
                PresetCommands::Save {
                    name,
                    data,
                    replay,
                    description,
                } => cmd_preset_save(&settings, presets, &name, data, replay, &description),
                PresetCommands::Rename { id, name, description } => {
                    cmd_preset_rename(presets, &id, &name, description.as_deref())
                }
                PresetCommands::Delete { id } => cmd_preset_delete(presets, &id),
            }
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Log to stderr so stdout stays machine-readable. `log` records from the
/// library crates arrive through the subscriber's log bridge.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a rejected timeline configuration.
    pub fn timeline(err: TimelineError) -> Self {
        let hint = match &err {
            TimelineError::MissingStartDate => Some("pass --start YYYY-MM-DD".to_string()),
            TimelineError::DurationTooLong { .. } => {
                Some("use a coarser interval for long timelines".to_string())
            }
            TimelineError::EndBeforeStart { .. } => None,
        };
        Self { code: timeline_exit_code(&err), message: err.to_string(), hint }
    }

    /// Create error from preset store error with proper exit code.
    pub fn preset(err: PresetError) -> Self {
        let code = preset_exit_code(&err);
        let hint = match code {
            EXIT_PRESET_NOT_FOUND => Some("run `pipegrid preset list` to see saved ids".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {e}", path.display())))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::other(format!("cannot encode JSON: {e}")))
}

// ============================================================================
// timeline
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimelineOutput {
    config: TimelineConfig,
    cell_count: usize,
    cells: Vec<TimelineCell>,
}

#[derive(Serialize)]
struct TimelineCell {
    index: usize,
    id: String,
    label: String,
}

#[allow(clippy::too_many_arguments)]
fn cmd_timeline(
    config_path: Option<PathBuf>,
    interval: Option<IntervalType>,
    duration: Option<u32>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    pipeline: Option<PipelineKind>,
    phases: Vec<String>,
    json: bool,
) -> Result<(), CliError> {
    let mut config = match &config_path {
        Some(path) => toml::from_str::<TimelineConfig>(&read_file(path)?)
            .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))?,
        None => TimelineConfig::default(),
    };
    if let Some(interval) = interval {
        config.interval_type = interval;
    }
    if let Some(duration) = duration {
        config.duration = duration;
    }
    if let Some(start) = start {
        config = config.with_start(start);
    }
    if let Some(end) = end {
        config = config.with_end(end);
    }
    if let Some(pipeline) = pipeline {
        config = config.with_pipeline(pipeline);
    }
    if !phases.is_empty() {
        if config.interval_type != IntervalType::Phases {
            return Err(CliError::args(format!(
                "--phase only applies to a phases timeline, not {}",
                config.interval_type
            ))
            .with_hint("add --interval phases"));
        }
        config = config.with_custom_phases(phases.into_iter().map(PhaseSpec::named).collect());
    }
    config.validate().map_err(CliError::timeline)?;

    let cells: Vec<TimelineCell> = index_for(&config)
        .into_iter()
        .map(|index| TimelineCell {
            index,
            id: slot_id(&config, index).unwrap_or_default(),
            label: label_for(&config, index).unwrap_or_default(),
        })
        .collect();

    if json {
        let output = TimelineOutput {
            cell_count: cells.len(),
            config,
            cells,
        };
        println!("{}", to_json(&output)?);
    } else {
        for cell in &cells {
            println!("{}\t{}\t{}", cell.index, cell.id, cell.label);
        }
    }
    Ok(())
}

// ============================================================================
// replay
// ============================================================================

fn load_catalog(path: &Path) -> Result<Catalog, CliError> {
    Catalog::from_json(&read_file(path)?).map_err(|e| CliError::parse(format!("{}: {e}", path.display())))
}

fn cmd_replay(
    settings: &Settings,
    script_path: PathBuf,
    catalog_path: Option<PathBuf>,
    output: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let script = replay::load_script(&script_path)?;
    let catalog = catalog_path.as_deref().map(load_catalog).transpose()?;
    let report = replay::run(script, settings, catalog)?;

    let json = to_json(&report)?;
    match &output {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .map_err(|e| CliError::io(format!("{}: {e}", path.display())))?,
        None => println!("{json}"),
    }

    let rejected = report.rejected();
    if strict && rejected > 0 {
        return Err(CliError {
            code: EXIT_REPLAY_REJECTED,
            message: format!("{rejected} of {} steps were not applied", report.steps.len()),
            hint: Some("see the \"outcome\" of each step in the report".to_string()),
        });
    }
    Ok(())
}

// ============================================================================
// preset
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetSummary<'a> {
    id: &'a str,
    name: &'a str,
    kind: &'static str,
    description: &'a str,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

fn cmd_preset_list(presets: &PresetManager<FileStore>, json: bool) -> Result<(), CliError> {
    let list = presets.list().map_err(CliError::preset)?;
    if json {
        let summaries: Vec<PresetSummary> = list
            .iter()
            .map(|p| PresetSummary {
                id: &p.id,
                name: &p.name,
                kind: p.data.kind(),
                description: &p.description,
                created_at: p.created_at.to_rfc3339(),
                updated_at: p.updated_at.map(|t| t.to_rfc3339()),
            })
            .collect();
        println!("{}", to_json(&summaries)?);
    } else {
        for p in &list {
            println!("{}\t{}\t{}\t{}", p.id, p.data.kind(), p.created_at.format("%Y-%m-%d %H:%M"), p.name);
        }
    }
    Ok(())
}

fn cmd_preset_show(presets: &PresetManager<FileStore>, id: &str) -> Result<(), CliError> {
    let preset = presets.get(id).map_err(CliError::preset)?;
    println!("{}", to_json(&preset)?);
    Ok(())
}

fn cmd_preset_save(
    settings: &Settings,
    mut presets: PresetManager<FileStore>,
    name: &str,
    data_path: Option<PathBuf>,
    replay_path: Option<PathBuf>,
    description: &str,
) -> Result<(), CliError> {
    let data = match (data_path, replay_path) {
        (Some(path), _) => serde_json::from_str::<PresetData>(&read_file(&path)?)
            .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))?,
        (None, Some(path)) => {
            let report = replay::run(replay::load_script(&path)?, settings, None)?;
            PresetData::pipeline(&report.config, &report.store)
        }
        (None, None) => return Err(CliError::args("one of --data or --replay is required")),
    };
    if let PresetData::Pipeline { config, .. } = &data {
        config.validate().map_err(CliError::timeline)?;
    }
    let id = presets
        .save_described(name, description, data)
        .map_err(CliError::preset)?;
    println!("{id}");
    Ok(())
}

fn cmd_preset_rename(
    mut presets: PresetManager<FileStore>,
    id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<(), CliError> {
    let preset = presets.update(id, name, description).map_err(CliError::preset)?;
    println!("{}", to_json(&preset)?);
    Ok(())
}

fn cmd_preset_delete(mut presets: PresetManager<FileStore>, id: &str) -> Result<(), CliError> {
    presets.delete(id).map_err(CliError::preset)?;
    eprintln!("deleted {id}");
    Ok(())
}
