//! Timeline indexer: configuration -> ordered cell indices and labels.
//!
//! The indexer is a set of pure functions over [`TimelineConfig`]. Indices are
//! always the dense range `0..cell_count(config)`; what an index *means* (a
//! phase, a day offset, a calendar date) is fully determined by the
//! interval type, which is why changing the interval type invalidates the
//! data stored against the previous indices.

use chrono::{Datelike, Days, Months, NaiveDate};
use pipegrid_core::CellIndex;
use serde::{Deserialize, Serialize};

use crate::cell::{MetaFields, MetaKey};
use crate::error::TimelineError;
use crate::phases::{PhaseSpec, PipelineKind};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Août", "Sep", "Oct", "Nov", "Déc",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    #[serde(alias = "phase")]
    Phases,
    #[serde(alias = "seconde", alias = "second")]
    Seconds,
    #[serde(alias = "heure", alias = "hour")]
    Hours,
    #[serde(alias = "jour", alias = "day")]
    Days,
    #[serde(alias = "semaine", alias = "week")]
    Weeks,
    #[serde(alias = "mois", alias = "month")]
    Months,
    #[serde(alias = "date")]
    Dates,
}

impl IntervalType {
    pub const ALL: [IntervalType; 7] = [
        IntervalType::Phases,
        IntervalType::Seconds,
        IntervalType::Hours,
        IntervalType::Days,
        IntervalType::Weeks,
        IntervalType::Months,
        IntervalType::Dates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalType::Phases => "phases",
            IntervalType::Seconds => "seconds",
            IntervalType::Hours => "hours",
            IntervalType::Days => "days",
            IntervalType::Weeks => "weeks",
            IntervalType::Months => "months",
            IntervalType::Dates => "dates",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    /// Largest cell count a duration-driven timeline may have.
    /// `None` for phases, whose length comes from the phase list.
    pub fn max_cells(&self) -> Option<u32> {
        match self {
            IntervalType::Phases => None,
            IntervalType::Seconds => Some(900),
            IntervalType::Hours => Some(336),
            IntervalType::Days | IntervalType::Dates => Some(365),
            IntervalType::Weeks => Some(52),
            IntervalType::Months => Some(120),
        }
    }
}

impl std::fmt::Display for IntervalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConfig {
    pub interval_type: IntervalType,
    #[serde(default)]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// `dates` mode only: inclusive end, overrides `duration`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_phases: Vec<PhaseSpec>,
    #[serde(default)]
    pub pipeline: PipelineKind,
}

impl TimelineConfig {
    pub fn new(interval_type: IntervalType, duration: u32) -> Self {
        Self {
            interval_type,
            duration,
            start_date: None,
            end_date: None,
            custom_phases: Vec::new(),
            pipeline: PipelineKind::default(),
        }
    }

    /// Phase timeline using the pipeline's default catalog.
    pub fn phases(pipeline: PipelineKind) -> Self {
        Self {
            pipeline,
            ..Self::new(IntervalType::Phases, 0)
        }
    }

    pub fn days(duration: u32) -> Self {
        Self::new(IntervalType::Days, duration)
    }

    pub fn weeks(duration: u32) -> Self {
        Self::new(IntervalType::Weeks, duration)
    }

    pub fn months(duration: u32) -> Self {
        Self::new(IntervalType::Months, duration)
    }

    pub fn dates(start: NaiveDate, duration: u32) -> Self {
        Self::new(IntervalType::Dates, duration).with_start(start)
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_custom_phases(mut self, phases: Vec<PhaseSpec>) -> Self {
        self.custom_phases = phases;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineKind) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Check the config can be indexed as written. The indexer itself is
    /// total and falls back to relative labels on invalid configs.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.interval_type == IntervalType::Dates {
            let start = self.start_date.ok_or(TimelineError::MissingStartDate)?;
            if let Some(end) = self.end_date {
                if end < start {
                    return Err(TimelineError::EndBeforeStart {
                        start: start.to_string(),
                        end: end.to_string(),
                    });
                }
            }
        }
        if let Some(max) = self.interval_type.max_cells() {
            let count = cell_count(self) as u32;
            if count > max {
                return Err(TimelineError::DurationTooLong {
                    interval: self.interval_type,
                    duration: count,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Two configs index cells the same way: same interval type and same
    /// pipeline. Only then can data survive a config change.
    pub fn same_semantics(&self, other: &TimelineConfig) -> bool {
        self.interval_type == other.interval_type && self.pipeline == other.pipeline
    }

    /// Inclusive day span of a `dates` timeline with both ends set.
    fn date_span(&self) -> Option<usize> {
        let (start, end) = (self.start_date?, self.end_date?);
        let days = (end - start).num_days();
        (days >= 0).then(|| days as usize + 1)
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self::phases(PipelineKind::default())
    }
}

/// Number of cells the grid shows for `config`.
pub fn cell_count(config: &TimelineConfig) -> usize {
    match config.interval_type {
        IntervalType::Phases if !config.custom_phases.is_empty() => config.custom_phases.len(),
        IntervalType::Phases => config.pipeline.default_phases().len(),
        IntervalType::Dates => config.date_span().unwrap_or(config.duration as usize),
        _ => config.duration as usize,
    }
}

/// Ordered cell indices for `config`: always `0..cell_count(config)`.
pub fn index_for(config: &TimelineConfig) -> Vec<CellIndex> {
    (0..cell_count(config)).collect()
}

/// Display label of `index`, `None` outside the grid.
pub fn label_for(config: &TimelineConfig, index: CellIndex) -> Option<String> {
    if index >= cell_count(config) {
        return None;
    }
    let n = index + 1;
    let label = match config.interval_type {
        IntervalType::Phases => phase_name(config, index),
        IntervalType::Seconds => format!("{index}s"),
        IntervalType::Hours => format!("{index}h"),
        IntervalType::Days | IntervalType::Dates => match day_date(config, index) {
            Some(date) => date.format("%d/%m").to_string(),
            None => format!("J+{n}"),
        },
        IntervalType::Weeks => match week_start(config, index) {
            Some(date) => format!("S{n} {}", date.format("%d/%m")),
            None => format!("S{n}"),
        },
        IntervalType::Months => match month_start(config, index) {
            Some(date) => format!("{} {}", MONTH_ABBREVIATIONS[date.month0() as usize], date.year()),
            None => MONTH_ABBREVIATIONS[index % 12].to_string(),
        },
    };
    Some(label)
}

/// Stable identifier of a slot (`day-3`, `week-1`, `date-2025-03-01`,
/// a phase id, ...). Used as the `timestamp` meta key.
pub fn slot_id(config: &TimelineConfig, index: CellIndex) -> Option<String> {
    if index >= cell_count(config) {
        return None;
    }
    let n = index + 1;
    let id = match config.interval_type {
        IntervalType::Phases => phase_id(config, index),
        IntervalType::Seconds => format!("sec-{index}"),
        IntervalType::Hours => format!("hour-{index}"),
        IntervalType::Days => format!("day-{n}"),
        IntervalType::Dates => match day_date(config, index) {
            Some(date) => format!("date-{date}"),
            None => format!("day-{n}"),
        },
        IntervalType::Weeks => format!("week-{n}"),
        IntervalType::Months => format!("month-{n}"),
    };
    Some(id)
}

/// Meta fields the indexer associates with `index`, for hosts that stamp
/// cells with their position.
pub fn slot_meta(config: &TimelineConfig, index: CellIndex) -> Option<MetaFields> {
    let label = label_for(config, index)?;
    let id = slot_id(config, index)?;
    let n = index + 1;
    let mut meta = MetaFields::new()
        .with(MetaKey::Timestamp, id.clone())
        .with(MetaKey::Label, label);
    match config.interval_type {
        IntervalType::Phases => meta.set(MetaKey::Phase, id),
        IntervalType::Seconds => meta.set(MetaKey::Seconds, index),
        IntervalType::Hours => meta.set(MetaKey::Hours, index),
        IntervalType::Days | IntervalType::Dates => {
            meta.set(MetaKey::Day, n);
            if let Some(date) = day_date(config, index) {
                meta.set(MetaKey::Date, date.to_string());
            }
        }
        IntervalType::Weeks => {
            meta.set(MetaKey::Week, n);
            if let Some(date) = week_start(config, index) {
                meta.set(MetaKey::Date, date.to_string());
            }
        }
        IntervalType::Months => {
            if let Some(date) = month_start(config, index) {
                meta.set(MetaKey::Date, date.to_string());
            }
        }
    }
    Some(meta)
}

fn phase_name(config: &TimelineConfig, index: CellIndex) -> String {
    let custom = config
        .custom_phases
        .get(index)
        .map(|p| p.name.trim())
        .filter(|name| !name.is_empty());
    let catalog = config.pipeline.default_phases().get(index).map(|p| p.name);
    custom
        .or(catalog)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Phase {}", index + 1))
}

fn phase_id(config: &TimelineConfig, index: CellIndex) -> String {
    let custom = config.custom_phases.get(index).and_then(|p| p.id.clone());
    let catalog = || {
        // Custom lists replace the catalog; reuse catalog ids only without one.
        config
            .custom_phases
            .is_empty()
            .then(|| config.pipeline.default_phases().get(index))
            .flatten()
            .map(|p| p.id.to_string())
    };
    custom
        .or_else(catalog)
        .unwrap_or_else(|| format!("phase-{index}"))
}

fn day_date(config: &TimelineConfig, index: CellIndex) -> Option<NaiveDate> {
    config.start_date?.checked_add_days(Days::new(index as u64))
}

fn week_start(config: &TimelineConfig, index: CellIndex) -> Option<NaiveDate> {
    config.start_date?.checked_add_days(Days::new(index as u64 * 7))
}

fn month_start(config: &TimelineConfig, index: CellIndex) -> Option<NaiveDate> {
    let start = config.start_date?;
    start.with_day(1)?.checked_add_months(Months::new(index as u32))
}
