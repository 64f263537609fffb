use std::fmt;

use crate::timeline::IntervalType;

/// A timeline configuration the indexer cannot honour as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// `dates` mode without a start date.
    MissingStartDate,
    /// End date before start date.
    EndBeforeStart { start: String, end: String },
    /// Duration above the per-interval maximum.
    DurationTooLong { interval: IntervalType, duration: u32, max: u32 },
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStartDate => write!(f, "dates timeline requires a start date"),
            Self::EndBeforeStart { start, end } => {
                write!(f, "end date {end} is before start date {start}")
            }
            Self::DurationTooLong { interval, duration, max } => {
                write!(f, "{interval} timeline allows at most {max} cells, got {duration}")
            }
        }
    }
}

impl std::error::Error for TimelineError {}

/// Failure of the key-value store behind presets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not read or write (file system, network, ...).
    Io(String),
    /// A key the backend cannot represent.
    InvalidKey(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "storage IO error: {msg}"),
            Self::InvalidKey(key) => write!(f, "invalid storage key: {key}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    /// Presets need a non-blank name.
    EmptyName,
    /// No preset with this id.
    NotFound(String),
    /// Stored record could not be decoded / encoded.
    Corrupt { id: String, message: String },
    Storage(StorageError),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "preset name must not be empty"),
            Self::NotFound(id) => write!(f, "preset not found: {id}"),
            Self::Corrupt { id, message } => write!(f, "preset '{id}' is corrupt: {message}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PresetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for PresetError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}
