//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | input            | File IO and parse failures               |
//! | 10-19   | timeline         | Timeline configuration rejected          |
//! | 20-29   | replay           | Action script replay codes               |
//! | 30-39   | preset           | Preset store codes                       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use pipegrid_engine::error::{PresetError, TimelineError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-9)
// =============================================================================

/// A file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Input was readable but not valid JSON/TOML of the expected shape.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Timeline (10-19)
// =============================================================================

/// `dates` timeline without a start date.
pub const EXIT_TIMELINE_MISSING_START: u8 = 10;

/// End date before start date.
pub const EXIT_TIMELINE_END_BEFORE_START: u8 = 11;

/// Duration above the interval's maximum cell count.
pub const EXIT_TIMELINE_TOO_LONG: u8 = 12;

// =============================================================================
// Replay (20-29)
// =============================================================================

/// A script step is not a valid action or history command.
pub const EXIT_REPLAY_BAD_STEP: u8 = 20;

/// `--strict` and at least one step was ignored, denied or left pending.
pub const EXIT_REPLAY_REJECTED: u8 = 21;

// =============================================================================
// Preset (30-39)
// =============================================================================

/// No preset with the given id.
pub const EXIT_PRESET_NOT_FOUND: u8 = 30;

/// Preset name missing or blank.
pub const EXIT_PRESET_EMPTY_NAME: u8 = 31;

/// Stored preset record cannot be decoded.
pub const EXIT_PRESET_CORRUPT: u8 = 32;

/// Preset store could not be read or written.
pub const EXIT_PRESET_STORAGE: u8 = 33;

// =============================================================================
// Error mapping
// =============================================================================

/// Map a TimelineError to its exit code.
pub fn timeline_exit_code(err: &TimelineError) -> u8 {
    match err {
        TimelineError::MissingStartDate => EXIT_TIMELINE_MISSING_START,
        TimelineError::EndBeforeStart { .. } => EXIT_TIMELINE_END_BEFORE_START,
        TimelineError::DurationTooLong { .. } => EXIT_TIMELINE_TOO_LONG,
    }
}

/// Map a PresetError to its exit code.
pub fn preset_exit_code(err: &PresetError) -> u8 {
    match err {
        PresetError::NotFound(_) => EXIT_PRESET_NOT_FOUND,
        PresetError::EmptyName => EXIT_PRESET_EMPTY_NAME,
        PresetError::Corrupt { .. } => EXIT_PRESET_CORRUPT,
        PresetError::Storage(_) => EXIT_PRESET_STORAGE,
    }
}
