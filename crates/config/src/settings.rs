// Application settings
// Loaded from ~/.config/pipegrid/settings.json

use log::warn;
use pipegrid_core::MenuPlacement;
use pipegrid_engine::catalog::{AccountTier, Catalog, Permissions};
use pipegrid_engine::history::DEFAULT_MAX_ENTRIES;
use pipegrid_engine::state::{EditorContext, TruncationPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // History
    #[serde(rename = "history.maxEntries")]
    pub history_max_entries: usize,

    // Context menu placement
    #[serde(rename = "menu.offset")]
    pub menu_offset: f32,

    #[serde(rename = "menu.margin")]
    pub menu_margin: f32,

    // Timeline
    #[serde(rename = "timeline.truncation")]
    pub truncation: TruncationPolicy,

    // Account
    #[serde(rename = "account.tier")]
    pub account_tier: AccountTier,

    // Presets
    #[serde(rename = "presets.directory", skip_serializing_if = "Option::is_none")]
    pub presets_directory: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let placement = MenuPlacement::default();
        Self {
            history_max_entries: DEFAULT_MAX_ENTRIES,
            menu_offset: placement.offset,
            menu_margin: placement.margin,
            truncation: TruncationPolicy::default(),
            account_tier: AccountTier::default(),
            presets_directory: None, // None = <config dir>/pipegrid
        }
    }
}

impl Settings {
    /// Directory holding everything pipegrid persists
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pipegrid")
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing or unreadable file yields the
    /// defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        warn!("error parsing {}: {e}; using default settings", path.display());
                        Self::default()
                    }
                }
            }
            Err(e) => {
                warn!("error reading {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn menu_placement(&self) -> MenuPlacement {
        MenuPlacement {
            offset: self.menu_offset,
            margin: self.menu_margin,
        }
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::new(self.account_tier)
    }

    /// Root of the preset file store.
    pub fn presets_dir(&self) -> PathBuf {
        self.presets_directory
            .clone()
            .unwrap_or_else(Self::config_dir)
    }

    /// Reducer context for `catalog` under these settings.
    pub fn editor_context(&self, catalog: Catalog) -> EditorContext {
        EditorContext {
            catalog,
            permissions: self.permissions(),
            truncation: self.truncation,
        }
    }
}
