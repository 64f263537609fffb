//! Named presets: saved pipeline snapshots and field-set templates.
//!
//! Presets go through a [`KeyValueStore`], so the engine never touches the
//! file system. Records live under `presets/<namespace>/<id>` as JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{info, warn};
use pipegrid_core::CellIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cell::FieldMap;
use crate::error::{PresetError, StorageError};
use crate::store::CellStore;
use crate::timeline::TimelineConfig;

pub type PresetId = String;

const KEY_ROOT: &str = "presets";

/// String key-value persistence behind the preset manager.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Returns whether the key existed.
    fn remove(&mut self, key: &str) -> Result<bool, StorageError>;
    /// Keys starting with `prefix`, ascending.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub key: String,
    pub value: Value,
}

impl TemplateField {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self { key: key.into(), value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PresetData {
    /// A whole grid: configuration plus every cell.
    Pipeline { config: TimelineConfig, cells: CellStore },
    /// A field set applied to the bulk targets.
    Template { fields: Vec<TemplateField> },
}

impl PresetData {
    pub fn pipeline(config: &TimelineConfig, cells: &CellStore) -> Self {
        PresetData::Pipeline {
            config: config.clone(),
            cells: cells.clone(),
        }
    }

    /// Template from a field map, e.g. one cell's data fields.
    pub fn template(fields: &FieldMap) -> Self {
        PresetData::Template {
            fields: fields
                .iter()
                .map(|(k, v)| TemplateField::new(k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Template fields as a merge partial; later duplicates win.
    pub fn template_fields(&self) -> Option<FieldMap> {
        match self {
            PresetData::Template { fields } => Some(
                fields
                    .iter()
                    .map(|f| (f.key.clone(), f.value.clone()))
                    .collect(),
            ),
            PresetData::Pipeline { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PresetData::Pipeline { .. } => "pipeline",
            PresetData::Template { .. } => "template",
        }
    }
}

/// How applying a preset treats existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyMode {
    /// Pipeline: config and store are swapped in. Template: the targets'
    /// data fields are replaced.
    #[default]
    Replace,
    /// Pipeline: cells are merged into the current store. Template: fields
    /// are merged into the targets.
    Merge,
}

/// Apply a template partial to `targets` under `mode`.
pub fn apply_template(store: &CellStore, targets: &[CellIndex], fields: &FieldMap, mode: ApplyMode) -> CellStore {
    let base = match mode {
        ApplyMode::Replace => targets.iter().fold(store.clone(), |s, &i| {
            let keys = s.data_keys(i);
            s.clear_fields(i, &keys)
        }),
        ApplyMode::Merge => store.clone(),
    };
    base.merge_into(targets, fields)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Set by the first rename or description change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub data: PresetData,
}

pub struct PresetManager<S> {
    store: S,
    namespace: String,
}

impl<S: KeyValueStore> PresetManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_namespace(store, "default")
    }

    pub fn with_namespace(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn prefix(&self) -> String {
        format!("{KEY_ROOT}/{}/", self.namespace)
    }

    fn key(&self, id: &str) -> String {
        format!("{}{id}", self.prefix())
    }

    pub fn save(&mut self, name: &str, data: PresetData) -> Result<PresetId, PresetError> {
        self.save_described(name, "", data)
    }

    pub fn save_described(&mut self, name: &str, description: &str, data: PresetData) -> Result<PresetId, PresetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName);
        }
        let preset = Preset {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.trim().to_string(),
            created_at: Utc::now(),
            updated_at: None,
            data,
        };
        self.write(&preset)?;
        info!("saved {} preset '{}' ({})", preset.data.kind(), preset.name, preset.id);
        Ok(preset.id)
    }

    /// Rename a preset and optionally replace its description. The id,
    /// creation time and data are kept.
    pub fn update(&mut self, id: &str, name: &str, description: Option<&str>) -> Result<Preset, PresetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName);
        }
        let mut preset = self.get(id)?;
        preset.name = name.to_string();
        if let Some(description) = description {
            preset.description = description.trim().to_string();
        }
        preset.updated_at = Some(Utc::now());
        self.write(&preset)?;
        info!("updated preset '{}' ({})", preset.name, preset.id);
        Ok(preset)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<Preset, PresetError> {
        self.update(id, name, None)
    }

    fn write(&mut self, preset: &Preset) -> Result<(), PresetError> {
        let json = serde_json::to_string(preset).map_err(|e| PresetError::Corrupt {
            id: preset.id.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&self.key(&preset.id), &json)?;
        Ok(())
    }

    /// Every readable preset, oldest first. Unreadable records are skipped.
    pub fn list(&self) -> Result<Vec<Preset>, PresetError> {
        let mut presets = Vec::new();
        for key in self.store.list(&self.prefix())? {
            let Some(text) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<Preset>(&text) {
                Ok(preset) => presets.push(preset),
                Err(e) => warn!("skipping unreadable preset record {key}: {e}"),
            }
        }
        presets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(presets)
    }

    pub fn get(&self, id: &str) -> Result<Preset, PresetError> {
        let text = self
            .store
            .get(&self.key(id))?
            .ok_or_else(|| PresetError::NotFound(id.to_string()))?;
        serde_json::from_str(&text).map_err(|e| PresetError::Corrupt {
            id: id.to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(&self, id: &str) -> Result<PresetData, PresetError> {
        self.get(id).map(|p| p.data)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), PresetError> {
        if self.store.remove(&self.key(id))? {
            info!("deleted preset {id}");
            Ok(())
        } else {
            Err(PresetError::NotFound(id.to_string()))
        }
    }
}
