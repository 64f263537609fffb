use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open-ended field dictionary as it travels on the wire: `fieldKey -> value`.
pub type FieldMap = BTreeMap<String, Value>;

/// Reserved field names that carry structure (where a cell sits on the
/// timeline) rather than process data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetaKey {
    Timestamp,
    Label,
    Date,
    Phase,
    Week,
    Day,
    Hours,
    Seconds,
    /// The `_meta` bag (completion percentage, last modification, ...)
    Meta,
}

impl MetaKey {
    pub const ALL: [MetaKey; 9] = [
        MetaKey::Timestamp,
        MetaKey::Label,
        MetaKey::Date,
        MetaKey::Phase,
        MetaKey::Week,
        MetaKey::Day,
        MetaKey::Hours,
        MetaKey::Seconds,
        MetaKey::Meta,
    ];

    /// Wire name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKey::Timestamp => "timestamp",
            MetaKey::Label => "label",
            MetaKey::Date => "date",
            MetaKey::Phase => "phase",
            MetaKey::Week => "week",
            MetaKey::Day => "day",
            MetaKey::Hours => "hours",
            MetaKey::Seconds => "seconds",
            MetaKey::Meta => "_meta",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for MetaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field name classified as either a reserved meta key or a data key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey<'a> {
    Meta(MetaKey),
    Data(&'a str),
}

impl<'a> FieldKey<'a> {
    pub fn classify(key: &'a str) -> Self {
        match MetaKey::parse(key) {
            Some(meta) => FieldKey::Meta(meta),
            None => FieldKey::Data(key),
        }
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, FieldKey::Meta(_))
    }
}

/// True when `key` is a reserved meta key.
pub fn is_meta_key(key: &str) -> bool {
    MetaKey::parse(key).is_some()
}

/// Structural fields of a cell, kept apart from its data so the two can never
/// collide and so data counts never include them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFields {
    values: BTreeMap<MetaKey, Value>,
}

impl MetaFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: MetaKey) -> Option<&Value> {
        self.values.get(&key)
    }

    pub fn set(&mut self, key: MetaKey, value: impl Into<Value>) {
        self.values.insert(key, value.into());
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: MetaKey, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: MetaKey) -> Option<Value> {
        self.values.remove(&key)
    }

    pub fn label(&self) -> Option<&str> {
        self.get(MetaKey::Label).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetaKey, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}

/// The stored record of one cell: meta fields plus the data dictionary.
///
/// Serializes as one flat JSON object where meta and data keys sit side by
/// side, e.g. `{"label": "Curing", "temperature": 18}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldMap", into = "FieldMap")]
pub struct CellRecord {
    meta: MetaFields,
    data: FieldMap,
}

impl CellRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a flat field map, routing reserved keys to meta.
    pub fn from_fields(fields: FieldMap) -> Self {
        let mut record = Self::new();
        for (key, value) in fields {
            record.set(&key, value);
        }
        record
    }

    /// Flatten back into wire form.
    pub fn to_fields(&self) -> FieldMap {
        let mut out = self.data.clone();
        for (key, value) in self.meta.iter() {
            out.insert(key.as_str().to_string(), value.clone());
        }
        out
    }

    pub fn meta(&self) -> &MetaFields {
        &self.meta
    }

    pub fn data(&self) -> &FieldMap {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match FieldKey::classify(key) {
            FieldKey::Meta(meta) => self.meta.get(meta),
            FieldKey::Data(key) => self.data.get(key),
        }
    }

    /// Write one field. Reserved names land in the meta record.
    pub fn set(&mut self, key: &str, value: Value) {
        match FieldKey::classify(key) {
            FieldKey::Meta(meta) => self.meta.set(meta, value),
            FieldKey::Data(key) => {
                self.data.insert(key.to_string(), value);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match FieldKey::classify(key) {
            FieldKey::Meta(meta) => self.meta.remove(meta),
            FieldKey::Data(key) => self.data.remove(key),
        }
    }

    /// Shallow merge; keys in `partial` overwrite existing ones.
    pub fn merge(&mut self, partial: &FieldMap) {
        for (key, value) in partial {
            self.set(key, value.clone());
        }
    }

    pub fn data_keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Number of data fields (meta keys never count).
    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// No keys at all, meta included.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.meta.is_empty()
    }

    /// Drop every data field, keeping meta.
    pub fn clear_data(&mut self) {
        self.data.clear();
    }
}

impl From<FieldMap> for CellRecord {
    fn from(fields: FieldMap) -> Self {
        Self::from_fields(fields)
    }
}

impl From<CellRecord> for FieldMap {
    fn from(record: CellRecord) -> Self {
        record.to_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_meta_key_round_trip() {
        for key in MetaKey::ALL {
            assert_eq!(MetaKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(MetaKey::parse("temperature"), None);
        assert!(is_meta_key("_meta"));
        assert!(!is_meta_key("meta"));
    }

    #[test]
    fn test_reserved_keys_route_to_meta() {
        let record = CellRecord::from_fields(fields(json!({
            "label": "Sechage",
            "temperature": 20,
            "_meta": {"completionPercentage": 10}
        })));

        assert_eq!(record.data_count(), 1);
        assert_eq!(record.meta().len(), 2);
        assert_eq!(record.meta().label(), Some("Sechage"));
        assert_eq!(record.get("temperature"), Some(&json!(20)));
        assert_eq!(record.data_keys().collect::<Vec<_>>(), vec!["temperature"]);
    }

    #[test]
    fn test_clear_data_keeps_meta() {
        let mut record = CellRecord::from_fields(fields(json!({"label": "J+1", "humidity": 60})));
        record.clear_data();
        assert!(!record.has_data());
        assert!(!record.is_empty());
        assert_eq!(record.get("label"), Some(&json!("J+1")));
    }

    #[test]
    fn test_serializes_flat() {
        let record = CellRecord::from_fields(fields(json!({"phase": "curing", "notes": ["a", "b"]})));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"phase": "curing", "notes": ["a", "b"]}));

        let back: CellRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
