//! Content catalog and account permissions.
//!
//! The catalog lists the draggable content descriptors a host offers, grouped
//! in sections. It is also the authority on access: when a drag payload names
//! a field the catalog knows, the catalog's access flag is used regardless of
//! what the payload claims.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who may drop a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Producer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountTier {
    #[default]
    Amateur,
    Influencer,
    Producer,
    Admin,
}

impl AccountTier {
    pub const ALL: [AccountTier; 4] = [
        AccountTier::Amateur,
        AccountTier::Influencer,
        AccountTier::Producer,
        AccountTier::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountTier::Amateur => "amateur",
            AccountTier::Influencer => "influencer",
            AccountTier::Producer => "producer",
            AccountTier::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for AccountTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only permission input of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub tier: AccountTier,
}

impl Permissions {
    pub fn new(tier: AccountTier) -> Self {
        Self { tier }
    }

    pub fn allows(&self, access: Access) -> bool {
        match access {
            Access::Public => true,
            Access::Producer => matches!(self.tier, AccountTier::Producer | AccountTier::Admin),
        }
    }

    pub fn can_use(&self, descriptor: &ContentDescriptor) -> bool {
        self.allows(descriptor.access)
    }
}

/// One draggable piece of content: dropping it writes
/// `field_key = default_value_shape` into the target cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    #[serde(alias = "key", alias = "id")]
    pub field_key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "empty_value", alias = "defaultValue")]
    pub default_value_shape: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default)]
    pub access: Access,
}

fn empty_value() -> Value {
    Value::String(String::new())
}

impl ContentDescriptor {
    pub fn new(field_key: impl Into<String>, default_value_shape: Value) -> Self {
        let field_key = field_key.into();
        Self {
            label: field_key.clone(),
            field_key,
            default_value_shape,
            section: None,
            access: Access::Public,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Lenient decode of a transfer object. The field key is taken from
    /// `fieldKey`, `key` or `id`, in that order; a missing or blank key
    /// yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let field_key = ["fieldKey", "key", "id"]
            .iter()
            .filter_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|k| !k.is_empty())?
            .to_string();
        let default_value_shape = obj
            .get("defaultValueShape")
            .or_else(|| obj.get("defaultValue"))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(empty_value);
        let access = obj
            .get("access")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        Some(Self {
            label: obj
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or(&field_key)
                .to_string(),
            field_key,
            default_value_shape,
            section: obj.get("section").and_then(Value::as_str).map(str::to_string),
            access,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSection {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub items: Vec<ContentDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub sections: Vec<CatalogSection>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_section(mut self, id: &str, label: &str, items: Vec<ContentDescriptor>) -> Self {
        self.sections.push(CatalogSection {
            id: id.to_string(),
            label: label.to_string(),
            items,
        });
        self
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ContentDescriptor> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn find(&self, field_key: &str) -> Option<&ContentDescriptor> {
        self.descriptors().find(|d| d.field_key == field_key)
    }

    /// Access flag in force for `field_key`: the catalog's when it lists the
    /// key, `claimed` otherwise.
    pub fn access_for(&self, field_key: &str, claimed: Access) -> Access {
        self.find(field_key).map_or(claimed, |d| d.access)
    }

    /// Payload descriptor with the catalog's access flag applied.
    pub fn resolve(&self, descriptor: &ContentDescriptor) -> ContentDescriptor {
        ContentDescriptor {
            access: self.access_for(&descriptor.field_key, descriptor.access),
            ..descriptor.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new().with_section(
            "environment",
            "Environment",
            vec![
                ContentDescriptor::new("temperature", json!(20)),
                ContentDescriptor::new("ppfd", json!(600)).with_access(Access::Producer),
            ],
        )
    }

    #[test]
    fn test_producer_gate() {
        let gated = ContentDescriptor::new("ppfd", json!(600)).with_access(Access::Producer);
        assert!(!Permissions::new(AccountTier::Amateur).can_use(&gated));
        assert!(!Permissions::new(AccountTier::Influencer).can_use(&gated));
        assert!(Permissions::new(AccountTier::Producer).can_use(&gated));
        assert!(Permissions::new(AccountTier::Admin).can_use(&gated));
    }

    #[test]
    fn test_catalog_access_wins() {
        let claimed_public = ContentDescriptor::new("ppfd", json!(1));
        assert_eq!(catalog().resolve(&claimed_public).access, Access::Producer);

        let unknown = ContentDescriptor::new("notes", json!(""));
        assert_eq!(catalog().resolve(&unknown).access, Access::Public);
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog = Catalog::from_json(
            r#"{"sections":[{"id":"extraction","label":"Extraction","items":[
                {"id":"extractionMethod","label":"Méthode","defaultValue":"eho"},
                {"key":"batchSize","defaultValue":100,"access":"producer"}
            ]}]}"#,
        )
        .unwrap();
        assert_eq!(catalog.find("extractionMethod").unwrap().default_value_shape, json!("eho"));
        assert_eq!(catalog.find("batchSize").unwrap().access, Access::Producer);
    }

    #[test]
    fn test_from_value_key_order_and_defaults() {
        let d = ContentDescriptor::from_value(&json!({"key": "humidity", "id": "ignored"})).unwrap();
        assert_eq!(d.field_key, "humidity");
        assert_eq!(d.label, "humidity");
        assert_eq!(d.default_value_shape, json!(""));

        assert!(ContentDescriptor::from_value(&json!({"fieldKey": "  "})).is_none());
        assert!(ContentDescriptor::from_value(&json!(["temperature"])).is_none());
    }
}
