//! Drag/drop assignment: decode the transfer payload, gate it against the
//! catalog and account tier, and turn it into a field merge over targets.

use pipegrid_core::{CellIndex, Selection};
use serde_json::Value;

use crate::catalog::{Catalog, ContentDescriptor, Permissions};
use crate::cell::FieldMap;
use crate::preset::TemplateField;

/// What was dragged.
#[derive(Debug, Clone, PartialEq)]
pub enum DragPayload {
    /// A single catalog descriptor.
    Item(ContentDescriptor),
    /// Several descriptors dragged together.
    Items(Vec<ContentDescriptor>),
    /// A named field-set template (`{ key, value }` pairs).
    Template { name: String, fields: Vec<TemplateField> },
}

impl DragPayload {
    /// Decode transfer text. Malformed JSON, a missing field key, or an empty
    /// item list yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        Self::from_value(&value)
    }

    /// Decode an already-parsed payload. A JSON string is treated as
    /// transfer text and parsed again.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(text) = value.as_str() {
            return Self::parse(text);
        }
        match value.get("type").and_then(Value::as_str) {
            Some("multi-items") | Some("items") => {
                let items = value
                    .get("items")?
                    .as_array()?
                    .iter()
                    .map(ContentDescriptor::from_value)
                    .collect::<Option<Vec<_>>>()?;
                (!items.is_empty()).then_some(DragPayload::Items(items))
            }
            Some("grouped") | Some("template") => {
                let group = value.get("group").unwrap_or(value);
                let name = group
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let fields: Vec<TemplateField> =
                    serde_json::from_value(group.get("fields")?.clone()).ok()?;
                Some(DragPayload::Template { name, fields })
            }
            _ => ContentDescriptor::from_value(value).map(DragPayload::Item),
        }
    }

    pub fn field_keys(&self) -> Vec<&str> {
        match self {
            DragPayload::Item(d) => vec![d.field_key.as_str()],
            DragPayload::Items(items) => items.iter().map(|d| d.field_key.as_str()).collect(),
            DragPayload::Template { fields, .. } => fields.iter().map(|f| f.key.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropError {
    /// The payload carries nothing to write.
    Empty,
    /// A descriptor is gated above the account tier. The whole drop is
    /// refused.
    Denied { field_key: String },
}

/// A drop resolved to the merge it performs.
#[derive(Debug, Clone, PartialEq)]
pub struct DropPlan {
    pub targets: Vec<CellIndex>,
    pub fields: FieldMap,
}

/// Resolve `payload` dropped on `target`.
///
/// Targets follow the selection rule: every selected cell when the
/// selection contains `target`, else `target` alone. Duplicate keys across
/// items resolve last-wins. Template entries with a null or empty-string
/// value are skipped.
pub fn plan_drop(
    payload: &DragPayload,
    target: CellIndex,
    selection: &Selection,
    catalog: &Catalog,
    permissions: &Permissions,
) -> Result<DropPlan, DropError> {
    let descriptors: Vec<ContentDescriptor> = match payload {
        DragPayload::Item(d) => vec![d.clone()],
        DragPayload::Items(items) => items.clone(),
        DragPayload::Template { fields, .. } => fields
            .iter()
            .filter(|f| !f.key.trim().is_empty() && !is_blank(&f.value))
            .map(|f| ContentDescriptor::new(f.key.clone(), f.value.clone()))
            .collect(),
    };

    let mut fields = FieldMap::new();
    for descriptor in &descriptors {
        let resolved = catalog.resolve(descriptor);
        if !permissions.can_use(&resolved) {
            return Err(DropError::Denied {
                field_key: resolved.field_key,
            });
        }
        fields.insert(resolved.field_key, resolved.default_value_shape);
    }

    if fields.is_empty() {
        return Err(DropError::Empty);
    }
    Ok(DropPlan {
        targets: selection.targets_for(target),
        fields,
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Access, AccountTier};
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new().with_section(
            "env",
            "Environment",
            vec![
                ContentDescriptor::new("temperature", json!(20)),
                ContentDescriptor::new("co2", json!(800)).with_access(Access::Producer),
            ],
        )
    }

    fn amateur() -> Permissions {
        Permissions::new(AccountTier::Amateur)
    }

    #[test]
    fn test_parse_single_item() {
        let payload = DragPayload::parse(r#"{"fieldKey":"temperature","defaultValueShape":20}"#).unwrap();
        assert_eq!(payload.field_keys(), vec!["temperature"]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(DragPayload::parse("not json").is_none());
        assert!(DragPayload::parse(r#"{"label":"no key"}"#).is_none());
        assert!(DragPayload::parse(r#"{"type":"multi-items","items":[]}"#).is_none());
        assert!(DragPayload::parse(r#"{"type":"multi-items","items":[{"key":"a"},{"label":"b"}]}"#).is_none());
    }

    #[test]
    fn test_parse_grouped_and_multi() {
        let grouped = DragPayload::parse(
            r#"{"type":"grouped","group":{"name":"Night","fields":[{"key":"light","value":"off"}]}}"#,
        )
        .unwrap();
        assert!(matches!(grouped, DragPayload::Template { ref name, .. } if name == "Night"));

        let multi = DragPayload::from_value(&json!({
            "type": "multi-items",
            "items": [{"key": "a", "defaultValue": 1}, {"key": "b"}]
        }))
        .unwrap();
        assert_eq!(multi.field_keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_from_value_accepts_transfer_text() {
        let payload = DragPayload::from_value(&json!("{\"key\":\"humidity\",\"defaultValue\":60}")).unwrap();
        assert_eq!(payload.field_keys(), vec!["humidity"]);
    }

    #[test]
    fn test_single_target_without_selection() {
        let payload = DragPayload::Item(ContentDescriptor::new("temperature", json!(20)));
        let plan = plan_drop(&payload, 2, &Selection::new(), &catalog(), &amateur()).unwrap();
        assert_eq!(plan.targets, vec![2]);
        assert_eq!(plan.fields.get("temperature"), Some(&json!(20)));
    }

    #[test]
    fn test_drop_on_selected_cell_hits_selection() {
        let mut selection = Selection::new();
        selection.click(1);
        selection.toggle(3);
        let payload = DragPayload::Item(ContentDescriptor::new("temperature", json!(20)));

        let plan = plan_drop(&payload, 3, &selection, &catalog(), &amateur()).unwrap();
        assert_eq!(plan.targets, vec![1, 3]);

        let outside = plan_drop(&payload, 5, &selection, &catalog(), &amateur()).unwrap();
        assert_eq!(outside.targets, vec![5]);
    }

    #[test]
    fn test_gated_item_refuses_whole_drop() {
        let payload = DragPayload::Items(vec![
            ContentDescriptor::new("temperature", json!(20)),
            // payload claims public; catalog says producer
            ContentDescriptor::new("co2", json!(900)),
        ]);
        let err = plan_drop(&payload, 0, &Selection::new(), &catalog(), &amateur()).unwrap_err();
        assert_eq!(err, DropError::Denied { field_key: "co2".into() });

        let producer = Permissions::new(AccountTier::Producer);
        let plan = plan_drop(&payload, 0, &Selection::new(), &catalog(), &producer).unwrap();
        assert_eq!(plan.fields.len(), 2);
    }

    #[test]
    fn test_template_skips_blank_values() {
        let payload = DragPayload::Template {
            name: "empty".into(),
            fields: vec![TemplateField::new("notes", json!("")), TemplateField::new("x", Value::Null)],
        };
        let err = plan_drop(&payload, 0, &Selection::new(), &catalog(), &amateur()).unwrap_err();
        assert_eq!(err, DropError::Empty);
    }
}
