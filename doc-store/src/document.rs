//! The managed document and its built-in defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A portfolio entry.
///
/// Opaque to the store: whatever JSON value was persisted is carried through
/// as-is, including entries with missing, `null` or non-string fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectRecord(Value);

impl ProjectRecord {
    pub fn new(name: impl Into<String>, desc: impl Into<String>, link: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.into()));
        fields.insert("desc".to_string(), Value::String(desc.into()));
        fields.insert("link".to_string(), Value::String(link.into()));
        Self(Value::Object(fields))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Field of an object entry, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    pub fn desc(&self) -> Option<&str> {
        self.get("desc").and_then(Value::as_str)
    }

    pub fn link(&self) -> Option<&str> {
        self.get("link").and_then(Value::as_str)
    }
}

/// The single document held by a [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    pub endorsements: u64,
    pub visitors: u64,
    pub projects: Vec<ProjectRecord>,
    /// Written by the contact endpoint; any string is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact_at: Option<String>,
    /// Top-level keys outside the known schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoreDocument {
    /// JSON keys owned by the schema; everything else lands in `extra`.
    pub const KNOWN_KEYS: [&'static str; 4] =
        ["endorsements", "visitors", "projects", "lastContactAt"];

    /// Document with zeroed counters and the given project list.
    pub fn with_projects(projects: Vec<ProjectRecord>) -> Self {
        Self {
            endorsements: 0,
            visitors: 0,
            projects,
            last_contact_at: None,
            extra: Map::new(),
        }
    }
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self::with_projects(default_projects())
    }
}

/// Project list used when none is stored or the stored one is empty.
pub fn default_projects() -> Vec<ProjectRecord> {
    vec![
        ProjectRecord::new(
            "Folio",
            "Personal site and the small API that serves it.",
            "https://github.com/folio-dev/folio",
        ),
        ProjectRecord::new(
            "Doc Store",
            "Single-document JSON store with serialized updates.",
            "https://github.com/folio-dev/folio/tree/main/doc-store",
        ),
        ProjectRecord::new(
            "Field Notes",
            "Markdown notes published alongside the portfolio.",
            "https://github.com/folio-dev/field-notes",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn default_has_three_projects_and_zero_counters() {
        let doc = StoreDocument::default();
        assert_eq!(doc.endorsements, 0);
        assert_eq!(doc.visitors, 0);
        assert_eq!(doc.projects.len(), 3);
        assert_eq!(doc.last_contact_at, None);
    }

    #[test]
    fn serializes_camel_case_in_declaration_order() {
        let mut doc = StoreDocument::with_projects(vec![ProjectRecord::new("a", "b", "c")]);
        doc.last_contact_at = Some("2026-01-01T00:00:00Z".to_string());
        doc.extra.insert("theme".to_string(), json!("dark"));

        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            text,
            r#"{"endorsements":0,"visitors":0,"projects":[{"name":"a","desc":"b","link":"c"}],"lastContactAt":"2026-01-01T00:00:00Z","theme":"dark"}"#
        );
    }

    #[test]
    fn project_record_keeps_arbitrary_json() {
        let raw = json!({"name": "Mine", "link": null, "stars": 5});
        let record: ProjectRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.name(), Some("Mine"));
        assert_eq!(record.link(), None);
        assert_eq!(record.get("stars"), Some(&json!(5)));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);

        let scalar: ProjectRecord = serde_json::from_value(json!(17)).unwrap();
        assert_eq!(scalar.into_value(), json!(17));
    }

    #[test]
    fn omits_unset_last_contact() {
        let value = serde_json::to_value(StoreDocument::default()).unwrap();
        assert!(value.get("lastContactAt").is_none());
    }
}
