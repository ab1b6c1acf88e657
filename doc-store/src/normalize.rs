//! Reconciles loosely-typed JSON with the canonical document shape.
//!
//! Each known field has its own coercion rule; anything that cannot be
//! coerced falls back to the matching field of the defaults. Keys outside the
//! schema are carried through untouched; project entries are never inspected.

use serde_json::{Map, Number, Value};

use crate::document::{ProjectRecord, StoreDocument};

/// Merge `raw` over `defaults`, repairing every known field.
///
/// Never fails. A `raw` that is not a JSON object yields `defaults`.
pub fn normalize(raw: &Value, defaults: &StoreDocument) -> StoreDocument {
    let mut doc = defaults.clone();
    strip_schema_keys(&mut doc.extra);
    let Some(fields) = raw.as_object() else {
        return doc;
    };

    for (key, value) in fields {
        if !StoreDocument::KNOWN_KEYS.contains(&key.as_str()) {
            doc.extra.insert(key.clone(), value.clone());
        }
    }

    if let Some(count) = coerce_count(fields.get("endorsements")) {
        doc.endorsements = count;
    }
    if let Some(count) = coerce_count(fields.get("visitors")) {
        doc.visitors = count;
    }
    if let Some(projects) = coerce_projects(fields.get("projects")) {
        doc.projects = projects;
    }
    if let Some(Value::String(at)) = fields.get("lastContactAt") {
        doc.last_contact_at = Some(at.clone());
    }

    doc
}

/// Re-normalize a typed draft, e.g. after a mutator has edited it.
///
/// Schema keys a mutator left in `extra` are discarded; the typed fields win.
pub fn normalize_document(
    draft: &StoreDocument,
    defaults: &StoreDocument,
) -> Result<StoreDocument, serde_json::Error> {
    let mut draft = draft.clone();
    strip_schema_keys(&mut draft.extra);
    let raw = serde_json::to_value(&draft)?;
    Ok(normalize(&raw, defaults))
}

fn strip_schema_keys(extra: &mut Map<String, Value>) {
    extra.retain(|key, _| !StoreDocument::KNOWN_KEYS.contains(&key.as_str()));
}

/// Finite numbers become non-negative integers; anything else is rejected.
fn coerce_count(value: Option<&Value>) -> Option<u64> {
    let Some(Value::Number(number)) = value else {
        return None;
    };
    truncate_non_negative(number)
}

fn truncate_non_negative(number: &Number) -> Option<u64> {
    if let Some(n) = number.as_u64() {
        return Some(n);
    }
    if number.is_i64() {
        // Only negative integers reach here.
        return Some(0);
    }
    let float = number.as_f64()?;
    if !float.is_finite() {
        return None;
    }
    // Float-to-int `as` saturates at both ends.
    Some(float.trunc().max(0.0) as u64)
}

/// A non-empty array is kept element for element.
fn coerce_projects(value: Option<&Value>) -> Option<Vec<ProjectRecord>> {
    match value {
        Some(Value::Array(items)) if !items.is_empty() => Some(
            items
                .iter()
                .cloned()
                .map(ProjectRecord::from_value)
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::default_projects;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn defaults() -> StoreDocument {
        StoreDocument::default()
    }

    #[test]
    fn non_object_yields_defaults() {
        for raw in [json!(null), json!(42), json!("x"), json!([1, 2, 3])] {
            assert_eq!(normalize(&raw, &defaults()), defaults());
        }
    }

    #[test]
    fn counters_are_truncated_and_clamped() {
        let doc = normalize(&json!({"endorsements": 7.9, "visitors": -3}), &defaults());
        assert_eq!(doc.endorsements, 7);
        assert_eq!(doc.visitors, 0);

        let doc = normalize(&json!({"endorsements": -0.5, "visitors": 1e300}), &defaults());
        assert_eq!(doc.endorsements, 0);
        assert_eq!(doc.visitors, u64::MAX);
    }

    #[test]
    fn large_integer_counters_survive_exactly() {
        let big = (1u64 << 53) + 1;
        let doc = normalize(&json!({ "endorsements": big }), &defaults());
        assert_eq!(doc.endorsements, big);
    }

    #[test]
    fn non_numeric_counters_keep_default() {
        let mut base = defaults();
        base.endorsements = 4;
        let doc = normalize(&json!({"endorsements": "12", "visitors": null}), &base);
        assert_eq!(doc.endorsements, 4);
        assert_eq!(doc.visitors, 0);
    }

    #[test]
    fn empty_or_invalid_projects_fall_back() {
        for projects in [json!([]), json!({}), json!("none"), json!(null)] {
            let doc = normalize(&json!({ "projects": projects }), &defaults());
            assert_eq!(doc.projects, default_projects());
        }
        let doc = normalize(&json!({}), &defaults());
        assert_eq!(doc.projects, default_projects());
    }

    #[test]
    fn stored_projects_replace_defaults() {
        let doc = normalize(
            &json!({"projects": [{"name": "Solo", "desc": "d", "link": "l", "stars": 5}]}),
            &defaults(),
        );
        assert_eq!(doc.projects.len(), 1);
        assert_eq!(doc.projects[0].name(), Some("Solo"));
        assert_eq!(doc.projects[0].get("stars"), Some(&json!(5)));
    }

    #[test]
    fn project_entries_are_kept_unexamined() {
        let projects = json!([
            {"name": "Mine", "desc": "d", "link": null},
            {"title": "no name at all"},
            1,
            "two",
            null,
        ]);
        let doc = normalize(&json!({ "projects": projects.clone() }), &defaults());
        let kept: Vec<Value> = doc.projects.into_iter().map(ProjectRecord::into_value).collect();
        assert_eq!(Value::Array(kept), projects);
    }

    #[test]
    fn extra_cannot_shadow_schema_fields() {
        let mut draft = defaults();
        draft.endorsements = 5;
        draft.last_contact_at = Some("2026-10-19T08:00:00.000Z".to_string());
        draft.extra.insert("endorsements".to_string(), json!("oops"));
        draft.extra.insert("projects".to_string(), json!([]));
        draft.extra.insert("lastContactAt".to_string(), json!(0));
        draft.extra.insert("theme".to_string(), json!("dark"));

        let doc = normalize_document(&draft, &defaults()).unwrap();
        assert_eq!(doc.endorsements, 5);
        assert_eq!(doc.projects, default_projects());
        assert_eq!(doc.last_contact_at.as_deref(), Some("2026-10-19T08:00:00.000Z"));
        assert_eq!(doc.extra.len(), 1);
        assert_eq!(doc.extra.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn schema_keys_in_default_extra_are_ignored() {
        let mut base = defaults();
        base.extra.insert("visitors".to_string(), json!(9));
        let doc = normalize(&json!({}), &base);
        assert_eq!(doc.visitors, 0);
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn unknown_keys_pass_through() {
        let doc = normalize(
            &json!({"theme": {"accent": "teal"}, "lastContactAt": "yesterday"}),
            &defaults(),
        );
        assert_eq!(doc.extra.get("theme"), Some(&json!({"accent": "teal"})));
        assert_eq!(doc.last_contact_at.as_deref(), Some("yesterday"));
        assert!(!doc.extra.contains_key("lastContactAt"));
    }

    #[test]
    fn non_string_last_contact_is_dropped() {
        let doc = normalize(&json!({"lastContactAt": 12345}), &defaults());
        assert_eq!(doc.last_contact_at, None);
    }

    #[test]
    fn normalization_is_idempotent() {
        let candidates = [
            json!({}),
            json!({"endorsements": 3.7, "visitors": -1, "projects": []}),
            json!({"endorsements": "bad", "projects": [{"name": "n"}, false], "x": [1, 2]}),
            json!({"visitors": 1e30, "lastContactAt": "2026-10-19T08:00:00Z"}),
            json!(["not", "an", "object"]),
        ];
        for raw in candidates {
            let once = normalize(&raw, &defaults());
            let twice = normalize_document(&once, &defaults()).unwrap();
            assert_eq!(twice, once, "candidate: {raw}");
        }
    }
}
