//! Dotted-path access into JSONB documents.
//!
//! All reads and writes of the flexible `data` documents go through these
//! helpers so path handling stays in one place. Getters return `Option`
//! instead of inventing defaults; `set` creates intermediate objects.

use serde_json::{Map, Value as JsonValue};

/// Look up a dotted path (e.g. "metadata.run") in a document.
pub fn get<'a>(doc: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut current = doc;
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Look up a dotted path and return it as a string slice.
pub fn get_str<'a>(doc: &'a JsonValue, path: &str) -> Option<&'a str> {
    get(doc, path).and_then(|v| v.as_str())
}

/// Look up a dotted path and return it as an f64.
pub fn get_f64(doc: &JsonValue, path: &str) -> Option<f64> {
    get(doc, path).and_then(|v| v.as_f64())
}

/// Look up a dotted path and return it as an i64.
pub fn get_i64(doc: &JsonValue, path: &str) -> Option<i64> {
    get(doc, path).and_then(|v| v.as_i64())
}

/// Set a dotted path in a document, creating intermediate objects.
///
/// Intermediate values that are not objects are replaced; the document itself
/// is turned into an object if it is not one already.
pub fn set(doc: &mut JsonValue, path: &str, value: JsonValue) {
    if !doc.is_object() {
        *doc = JsonValue::Object(Map::new());
    }

    let mut current = doc;
    let parts: Vec<&str> = path.split('.').collect();
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            return;
        }
        let map = match current.as_object_mut() {
            Some(map) => map,
            None => return,
        };
        if i == parts.len() - 1 {
            map.insert((*part).to_string(), value);
            return;
        }
        let entry = map
            .entry((*part).to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !entry.is_object() {
            *entry = JsonValue::Object(Map::new());
        }
        current = entry;
    }
}

/// True when the path resolves to a non-null value.
pub fn has(doc: &JsonValue, path: &str) -> bool {
    matches!(get(doc, path), Some(v) if !v.is_null())
}

/// Merge promoted scalar fields and the id into a copy of the document.
///
/// The stored JSONB body never contains `id`; API consumers see one flat
/// object, so serialization re-attaches the id and the promoted columns here.
/// Promoted values win over any stale copies inside the document.
pub fn merge(data: &JsonValue, fields: Vec<(&str, JsonValue)>) -> JsonValue {
    let mut map = match data {
        JsonValue::Object(m) => m.clone(),
        _ => Map::new(),
    };
    map.remove("id");
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        map.insert(key.to_string(), value);
    }
    JsonValue::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested_path() {
        let doc = json!({"metadata": {"run": "63fe5", "jenkins": {"build": "42"}}});
        assert_eq!(get_str(&doc, "metadata.run"), Some("63fe5"));
        assert_eq!(get_str(&doc, "metadata.jenkins.build"), Some("42"));
        assert!(get(&doc, "metadata.missing").is_none());
        assert!(get(&doc, "metadata..run").is_none());
    }

    #[test]
    fn test_get_numbers() {
        let doc = json!({"summary": {"tests": 10, "duration": 1.5}});
        assert_eq!(get_i64(&doc, "summary.tests"), Some(10));
        assert_eq!(get_f64(&doc, "summary.duration"), Some(1.5));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut doc = json!({});
        set(&mut doc, "metadata.env", json!("prod"));
        assert_eq!(get_str(&doc, "metadata.env"), Some("prod"));

        set(&mut doc, "metadata.tags", json!(["smoke"]));
        assert_eq!(doc["metadata"]["tags"], json!(["smoke"]));
    }

    #[test]
    fn test_set_replaces_non_object_intermediate() {
        let mut doc = json!({"metadata": "oops"});
        set(&mut doc, "metadata.env", json!("dev"));
        assert_eq!(get_str(&doc, "metadata.env"), Some("dev"));
    }

    #[test]
    fn test_has_ignores_null() {
        let doc = json!({"source": null, "env": "prod"});
        assert!(!has(&doc, "source"));
        assert!(has(&doc, "env"));
    }

    #[test]
    fn test_merge_strips_stored_id_and_skips_nulls() {
        let data = json!({"id": "stale", "metadata": {"env": "prod"}});
        let merged = merge(
            &data,
            vec![
                ("id", json!("11111111-2222-7333-8444-555555555555")),
                ("component", JsonValue::Null),
                ("duration", json!(1.25)),
            ],
        );
        assert_eq!(
            merged["id"],
            json!("11111111-2222-7333-8444-555555555555")
        );
        assert_eq!(merged["duration"], json!(1.25));
        assert!(merged.get("component").is_none());
        assert_eq!(merged["metadata"]["env"], json!("prod"));
    }
}
