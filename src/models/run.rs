//! Run domain models and serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use utoipa::ToSchema;

use crate::entity::run;
use crate::models::document;

/// Metadata keys the run aggregator copies from results onto the run.
///
/// Only these keys are backfilled, and existing run-level values are never
/// overwritten.
pub const METADATA_BACKFILL_KEYS: &[&str] = &["component", "env", "project", "jenkins", "tags"];

/// Aggregated outcome counts stored under `data.summary`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RunSummary {
    #[serde(default)]
    pub errors: i64,
    #[serde(default)]
    pub failures: i64,
    #[serde(default)]
    pub skips: i64,
    #[serde(default)]
    pub tests: i64,
    #[serde(default)]
    pub xfailures: i64,
    #[serde(default)]
    pub xpasses: i64,
}

impl RunSummary {
    /// Read a summary out of a run document, tolerating missing keys.
    pub fn from_document(data: &JsonValue) -> Self {
        document::get(data, "summary")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Write this summary into `data.summary`, preserving any extra keys the
    /// document already carries (e.g. `collected` from the test runner).
    pub fn write_to(&self, data: &mut JsonValue) {
        let mut summary = document::get(data, "summary")
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        summary.insert("errors".into(), json!(self.errors));
        summary.insert("failures".into(), json!(self.failures));
        summary.insert("skips".into(), json!(self.skips));
        summary.insert("tests".into(), json!(self.tests));
        summary.insert("xfailures".into(), json!(self.xfailures));
        summary.insert("xpasses".into(), json!(self.xpasses));
        document::set(data, "summary", JsonValue::Object(summary));
    }
}

/// Serialize a run row into the flat API document.
pub fn to_document(m: &run::Model) -> JsonValue {
    document::merge(
        &m.data,
        vec![
            ("id", json!(m.id)),
            ("project_id", json!(m.project_id)),
            ("component", json!(m.component)),
            ("env", json!(m.env)),
            ("source", json!(m.source)),
            (
                "start_time",
                m.start_time
                    .map(|t| json!(t.to_rfc3339()))
                    .unwrap_or(JsonValue::Null),
            ),
            ("duration", json!(m.duration)),
        ],
    )
}

/// Parse a timestamp out of a posted document field.
///
/// Accepts RFC 3339 strings or numeric epoch seconds; anything else is None.
pub fn parse_start_time(value: Option<&JsonValue>) -> Option<DateTime<Utc>> {
    match value {
        Some(JsonValue::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
        _ => None,
    }
}

/// Extract the promoted scalar columns from a posted run or result document.
#[derive(Debug, Default, Clone)]
pub struct PromotedFields {
    pub component: Option<String>,
    pub env: Option<String>,
    pub source: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
}

impl PromotedFields {
    pub fn from_document(doc: &JsonValue) -> Self {
        PromotedFields {
            component: document::get_str(doc, "component")
                .or_else(|| document::get_str(doc, "metadata.component"))
                .map(str::to_string),
            env: document::get_str(doc, "env")
                .or_else(|| document::get_str(doc, "metadata.env"))
                .map(str::to_string),
            source: document::get_str(doc, "source").map(str::to_string),
            start_time: parse_start_time(document::get(doc, "start_time")),
            duration: document::get_f64(doc, "duration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_roundtrip_preserves_extra_keys() {
        let mut data = json!({"summary": {"collected": 12, "tests": 1}});
        let summary = RunSummary {
            errors: 1,
            failures: 2,
            skips: 0,
            tests: 10,
            xfailures: 0,
            xpasses: 3,
        };
        summary.write_to(&mut data);

        assert_eq!(data["summary"]["collected"], json!(12));
        assert_eq!(data["summary"]["tests"], json!(10));
        assert_eq!(data["summary"]["failures"], json!(2));
        assert_eq!(RunSummary::from_document(&data), summary);
    }

    #[test]
    fn test_summary_from_missing_document() {
        let data = json!({});
        assert_eq!(RunSummary::from_document(&data), RunSummary::default());
    }

    #[test]
    fn test_parse_start_time_accepts_rfc3339_and_epoch() {
        let t = parse_start_time(Some(&json!("2026-03-01T10:00:00Z")));
        assert!(t.is_some());

        let t = parse_start_time(Some(&json!(1767225600.0)));
        assert!(t.is_some());

        assert!(parse_start_time(Some(&json!("yesterday"))).is_none());
        assert!(parse_start_time(None).is_none());
    }

    #[test]
    fn test_promoted_fields_prefer_top_level() {
        let doc = json!({
            "component": "api",
            "metadata": {"component": "ignored", "env": "staging"},
            "duration": 4.5,
            "start_time": "2026-03-01T10:00:00Z"
        });
        let fields = PromotedFields::from_document(&doc);
        assert_eq!(fields.component.as_deref(), Some("api"));
        assert_eq!(fields.env.as_deref(), Some("staging"));
        assert_eq!(fields.duration, Some(4.5));
        assert!(fields.start_time.is_some());
        assert!(fields.source.is_none());
    }
}
