//! Result domain models and serialization.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use utoipa::ToSchema;

use crate::entity::result;
use crate::models::document;

/// Outcome of one executed test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultOutcome {
    Passed,
    Failed,
    Error,
    Skipped,
    Xfailed,
    Xpassed,
    Manual,
}

impl ResultOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::Xfailed => "xfailed",
            Self::Xpassed => "xpassed",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "error" => Some(Self::Error),
            "skipped" => Some(Self::Skipped),
            "xfailed" => Some(Self::Xfailed),
            "xpassed" => Some(Self::Xpassed),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResultOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a result row into the flat API document.
pub fn to_document(m: &result::Model) -> JsonValue {
    document::merge(
        &m.data,
        vec![
            ("id", json!(m.id)),
            ("run_id", json!(m.run_id)),
            ("project_id", json!(m.project_id)),
            ("test_id", json!(m.test_id)),
            ("component", json!(m.component)),
            ("env", json!(m.env)),
            ("source", json!(m.source)),
            ("result", json!(m.result)),
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

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_outcome_parse_roundtrip() {
        for outcome in [
            ResultOutcome::Passed,
            ResultOutcome::Failed,
            ResultOutcome::Error,
            ResultOutcome::Skipped,
            ResultOutcome::Xfailed,
            ResultOutcome::Xpassed,
            ResultOutcome::Manual,
        ] {
            assert_eq!(ResultOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(ResultOutcome::parse("exploded"), None);
    }

    #[test]
    fn test_to_document_merges_promoted_columns() {
        let id = Uuid::now_v7();
        let run_id = Uuid::now_v7();
        let model = result::Model {
            id,
            run_id: Some(run_id),
            project_id: None,
            test_id: Some("tests/test_login.py::test_ok".to_string()),
            component: Some("api".to_string()),
            env: None,
            source: None,
            result: Some("passed".to_string()),
            start_time: None,
            duration: Some(0.25),
            data: json!({"metadata": {"tags": ["smoke"]}, "id": "stale"}),
        };

        let doc = to_document(&model);
        assert_eq!(doc["id"], json!(id));
        assert_eq!(doc["run_id"], json!(run_id));
        assert_eq!(doc["result"], json!("passed"));
        assert_eq!(doc["metadata"]["tags"], json!(["smoke"]));
        // nulls are dropped rather than serialized
        assert!(doc.get("env").is_none());
    }
}
