//! Import domain models.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use utoipa::ToSchema;

use crate::entity::import;
use crate::models::document;

/// Import lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A JSON run archive as uploaded to the import endpoint.
///
/// The archive holds one run document (optional; a skeleton is created when
/// absent) and its result documents. Field layout matches what the API itself
/// serves, so an exported run can be re-imported as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunArchive {
    #[serde(default)]
    pub run: Option<JsonValue>,
    #[serde(default)]
    pub results: Vec<JsonValue>,
}

impl RunArchive {
    /// Run id embedded in the archive, if any (used for idempotent re-import).
    pub fn run_id(&self) -> Option<uuid::Uuid> {
        self.run
            .as_ref()
            .and_then(|r| document::get_str(r, "id"))
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
    }
}

/// Serialize an import row into the flat API document.
pub fn to_document(m: &import::Model) -> JsonValue {
    document::merge(
        &m.data,
        vec![
            ("id", json!(m.id)),
            ("filename", json!(m.filename)),
            ("format", json!(m.format)),
            ("status", json!(m.status)),
            ("created", json!(m.created_at.to_rfc3339())),
            ("updated", json!(m.updated_at.to_rfc3339())),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_parses_run_and_results() {
        let raw = serde_json::json!({
            "run": {"id": "0195a8e2-1111-7222-8333-444455556666", "source": "ci"},
            "results": [
                {"test_id": "tests/test_a.py::test_one", "result": "passed"},
                {"test_id": "tests/test_a.py::test_two", "result": "failed"}
            ]
        });
        let archive: RunArchive = serde_json::from_value(raw).unwrap();
        assert_eq!(archive.results.len(), 2);
        assert!(archive.run_id().is_some());
    }

    #[test]
    fn test_archive_without_run_block() {
        let raw = serde_json::json!({
            "results": [{"test_id": "t", "result": "passed"}]
        });
        let archive: RunArchive = serde_json::from_value(raw).unwrap();
        assert!(archive.run.is_none());
        assert!(archive.run_id().is_none());
        assert_eq!(archive.results.len(), 1);
    }
}
