//! Report domain models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use utoipa::ToSchema;

use crate::entity::report;
use crate::models::document;

/// Report lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Running,
    Done,
    /// The filter matched no results; no artifact was written.
    Empty,
    Error,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Empty => "empty",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "empty" => Some(Self::Empty),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Artifact renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportView {
    Csv,
    Json,
    Text,
}

impl ReportView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn mimetype(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Text => "text/plain",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

impl std::fmt::Display for ReportView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to generate a report artifact.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    /// Renderer for the artifact.
    pub view: ReportView,
    /// Filter expressions applied to results, comma separated.
    #[serde(default)]
    pub filter: Option<String>,
    /// Restrict to results from one source.
    #[serde(default)]
    pub source: Option<String>,
    /// Project id or name to scope the report to.
    #[serde(default)]
    pub project: Option<String>,
}

/// Serialize a report row into the flat API document.
pub fn to_document(m: &report::Model) -> JsonValue {
    document::merge(
        &m.params,
        vec![
            ("id", json!(m.id)),
            ("project_id", json!(m.project_id)),
            ("filename", json!(m.filename)),
            ("mimetype", json!(m.mimetype)),
            ("view", json!(m.view)),
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
    fn test_view_mimetypes() {
        assert_eq!(ReportView::Csv.mimetype(), "text/csv");
        assert_eq!(ReportView::Json.mimetype(), "application/json");
        assert_eq!(ReportView::Text.mimetype(), "text/plain");
        assert_eq!(ReportView::Text.extension(), "txt");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ReportStatus::parse("pending"), Some(ReportStatus::Pending));
        assert_eq!(ReportStatus::parse("empty"), Some(ReportStatus::Empty));
        assert_eq!(ReportStatus::parse("bogus"), None);
    }
}
