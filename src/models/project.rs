//! Project domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::project;

/// Request to create a project.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    /// URL-safe unique name (e.g. "my-project").
    pub name: String,
    /// Human readable title; defaults to the name.
    #[serde(default)]
    pub title: Option<String>,
}

/// Project representation in API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<project::Model> for ProjectResponse {
    fn from(m: project::Model) -> Self {
        ProjectResponse {
            id: m.id,
            name: m.name,
            title: m.title,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Serialize a project row into the flat API document.
pub fn to_document(m: &project::Model) -> serde_json::Value {
    serde_json::json!({
        "id": m.id,
        "name": m.name,
        "title": m.title,
        "created": m.created_at.to_rfc3339(),
        "updated": m.updated_at.to_rfc3339(),
    })
}
