//! Project queries.

use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::db::paginate::{self, PageRequest};
use crate::db::DbPool;
use crate::entity::project::{self, Entity as Project};
use crate::error::{AppError, AppResult};
use crate::filters::{self, PROJECT_COLUMNS};
use crate::models::Pagination;

impl DbPool {
    pub async fn create_project(
        &self,
        name: &str,
        title: Option<&str>,
    ) -> AppResult<project::Model> {
        let now = chrono::Utc::now();
        let model = project::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            title: Set(title.unwrap_or(name).to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(self.connection()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::InvalidInput(format!("Project '{}' already exists", name))
            } else {
                AppError::Database(format!("Failed to create project: {}", e))
            }
        })
    }

    pub async fn get_project(&self, id: Uuid) -> AppResult<Option<project::Model>> {
        Project::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get project: {}", e)))
    }

    pub async fn get_project_by_name(&self, name: &str) -> AppResult<Option<project::Model>> {
        Project::find()
            .filter(project::Column::Name.eq(name))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get project: {}", e)))
    }

    /// Looks a project up by UUID or by its unique name.
    pub async fn resolve_project(&self, reference: &str) -> AppResult<Option<project::Model>> {
        if let Ok(id) = Uuid::parse_str(reference) {
            return self.get_project(id).await;
        }
        self.get_project_by_name(reference).await
    }

    pub async fn list_projects(
        &self,
        filter_strings: &[String],
        request: &PageRequest,
        query_config: &QueryConfig,
    ) -> AppResult<(Vec<project::Model>, Pagination)> {
        let select = filters::apply_filters(Project::find(), filter_strings, &PROJECT_COLUMNS)
            .order_by_asc(project::Column::Name);
        paginate::paginate(self.connection(), select, request, query_config).await
    }
}
