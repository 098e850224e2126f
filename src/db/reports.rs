//! Report queries.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::db::paginate::{self, PageRequest};
use crate::db::DbPool;
use crate::entity::report::{self, Entity as Report};
use crate::error::{AppError, AppResult};
use crate::models::{Pagination, ReportStatus, ReportView};

impl DbPool {
    pub async fn create_report(
        &self,
        project_id: Option<Uuid>,
        view: ReportView,
        params: JsonValue,
    ) -> AppResult<report::Model> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();
        let model = report::ActiveModel {
            id: Set(id),
            project_id: Set(project_id),
            filename: Set(format!("report-{}.{}", id, view.extension())),
            mimetype: Set(view.mimetype().to_string()),
            view: Set(view.as_str().to_string()),
            status: Set(ReportStatus::Pending.as_str().to_string()),
            params: Set(params),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create report: {}", e)))
    }

    pub async fn get_report(&self, id: Uuid) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get report: {}", e)))
    }

    pub async fn list_reports(
        &self,
        request: &PageRequest,
        query_config: &QueryConfig,
    ) -> AppResult<(Vec<report::Model>, Pagination)> {
        let select = Report::find().order_by_desc(report::Column::CreatedAt);
        paginate::paginate(self.connection(), select, request, query_config).await
    }

    /// Updates a report's status. Returns how many rows matched, so callers
    /// that race a deletion can treat 0 as a no-op.
    pub async fn set_report_status(&self, id: Uuid, status: ReportStatus) -> AppResult<u64> {
        let result = Report::update_many()
            .col_expr(report::Column::Status, Expr::value(status.as_str()))
            .filter(report::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update report status: {}", e)))?;
        Ok(result.rows_affected)
    }

    pub async fn delete_report(&self, id: Uuid) -> AppResult<()> {
        Report::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete report: {}", e)))?;
        Ok(())
    }

    /// Reports created before the cutoff, oldest first, for artifact pruning.
    pub async fn reports_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
        limit: u64,
    ) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::CreatedAt.lt(cutoff))
            .order_by_asc(report::Column::CreatedAt)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list old reports: {}", e)))
    }
}
