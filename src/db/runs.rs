//! Run queries.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, Set,
    Statement, Value,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::db::paginate::{self, PageRequest};
use crate::db::DbPool;
use crate::entity::run::{self, Entity as Run};
use crate::error::{AppError, AppResult};
use crate::filters::{self, RUN_COLUMNS};
use crate::models::run::PromotedFields;
use crate::models::Pagination;

impl DbPool {
    /// Inserts a run from a posted document. An explicit id is honored so
    /// re-imports stay idempotent; otherwise a v7 UUID is generated.
    pub async fn create_run(
        &self,
        id: Option<Uuid>,
        project_id: Option<Uuid>,
        document: &JsonValue,
    ) -> AppResult<run::Model> {
        let promoted = PromotedFields::from_document(document);
        let mut data = document.clone();
        if let Some(body) = data.as_object_mut() {
            body.remove("id");
        }

        let model = run::ActiveModel {
            id: Set(id.unwrap_or_else(Uuid::now_v7)),
            project_id: Set(project_id),
            component: Set(promoted.component),
            env: Set(promoted.env),
            source: Set(promoted.source),
            start_time: Set(promoted.start_time),
            duration: Set(promoted.duration),
            data: Set(data),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create run: {}", e)))
    }

    pub async fn get_run(&self, id: Uuid) -> AppResult<Option<run::Model>> {
        Run::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run: {}", e)))
    }

    pub async fn list_runs(
        &self,
        filter_strings: &[String],
        project_id: Option<Uuid>,
        request: &PageRequest,
        query_config: &QueryConfig,
    ) -> AppResult<(Vec<run::Model>, Pagination)> {
        let mut select = filters::apply_filters(Run::find(), filter_strings, &RUN_COLUMNS);
        if let Some(project_id) = project_id {
            select = select.filter(run::Column::ProjectId.eq(project_id));
        }
        let select = select.order_by_desc(run::Column::StartTime);
        paginate::paginate(self.connection(), select, request, query_config).await
    }

    /// Persists the aggregator's changes to an existing run.
    pub async fn save_run(&self, model: run::ActiveModel) -> AppResult<run::Model> {
        model
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to save run: {}", e)))
    }

    /// Finds recent runs whose stored summary disagrees with the actual
    /// number of linked results.
    pub async fn aborted_run_ids(&self, window_secs: u64) -> AppResult<Vec<Uuid>> {
        #[derive(Debug, FromQueryResult)]
        struct RunIdRow {
            id: Uuid,
        }

        let stmt = Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT r.id FROM runs r \
             WHERE r.start_time >= NOW() - make_interval(secs => $1) \
               AND COALESCE((r.data #>> '{summary,tests}')::bigint, -1) <> \
                   (SELECT COUNT(*) FROM results WHERE results.run_id = r.id)",
            [Value::from(window_secs as f64)],
        );

        let rows = RunIdRow::find_by_statement(stmt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find aborted runs: {}", e)))?;

        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    /// Deletes at most `limit` runs older than the cutoff. Linked results go
    /// with them via the FK cascade. Returns the number of deleted rows.
    pub async fn delete_runs_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
        limit: u64,
    ) -> AppResult<u64> {
        let result = Run::delete_many()
            .filter(Expr::cust_with_values(
                "id IN (SELECT id FROM runs WHERE start_time < $1 ORDER BY start_time LIMIT $2)",
                [Value::from(cutoff), Value::from(limit as i64)],
            ))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to prune runs: {}", e)))?;
        Ok(result.rows_affected)
    }
}
