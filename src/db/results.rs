//! Result queries.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, Value,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::db::paginate::{self, PageRequest};
use crate::db::DbPool;
use crate::entity::result::{self, Entity as TestResult};
use crate::error::{AppError, AppResult};
use crate::filters::{self, RESULT_COLUMNS};
use crate::models::document;
use crate::models::run::PromotedFields;
use crate::models::Pagination;

/// Builds a result row from a posted document.
pub fn result_from_document(
    id: Option<Uuid>,
    run_id: Option<Uuid>,
    project_id: Option<Uuid>,
    doc: &JsonValue,
) -> result::ActiveModel {
    let promoted = PromotedFields::from_document(doc);
    let mut data = doc.clone();
    if let Some(body) = data.as_object_mut() {
        body.remove("id");
    }

    result::ActiveModel {
        id: Set(id.unwrap_or_else(Uuid::now_v7)),
        run_id: Set(run_id),
        project_id: Set(project_id),
        test_id: Set(document::get_str(doc, "test_id").map(str::to_string)),
        result: Set(document::get_str(doc, "result").map(str::to_string)),
        component: Set(promoted.component),
        env: Set(promoted.env),
        source: Set(promoted.source),
        start_time: Set(promoted.start_time),
        duration: Set(promoted.duration),
        data: Set(data),
    }
}

impl DbPool {
    pub async fn create_result(&self, model: result::ActiveModel) -> AppResult<result::Model> {
        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create result: {}", e)))
    }

    pub async fn create_results_bulk(&self, models: Vec<result::ActiveModel>) -> AppResult<usize> {
        if models.is_empty() {
            return Ok(0);
        }
        let inserted = models.len();
        TestResult::insert_many(models)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert results: {}", e)))?;
        Ok(inserted)
    }

    pub async fn get_result(&self, id: Uuid) -> AppResult<Option<result::Model>> {
        TestResult::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get result: {}", e)))
    }

    pub async fn list_results(
        &self,
        filter_strings: &[String],
        project_id: Option<Uuid>,
        request: &PageRequest,
        query_config: &QueryConfig,
    ) -> AppResult<(Vec<result::Model>, Pagination)> {
        let mut select =
            filters::apply_filters(TestResult::find(), filter_strings, &RESULT_COLUMNS);
        if let Some(project_id) = project_id {
            select = select.filter(result::Column::ProjectId.eq(project_id));
        }
        let select = select.order_by_desc(result::Column::StartTime);
        paginate::paginate(self.connection(), select, request, query_config).await
    }

    /// All results of one run, oldest first, the order the aggregator folds
    /// them in.
    pub async fn results_for_run(&self, run_id: Uuid) -> AppResult<Vec<result::Model>> {
        TestResult::find()
            .filter(result::Column::RunId.eq(run_id))
            .order_by_asc(result::Column::StartTime)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load run results: {}", e)))
    }

    /// Filtered results without pagination, bounded by `limit`, oldest
    /// first. Report generation renders from this.
    pub async fn filtered_results(
        &self,
        filter_strings: &[String],
        project_id: Option<Uuid>,
        limit: u64,
    ) -> AppResult<Vec<result::Model>> {
        let mut select =
            filters::apply_filters(TestResult::find(), filter_strings, &RESULT_COLUMNS);
        if let Some(project_id) = project_id {
            select = select.filter(result::Column::ProjectId.eq(project_id));
        }
        select
            .order_by_asc(result::Column::StartTime)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load filtered results: {}", e)))
    }

    /// Deletes at most `limit` results older than the cutoff. Returns the
    /// number of deleted rows.
    pub async fn delete_results_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
        limit: u64,
    ) -> AppResult<u64> {
        let result = TestResult::delete_many()
            .filter(Expr::cust_with_values(
                "id IN (SELECT id FROM results WHERE start_time < $1 ORDER BY start_time LIMIT $2)",
                [Value::from(cutoff), Value::from(limit as i64)],
            ))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to prune results: {}", e)))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_from_document_promotes_columns() {
        let run_id = Uuid::now_v7();
        let doc = json!({
            "test_id": "tests/test_login.py::test_ok",
            "result": "failed",
            "component": "frontend",
            "duration": 2.5,
            "start_time": "2026-03-01T10:00:00Z",
            "metadata": {"env": "prod"},
            "id": "should-be-stripped"
        });

        let model = result_from_document(None, Some(run_id), None, &doc);
        assert_eq!(
            model.test_id.unwrap(),
            Some("tests/test_login.py::test_ok".to_string())
        );
        assert_eq!(model.result.unwrap(), Some("failed".to_string()));
        assert_eq!(model.component.unwrap(), Some("frontend".to_string()));
        assert_eq!(model.duration.unwrap(), Some(2.5));
        assert_eq!(model.run_id.unwrap(), Some(run_id));
        let data = model.data.unwrap();
        assert!(data.get("id").is_none());
        assert_eq!(data["metadata"]["env"], json!("prod"));
    }
}
