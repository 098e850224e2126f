//! Import queries.

use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, Value};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entity::import::{self, Entity as Import};
use crate::error::{AppError, AppResult};
use crate::models::ImportStatus;

impl DbPool {
    pub async fn create_import(
        &self,
        filename: &str,
        format: &str,
        data: JsonValue,
    ) -> AppResult<import::Model> {
        let now = chrono::Utc::now();
        let model = import::ActiveModel {
            id: Set(Uuid::now_v7()),
            filename: Set(filename.to_string()),
            format: Set(format.to_string()),
            status: Set(ImportStatus::Pending.as_str().to_string()),
            data: Set(data),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create import: {}", e)))
    }

    pub async fn get_import(&self, id: Uuid) -> AppResult<Option<import::Model>> {
        Import::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get import: {}", e)))
    }

    pub async fn set_import_status(&self, id: Uuid, status: ImportStatus) -> AppResult<u64> {
        let result = Import::update_many()
            .col_expr(import::Column::Status, Expr::value(status.as_str()))
            .filter(import::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update import status: {}", e)))?;
        Ok(result.rows_affected)
    }

    /// Persists status plus linkage data discovered while processing.
    pub async fn save_import(&self, model: import::ActiveModel) -> AppResult<import::Model> {
        model
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to save import: {}", e)))
    }

    /// Deletes at most `limit` imports older than the cutoff. Returns the
    /// number of deleted rows.
    pub async fn delete_imports_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
        limit: u64,
    ) -> AppResult<u64> {
        let result = Import::delete_many()
            .filter(Expr::cust_with_values(
                "id IN (SELECT id FROM imports WHERE created_at < $1 ORDER BY created_at LIMIT $2)",
                [Value::from(cutoff), Value::from(limit as i64)],
            ))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to prune imports: {}", e)))?;
        Ok(result.rows_affected)
    }
}
