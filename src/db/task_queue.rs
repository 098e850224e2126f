//! Durable task queue backed by the `queued_tasks` table.
//!
//! The table is both broker and result backend. Claims use
//! `FOR UPDATE SKIP LOCKED` so any number of workers can poll concurrently
//! without handing the same task to two of them.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, QueryFilter, Set, Statement,
    Value,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entity::queued_task::{self, Entity as QueuedTask};
use crate::error::{AppError, AppResult};
use crate::models::TaskState;

impl DbPool {
    /// Inserts a pending task due immediately and returns its row.
    pub async fn enqueue_task(
        &self,
        name: &str,
        args: JsonValue,
        kwargs: JsonValue,
    ) -> AppResult<queued_task::Model> {
        let now = Utc::now();
        let model = queued_task::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            args: Set(args),
            kwargs: Set(kwargs),
            state: Set(TaskState::Pending.as_str().to_string()),
            retries: Set(0),
            not_before: Set(now),
            started_at: Set(None),
            result: Set(None),
            error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to enqueue task: {}", e)))
    }

    /// Atomically claims up to `limit` due tasks, marking them started.
    /// Rows already claimed by another worker are skipped, not waited on.
    pub async fn claim_due_tasks(&self, limit: u64) -> AppResult<Vec<queued_task::Model>> {
        let stmt = Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "UPDATE queued_tasks SET state = 'started', started_at = NOW() \
             WHERE id IN ( \
                 SELECT id FROM queued_tasks \
                 WHERE state IN ('pending', 'retry') AND not_before <= NOW() \
                 ORDER BY not_before \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING *",
            [Value::from(limit as i64)],
        );

        queued_task::Model::find_by_statement(stmt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to claim tasks: {}", e)))
    }

    pub async fn get_task(&self, id: Uuid) -> AppResult<Option<queued_task::Model>> {
        QueuedTask::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get task: {}", e)))
    }

    pub async fn complete_task(&self, id: Uuid, result: Option<JsonValue>) -> AppResult<()> {
        let model = queued_task::ActiveModel {
            id: Set(id),
            state: Set(TaskState::Success.as_str().to_string()),
            result: Set(result),
            error: Set(None),
            ..Default::default()
        };
        model
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to complete task: {}", e)))?;
        Ok(())
    }

    /// Schedules another attempt after a failure.
    pub async fn record_task_retry(
        &self,
        id: Uuid,
        retries: i32,
        error: &str,
        not_before: DateTime<Utc>,
    ) -> AppResult<()> {
        let model = queued_task::ActiveModel {
            id: Set(id),
            state: Set(TaskState::Retry.as_str().to_string()),
            retries: Set(retries),
            error: Set(Some(error.to_string())),
            not_before: Set(not_before),
            ..Default::default()
        };
        model
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to schedule task retry: {}", e)))?;
        Ok(())
    }

    /// Marks a task permanently failed.
    pub async fn record_task_failure(&self, id: Uuid, retries: i32, error: &str) -> AppResult<()> {
        let model = queued_task::ActiveModel {
            id: Set(id),
            state: Set(TaskState::Failure.as_str().to_string()),
            retries: Set(retries),
            error: Set(Some(error.to_string())),
            ..Default::default()
        };
        model
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to record task failure: {}", e)))?;
        Ok(())
    }

    /// Requeues tasks whose worker died mid-execution: still `started` after
    /// the stale lease. Returns how many were recovered.
    pub async fn requeue_stale_tasks(&self, stale_secs: u64) -> AppResult<u64> {
        let result = QueuedTask::update_many()
            .col_expr(
                queued_task::Column::State,
                Expr::value(TaskState::Retry.as_str()),
            )
            .col_expr(
                queued_task::Column::NotBefore,
                Expr::cust("NOW()"),
            )
            .filter(queued_task::Column::State.eq(TaskState::Started.as_str()))
            .filter(Expr::cust_with_values(
                "started_at < NOW() - make_interval(secs => $1)",
                [Value::from(stale_secs as f64)],
            ))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to requeue stale tasks: {}", e)))?;
        Ok(result.rows_affected)
    }
}
