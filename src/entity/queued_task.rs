//! Queued task entity for SeaORM.
//!
//! One durable row per enqueued background task. Workers claim due rows with
//! FOR UPDATE SKIP LOCKED, so the table is both broker and result backend.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "queued_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Registered handler name (e.g. "update_run").
    pub name: String,
    /// Positional arguments (JSON array).
    #[sea_orm(column_type = "JsonBinary")]
    pub args: JsonValue,
    /// Keyword arguments (JSON object).
    #[sea_orm(column_type = "JsonBinary")]
    pub kwargs: JsonValue,
    /// pending, started, retry, success or failure.
    pub state: String,
    /// Number of failed attempts so far.
    pub retries: i32,
    /// Earliest time the task may be claimed.
    pub not_before: DateTimeUtc,
    /// Set when a worker claims the task; used for stale-lease recovery.
    pub started_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub result: Option<JsonValue>,
    pub error: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
