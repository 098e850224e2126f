//! Import entity for SeaORM.
//!
//! Tracks one uploaded run archive through the ingest pipeline. The archive
//! bytes live in object storage; `data` records linkage (run_id, project_id)
//! discovered during processing.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "imports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub filename: String,
    /// Archive format; currently always "json" (JSON run archive).
    pub format: String,
    pub status: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: JsonValue,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
