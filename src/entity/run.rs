//! Run entity for SeaORM.
//!
//! A run is one execution of a test session. The `data` JSONB document holds
//! the flexible fields (metadata, summary, created); frequently filtered or
//! sorted fields are promoted to scalar columns.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub component: Option<String>,
    pub env: Option<String>,
    pub source: Option<String>,
    pub start_time: Option<DateTimeUtc>,
    /// Total duration in seconds, recomputed by the run aggregator.
    pub duration: Option<f64>,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: JsonValue,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(has_many = "super::result::Entity")]
    Results,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Results.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
