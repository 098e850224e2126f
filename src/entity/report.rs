//! Report entity for SeaORM.
//!
//! A report row tracks one requested artifact (csv/json/text rendering of
//! filtered results). The artifact itself lives in object storage.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub filename: String,
    pub mimetype: String,
    /// Renderer name: csv, json or text.
    pub view: String,
    pub status: String,
    /// Request parameters the artifact was generated from (filter, source).
    #[sea_orm(column_type = "JsonBinary")]
    pub params: JsonValue,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
