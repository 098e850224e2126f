//! Result entity for SeaORM.
//!
//! One executed test case. Results are written once by ingest and never
//! structurally mutated afterwards; only scheduled pruning deletes them.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub run_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    /// Fully qualified test name (e.g. "tests/api/test_login.py::test_ok").
    pub test_id: Option<String>,
    pub component: Option<String>,
    pub env: Option<String>,
    pub source: Option<String>,
    /// Outcome string: passed, failed, error, skipped, xfailed, xpassed, manual.
    pub result: Option<String>,
    pub start_time: Option<DateTimeUtc>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: JsonValue,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::run::Entity",
        from = "Column::RunId",
        to = "super::run::Column::Id"
    )]
    Run,
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Run.def()
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
