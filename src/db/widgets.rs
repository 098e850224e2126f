//! Shared aggregation queries behind the dashboard widgets.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entity::result::{self, Entity as TestResult};
use crate::error::{AppError, AppResult};
use crate::filters::{self, RESULT_COLUMNS};

/// One group in an aggregation: the grouped value and how many results
/// carried it. `value` is NULL for results missing the field.
#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize, ToSchema)]
pub struct AggregateBucket {
    pub value: Option<String>,
    pub count: i64,
}

impl DbPool {
    /// Counts results grouped by any filterable field, most common first.
    /// The same filter language as `GET /results` narrows the input set.
    pub async fn aggregate_results(
        &self,
        group_field: &str,
        filter_strings: &[String],
        project_id: Option<Uuid>,
        days: Option<f64>,
        limit: u64,
    ) -> AppResult<Vec<AggregateBucket>> {
        let column = filters::resolve(group_field, &RESULT_COLUMNS).ok_or_else(|| {
            AppError::InvalidInput(format!("Cannot group by unknown field '{}'", group_field))
        })?;
        let group_expr = column.text_sql();

        let mut select =
            filters::apply_filters(TestResult::find(), filter_strings, &RESULT_COLUMNS);
        if let Some(project_id) = project_id {
            select = select.filter(result::Column::ProjectId.eq(project_id));
        }
        if let Some(days) = days {
            select = select.filter(Expr::cust_with_values(
                "start_time >= NOW() - make_interval(days => $1)",
                [days],
            ));
        }

        select
            .select_only()
            .expr_as(Expr::cust(group_expr.clone()), "value")
            .expr_as(Expr::cust("COUNT(*)"), "count")
            .group_by(Expr::cust(group_expr))
            .order_by_desc(Expr::cust("count"))
            .limit(limit)
            .into_model::<AggregateBucket>()
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to aggregate results: {}", e)))
    }
}
