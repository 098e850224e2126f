//! Widget API handlers: aggregation primitives for dashboards.

use actix_web::{HttpRequest, HttpResponse, web};
use utoipa::ToSchema;

use crate::api::scoped_project_id;
use crate::db::DbPool;
use crate::db::widgets::AggregateBucket;
use crate::error::AppResult;
use crate::models;

/// Query parameters for the result aggregator.
#[derive(Debug, serde::Deserialize, ToSchema)]
pub struct AggregatorParams {
    /// Field to group by; accepts the same names as `filter=`.
    pub group_field: String,
    /// Only count results started within this many days.
    pub days: Option<f64>,
    /// Maximum number of buckets (default 10, max 500).
    #[serde(default = "default_bucket_limit")]
    pub limit: u64,
    /// Project id or name to scope the aggregation.
    pub project: Option<String>,
}

fn default_bucket_limit() -> u64 {
    10
}

/// Count results grouped by a field.
///
/// The workhorse behind the dashboard widgets: bucket counts over any
/// filterable field, most common first, with the same `filter=` language
/// as the list endpoints narrowing the input set.
#[utoipa::path(
    get,
    path = "/api/v1/widgets/result-aggregator",
    tag = "Widgets",
    params(
        ("group_field" = String, Query, description = "Field to group by (e.g. component, metadata.exception_name)"),
        ("days" = Option<f64>, Query, description = "Only count results started within this many days"),
        ("limit" = Option<u64>, Query, description = "Maximum number of buckets (default 10, max 500)"),
        ("filter" = Option<String>, Query, description = "Filter expressions, repeatable or comma-separated"),
        ("project" = Option<String>, Query, description = "Project id or name to scope the aggregation")
    ),
    responses(
        (status = 200, description = "Buckets ordered by count", body = [AggregateBucket]),
        (status = 400, description = "Unknown group field", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown project", body = crate::error::ErrorResponse)
    )
)]
pub async fn result_aggregator(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    params: web::Query<AggregatorParams>,
) -> AppResult<HttpResponse> {
    let filters = models::parse_filter_params(req.query_string());
    let project_id = scoped_project_id(&pool, params.project.as_deref()).await?;
    let limit = params.limit.clamp(1, 500);

    let buckets = pool
        .aggregate_results(
            &params.group_field,
            &filters,
            project_id,
            params.days,
            limit,
        )
        .await?;

    Ok(HttpResponse::Ok().json(buckets))
}

/// Configure widget routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/widgets/result-aggregator").route(web::get().to(result_aggregator)));
}
