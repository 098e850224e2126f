//! Run API handlers.

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use crate::api::scoped_project_id;
use crate::config::Config;
use crate::db::DbPool;
use crate::db::paginate::PageRequest;
use crate::error::{AppError, AppResult};
use crate::models::{self, ListParams, PagedDocuments, document};
use crate::tasks;

/// List runs with filtering and pagination.
///
/// `estimate=true` answers with the planner's row estimate instead of a
/// real count when the match is large.
#[utoipa::path(
    get,
    path = "/api/v1/runs",
    tag = "Runs",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("pageSize" = Option<u64>, Query, description = "Results per page (default 25, max 500)"),
        ("filter" = Option<String>, Query, description = "Filter expressions, repeatable or comma-separated"),
        ("estimate" = Option<bool>, Query, description = "Use the planner's row estimate for the total"),
        ("countMode" = Option<String>, Query, description = "'exact' retries a timed-out count without the time budget"),
        ("project" = Option<String>, Query, description = "Project id or name to scope the query")
    ),
    responses(
        (status = 200, description = "Paged list of runs", body = PagedDocuments),
        (status = 404, description = "Unknown project", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_runs(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    params: web::Query<ListParams>,
) -> AppResult<HttpResponse> {
    let filters = models::parse_filter_params(req.query_string());
    let request = PageRequest::from(&*params);
    let project_id = scoped_project_id(&pool, params.project.as_deref()).await?;

    let (runs, pagination) = pool
        .list_runs(&filters, project_id, &request, &config.query)
        .await?;

    let items = runs.iter().map(models::run::to_document).collect();
    Ok(HttpResponse::Ok().json(PagedDocuments { items, pagination }))
}

/// Fetch one run.
#[utoipa::path(
    get,
    path = "/api/v1/runs/{id}",
    tag = "Runs",
    params(
        ("id" = Uuid, Path, description = "Run id")
    ),
    responses(
        (status = 200, description = "Run document"),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_run(pool: web::Data<DbPool>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let run = pool
        .get_run(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Run".to_string()))?;

    Ok(HttpResponse::Ok().json(models::run::to_document(&run)))
}

/// Create a run from a posted document.
///
/// The document's `project` (or `metadata.project`) reference is resolved
/// to a project when it names one. Summary aggregation is queued right
/// away so a run created ahead of its results converges once they arrive.
#[utoipa::path(
    post,
    path = "/api/v1/runs",
    tag = "Runs",
    request_body = Object,
    responses(
        (status = 201, description = "Run created"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_run(
    pool: web::Data<DbPool>,
    body: web::Json<JsonValue>,
) -> AppResult<HttpResponse> {
    let doc = body.into_inner();
    if !doc.is_object() {
        return Err(AppError::InvalidInput(
            "Run document must be a JSON object".to_string(),
        ));
    }

    let project_id = match document::get_str(&doc, "project")
        .or_else(|| document::get_str(&doc, "metadata.project"))
    {
        Some(reference) => pool.resolve_project(reference).await?.map(|p| p.id),
        None => None,
    };

    // An explicit id is honored so clients that generate their own run ids
    // can post results against them before the run document lands.
    let id = document::get_str(&doc, "id").and_then(|s| Uuid::parse_str(s).ok());
    let run = pool.create_run(id, project_id, &doc).await?;

    pool.enqueue_task(
        tasks::runs::UPDATE_RUN,
        serde_json::json!([run.id]),
        serde_json::json!({}),
    )
    .await?;

    info!("Run created: id={}, project={:?}", run.id, run.project_id);

    Ok(HttpResponse::Created().json(models::run::to_document(&run)))
}

/// Configure run routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/runs")
            .route(web::get().to(list_runs))
            .route(web::post().to(create_run)),
    )
    .service(web::resource("/runs/{id}").route(web::get().to(get_run)));
}
