//! Result API handlers.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use tracing::info;
use uuid::Uuid;

use crate::api::scoped_project_id;
use crate::config::Config;
use crate::db::DbPool;
use crate::db::paginate::PageRequest;
use crate::db::results::result_from_document;
use crate::error::{AppError, AppResult};
use crate::models::{self, ListParams, PagedDocuments, document};
use crate::tasks;

/// List results with filtering and pagination.
#[utoipa::path(
    get,
    path = "/api/v1/results",
    tag = "Results",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("pageSize" = Option<u64>, Query, description = "Results per page (default 25, max 500)"),
        ("filter" = Option<String>, Query, description = "Filter expressions, repeatable or comma-separated"),
        ("estimate" = Option<bool>, Query, description = "Use the planner's row estimate for the total"),
        ("countMode" = Option<String>, Query, description = "'exact' retries a timed-out count without the time budget"),
        ("project" = Option<String>, Query, description = "Project id or name to scope the query")
    ),
    responses(
        (status = 200, description = "Paged list of results", body = PagedDocuments),
        (status = 404, description = "Unknown project", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_results(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    params: web::Query<ListParams>,
) -> AppResult<HttpResponse> {
    let filters = models::parse_filter_params(req.query_string());
    let request = PageRequest::from(&*params);
    let project_id = scoped_project_id(&pool, params.project.as_deref()).await?;

    let (results, pagination) = pool
        .list_results(&filters, project_id, &request, &config.query)
        .await?;

    let items = results.iter().map(models::result::to_document).collect();
    Ok(HttpResponse::Ok().json(PagedDocuments { items, pagination }))
}

/// Fetch one result.
#[utoipa::path(
    get,
    path = "/api/v1/results/{id}",
    tag = "Results",
    params(
        ("id" = Uuid, Path, description = "Result id")
    ),
    responses(
        (status = 200, description = "Result document"),
        (status = 404, description = "Result not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_result(pool: web::Data<DbPool>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let result = pool
        .get_result(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Result".to_string()))?;

    Ok(HttpResponse::Ok().json(models::result::to_document(&result)))
}

/// Create a result from a posted document.
///
/// A `run_id` naming a run that does not exist yet creates a skeleton run
/// under that id, so result streams can start before their run document is
/// posted. Summary aggregation is queued after every insert; redundant
/// aggregations collapse on the run lock.
#[utoipa::path(
    post,
    path = "/api/v1/results",
    tag = "Results",
    request_body = Object,
    responses(
        (status = 201, description = "Result created"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_result(
    pool: web::Data<DbPool>,
    body: web::Json<JsonValue>,
) -> AppResult<HttpResponse> {
    let doc = body.into_inner();
    if !doc.is_object() {
        return Err(AppError::InvalidInput(
            "Result document must be a JSON object".to_string(),
        ));
    }

    let run_id = document::get_str(&doc, "run_id").and_then(|s| Uuid::parse_str(s).ok());
    let explicit_project = match document::get_str(&doc, "project")
        .or_else(|| document::get_str(&doc, "metadata.project"))
    {
        Some(reference) => pool.resolve_project(reference).await?.map(|p| p.id),
        None => None,
    };

    let mut project_id = explicit_project;
    if let Some(run_id) = run_id {
        let run = match pool.get_run(run_id).await? {
            Some(run) => run,
            None => {
                let start_time = document::get_str(&doc, "start_time")
                    .map(str::to_string)
                    .unwrap_or_else(|| Utc::now().to_rfc3339());
                let skeleton = json!({ "start_time": start_time });
                pool.create_run(Some(run_id), explicit_project, &skeleton)
                    .await?
            }
        };
        project_id = project_id.or(run.project_id);
    }

    let model = result_from_document(None, run_id, project_id, &doc);
    let result = pool.create_result(model).await?;

    if let Some(run_id) = run_id {
        pool.enqueue_task(tasks::runs::UPDATE_RUN, json!([run_id]), json!({}))
            .await?;
    }

    info!(
        "Result created: id={}, run={:?}, test_id={:?}",
        result.id, result.run_id, result.test_id
    );

    Ok(HttpResponse::Created().json(models::result::to_document(&result)))
}

/// Configure result routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/results")
            .route(web::get().to(list_results))
            .route(web::post().to(create_result)),
    )
    .service(web::resource("/results/{id}").route(web::get().to(get_result)));
}
