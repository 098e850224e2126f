//! Report API handlers.

use actix_web::{HttpResponse, web};
use serde_json::{Value as JsonValue, json};
use tracing::info;
use uuid::Uuid;

use crate::api::scoped_project_id;
use crate::config::Config;
use crate::db::DbPool;
use crate::db::paginate::PageRequest;
use crate::error::{AppError, AppResult};
use crate::models::{self, CreateReportRequest, ListParams, PagedDocuments, ReportStatus};
use crate::services::Storage;
use crate::tasks;

/// Request a report artifact.
///
/// Creates the report row and queues rendering; poll the report's status
/// or the returned task id to learn when the artifact is ready.
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    tag = "Reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report queued"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown project", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_report(
    pool: web::Data<DbPool>,
    body: web::Json<CreateReportRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let project_id = scoped_project_id(&pool, req.project.as_deref()).await?;

    // The params column records the request so the renderer and later
    // readers see what the artifact was built from.
    let mut params = serde_json::Map::new();
    params.insert("view".to_string(), json!(req.view.as_str()));
    if let Some(filter) = &req.filter {
        params.insert("filter".to_string(), json!(filter));
    }
    if let Some(source) = &req.source {
        params.insert("source".to_string(), json!(source));
    }
    if let Some(project) = &req.project {
        params.insert("project".to_string(), json!(project));
    }

    let report = pool
        .create_report(project_id, req.view, JsonValue::Object(params))
        .await?;

    let task = pool
        .enqueue_task(
            tasks::reports::GENERATE_REPORT,
            json!([{ "id": report.id }]),
            json!({}),
        )
        .await?;

    info!(
        "Report queued: id={}, view={}, task={}",
        report.id, report.view, task.id
    );

    let mut document = models::report::to_document(&report);
    models::document::set(&mut document, "task_id", json!(task.id));
    Ok(HttpResponse::Created().json(document))
}

/// List reports, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    tag = "Reports",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("pageSize" = Option<u64>, Query, description = "Results per page (default 25, max 500)")
    ),
    responses(
        (status = 200, description = "Paged list of reports", body = PagedDocuments)
    )
)]
pub async fn list_reports(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    params: web::Query<ListParams>,
) -> AppResult<HttpResponse> {
    let request = PageRequest::from(&*params);
    let (reports, pagination) = pool.list_reports(&request, &config.query).await?;

    let items = reports.iter().map(models::report::to_document).collect();
    Ok(HttpResponse::Ok().json(PagedDocuments { items, pagination }))
}

/// Fetch one report.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "Report id")
    ),
    responses(
        (status = 200, description = "Report document"),
        (status = 404, description = "Report not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_report(pool: web::Data<DbPool>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let report = pool
        .get_report(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Report".to_string()))?;

    Ok(HttpResponse::Ok().json(models::report::to_document(&report)))
}

/// Download a finished report artifact.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}/download",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "Report id")
    ),
    responses(
        (status = 200, description = "Report artifact"),
        (status = 400, description = "Report is not ready", body = crate::error::ErrorResponse),
        (status = 404, description = "Report not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn download_report(
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let report = pool
        .get_report(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Report".to_string()))?;

    if ReportStatus::parse(&report.status) != Some(ReportStatus::Done) {
        return Err(AppError::InvalidInput(format!(
            "Report is not ready for download (status: {})",
            report.status
        )));
    }

    let key = Storage::report_key(report.id, &report.filename);
    let (bytes, content_type) = storage.get(&key).await?;
    let content_type = content_type.unwrap_or_else(|| report.mimetype.clone());

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", report.filename),
        ))
        .body(bytes))
}

/// Configure report routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/reports/{id}/download").route(web::get().to(download_report)))
        .service(
            web::resource("/reports")
                .route(web::get().to(list_reports))
                .route(web::post().to(create_report)),
        )
        .service(web::resource("/reports/{id}").route(web::get().to(get_report)));
}
