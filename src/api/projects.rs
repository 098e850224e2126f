//! Project API handlers.

use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::config::Config;
use crate::db::DbPool;
use crate::db::paginate::PageRequest;
use crate::error::{AppError, AppResult};
use crate::models::{self, CreateProjectRequest, ListParams, PagedDocuments, ProjectResponse};

/// Create a project.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_project(
    pool: web::Data<DbPool>,
    body: web::Json<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "Project name must not be empty".to_string(),
        ));
    }

    let project = pool.create_project(name, req.title.as_deref()).await?;

    info!("Project created: id={}, name={}", project.id, project.name);

    Ok(HttpResponse::Created().json(ProjectResponse::from(project)))
}

/// List projects with filtering and pagination.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("pageSize" = Option<u64>, Query, description = "Results per page (default 25, max 500)"),
        ("filter" = Option<String>, Query, description = "Filter expressions, repeatable or comma-separated")
    ),
    responses(
        (status = 200, description = "Paged list of projects", body = PagedDocuments)
    )
)]
pub async fn list_projects(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    params: web::Query<ListParams>,
) -> AppResult<HttpResponse> {
    let filters = models::parse_filter_params(req.query_string());
    let request = PageRequest::from(&*params);

    let (projects, pagination) = pool
        .list_projects(&filters, &request, &config.query)
        .await?;

    let items = projects.iter().map(models::project::to_document).collect();
    Ok(HttpResponse::Ok().json(PagedDocuments { items, pagination }))
}

/// Fetch one project by id or name.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(
        ("id" = String, Path, description = "Project id or url-safe name")
    ),
    responses(
        (status = 200, description = "Project detail", body = ProjectResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_project(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let reference = path.into_inner();
    let project = pool
        .resolve_project(&reference)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    Ok(HttpResponse::Ok().json(ProjectResponse::from(project)))
}

/// Configure project routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/projects")
            .route(web::get().to(list_projects))
            .route(web::post().to(create_project)),
    )
    .service(web::resource("/projects/{id}").route(web::get().to(get_project)));
}
