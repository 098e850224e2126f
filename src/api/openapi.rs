//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, db, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tally Server",
        version = "0.1.0",
        description = "Test-result aggregation server: runs, results, imports, generated report artifacts and dashboard widgets"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Project endpoints
        api::projects::create_project,
        api::projects::list_projects,
        api::projects::get_project,
        // Run endpoints
        api::runs::list_runs,
        api::runs::get_run,
        api::runs::create_run,
        // Result endpoints
        api::results::list_results,
        api::results::get_result,
        api::results::create_result,
        // Report endpoints
        api::reports::create_report,
        api::reports::list_reports,
        api::reports::get_report,
        api::reports::download_report,
        // Import endpoints
        api::imports::create_import,
        api::imports::get_import,
        // Task polling
        api::tasks::get_task,
        // Widgets
        api::widgets::result_aggregator,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::Pagination,
            models::PagedDocuments,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Projects
            models::CreateProjectRequest,
            models::ProjectResponse,
            // Reports
            models::ReportView,
            models::ReportStatus,
            models::CreateReportRequest,
            // Imports
            models::ImportStatus,
            // Tasks
            models::TaskState,
            models::TaskStatusResponse,
            // Widgets
            api::widgets::AggregatorParams,
            db::widgets::AggregateBucket,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Projects", description = "Project management"),
        (name = "Runs", description = "Test runs and their aggregated summaries"),
        (name = "Results", description = "Individual test results"),
        (name = "Reports", description = "Generated report artifacts"),
        (name = "Imports", description = "Run archive uploads"),
        (name = "Tasks", description = "Background task polling"),
        (name = "Widgets", description = "Dashboard aggregation queries")
    )
)]
pub struct ApiDoc;
