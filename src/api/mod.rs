//! API endpoint modules.

use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};

pub mod health;
pub mod imports;
pub mod openapi;
pub mod projects;
pub mod reports;
pub mod results;
pub mod runs;
pub mod tasks;
pub mod widgets;

pub use health::configure_health_routes;
pub use imports::configure_routes as configure_import_routes;
pub use openapi::ApiDoc;
pub use projects::configure_routes as configure_project_routes;
pub use reports::configure_routes as configure_report_routes;
pub use results::configure_routes as configure_result_routes;
pub use runs::configure_routes as configure_run_routes;
pub use tasks::configure_routes as configure_task_routes;
pub use widgets::configure_routes as configure_widget_routes;

/// Resolve an optional `project=` reference to its id.
///
/// Asking to scope by a project that does not exist is a client error, not
/// an empty list.
pub(crate) async fn scoped_project_id(
    pool: &DbPool,
    reference: Option<&str>,
) -> AppResult<Option<Uuid>> {
    match reference {
        Some(reference) => {
            let project = pool
                .resolve_project(reference)
                .await?
                .ok_or_else(|| AppError::NotFound("Project".to_string()))?;
            Ok(Some(project.id))
        }
        None => Ok(None),
    }
}
