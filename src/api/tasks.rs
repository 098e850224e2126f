//! Task polling API handlers.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{TaskState, TaskStatusResponse};

fn status_code(state: TaskState) -> StatusCode {
    match state.http_status() {
        200 => StatusCode::OK,
        203 => StatusCode::NON_AUTHORITATIVE_INFORMATION,
        _ => StatusCode::PARTIAL_CONTENT,
    }
}

/// Poll a queued task.
///
/// The response status mirrors the task state: 200 when it succeeded, 206
/// while it is pending or running, 203 when it failed. An id the queue has
/// never seen reports as pending, matching clients that poll before their
/// enqueue response arrives.
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "Task succeeded", body = TaskStatusResponse),
        (status = 203, description = "Task failed", body = TaskStatusResponse),
        (status = 206, description = "Task still in progress", body = TaskStatusResponse)
    )
)]
pub async fn get_task(pool: web::Data<DbPool>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let task = pool.get_task(path.into_inner()).await?;

    let (state, result, error) = match &task {
        Some(task) => (
            TaskState::parse(&task.state).unwrap_or(TaskState::Pending),
            task.result.clone(),
            task.error.clone(),
        ),
        None => (TaskState::Pending, None, None),
    };

    let body = TaskStatusResponse {
        state: state.wire_str().to_string(),
        message: state.message().to_string(),
        result,
        error,
    };

    Ok(HttpResponse::build(status_code(state)).json(body))
}

/// Configure task routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/tasks/{id}").route(web::get().to(get_task)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(status_code(TaskState::Success), StatusCode::OK);
        assert_eq!(
            status_code(TaskState::Failure),
            StatusCode::NON_AUTHORITATIVE_INFORMATION
        );
        assert_eq!(status_code(TaskState::Pending), StatusCode::PARTIAL_CONTENT);
        assert_eq!(status_code(TaskState::Started), StatusCode::PARTIAL_CONTENT);
        assert_eq!(status_code(TaskState::Retry), StatusCode::PARTIAL_CONTENT);
    }
}
