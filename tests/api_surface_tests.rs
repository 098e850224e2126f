//! HTTP surface tests that run without a database.
//!
//! Anything touching PostgreSQL is covered by unit tests against rendered
//! SQL; these exercise the actix wiring instead: error rendering, the
//! health probe and the OpenAPI document.

use actix_web::dev::ServiceResponse;
use actix_web::{test as actix_test, web, App, HttpResponse};
use serde_json::Value;
use utoipa::OpenApi;

use tally_lib::api;
use tally_lib::error::{AppError, AppResult};

async fn missing_run() -> AppResult<HttpResponse> {
    Err(AppError::NotFound("Run".to_string()))
}

async fn rejected() -> AppResult<HttpResponse> {
    Err(AppError::InvalidInput("bad filter".to_string()))
}

/// App with the health probe and two routes that fail on purpose.
async fn create_test_app() -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    actix_test::init_service(
        App::new()
            .service(api::health::health)
            .route("/missing", web::get().to(missing_run))
            .route("/bad", web::get().to(rejected)),
    )
    .await
}

async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = actix_test::TestRequest::get().uri(uri).to_request();
    let resp = actix_test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = actix_test::read_body_json(resp).await;
    (status, body)
}

#[actix_rt::test]
async fn test_health_reports_healthy() {
    let app = create_test_app().await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[actix_rt::test]
async fn test_not_found_renders_the_error_envelope() {
    let app = create_test_app().await;

    let (status, body) = get_json(&app, "/missing").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Run not found");
}

#[actix_rt::test]
async fn test_invalid_input_renders_the_error_envelope() {
    let app = create_test_app().await;

    let (status, body) = get_json(&app, "/bad").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
    assert_eq!(body["message"], "Invalid input: bad filter");
}

#[test]
fn test_openapi_document_covers_the_surface() {
    let doc = api::ApiDoc::openapi();
    let json = serde_json::to_value(doc).unwrap();

    let paths = json["paths"].as_object().unwrap();
    for path in [
        "/api/v1/health",
        "/api/v1/ready",
        "/api/v1/projects",
        "/api/v1/projects/{id}",
        "/api/v1/runs",
        "/api/v1/runs/{id}",
        "/api/v1/results",
        "/api/v1/results/{id}",
        "/api/v1/reports",
        "/api/v1/reports/{id}",
        "/api/v1/reports/{id}/download",
        "/api/v1/imports",
        "/api/v1/imports/{id}",
        "/api/v1/tasks/{id}",
        "/api/v1/widgets/result-aggregator",
    ] {
        assert!(
            paths.contains_key(path),
            "OpenAPI document is missing {path}"
        );
    }

    let schemas = json["components"]["schemas"].as_object().unwrap();
    for schema in [
        "ErrorResponse",
        "Pagination",
        "PagedDocuments",
        "TaskStatusResponse",
    ] {
        assert!(
            schemas.contains_key(schema),
            "OpenAPI document is missing schema {schema}"
        );
    }
}
