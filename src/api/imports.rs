//! Import API handlers.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models;
use crate::services::Storage;
use crate::tasks;

/// Upload a run archive for background import.
///
/// The first file field of the multipart form is stored verbatim and a
/// `run_import` task is queued to parse it into a run and its results.
#[utoipa::path(
    post,
    path = "/api/v1/imports",
    tag = "Imports",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Import accepted for processing"),
        (status = 400, description = "Invalid upload", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_import(
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        // Form fields without a filename are not the archive
        let Some(filename) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
        else {
            continue;
        };

        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            return Err(AppError::InvalidInput(
                "Archive filename must not contain path separators".to_string(),
            ));
        }

        let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        if extension != "json" {
            return Err(AppError::InvalidInput(
                "Only JSON run archives are supported".to_string(),
            ));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            if data.len() + chunk.len() > config.max_upload_size {
                return Err(AppError::InvalidInput(format!(
                    "Import archive exceeds the {} byte upload limit",
                    config.max_upload_size
                )));
            }
            data.extend_from_slice(&chunk);
        }

        upload = Some((filename, data));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(AppError::InvalidInput(
            "Multipart upload carries no file field".to_string(),
        ));
    };

    let size = bytes.len();
    let import = pool.create_import(&filename, "json", json!({})).await?;

    let key = Storage::import_key(import.id, &import.filename);
    storage.put(&key, bytes, Some("application/json")).await?;

    let task = pool
        .enqueue_task(tasks::imports::RUN_IMPORT, json!([import.id]), json!({}))
        .await?;

    info!(
        "Import accepted: id={}, filename={}, bytes={}, task={}",
        import.id, import.filename, size, task.id
    );

    let mut document = models::import::to_document(&import);
    models::document::set(&mut document, "task_id", json!(task.id));
    Ok(HttpResponse::Accepted().json(document))
}

/// Fetch one import.
#[utoipa::path(
    get,
    path = "/api/v1/imports/{id}",
    tag = "Imports",
    params(
        ("id" = Uuid, Path, description = "Import id")
    ),
    responses(
        (status = 200, description = "Import document"),
        (status = 404, description = "Import not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_import(pool: web::Data<DbPool>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let import = pool
        .get_import(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Import".to_string()))?;

    Ok(HttpResponse::Ok().json(models::import::to_document(&import)))
}

/// Configure import routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/imports").route(web::post().to(create_import)))
        .service(web::resource("/imports/{id}").route(web::get().to(get_import)));
}
