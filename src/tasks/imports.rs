//! Import processing: stored archive to run + results rows.

use sea_orm::{IntoActiveModel, Set};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::results::result_from_document;
use crate::entity::result;
use crate::error::{AppError, AppResult};
use crate::models::{document, ImportStatus, RunArchive};
use crate::services::Storage;
use crate::tasks::{runs, TaskContext, TaskPayload};

pub const RUN_IMPORT: &str = "run_import";

pub async fn run_import_task(
    ctx: TaskContext,
    payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let Some(import_id) = payload.first_uuid() else {
        return Err(AppError::InvalidInput(
            "run_import requires an import id argument".to_string(),
        ));
    };
    run_import(&ctx, import_id).await
}

async fn run_import(ctx: &TaskContext, import_id: Uuid) -> AppResult<Option<JsonValue>> {
    let Some(import) = ctx.db.get_import(import_id).await? else {
        debug!(import = %import_id, "import does not exist, nothing to do");
        return Ok(None);
    };
    ctx.db
        .set_import_status(import_id, ImportStatus::Running)
        .await?;

    let key = Storage::import_key(import_id, &import.filename);
    let (bytes, _) = ctx.storage.get(&key).await?;

    // A malformed archive never becomes valid; mark the import failed
    // instead of burning retries on it.
    let archive: RunArchive = match serde_json::from_slice(&bytes) {
        Ok(archive) => archive,
        Err(err) => {
            warn!(import = %import_id, error = %err, "uploaded file is not a run archive");
            ctx.db
                .set_import_status(import_id, ImportStatus::Error)
                .await?;
            return Ok(None);
        }
    };

    let run_doc = archive.run.clone().unwrap_or_else(|| json!({}));
    let project_id = match document::get_str(&run_doc, "project")
        .or_else(|| document::get_str(&run_doc, "metadata.project"))
    {
        Some(reference) => ctx.db.resolve_project(reference).await?.map(|p| p.id),
        None => None,
    };

    // An archive carrying its own run id re-imports onto the same run.
    let run = match archive.run_id() {
        Some(existing_id) => match ctx.db.get_run(existing_id).await? {
            Some(run) => run,
            None => {
                ctx.db
                    .create_run(Some(existing_id), project_id, &run_doc)
                    .await?
            }
        },
        None => ctx.db.create_run(None, project_id, &run_doc).await?,
    };

    let effective_project = project_id.or(run.project_id);
    let models: Vec<result::ActiveModel> = archive
        .results
        .iter()
        .map(|doc| result_from_document(None, Some(run.id), effective_project, doc))
        .collect();
    let inserted = ctx.db.create_results_bulk(models).await?;

    let mut data = import.data.clone();
    document::set(&mut data, "run_id", json!(run.id));
    let mut active = import.into_active_model();
    active.data = Set(data);
    active.status = Set(ImportStatus::Done.as_str().to_string());
    ctx.db.save_import(active).await?;

    ctx.db
        .enqueue_task(runs::UPDATE_RUN, json!([run.id]), json!({}))
        .await?;

    info!(import = %import_id, run = %run.id, results = inserted, "import processed");
    Ok(Some(json!({ "run_id": run.id, "results": inserted })))
}
