//! Scheduled retention pruning.
//!
//! Deletes rows in bounded batches so a year of backlog never turns into one
//! giant transaction.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::error::AppResult;
use crate::models::ReportStatus;
use crate::services::Storage;
use crate::tasks::{lock, TaskContext, TaskPayload};

pub const PRUNE_OLD_RESULTS: &str = "prune_old_results";
pub const PRUNE_OLD_RUNS: &str = "prune_old_runs";
pub const PRUNE_OLD_IMPORTS: &str = "prune_old_imports";
pub const PRUNE_OLD_ARTIFACTS: &str = "prune_old_artifacts";

const DELETE_BATCH: u64 = 1000;
const ARTIFACT_BATCH: u64 = 100;
const FILE_LOCK_TTL_SECS: u64 = 60;

fn cutoff(days: u32) -> DateTime<Utc> {
    Utc::now() - Duration::days(i64::from(days))
}

pub async fn prune_old_results_task(
    ctx: TaskContext,
    _payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let days = ctx.config.retention.results_days;
    let cutoff = cutoff(days);
    let mut total = 0u64;
    loop {
        let deleted = ctx.db.delete_results_before(cutoff, DELETE_BATCH).await?;
        total += deleted;
        if deleted < DELETE_BATCH {
            break;
        }
    }
    info!(total, days, "pruned old results");
    Ok(Some(json!({ "deleted": total })))
}

pub async fn prune_old_runs_task(
    ctx: TaskContext,
    _payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let days = ctx.config.retention.runs_days;
    let cutoff = cutoff(days);
    let mut total = 0u64;
    loop {
        let deleted = ctx.db.delete_runs_before(cutoff, DELETE_BATCH).await?;
        total += deleted;
        if deleted < DELETE_BATCH {
            break;
        }
    }
    info!(total, days, "pruned old runs");
    Ok(Some(json!({ "deleted": total })))
}

pub async fn prune_old_imports_task(
    ctx: TaskContext,
    _payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let days = ctx.config.retention.imports_days;
    let cutoff = cutoff(days);
    let mut total = 0u64;
    loop {
        let deleted = ctx.db.delete_imports_before(cutoff, DELETE_BATCH).await?;
        total += deleted;
        if deleted < DELETE_BATCH {
            break;
        }
    }
    info!(total, days, "pruned old imports");
    Ok(Some(json!({ "deleted": total })))
}

/// Deletes expired report artifacts from object storage, then their rows.
/// Each file is deleted under its named lock so two schedulers never race
/// on the same object.
pub async fn prune_old_artifacts_task(
    ctx: TaskContext,
    _payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let days = ctx.config.retention.reports_days;
    let cutoff = cutoff(days);
    let mut total = 0u64;

    loop {
        let reports = ctx.db.reports_before(cutoff, ARTIFACT_BATCH).await?;
        if reports.is_empty() {
            break;
        }
        let batch_len = reports.len();
        let mut deleted_in_batch = 0u64;

        for report in reports {
            let lock_name = lock::file_delete_lock_name(&report.filename);
            let Some(guard) =
                lock::acquire_lock(&ctx.db, &lock_name, FILE_LOCK_TTL_SECS).await?
            else {
                info!(file = %report.filename, "file is being deleted elsewhere, skipping");
                continue;
            };
            let outcome = delete_artifact(&ctx, report.id, &report.filename, &report.status).await;
            guard.release().await;
            outcome?;
            deleted_in_batch += 1;
        }

        total += deleted_in_batch;
        // all contended, or the backlog is drained
        if deleted_in_batch == 0 || batch_len < ARTIFACT_BATCH as usize {
            break;
        }
    }

    info!(total, days, "pruned old report artifacts");
    Ok(Some(json!({ "deleted": total })))
}

async fn delete_artifact(
    ctx: &TaskContext,
    report_id: uuid::Uuid,
    filename: &str,
    status: &str,
) -> AppResult<()> {
    // empty and errored reports never wrote an object
    if ReportStatus::parse(status) == Some(ReportStatus::Done) {
        let key = Storage::report_key(report_id, filename);
        ctx.storage.delete(&key).await?;
    }
    ctx.db.delete_report(report_id).await
}
