//! Run summary aggregation.
//!
//! `update_run` recomputes a run's summary from its results. It is
//! idempotent and lock-protected: concurrent requests for the same run do
//! one recompute, the losers skip. `sync_aborted_runs` is the safety net
//! that re-enqueues aggregation for runs whose summary drifted (lost tasks,
//! crashed workers).

use sea_orm::{IntoActiveModel, Set};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::result;
use crate::error::{AppError, AppResult};
use crate::models::run::{RunSummary, METADATA_BACKFILL_KEYS};
use crate::models::{document, ResultOutcome};
use crate::tasks::{lock, TaskContext, TaskPayload};

pub const UPDATE_RUN: &str = "update_run";
pub const SYNC_ABORTED_RUNS: &str = "sync_aborted_runs";

/// Aggregation finishes well inside this; it only matters when a holder
/// crashes and the row has to expire.
const RUN_LOCK_TTL_SECS: u64 = 300;

pub async fn update_run_task(
    ctx: TaskContext,
    payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let Some(run_id) = payload.first_uuid() else {
        return Err(AppError::InvalidInput(
            "update_run requires a run id argument".to_string(),
        ));
    };
    update_run(&ctx, run_id).await?;
    Ok(None)
}

/// Recomputes one run's summary under its named lock. Contention means
/// another worker is already doing this exact work, so losing is success.
pub async fn update_run(ctx: &TaskContext, run_id: Uuid) -> AppResult<()> {
    let lock_name = lock::run_update_lock_name(run_id);
    let Some(guard) = lock::acquire_lock(&ctx.db, &lock_name, RUN_LOCK_TTL_SECS).await? else {
        info!(run = %run_id, "run is already being aggregated, skipping");
        return Ok(());
    };
    let outcome = aggregate_run(ctx, run_id).await;
    guard.release().await;
    outcome
}

async fn aggregate_run(ctx: &TaskContext, run_id: Uuid) -> AppResult<()> {
    let Some(run) = ctx.db.get_run(run_id).await? else {
        debug!(run = %run_id, "run does not exist, nothing to aggregate");
        return Ok(());
    };
    let results = ctx.db.results_for_run(run_id).await?;

    let folded = fold_summary(&results);
    let mut data = run.data.clone();
    folded.summary.write_to(&mut data);
    backfill_metadata(&mut data, &results);

    let start_time = run.start_time.or(folded.earliest_start);
    if !document::has(&data, "created") {
        if let Some(earliest) = start_time {
            document::set(&mut data, "created", json!(earliest.to_rfc3339()));
        }
    }

    let mut active = run.clone().into_active_model();
    active.data = Set(data);
    if folded.duration > 0.0 {
        active.duration = Set(Some(folded.duration));
    }
    if run.start_time.is_none() {
        active.start_time = Set(folded.earliest_start);
    }
    if run.component.is_none() {
        if let Some(component) = first_some(&results, |r| r.component.as_deref()) {
            active.component = Set(Some(component));
        }
    }
    if run.env.is_none() {
        if let Some(env) = first_some(&results, |r| r.env.as_deref()) {
            active.env = Set(Some(env));
        }
    }
    if run.source.is_none() {
        if let Some(source) = first_some(&results, |r| r.source.as_deref()) {
            active.source = Set(Some(source));
        }
    }

    ctx.db.save_run(active).await?;
    debug!(run = %run_id, tests = folded.summary.tests, "run summary updated");
    Ok(())
}

/// Finds recent runs whose summary disagrees with their result count and
/// re-enqueues aggregation for each.
pub async fn sync_aborted_runs_task(
    ctx: TaskContext,
    _payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let window = ctx.config.tasks.sync_window_secs;
    let run_ids = ctx.db.aborted_run_ids(window).await?;
    let requeued = run_ids.len();
    for run_id in run_ids {
        ctx.db
            .enqueue_task(UPDATE_RUN, json!([run_id]), json!({}))
            .await?;
    }
    if requeued > 0 {
        info!(requeued, "re-enqueued aggregation for out-of-sync runs");
    }
    Ok(Some(json!({ "requeued": requeued })))
}

/// The pure fold at the heart of aggregation.
#[derive(Debug, Default, PartialEq)]
pub struct FoldedRun {
    pub summary: RunSummary,
    pub duration: f64,
    pub earliest_start: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn fold_summary(results: &[result::Model]) -> FoldedRun {
    let mut folded = FoldedRun {
        summary: RunSummary {
            tests: results.len() as i64,
            ..Default::default()
        },
        ..Default::default()
    };

    for result in results {
        match result.result.as_deref().and_then(ResultOutcome::parse) {
            Some(ResultOutcome::Failed) => folded.summary.failures += 1,
            Some(ResultOutcome::Error) => folded.summary.errors += 1,
            Some(ResultOutcome::Skipped) => folded.summary.skips += 1,
            Some(ResultOutcome::Xfailed) => folded.summary.xfailures += 1,
            Some(ResultOutcome::Xpassed) => folded.summary.xpasses += 1,
            _ => {}
        }
        if let Some(duration) = result.duration {
            folded.duration += duration;
        }
        match (folded.earliest_start, result.start_time) {
            (None, candidate) => folded.earliest_start = candidate,
            (Some(current), Some(candidate)) if candidate < current => {
                folded.earliest_start = Some(candidate)
            }
            _ => {}
        }
    }
    folded
}

/// Copies allowlisted metadata keys from the first result that supplies
/// each, never overwriting run-level values.
fn backfill_metadata(data: &mut JsonValue, results: &[result::Model]) {
    for key in METADATA_BACKFILL_KEYS {
        let path = format!("metadata.{}", key);
        if document::has(data, &path) {
            continue;
        }
        for result in results {
            if document::has(&result.data, &path) {
                if let Some(value) = document::get(&result.data, &path) {
                    document::set(data, &path, value.clone());
                }
                break;
            }
        }
    }
}

fn first_some(
    results: &[result::Model],
    pick: impl Fn(&result::Model) -> Option<&str>,
) -> Option<String> {
    results.iter().find_map(|r| pick(r).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_result(
        outcome: Option<&str>,
        duration: Option<f64>,
        start_hour: Option<u32>,
    ) -> result::Model {
        result::Model {
            id: Uuid::now_v7(),
            run_id: Some(Uuid::now_v7()),
            project_id: None,
            test_id: Some("tests/test_sample.py::test_case".to_string()),
            result: outcome.map(str::to_string),
            component: None,
            env: None,
            source: None,
            start_time: start_hour
                .map(|h| Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap()),
            duration,
            data: json!({}),
        }
    }

    #[test]
    fn test_fold_buckets_outcomes() {
        let results = vec![
            make_result(Some("passed"), Some(1.0), Some(10)),
            make_result(Some("failed"), Some(2.0), Some(9)),
            make_result(Some("error"), Some(0.5), Some(11)),
            make_result(Some("skipped"), None, None),
            make_result(Some("xfailed"), Some(1.5), Some(12)),
            make_result(Some("xpassed"), Some(1.0), Some(12)),
            make_result(None, Some(1.0), Some(13)),
        ];

        let folded = fold_summary(&results);
        assert_eq!(folded.summary.tests, 7);
        assert_eq!(folded.summary.failures, 1);
        assert_eq!(folded.summary.errors, 1);
        assert_eq!(folded.summary.skips, 1);
        assert_eq!(folded.summary.xfailures, 1);
        assert_eq!(folded.summary.xpasses, 1);
        assert_eq!(folded.duration, 7.0);
        // earliest is hour 9 even though it was not first in the slice
        assert_eq!(
            folded.earliest_start,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_fold_of_empty_run() {
        let folded = fold_summary(&[]);
        assert_eq!(folded.summary, RunSummary::default());
        assert_eq!(folded.duration, 0.0);
        assert!(folded.earliest_start.is_none());
    }

    #[test]
    fn test_fold_is_idempotent() {
        let results = vec![
            make_result(Some("passed"), Some(1.0), Some(10)),
            make_result(Some("failed"), Some(2.0), Some(9)),
        ];
        assert_eq!(fold_summary(&results), fold_summary(&results));
    }

    #[test]
    fn test_backfill_respects_existing_run_metadata() {
        let mut data = json!({"metadata": {"component": "run-level"}});
        let mut result_a = make_result(Some("passed"), None, None);
        result_a.data = json!({"metadata": {"component": "result-level", "env": "prod"}});
        let mut result_b = make_result(Some("passed"), None, None);
        result_b.data =
            json!({"metadata": {"env": "stage", "jenkins": {"build": 7}, "hostname": "ci-7"}});

        backfill_metadata(&mut data, &[result_a, result_b]);

        assert_eq!(data["metadata"]["component"], json!("run-level"));
        // first supplier wins
        assert_eq!(data["metadata"]["env"], json!("prod"));
        assert_eq!(data["metadata"]["jenkins"], json!({"build": 7}));
        // keys outside the allowlist are not copied
        assert!(data["metadata"].get("hostname").is_none());
    }
}
