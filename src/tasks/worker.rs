//! The worker pool that drains the task queue.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::entity::queued_task;
use crate::models::ReportStatus;
use crate::tasks::retry::RetryPolicy;
use crate::tasks::{TaskContext, TaskPayload, TaskRegistry};

const CLAIM_BATCH: u64 = 10;
const MAINTENANCE_INTERVAL_SECS: u64 = 60;

/// Spawns the worker pool. Workers poll independently; SKIP LOCKED claims
/// keep them from ever executing the same task twice concurrently.
pub fn start_workers(ctx: TaskContext, registry: TaskRegistry) {
    let workers = ctx.config.tasks.workers.max(1);
    let poll = Duration::from_secs(ctx.config.tasks.poll_secs.max(1));
    info!(workers, "starting task workers");
    for worker_id in 0..workers {
        let ctx = ctx.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            worker_loop(worker_id, ctx, registry, poll).await;
        });
    }
}

/// Spawns the periodic queue maintenance loop that recovers tasks whose
/// worker died mid-execution.
pub fn start_queue_maintenance(ctx: TaskContext) {
    tokio::spawn(async move {
        let stale_secs = ctx.config.tasks.stale_secs;
        loop {
            sleep(Duration::from_secs(MAINTENANCE_INTERVAL_SECS)).await;
            match ctx.db.requeue_stale_tasks(stale_secs).await {
                Ok(0) => {}
                Ok(recovered) => warn!(recovered, "requeued stale started tasks"),
                Err(err) => error!(error = %err, "queue maintenance failed"),
            }
        }
    });
}

async fn worker_loop(
    worker_id: usize,
    ctx: TaskContext,
    registry: TaskRegistry,
    poll: Duration,
) {
    info!(worker = worker_id, "task worker started");
    loop {
        match ctx.db.claim_due_tasks(CLAIM_BATCH).await {
            Ok(tasks) if tasks.is_empty() => sleep(poll).await,
            Ok(tasks) => {
                for task in tasks {
                    execute_task(&ctx, &registry, task).await;
                }
            }
            Err(err) => {
                error!(worker = worker_id, error = %err, "failed to claim tasks");
                sleep(poll).await;
            }
        }
    }
}

/// Runs one claimed task through success or failure bookkeeping. Handler
/// panics are contained by the spawn boundary and treated as failures.
pub async fn execute_task(ctx: &TaskContext, registry: &TaskRegistry, task: queued_task::Model) {
    let Some(handler) = registry.get(&task.name) else {
        warn!(task = %task.id, name = %task.name, "no handler registered, failing task");
        if let Err(err) = ctx
            .db
            .record_task_failure(task.id, task.retries, "no handler registered")
            .await
        {
            error!(task = %task.id, error = %err, "failed to record task failure");
        }
        return;
    };

    let payload = TaskPayload::from_row(&task.args, &task.kwargs);
    let started = std::time::Instant::now();
    let outcome = tokio::spawn(handler(ctx.clone(), payload)).await;

    match outcome {
        Ok(Ok(result)) => {
            if let Err(err) = ctx.db.complete_task(task.id, result).await {
                error!(task = %task.id, error = %err, "failed to record task success");
            } else {
                info!(
                    task = %task.id,
                    name = %task.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "task succeeded"
                );
            }
        }
        Ok(Err(err)) => handle_failure(ctx, &task, &err.to_string()).await,
        Err(join_err) => {
            let message = if join_err.is_panic() {
                "task handler panicked"
            } else {
                "task handler was cancelled"
            };
            handle_failure(ctx, &task, message).await;
        }
    }
}

/// Failure bookkeeping: report side effect first, then backoff retry or
/// terminal failure once the attempt ceiling is reached.
async fn handle_failure(ctx: &TaskContext, task: &queued_task::Model, message: &str) {
    warn!(task = %task.id, name = %task.name, error = %message, "task failed");

    // A first argument carrying a report id marks that report as errored.
    let payload = TaskPayload::from_row(&task.args, &task.kwargs);
    if let Some(report_id) = payload.first_object_id() {
        if let Err(err) = ctx
            .db
            .set_report_status(report_id, ReportStatus::Error)
            .await
        {
            error!(report = %report_id, error = %err, "failed to mark report as errored");
        }
    }

    let policy = RetryPolicy::default();
    if policy.exhausted(task.retries) {
        if let Err(err) = ctx
            .db
            .record_task_failure(task.id, task.retries, message)
            .await
        {
            error!(task = %task.id, error = %err, "failed to record terminal task failure");
        } else {
            error!(
                task = %task.id,
                name = %task.name,
                retries = task.retries,
                "task failed permanently"
            );
        }
        return;
    }

    let delay = policy.delay(task.retries);
    let not_before = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(3600));
    if let Err(err) = ctx
        .db
        .record_task_retry(task.id, task.retries + 1, message, not_before)
        .await
    {
        error!(task = %task.id, error = %err, "failed to schedule task retry");
    }
}
