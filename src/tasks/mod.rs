//! Background task pipeline.
//!
//! Tasks are durable rows in the `queued_tasks` table. Handlers get a
//! [`TaskContext`] and a [`TaskPayload`]; anything else they need they load
//! themselves. The worker pool ([`worker`]) drains the queue, the beat
//! scheduler ([`beat`]) feeds periodic tasks into it.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::Storage;

pub mod beat;
pub mod imports;
pub mod lock;
pub mod prune;
pub mod reports;
pub mod retry;
pub mod runs;
pub mod worker;

/// Shared state handed to every task handler, built once at startup.
#[derive(Clone)]
pub struct TaskContext {
    pub db: DbPool,
    pub storage: Storage,
    pub config: Arc<Config>,
}

/// Arguments delivered to a handler: a JSON array of positional args and a
/// JSON object of keyword args.
#[derive(Debug, Clone, Default)]
pub struct TaskPayload {
    pub args: Vec<JsonValue>,
    pub kwargs: Map<String, JsonValue>,
}

impl TaskPayload {
    pub fn from_row(args: &JsonValue, kwargs: &JsonValue) -> Self {
        Self {
            args: args.as_array().cloned().unwrap_or_default(),
            kwargs: kwargs.as_object().cloned().unwrap_or_default(),
        }
    }

    /// First positional argument parsed as a UUID, the common shape for
    /// per-entity tasks.
    pub fn first_uuid(&self) -> Option<Uuid> {
        self.args
            .first()?
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// The `id` key of the first positional argument when it is an object.
    /// The failure hook uses this to find the report a task was generating.
    pub fn first_object_id(&self) -> Option<Uuid> {
        self.args
            .first()?
            .get("id")?
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

pub type TaskHandler = Arc<
    dyn Fn(TaskContext, TaskPayload) -> BoxFuture<'static, AppResult<Option<JsonValue>>>
        + Send
        + Sync,
>;

/// Task name to handler table, assembled at startup. No global state: the
/// registry travels with the worker pool that uses it.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    handlers: HashMap<String, TaskHandler>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(TaskContext, TaskPayload) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = AppResult<Option<JsonValue>>> + Send + 'static,
    {
        self.handlers.insert(
            name.to_string(),
            Arc::new(move |ctx, payload| Box::pin(handler(ctx, payload))),
        );
    }

    pub fn get(&self, name: &str) -> Option<TaskHandler> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registry with every built-in task.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(runs::UPDATE_RUN, runs::update_run_task);
        registry.register(runs::SYNC_ABORTED_RUNS, runs::sync_aborted_runs_task);
        registry.register(imports::RUN_IMPORT, imports::run_import_task);
        registry.register(reports::GENERATE_REPORT, reports::generate_report_task);
        registry.register(prune::PRUNE_OLD_RESULTS, prune::prune_old_results_task);
        registry.register(prune::PRUNE_OLD_RUNS, prune::prune_old_runs_task);
        registry.register(prune::PRUNE_OLD_IMPORTS, prune::prune_old_imports_task);
        registry.register(prune::PRUNE_OLD_ARTIFACTS, prune::prune_old_artifacts_task);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_from_row_tolerates_bad_shapes() {
        let payload = TaskPayload::from_row(&json!("not-an-array"), &json!(null));
        assert!(payload.args.is_empty());
        assert!(payload.kwargs.is_empty());
    }

    #[test]
    fn test_payload_first_uuid() {
        let id = Uuid::now_v7();
        let payload = TaskPayload::from_row(&json!([id.to_string()]), &json!({}));
        assert_eq!(payload.first_uuid(), Some(id));

        let payload = TaskPayload::from_row(&json!(["nope"]), &json!({}));
        assert_eq!(payload.first_uuid(), None);
    }

    #[test]
    fn test_payload_first_object_id() {
        let id = Uuid::now_v7();
        let payload = TaskPayload::from_row(&json!([{"id": id.to_string()}]), &json!({}));
        assert_eq!(payload.first_object_id(), Some(id));

        // a plain string first argument is not report linkage
        let payload = TaskPayload::from_row(&json!([id.to_string()]), &json!({}));
        assert_eq!(payload.first_object_id(), None);
    }

    #[test]
    fn test_builtin_registry_covers_all_tasks() {
        let registry = TaskRegistry::builtin();
        for name in [
            "update_run",
            "sync_aborted_runs",
            "run_import",
            "generate_report",
            "prune_old_results",
            "prune_old_runs",
            "prune_old_imports",
            "prune_old_artifacts",
        ] {
            assert!(registry.contains(name), "{name}");
        }
        assert!(!registry.contains("unknown_task"));
    }
}
