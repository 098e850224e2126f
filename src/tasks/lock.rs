//! Scoped acquisition of the named distributed locks.

use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppResult;

/// Lock name guarding aggregation of one run.
pub fn run_update_lock_name(run_id: Uuid) -> String {
    format!("update-run-lock-{}", run_id)
}

/// Lock name guarding deletion of one stored file.
pub fn file_delete_lock_name(filename: &str) -> String {
    format!("delete-file-lock-{}", filename)
}

/// A held lock. Call [`LockGuard::release`] when done; the row's TTL is the
/// backstop when a holder crashes before releasing.
pub struct LockGuard {
    db: DbPool,
    name: String,
    holder: Uuid,
}

impl LockGuard {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn release(self) {
        if let Err(err) = self.db.release_lock(&self.name, self.holder).await {
            warn!(lock = %self.name, error = %err, "failed to release lock, TTL will reclaim it");
        }
    }
}

/// Tries to take a named lock, polling twice about half a second apart.
/// `None` means someone else holds it; callers discard their operation
/// rather than queueing behind the holder.
pub async fn acquire_lock(
    db: &DbPool,
    name: &str,
    ttl_secs: u64,
) -> AppResult<Option<LockGuard>> {
    let holder = Uuid::new_v4();
    for attempt in 0..2 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        if db.try_acquire_lock(name, holder, ttl_secs).await? {
            return Ok(Some(LockGuard {
                db: db.clone(),
                name: name.to_string(),
                holder,
            }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_names() {
        let id = Uuid::parse_str("0195d3a0-0000-7000-8000-000000000000").unwrap();
        assert_eq!(
            run_update_lock_name(id),
            "update-run-lock-0195d3a0-0000-7000-8000-000000000000"
        );
        assert_eq!(
            file_delete_lock_name("report-1.csv"),
            "delete-file-lock-report-1.csv"
        );
    }
}
