//! Named distributed locks.
//!
//! One row per lock. Acquisition is a single upsert: the insert wins when no
//! row exists, the conflict update wins when the existing row has expired.
//! Either way Postgres returns a row only to the winner.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Statement, Value};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entity::lock::{self, Entity as Lock};
use crate::error::{AppError, AppResult};

impl DbPool {
    /// Tries to take the named lock for `ttl_secs`. Returns whether this
    /// holder now owns it.
    pub async fn try_acquire_lock(
        &self,
        name: &str,
        holder: Uuid,
        ttl_secs: u64,
    ) -> AppResult<bool> {
        let stmt = Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "INSERT INTO locks (name, holder, expires_at) \
             VALUES ($1, $2, NOW() + make_interval(secs => $3)) \
             ON CONFLICT (name) DO UPDATE \
             SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at \
             WHERE locks.expires_at < NOW() \
             RETURNING name",
            [
                Value::from(name),
                Value::from(holder),
                Value::from(ttl_secs as f64),
            ],
        );

        let row = self
            .connection()
            .query_one_raw(stmt)
            .await
            .map_err(|e| AppError::Database(format!("Failed to acquire lock: {}", e)))?;
        Ok(row.is_some())
    }

    /// Releases the lock if this holder still owns it. Releasing a lock that
    /// expired and was re-acquired by someone else is a no-op.
    pub async fn release_lock(&self, name: &str, holder: Uuid) -> AppResult<()> {
        Lock::delete_many()
            .filter(lock::Column::Name.eq(name))
            .filter(lock::Column::Holder.eq(holder))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to release lock: {}", e)))?;
        Ok(())
    }
}
