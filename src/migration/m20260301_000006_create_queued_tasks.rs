//! Migration: Create queued_tasks table.
//!
//! The durable task queue: one row per enqueued task, claimed by workers
//! with FOR UPDATE SKIP LOCKED. Doubles as the result backend for polling.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                -- Queued tasks table
                CREATE TABLE queued_tasks (
                    id UUID PRIMARY KEY,
                    name VARCHAR(100) NOT NULL,
                    args JSONB NOT NULL DEFAULT '[]'::jsonb,
                    kwargs JSONB NOT NULL DEFAULT '{}'::jsonb,
                    state VARCHAR(20) NOT NULL DEFAULT 'pending'
                        CHECK (state IN ('pending', 'started', 'retry', 'success', 'failure')),
                    retries INTEGER NOT NULL DEFAULT 0,
                    -- Earliest time the task may be claimed (retry backoff)
                    not_before TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    -- Set when a worker claims the task; stale-lease recovery keys on it
                    started_at TIMESTAMPTZ,
                    result JSONB,
                    error TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Index for the worker claim query (due pending/retry rows)
                CREATE INDEX idx_queued_tasks_due ON queued_tasks(not_before)
                    WHERE state IN ('pending', 'retry');

                -- Index for stale-lease recovery
                CREATE INDEX idx_queued_tasks_started ON queued_tasks(started_at)
                    WHERE state = 'started';

                -- Trigger to update updated_at
                CREATE TRIGGER update_queued_tasks_updated_at
                    BEFORE UPDATE ON queued_tasks
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_queued_tasks_updated_at ON queued_tasks;
                DROP TABLE IF EXISTS queued_tasks CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
