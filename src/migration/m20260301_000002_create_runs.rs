//! Migration: Create runs table.
//!
//! A run is one execution of a test session. Frequently filtered fields are
//! promoted to scalar columns; everything else lives in the JSONB document.

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
                -- Runs table
                CREATE TABLE runs (
                    id UUID PRIMARY KEY,
                    project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
                    component VARCHAR(255),
                    env VARCHAR(255),
                    source VARCHAR(255),
                    start_time TIMESTAMPTZ,
                    -- Total duration in seconds, recomputed by the run aggregator
                    duration DOUBLE PRECISION,
                    data JSONB NOT NULL DEFAULT '{}'::jsonb
                );

                -- Index for listing runs newest first
                CREATE INDEX idx_runs_start_time ON runs(start_time DESC);

                -- Index for project-scoped queries
                CREATE INDEX idx_runs_project_id ON runs(project_id);

                -- Indexes for the common promoted-column filters
                CREATE INDEX idx_runs_component ON runs(component);
                CREATE INDEX idx_runs_env ON runs(env);

                -- GIN index for JSONB filters (metadata.*, summary.*)
                CREATE INDEX idx_runs_data ON runs USING GIN (data);
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
                DROP TABLE IF EXISTS runs CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
