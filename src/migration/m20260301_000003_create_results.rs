//! Migration: Create results table.
//!
//! One row per executed test case. Results ride along when their run is
//! deleted (FK cascade), which is what batched run pruning relies on.

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
                -- Results table
                CREATE TABLE results (
                    id UUID PRIMARY KEY,
                    run_id UUID REFERENCES runs(id) ON DELETE CASCADE,
                    project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
                    -- Fully qualified test name
                    test_id VARCHAR(512),
                    component VARCHAR(255),
                    env VARCHAR(255),
                    source VARCHAR(255),
                    -- Outcome: passed, failed, error, skipped, xfailed, xpassed, manual
                    result VARCHAR(50),
                    start_time TIMESTAMPTZ,
                    -- Duration in seconds
                    duration DOUBLE PRECISION,
                    data JSONB NOT NULL DEFAULT '{}'::jsonb
                );

                -- Index for the aggregator's per-run scan
                CREATE INDEX idx_results_run_id ON results(run_id);

                -- Index for project-scoped queries
                CREATE INDEX idx_results_project_id ON results(project_id);

                -- Index for listing results newest first
                CREATE INDEX idx_results_start_time ON results(start_time DESC);

                -- Indexes for the common promoted-column filters
                CREATE INDEX idx_results_result ON results(result);
                CREATE INDEX idx_results_test_id ON results(test_id);
                CREATE INDEX idx_results_component ON results(component);

                -- GIN index for JSONB filters (metadata.*)
                CREATE INDEX idx_results_data ON results USING GIN (data);
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
                DROP TABLE IF EXISTS results CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
