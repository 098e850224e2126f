//! Migration: Create reports table.
//!
//! A report row tracks one requested artifact; the rendered file lives in
//! object storage under reports/{id}/{filename}.

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
                -- Reports table
                CREATE TABLE reports (
                    id UUID PRIMARY KEY,
                    project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
                    filename VARCHAR(255) NOT NULL,
                    mimetype VARCHAR(100) NOT NULL,
                    view VARCHAR(20) NOT NULL
                        CHECK (view IN ('csv', 'json', 'text')),
                    status VARCHAR(20) NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'running', 'done', 'empty', 'error')),
                    -- Request parameters the artifact was generated from
                    params JSONB NOT NULL DEFAULT '{}'::jsonb,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Index for listing reports newest first and for pruning
                CREATE INDEX idx_reports_created_at ON reports(created_at DESC);

                -- Trigger to update updated_at
                CREATE TRIGGER update_reports_updated_at
                    BEFORE UPDATE ON reports
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
                DROP TRIGGER IF EXISTS update_reports_updated_at ON reports;
                DROP TABLE IF EXISTS reports CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
