//! Migration: Create imports table.
//!
//! Tracks uploaded run archives through the ingest pipeline. The archive
//! bytes live in object storage under imports/{id}/{filename}.

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
                -- Imports table
                CREATE TABLE imports (
                    id UUID PRIMARY KEY,
                    filename VARCHAR(255) NOT NULL,
                    format VARCHAR(20) NOT NULL,
                    status VARCHAR(20) NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'running', 'done', 'error')),
                    -- Linkage discovered during processing (run_id)
                    data JSONB NOT NULL DEFAULT '{}'::jsonb,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Index for pruning by age
                CREATE INDEX idx_imports_created_at ON imports(created_at);

                -- Trigger to update updated_at
                CREATE TRIGGER update_imports_updated_at
                    BEFORE UPDATE ON imports
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
                DROP TRIGGER IF EXISTS update_imports_updated_at ON imports;
                DROP TABLE IF EXISTS imports CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
