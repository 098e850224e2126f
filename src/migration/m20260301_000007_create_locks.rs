//! Migration: Create locks table.
//!
//! Named distributed locks. Acquisition is an upsert that only wins when no
//! row exists or the existing row's TTL has expired.

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
                -- Locks table
                CREATE TABLE locks (
                    name VARCHAR(255) PRIMARY KEY,
                    holder UUID NOT NULL,
                    expires_at TIMESTAMPTZ NOT NULL
                );
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
                DROP TABLE IF EXISTS locks CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
