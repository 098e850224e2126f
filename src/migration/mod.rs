//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_projects;
mod m20260301_000002_create_runs;
mod m20260301_000003_create_results;
mod m20260301_000004_create_reports;
mod m20260301_000005_create_imports;
mod m20260301_000006_create_queued_tasks;
mod m20260301_000007_create_locks;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_projects::Migration),
            Box::new(m20260301_000002_create_runs::Migration),
            Box::new(m20260301_000003_create_results::Migration),
            Box::new(m20260301_000004_create_reports::Migration),
            Box::new(m20260301_000005_create_imports::Migration),
            Box::new(m20260301_000006_create_queued_tasks::Migration),
            Box::new(m20260301_000007_create_locks::Migration),
        ]
    }
}
