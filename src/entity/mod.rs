//! SeaORM entity definitions for PostgreSQL database.

pub mod import;
pub mod lock;
pub mod project;
pub mod queued_task;
pub mod report;
pub mod result;
pub mod run;
