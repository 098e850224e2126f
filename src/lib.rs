//! Tally Server library.
//!
//! This library provides the core functionality for the test result
//! aggregation server, including database operations, the filter grammar,
//! the background task pipeline, and API services.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
pub mod tasks;
