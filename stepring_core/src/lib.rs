#![forbid(unsafe_code)]

//! Core domain model and logic for the Stepring daily step dashboard.
//!
//! This crate provides:
//! - Domain types (step counts, samples, targets, day windows)
//! - Calorie estimation
//! - The health-data gateway contract and its stores
//! - Dashboard state, reducers, and the refresh controller
//! - Daily history and CSV export

pub mod types;
pub mod error;
pub mod calories;
pub mod config;
pub mod logging;
pub mod gateway;
pub mod sample_store;
pub mod authorization;
pub mod synthetic;
pub mod dashboard;
pub mod controller;
pub mod history;

// Re-export commonly used types
pub use error::{AuthorizationError, Error, QueryError, Result};
pub use types::*;
pub use calories::estimate_calories;
pub use config::Config;
pub use gateway::{dashboard_scopes, HealthDataGateway};
pub use sample_store::JsonlHealthStore;
pub use synthetic::SyntheticHealthStore;
pub use dashboard::{reduce_on_step_query_result, reduce_on_target_selected, DashboardState, DashboardView};
pub use controller::{run_query, Activation, DashboardController, QueryCompletion, RefreshTicket};
pub use history::{daily_summaries, export_csv, DailySummary, MAX_HISTORY_DAYS};
