#![forbid(unsafe_code)]

//! Core engine for the Forge workout planner.
//!
//! This crate provides:
//! - Domain types (exercises, targets, day and week schedules)
//! - Exercise catalog and name resolution
//! - Duration estimation and time budgeting
//! - Target selection and load progression
//! - Muscle recovery and movement coverage analysis
//! - Generator prompting, response parsing and week orchestration
//! - Performance history loading and plan persistence

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod estimator;
pub mod metrics;
pub mod progression;
pub mod targets;
pub mod budget;
pub mod coverage;
pub mod history;
pub mod generator;
pub mod prompt;
pub mod parser;
pub mod orchestrator;
pub mod store;

// Re-export commonly used types
pub use error::{Error, FieldIssue, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, ExerciseCatalog};
pub use config::Config;
pub use estimator::{estimate_duration, DurationEstimate, EstimateInput};
pub use targets::TargetSelector;
pub use budget::{budget_with, BudgetOutcome};
pub use coverage::{analyze_week, check_rebalance, RecoveryState};
pub use history::load_history;
pub use generator::{ModelCache, ReplayGenerator, WorkoutGenerator};
pub use orchestrator::{GeneratedWeek, WeekPlanner, WeekRequest};
pub use store::{JsonPlanStore, PlanStore};
