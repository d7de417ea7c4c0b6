//! Rover Recipes Common Library
//!
//! Shared code for the Rover Recipes backend including:
//! - Database models, connection pool and repository
//! - The recipe catalog service (recipe creation)
//! - Photo storage
//! - Error types and handling
//! - Configuration management
//! - Metrics helpers

pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use catalog::{Catalog, IngredientRow, RecipeSubmission, StepRow};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use storage::{PhotoStore, PhotoUpload};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
