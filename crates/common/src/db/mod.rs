//! Database layer for Rover Recipes
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - The connection provider handed to request handlers
//! - Idempotent schema bootstrap

pub mod models;
mod repository;

pub use repository::{
    IngredientLine, NewIngredient, NewRecipe, NewStep, RecipeDetail, RecipeSummary, Repository,
    StepLine,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::*;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    EntityTrait, Schema, TransactionTrait,
};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
///
/// Built once at startup and cloned into the router state. Handlers borrow a
/// pooled connection per query, or open a transaction that rolls back when
/// dropped without a commit.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.url.is_none() {
            std::fs::create_dir_all(&config.data_dir).map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to create data directory {}: {}", config.data_dir, e),
            })?;
        }

        let url = config.connection_url();
        info!(url = %url, "Connecting to database...");

        let mut opts = ConnectOptions::new(url);
        opts.connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        if config.is_in_memory() {
            // Every connection to sqlite::memory: opens a separate database
            opts.max_connections(1).min_connections(1);
        } else {
            opts.max_connections(config.max_connections)
                .min_connections(config.min_connections);
        }

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Pooled connection for single statements
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Open a transaction; dropping it without `commit` rolls back
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        self.conn.begin().await.map_err(Into::into)
    }

    /// Create every table that does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        create_table(&self.conn, CategoryEntity).await?;
        create_table(&self.conn, IngredientEntity).await?;
        create_table(&self.conn, RecipeEntity).await?;
        create_table(&self.conn, RecipeIngredientEntity).await?;
        create_table(&self.conn, StepEntity).await?;

        info!("Database schema ready");
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}

async fn create_table<E: EntityTrait>(conn: &DatabaseConnection, entity: E) -> Result<()> {
    let backend = conn.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();

    conn.execute(backend.build(&stmt)).await?;
    Ok(())
}
