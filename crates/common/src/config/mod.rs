//! Configuration management for Rover Recipes
//!
//! Supports loading configuration from:
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - The `DB_NAME` variable, which picks the database file name
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Photo storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Catalog bootstrap configuration
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Largest accepted request body (multipart uploads included)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Directory holding a prebuilt frontend (index.html and assets)
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Explicit connection URL; overrides `data_dir` + `name` when set
    pub url: Option<String>,

    /// Directory holding the SQLite file
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Database name, the file is `{data_dir}/{name}.db`
    #[serde(default = "default_db_name")]
    pub name: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory uploaded photos are written to
    #[serde(default = "default_photos_dir")]
    pub photos_dir: String,

    /// URL path prefix the photos directory is served under, also the
    /// prefix of every stored photo path
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Where uploads wait until their recipe is committed. Must be on the
    /// same filesystem as `photos_dir` and outside it; defaults to a hidden
    /// sibling (`photos` -> `.photos-staging`).
    #[serde(default)]
    pub staging_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Categories inserted at startup when missing
    #[serde(default = "default_seed_categories")]
    pub seed_categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (debug, info, warn, error or a full EnvFilter)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Install the Prometheus recorder and expose /metrics
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Service name reported at startup
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }
fn default_static_dir() -> String { "static".to_string() }
fn default_data_dir() -> String { "/data".to_string() }
fn default_db_name() -> String { "roverrecipes".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_photos_dir() -> String { "photos".to_string() }
fn default_public_path() -> String { "photos".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_metrics_enabled() -> bool { true }
fn default_service_name() -> String { "roverrecipes".to_string() }

fn default_seed_categories() -> Vec<String> {
    ["Italian", "Seafood", "Desserts", "Vegetarian", "Quick & Easy", "Healthy"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
            name: default_db_name(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            photos_dir: default_photos_dir(),
            public_path: default_public_path(),
            staging_dir: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            seed_categories: default_seed_categories(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_enabled: default_metrics_enabled(),
            service_name: default_service_name(),
        }
    }
}

impl DatabaseConfig {
    /// In-memory database, used by tests and throwaway runs
    pub fn in_memory() -> Self {
        Self {
            url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
            min_connections: 1,
            ..Self::default()
        }
    }

    /// Path of the SQLite file when no explicit URL is configured
    pub fn file_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(format!("{}.db", self.name))
    }

    /// Connection URL handed to SeaORM
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            // rwc: create the file when it does not exist yet
            None => format!("sqlite://{}?mode=rwc", self.file_path().display()),
        }
    }

    /// Whether the configured database lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.url.as_deref().is_some_and(|url| url.contains(":memory:"))
    }
}

impl StorageConfig {
    /// Storage rooted at `dir`, keeping the default public path
    pub fn rooted_at(dir: impl AsRef<Path>) -> Self {
        Self {
            photos_dir: dir.as_ref().display().to_string(),
            ..Self::default()
        }
    }

    /// Staging directory, explicit or derived from `photos_dir`
    pub fn staging_path(&self) -> PathBuf {
        if let Some(dir) = &self.staging_dir {
            return PathBuf::from(dir);
        }

        let photos = Path::new(&self.photos_dir);
        let name = photos
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photos".to_string());
        photos.with_file_name(format!(".{}-staging", name))
    }
}

impl AppConfig {
    /// Load configuration from `config/`, the environment and `.env`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        Self::load_from(Path::new("config"), &env)
    }

    /// Layered load with the config files read from `dir`
    pub fn load_from(dir: &Path, env: &str) -> Result<Self, ConfigError> {
        let file = |name: &str| File::with_name(&dir.join(name).to_string_lossy()).required(false);

        let config = Config::builder()
            // Load base config file
            .add_source(file("default"))

            // Load environment-specific config
            .add_source(file(env))

            // Load local overrides
            .add_source(file("local"))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )

            // DB_NAME predates the APP__ scheme and still wins
            .set_override_option("database.name", std::env::var("DB_NAME").ok())?

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
