//! Rover Recipes HTTP gateway
//!
//! Routes, handlers and the multipart form decoding for the recipe
//! catalog. Every JSON route is reachable both at the root (`/recetas`)
//! and under `/api` (`/api/recetas`).

pub mod forms;
pub mod handlers;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use roverrecipes_common::{
    config::AppConfig,
    db::{DbPool, Repository},
    errors::Result,
    storage::PhotoStore,
    Catalog,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub catalog: Catalog,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Connect, bootstrap schema and seed data, prepare the photos tree
    pub async fn build(config: AppConfig, metrics: Option<PrometheusHandle>) -> Result<Self> {
        let db = DbPool::new(&config.database).await?;
        db.ensure_schema().await?;

        let repo = Repository::new(db.clone());
        repo.ensure_categories(&config.catalog.seed_categories).await?;

        let photos = PhotoStore::new(&config.storage);
        photos.ensure_dirs().await?;
        info!(photos_dir = %photos.root().display(), "Photo storage ready");

        Ok(Self {
            config: Arc::new(config),
            db,
            catalog: Catalog::new(repo, photos),
            metrics,
        })
    }

    pub fn repo(&self) -> &Repository {
        self.catalog.repository()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let recipe_routes = Router::new()
        .route(
            "/recetas",
            get(handlers::recipes::list_recipes).post(handlers::recipes::create_recipe),
        )
        .route("/recetas/{id}", get(handlers::recipes::get_recipe))
        .route("/categorias", get(handlers::categories::list_categories));

    let mut app = Router::new()
        // Pages
        .route("/", get(handlers::pages::home))
        .route("/create", get(handlers::pages::create_form))

        // Probes
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // JSON API, legacy unprefixed and under /api
        .merge(recipe_routes.clone())
        .nest("/api", recipe_routes);

    let public_path = state.config.storage.public_path.trim_matches('/');
    if public_path.is_empty() {
        warn!("storage.public_path is empty; uploaded photos are not served");
    } else {
        app = app.nest_service(
            &format!("/{}", public_path),
            ServeDir::new(state.catalog.photos().root()),
        );
    }

    app.fallback_service(ServeDir::new(&state.config.server.static_dir))
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                // Request ID propagation
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
                .layer(TimeoutLayer::new(state.config.request_timeout())),
        )
        .with_state(state)
}
