//! Liveness, readiness and Prometheus endpoints
//!
//! Readiness covers what a recipe creation needs: a database that answers
//! and writable photo and staging directories.

use axum::{extract::State, http::StatusCode, Json};
use roverrecipes_common::{
    errors::{AppError, Result},
    PhotoStore,
};
use serde::Serialize;
use std::{path::Path, time::Instant};

use crate::AppState;

#[derive(Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub checks: Checks,
}

#[derive(Serialize)]
pub struct Checks {
    pub database: Probe,
    pub photos: Probe,
}

/// Outcome of one dependency check
#[derive(Serialize)]
pub struct Probe {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Probe {
    fn up(latency_ms: Option<u64>) -> Self {
        Self {
            status: "up",
            latency_ms,
            detail: None,
        }
    }

    fn down(detail: String) -> Self {
        Self {
            status: "down",
            latency_ms: None,
            detail: Some(detail),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// The process is up and routing
pub async fn health() -> Json<Liveness> {
    Json(Liveness {
        status: "healthy",
        version: roverrecipes_common::VERSION,
    })
}

/// 200 when recipes can be read and created, 503 otherwise
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let database = check_database(&state).await;
    let photos = check_photos(state.catalog.photos()).await;

    let (code, status) = if database.is_up() && photos.is_up() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(Readiness {
            status,
            checks: Checks { database, photos },
        }),
    )
}

async fn check_database(state: &AppState) -> Probe {
    let start = Instant::now();

    match state.db.ping().await {
        Ok(()) => Probe::up(Some(start.elapsed().as_millis() as u64)),
        Err(e) => Probe::down(e.to_string()),
    }
}

async fn check_photos(store: &PhotoStore) -> Probe {
    for dir in [store.root(), store.staging_root()] {
        if let Err(detail) = writable_dir(dir).await {
            return Probe::down(detail);
        }
    }

    Probe::up(None)
}

async fn writable_dir(dir: &Path) -> std::result::Result<(), String> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Ok(()),
        Ok(_) => Err(format!("{} is not a writable directory", dir.display())),
        Err(e) => Err(format!("{}: {}", dir.display(), e)),
    }
}

/// Prometheus exposition, 404 when metrics are disabled
pub async fn metrics(State(state): State<AppState>) -> Result<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound {
            resource_type: "endpoint".to_string(),
            id: "/metrics".to_string(),
        })
}
