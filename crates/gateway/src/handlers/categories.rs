//! Category handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use roverrecipes_common::errors::Result;

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
}

/// List every category in id order
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryResponse>>> {
    let categories = state
        .repo()
        .list_categories()
        .await?
        .into_iter()
        .map(|c| CategoryResponse { id: c.id, name: c.name })
        .collect();

    Ok(Json(categories))
}
