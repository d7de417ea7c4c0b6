//! Recipe handlers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{forms, AppState};
use roverrecipes_common::{
    db::{RecipeDetail, RecipeSummary},
    errors::{AppError, Result},
};

/// Response after creating a recipe
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRecipeResponse {
    pub success: bool,
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
}

/// List every recipe with its category name
pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<RecipeSummary>>> {
    let recipes = state.repo().list_recipes().await?;
    Ok(Json(recipes))
}

/// Get a recipe with its ingredients and steps
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeDetail>> {
    let recipe = state
        .repo()
        .find_recipe(recipe_id)
        .await?
        .ok_or(AppError::RecipeNotFound { id: recipe_id })?;

    Ok(Json(recipe))
}

/// Create a recipe from the multipart creation form
pub async fn create_recipe(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<CreateRecipeResponse>)> {
    let multipart = multipart.map_err(|e| AppError::InvalidFormat {
        message: e.body_text(),
    })?;

    let submission = forms::read_recipe_form(multipart, state.config.server.max_upload_bytes).await?;
    let recipe = state.catalog.create_recipe(submission).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRecipeResponse {
            success: true,
            id: recipe.id,
            name: recipe.name,
        }),
    ))
}
