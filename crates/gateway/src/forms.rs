//! Multipart decoding of the recipe creation form
//!
//! The HTML form posts ingredients and steps as parallel lists
//! (`ingredientes`, `unidades`, `cantidades`, `pasos`, `fotos_pasos`).
//! They are paired up by position here, so the rest of the system only sees
//! structured rows.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use roverrecipes_common::{
    errors::{AppError, Result},
    IngredientRow, PhotoUpload, RecipeSubmission, StepRow,
};
use tracing::debug;

/// Read the whole form. `limit` is only used to describe an oversized body.
pub async fn read_recipe_form(mut multipart: Multipart, limit: usize) -> Result<RecipeSubmission> {
    let mut name = None;
    let mut description = None;
    let mut category_id = None;
    let mut main_photo = None;

    let mut ingredient_names = Vec::new();
    let mut units = Vec::new();
    let mut quantities = Vec::new();
    let mut step_texts = Vec::new();
    let mut step_photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        // `ingredientes[]` and `ingredientes` name the same list
        let key = field
            .name()
            .unwrap_or_default()
            .trim_end_matches("[]")
            .to_string();

        match key.as_str() {
            "nombre" => name = Some(read_text(field, limit).await?),
            "descripcion" => description = Some(read_text(field, limit).await?),
            "categoria_id" => category_id = parse_category_id(&read_text(field, limit).await?),
            "foto_principal" => main_photo = read_file(field, limit).await?,
            "ingredientes" => ingredient_names.push(read_text(field, limit).await?),
            "unidades" => units.push(read_text(field, limit).await?),
            "cantidades" => quantities.push(read_text(field, limit).await?),
            "pasos" => step_texts.push(read_text(field, limit).await?),
            "fotos_pasos" => step_photos.push(read_file(field, limit).await?),
            _ => debug!(field = %key, "Ignoring unknown form field"),
        }
    }

    let name = name.ok_or_else(|| AppError::MissingField {
        field: "nombre".to_string(),
    })?;

    Ok(RecipeSubmission {
        name,
        description,
        category_id,
        main_photo,
        ingredients: pair_ingredients(ingredient_names, units, quantities),
        steps: pair_steps(step_texts, step_photos),
    })
}

/// Blank or non-numeric ids leave the recipe without a category
pub fn parse_category_id(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

/// Zip the parallel ingredient lists; a shorter list reads as blank
pub fn pair_ingredients(
    names: Vec<String>,
    units: Vec<String>,
    quantities: Vec<String>,
) -> Vec<IngredientRow> {
    let len = names.len().max(units.len()).max(quantities.len());
    let mut names = names.into_iter();
    let mut units = units.into_iter();
    let mut quantities = quantities.into_iter();

    (0..len)
        .map(|_| IngredientRow {
            name: names.next().unwrap_or_default(),
            unit: units.next().unwrap_or_default(),
            quantity: quantities.next().unwrap_or_default(),
        })
        .collect()
}

/// Zip step descriptions with the step photo inputs at the same position
pub fn pair_steps(descriptions: Vec<String>, photos: Vec<Option<PhotoUpload>>) -> Vec<StepRow> {
    let len = descriptions.len().max(photos.len());
    let mut descriptions = descriptions.into_iter();
    let mut photos = photos.into_iter();

    (0..len)
        .map(|_| StepRow {
            description: descriptions.next().unwrap_or_default(),
            photo: photos.next().flatten(),
        })
        .collect()
}

async fn read_text(field: Field<'_>, limit: usize) -> Result<String> {
    field.text().await.map_err(|e| multipart_error(e, limit))
}

/// Browsers send an empty part for an untouched file input
async fn read_file(field: Field<'_>, limit: usize) -> Result<Option<PhotoUpload>> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

    if bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(PhotoUpload::new(file_name, bytes.to_vec())))
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::InvalidFormat {
            message: err.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_category_id() {
        assert_eq!(parse_category_id("3"), Some(3));
        assert_eq!(parse_category_id(" 12 "), Some(12));
        assert_eq!(parse_category_id(""), None);
        assert_eq!(parse_category_id("soups"), None);
        assert_eq!(parse_category_id("1.5"), None);
    }

    #[test]
    fn test_pair_ingredients_by_position() {
        let rows = pair_ingredients(
            strings(&["Tomato", "Salt", ""]),
            strings(&["kg", "g", ""]),
            strings(&["2", "bad", ""]),
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], IngredientRow {
            name: "Salt".into(),
            unit: "g".into(),
            quantity: "bad".into(),
        });
        assert!(rows[2].is_blank());
    }

    #[test]
    fn test_pair_ingredients_short_lists() {
        let rows = pair_ingredients(strings(&["Egg", "Milk"]), strings(&["pc"]), Vec::new());

        assert_eq!(rows[0].unit, "pc");
        assert_eq!(rows[1].unit, "");
        assert_eq!(rows[1].quantity, "");
    }

    #[test]
    fn test_pair_steps_keeps_photo_alignment() {
        let photo = PhotoUpload::new("two.jpg", vec![2]);
        let rows = pair_steps(
            strings(&["One", "Two", "Three"]),
            vec![None, Some(photo.clone())],
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].photo, None);
        assert_eq!(rows[1].photo, Some(photo));
        assert_eq!(rows[2].photo, None);
    }
}
