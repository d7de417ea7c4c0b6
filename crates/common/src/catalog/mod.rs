//! Recipe catalog service
//!
//! Turns a submitted recipe form into database rows and stored photos.
//! Blank ingredient and step rows are dropped here; step numbers count only
//! the rows that survive.

use crate::db::{NewIngredient, NewRecipe, NewStep, Repository};
use crate::db::models::Recipe;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::storage::{PhotoBatch, PhotoKind, PhotoStore, PhotoUpload};
use std::time::Instant;
use tracing::{info, instrument};
use validator::Validate;

/// Recipe form as submitted, one structured row per ingredient and step
#[derive(Debug, Clone, Default, Validate)]
pub struct RecipeSubmission {
    #[validate(length(min = 1, max = 200, message = "Recipe name must be 1 to 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub main_photo: Option<PhotoUpload>,
    pub ingredients: Vec<IngredientRow>,
    pub steps: Vec<StepRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientRow {
    pub name: String,
    pub unit: String,
    /// Raw quantity text; unparsable values become 0
    pub quantity: String,
}

impl IngredientRow {
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRow {
    pub description: String,
    pub photo: Option<PhotoUpload>,
}

impl StepRow {
    pub fn is_blank(&self) -> bool {
        self.description.trim().is_empty()
    }
}

/// Parse a quantity, falling back to 0 for anything that is not a finite number
pub fn parse_quantity(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite())
        .unwrap_or(0.0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Ingredient rows to insert, blank names dropped
pub fn plan_ingredients(rows: Vec<IngredientRow>) -> Vec<NewIngredient> {
    rows.into_iter()
        .filter(|row| !row.is_blank())
        .map(|row| NewIngredient {
            quantity: parse_quantity(&row.quantity),
            unit: non_blank(Some(row.unit)),
            name: row.name,
        })
        .collect()
}

#[derive(Clone)]
pub struct Catalog {
    repo: Repository,
    photos: PhotoStore,
}

impl Catalog {
    pub fn new(repo: Repository, photos: PhotoStore) -> Self {
        Self { repo, photos }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    /// Create a recipe with its ingredients, steps and photos.
    ///
    /// Either everything is stored or nothing is: rows share one transaction
    /// and photos stay staged until every row is inserted.
    #[instrument(skip_all, fields(name = %submission.name))]
    pub async fn create_recipe(&self, mut submission: RecipeSubmission) -> Result<Recipe> {
        let start = Instant::now();

        // Stored trimmed, so validated trimmed
        submission.name = submission.name.trim().to_string();
        if submission.name.is_empty() {
            return Err(AppError::invalid_field("nombre", "Recipe name is required"));
        }
        submission
            .validate()
            .map_err(|e| AppError::invalid_field("nombre", e.to_string()))?;

        if let Some(category_id) = submission.category_id {
            if !self.repo.category_exists(category_id).await? {
                return Err(AppError::invalid_field(
                    "categoria_id",
                    format!("Unknown category id {}", category_id),
                ));
            }
        }

        let mut batch = self.photos.begin();

        match self.write(&mut batch, submission).await {
            Ok((recipe, ingredients, steps)) => {
                let photos = batch.len();
                batch.finish().await;

                metrics::record_recipe_created(start.elapsed().as_secs_f64(), ingredients, steps);
                info!(
                    recipe_id = recipe.id,
                    ingredients,
                    steps,
                    photos,
                    "Recipe created"
                );
                Ok(recipe)
            }
            Err(e) => {
                batch.discard().await;
                metrics::record_recipe_failure(&format!("{:?}", e.code()));
                Err(e)
            }
        }
    }

    async fn write(
        &self,
        batch: &mut PhotoBatch,
        submission: RecipeSubmission,
    ) -> Result<(Recipe, usize, usize)> {
        let main_photo = match submission.main_photo {
            Some(upload) => Some(batch.stage(PhotoKind::Main, upload).await?),
            None => None,
        };

        let ingredients = plan_ingredients(submission.ingredients);

        let mut steps = Vec::new();
        for (index, row) in submission.steps.into_iter().filter(|row| !row.is_blank()).enumerate() {
            let photo = match row.photo {
                Some(upload) => Some(batch.stage(PhotoKind::Step, upload).await?),
                None => None,
            };

            steps.push(NewStep {
                number: index as i32 + 1,
                description: row.description,
                photo,
            });
        }

        let (ingredient_count, step_count) = (ingredients.len(), steps.len());

        let recipe = NewRecipe {
            name: submission.name,
            description: non_blank(submission.description),
            category_id: submission.category_id,
            main_photo,
            ingredients,
            steps,
        };

        // Nothing may read on `txn` before `insert_recipe` writes
        let txn = self.repo.pool().begin().await?;
        let created = Repository::insert_recipe(&txn, recipe).await?;

        // Files go public before the commit so a failed move still rolls
        // back the rows; a failed commit is undone by `discard`.
        batch.promote().await?;
        txn.commit().await?;

        Ok((created, ingredient_count, step_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, StorageConfig};
    use std::path::Path;
    use crate::db::models::*;
    use crate::db::DbPool;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tempfile::TempDir;

    async fn test_catalog() -> (Catalog, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_on(&DatabaseConfig::in_memory(), dir.path()).await;
        (catalog, dir)
    }

    /// Catalog over a SQLite file in `dir`, with a real connection pool
    async fn file_catalog() -> (Catalog, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let database = DatabaseConfig {
            data_dir: dir.path().display().to_string(),
            name: "catalog".to_string(),
            ..DatabaseConfig::default()
        };
        let catalog = catalog_on(&database, dir.path()).await;
        (catalog, dir)
    }

    async fn catalog_on(database: &DatabaseConfig, dir: &Path) -> Catalog {
        let pool = DbPool::new(database).await.unwrap();
        pool.ensure_schema().await.unwrap();

        let repo = Repository::new(pool);
        repo.ensure_categories(&["Soups".to_string()]).await.unwrap();

        let photos = PhotoStore::new(&StorageConfig::rooted_at(dir.join("photos")));
        Catalog::new(repo, photos)
    }

    fn row(name: &str, unit: &str, quantity: &str) -> IngredientRow {
        IngredientRow {
            name: name.into(),
            unit: unit.into(),
            quantity: quantity.into(),
        }
    }

    fn step(description: &str) -> StepRow {
        StepRow {
            description: description.into(),
            photo: None,
        }
    }

    fn count_files(dir: &std::path::Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .flatten()
            .map(|entry| {
                let path = entry.path();
                if path.is_dir() { count_files(&path) } else { 1 }
            })
            .sum()
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("2"), 2.0);
        assert_eq!(parse_quantity(" 0.5 "), 0.5);
        assert_eq!(parse_quantity("bad"), 0.0);
        assert_eq!(parse_quantity(""), 0.0);
        assert_eq!(parse_quantity("NaN"), 0.0);
        assert_eq!(parse_quantity("inf"), 0.0);
        assert_eq!(parse_quantity("-1"), -1.0);
    }

    #[test]
    fn test_plan_ingredients_skips_blank_names() {
        let planned = plan_ingredients(vec![
            row("Tomato", "kg", "2"),
            row("   ", "g", "5"),
            row("Salt", "", "bad"),
        ]);

        assert_eq!(
            planned,
            vec![
                NewIngredient { name: "Tomato".into(), unit: Some("kg".into()), quantity: 2.0 },
                NewIngredient { name: "Salt".into(), unit: None, quantity: 0.0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_tomato_soup_example() {
        let (catalog, _dir) = test_catalog().await;

        let recipe = catalog
            .create_recipe(RecipeSubmission {
                name: "Tomato Soup".into(),
                ingredients: vec![row("Tomato", "kg", "2"), row("Salt", "g", "bad"), row("", "", "")],
                steps: vec![step("Chop"), step(""), step("")],
                ..RecipeSubmission::default()
            })
            .await
            .unwrap();

        let detail = catalog.repository().find_recipe(recipe.id).await.unwrap().unwrap();
        let ingredients: Vec<_> = detail
            .ingredients
            .iter()
            .map(|i| (i.name.as_str(), i.quantity))
            .collect();
        assert_eq!(ingredients, vec![("Tomato", Some(2.0)), ("Salt", Some(0.0))]);

        assert_eq!(detail.steps.len(), 1);
        assert_eq!(detail.steps[0].number, 1);
        assert_eq!(detail.steps[0].description, "Chop");
    }

    #[tokio::test]
    async fn test_step_numbers_skip_blank_rows() {
        let (catalog, _dir) = test_catalog().await;

        let recipe = catalog
            .create_recipe(RecipeSubmission {
                name: "Bread".into(),
                steps: vec![step(""), step("Mix"), step("  "), step("Knead"), step("Bake")],
                ..RecipeSubmission::default()
            })
            .await
            .unwrap();

        let detail = catalog.repository().find_recipe(recipe.id).await.unwrap().unwrap();
        let steps: Vec<_> = detail
            .steps
            .iter()
            .map(|s| (s.number, s.description.as_str()))
            .collect();
        assert_eq!(steps, vec![(1, "Mix"), (2, "Knead"), (3, "Bake")]);
    }

    #[tokio::test]
    async fn test_photos_are_stored_with_rows() {
        let (catalog, dir) = test_catalog().await;

        let recipe = catalog
            .create_recipe(RecipeSubmission {
                name: "Paella".into(),
                category_id: Some(1),
                main_photo: Some(PhotoUpload::new("paella.jpg", b"jpeg".to_vec())),
                steps: vec![
                    StepRow {
                        description: "Fry".into(),
                        photo: Some(PhotoUpload::new("fry.jpg", b"fry".to_vec())),
                    },
                    // Photo of a skipped step is never written
                    StepRow {
                        description: " ".into(),
                        photo: Some(PhotoUpload::new("skip.jpg", b"skip".to_vec())),
                    },
                    step("Serve"),
                ],
                ..RecipeSubmission::default()
            })
            .await
            .unwrap();

        let main = recipe.main_photo.clone().unwrap();
        assert!(main.starts_with("photos/"));
        assert_eq!(std::fs::read(dir.path().join(&main)).unwrap(), b"jpeg");

        let detail = catalog.repository().find_recipe(recipe.id).await.unwrap().unwrap();
        let fry = detail.steps[0].photo.clone().unwrap();
        assert!(fry.starts_with("photos/steps/"));
        assert_eq!(std::fs::read(dir.path().join(&fry)).unwrap(), b"fry");
        assert_eq!(detail.steps[1].photo, None);

        assert_eq!(count_files(catalog.photos().root()), 2);
    }

    #[tokio::test]
    async fn test_blank_name_rejected_before_writes() {
        let (catalog, _dir) = test_catalog().await;

        let err = catalog
            .create_recipe(RecipeSubmission {
                name: "   ".into(),
                main_photo: Some(PhotoUpload::new("a.jpg", vec![1])),
                ingredients: vec![row("Egg", "", "1")],
                ..RecipeSubmission::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));

        let conn = catalog.repository().pool().conn();
        assert_eq!(RecipeEntity::find().count(conn).await.unwrap(), 0);
        assert_eq!(IngredientEntity::find().count(conn).await.unwrap(), 0);
        assert_eq!(count_files(catalog.photos().root()), 0);
    }

    #[tokio::test]
    async fn test_overlong_name_rejected() {
        let (catalog, _dir) = test_catalog().await;

        let err = catalog
            .create_recipe(RecipeSubmission {
                name: "x".repeat(201),
                ..RecipeSubmission::default()
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::errors::ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_name_limit_applies_after_trimming() {
        let (catalog, _dir) = test_catalog().await;
        let name = "x".repeat(200);

        let recipe = catalog
            .create_recipe(RecipeSubmission {
                name: format!("  {}  ", name),
                ..RecipeSubmission::default()
            })
            .await
            .unwrap();

        assert_eq!(recipe.name, name);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creations_with_category() {
        let (catalog, _dir) = file_catalog().await;

        let tasks: Vec<_> = (0..24)
            .map(|i| {
                let catalog = catalog.clone();
                tokio::spawn(async move {
                    catalog
                        .create_recipe(RecipeSubmission {
                            name: format!("Soup {}", i),
                            category_id: Some(1),
                            main_photo: Some(PhotoUpload::new("soup.jpg", vec![i as u8])),
                            ingredients: vec![row("Tomato", "kg", "1"), row(&format!("Herb {}", i), "g", "2")],
                            steps: vec![step("Simmer")],
                            ..RecipeSubmission::default()
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            tokio_test::assert_ok!(task.await.unwrap());
        }

        let recipes = catalog.repository().list_recipes().await.unwrap();
        assert_eq!(recipes.len(), 24);
        assert!(recipes.iter().all(|r| r.category.as_deref() == Some("Soups")));

        // One shared Tomato plus one herb per recipe
        let conn = catalog.repository().pool().conn();
        assert_eq!(IngredientEntity::find().count(conn).await.unwrap(), 25);
        assert_eq!(StepEntity::find().count(conn).await.unwrap(), 24);
        assert_eq!(count_files(catalog.photos().root()), 24);
    }

    #[tokio::test]
    async fn test_failure_leaves_no_rows_or_files() {
        let (catalog, _dir) = test_catalog().await;

        let err = catalog
            .create_recipe(RecipeSubmission {
                name: "Lost".into(),
                category_id: Some(99),
                main_photo: Some(PhotoUpload::new("lost.jpg", b"x".to_vec())),
                ingredients: vec![row("Pepper", "g", "1")],
                steps: vec![StepRow {
                    description: "Grind".into(),
                    photo: Some(PhotoUpload::new("grind.jpg", b"y".to_vec())),
                }],
                ..RecipeSubmission::default()
            })
            .await
            .unwrap_err();

        assert!(err.is_client_error());

        let conn = catalog.repository().pool().conn();
        assert_eq!(RecipeEntity::find().count(conn).await.unwrap(), 0);
        assert_eq!(IngredientEntity::find().count(conn).await.unwrap(), 0);
        assert_eq!(StepEntity::find().count(conn).await.unwrap(), 0);
        assert_eq!(count_files(catalog.photos().root()), 0);
    }

    #[tokio::test]
    async fn test_description_blank_becomes_null() {
        let (catalog, _dir) = test_catalog().await;

        let recipe = tokio_test::assert_ok!(
            catalog
                .create_recipe(RecipeSubmission {
                    name: " Toast ".into(),
                    description: Some("  ".into()),
                    ..RecipeSubmission::default()
                })
                .await
        );

        assert_eq!(recipe.name, "Toast");
        assert_eq!(recipe.description, None);
    }
}
