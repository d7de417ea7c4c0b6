//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, NotSet,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Recipe ready to be written: blank rows already dropped, quantities parsed,
/// steps numbered and photo paths final.
#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub main_photo: Option<String>,
    pub ingredients: Vec<NewIngredient>,
    pub steps: Vec<NewStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIngredient {
    pub name: String,
    pub unit: Option<String>,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStep {
    pub number: i32,
    pub description: String,
    pub photo: Option<String>,
}

/// Recipe as returned by the listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    /// Category name, `null` when the recipe has none
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "foto_principal")]
    pub main_photo: Option<String>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: String,
}

impl RecipeSummary {
    fn from_parts(recipe: Recipe, category: Option<Category>) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            description: recipe.description,
            category: category.map(|c| c.name),
            main_photo: recipe.main_photo,
            created_at: recipe.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientLine {
    /// Ingredient id, shared across recipes
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "unidad")]
    pub unit: Option<String>,
    #[serde(rename = "cantidad")]
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLine {
    pub id: i32,
    #[serde(rename = "paso_numero")]
    pub number: i32,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "foto")]
    pub photo: Option<String>,
}

/// Recipe with its ingredient lines and ordered steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    #[serde(rename = "ingredientes")]
    pub ingredients: Vec<IngredientLine>,
    #[serde(rename = "pasos")]
    pub steps: Vec<StepLine>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Underlying pool, for callers that manage their own transaction
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Category Operations
    // ========================================================================

    /// List all categories in id order
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        CategoryEntity::find()
            .order_by_asc(CategoryColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Insert each named category that does not exist yet.
    /// Returns how many were inserted.
    pub async fn ensure_categories(&self, names: &[String]) -> Result<usize> {
        let mut inserted = 0;

        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let existing = CategoryEntity::find()
                .filter(CategoryColumn::Name.eq(name))
                .one(self.conn())
                .await?;

            if existing.is_none() {
                CategoryActiveModel {
                    id: NotSet,
                    name: Set(name.to_string()),
                }
                .insert(self.conn())
                .await?;
                inserted += 1;
            }
        }

        if inserted > 0 {
            info!(inserted, "Seeded categories");
        }

        Ok(inserted)
    }

    // ========================================================================
    // Recipe Operations
    // ========================================================================

    /// List all recipes in id order with their category name
    pub async fn list_recipes(&self) -> Result<Vec<RecipeSummary>> {
        let rows = RecipeEntity::find()
            .find_also_related(CategoryEntity)
            .order_by_asc(RecipeColumn::Id)
            .all(self.conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(recipe, category)| RecipeSummary::from_parts(recipe, category))
            .collect())
    }

    /// Find a recipe with its ingredients and steps
    pub async fn find_recipe(&self, id: i32) -> Result<Option<RecipeDetail>> {
        let Some((recipe, category)) = RecipeEntity::find_by_id(id)
            .find_also_related(CategoryEntity)
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        let ingredients = RecipeIngredientEntity::find()
            .filter(RecipeIngredientColumn::RecipeId.eq(id))
            .find_also_related(IngredientEntity)
            .order_by_asc(RecipeIngredientColumn::Id)
            .all(self.conn())
            .await?
            .into_iter()
            .filter_map(|(line, ingredient)| {
                ingredient.map(|ingredient| IngredientLine {
                    id: ingredient.id,
                    name: ingredient.name,
                    unit: ingredient.unit,
                    quantity: line.quantity,
                })
            })
            .collect();

        let steps = StepEntity::find()
            .filter(StepColumn::RecipeId.eq(id))
            .order_by_asc(StepColumn::Number)
            .all(self.conn())
            .await?
            .into_iter()
            .map(|step| StepLine {
                id: step.id,
                number: step.number,
                description: step.description,
                photo: step.photo,
            })
            .collect();

        Ok(Some(RecipeDetail {
            summary: RecipeSummary::from_parts(recipe, category),
            ingredients,
            steps,
        }))
    }

    /// Whether a category with this id exists
    pub async fn category_exists(&self, id: i32) -> Result<bool> {
        Ok(CategoryEntity::find_by_id(id).one(self.conn()).await?.is_some())
    }

    /// Insert a recipe, its ingredient links and its steps on `conn`.
    ///
    /// Meant to run inside a transaction owned by the caller; nothing here
    /// commits. The recipe INSERT stays the first statement so the
    /// transaction takes the SQLite write lock up front; one that reads
    /// first fails with `database is locked` next to a concurrent writer.
    /// Check the category with [`category_exists`] before `begin()`.
    ///
    /// [`category_exists`]: Repository::category_exists
    pub async fn insert_recipe<C: ConnectionTrait>(conn: &C, recipe: NewRecipe) -> Result<Recipe> {
        let created = RecipeActiveModel {
            id: NotSet,
            name: Set(recipe.name),
            description: Set(recipe.description),
            category_id: Set(recipe.category_id),
            main_photo: Set(recipe.main_photo),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;

        for line in recipe.ingredients {
            let ingredient = Self::find_or_create_ingredient(conn, &line.name, line.unit).await?;

            RecipeIngredientActiveModel {
                id: NotSet,
                recipe_id: Set(created.id),
                ingredient_id: Set(ingredient.id),
                quantity: Set(Some(line.quantity)),
            }
            .insert(conn)
            .await?;
        }

        for step in recipe.steps {
            StepActiveModel {
                id: NotSet,
                recipe_id: Set(created.id),
                number: Set(step.number),
                description: Set(step.description),
                photo: Set(step.photo),
            }
            .insert(conn)
            .await?;
        }

        debug!(recipe_id = created.id, "Recipe rows inserted");
        Ok(created)
    }

    // ========================================================================
    // Ingredient Operations
    // ========================================================================

    /// Reuse the ingredient with exactly this name, or create it with `unit`.
    /// An existing ingredient keeps its stored unit.
    pub async fn find_or_create_ingredient<C: ConnectionTrait>(
        conn: &C,
        name: &str,
        unit: Option<String>,
    ) -> Result<Ingredient> {
        if let Some(existing) = IngredientEntity::find()
            .filter(IngredientColumn::Name.eq(name))
            .one(conn)
            .await?
        {
            return Ok(existing);
        }

        IngredientActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            unit: Set(unit),
        }
        .insert(conn)
        .await
        .map_err(Into::into)
    }
}
