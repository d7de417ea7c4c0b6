//! SeaORM entity models
//!
//! Table and column names match the deployed SQLite schema.

mod category;
mod ingredient;
mod recipe;
mod recipe_ingredient;
mod step;

pub use category::{
    Entity as CategoryEntity,
    Model as Category,
    ActiveModel as CategoryActiveModel,
    Column as CategoryColumn,
};

pub use recipe::{
    Entity as RecipeEntity,
    Model as Recipe,
    ActiveModel as RecipeActiveModel,
    Column as RecipeColumn,
};

pub use ingredient::{
    Entity as IngredientEntity,
    Model as Ingredient,
    ActiveModel as IngredientActiveModel,
    Column as IngredientColumn,
};

pub use recipe_ingredient::{
    Entity as RecipeIngredientEntity,
    Model as RecipeIngredient,
    ActiveModel as RecipeIngredientActiveModel,
    Column as RecipeIngredientColumn,
};

pub use step::{
    Entity as StepEntity,
    Model as Step,
    ActiveModel as StepActiveModel,
    Column as StepColumn,
};
