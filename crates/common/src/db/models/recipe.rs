//! Recipe entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recetas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_name = "nombre")]
    pub name: String,

    #[sea_orm(column_name = "descripcion", column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_name = "categoria_id", nullable)]
    pub category_id: Option<i32>,

    /// Relative path under the public photos prefix
    #[sea_orm(column_name = "foto_principal", nullable)]
    pub main_photo: Option<String>,

    #[sea_orm(column_name = "fecha_creacion")]
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,

    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    Ingredients,

    #[sea_orm(has_many = "super::step::Entity")]
    Steps,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredients.def()
    }
}

impl Related<super::step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
