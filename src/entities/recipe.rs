use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub portions: Decimal,
    pub category: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,
    #[sea_orm(has_many = "super::sale_recipe::Entity")]
    SaleRecipes,
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl Related<super::sale_recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleRecipes.def()
    }
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        super::sale_recipe::Relation::Sale.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::sale_recipe::Relation::Recipe.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
