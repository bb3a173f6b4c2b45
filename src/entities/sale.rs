use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total: Decimal,
    pub completed: bool,
    pub sale_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_recipe::Entity")]
    SaleRecipes,
}

impl Related<super::sale_recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleRecipes.def()
    }
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        super::sale_recipe::Relation::Recipe.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::sale_recipe::Relation::Sale.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
