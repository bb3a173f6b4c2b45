use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub quantity: Decimal,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Value of the on-hand stock for this ingredient, at two-decimal scale.
    pub fn stock_value(&self) -> Decimal {
        let mut value = (self.quantity * self.unit_price).round_dp(2);
        value.rescale(2);
        value
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,
    #[sea_orm(has_many = "super::waste_record::Entity")]
    WasteRecords,
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl Related<super::waste_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WasteRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
