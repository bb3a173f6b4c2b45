use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Association row binding a recipe to an ingredient. `unit_price` is a
/// snapshot of the ingredient's price taken when the row was last written;
/// it is never set directly by callers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_ingredients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Line cost at the snapshotted price, at two-decimal scale. Pure
    /// function of stored state.
    pub fn subtotal(&self) -> Decimal {
        let mut value = (self.quantity * self.unit_price).round_dp(2);
        value.rescale(2);
        value
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id"
    )]
    Recipe,
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn association(quantity: Decimal, unit_price: Decimal) -> Model {
        Model {
            id: 1,
            recipe_id: 1,
            ingredient_id: 1,
            quantity,
            unit_price,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn subtotal_is_quantity_times_snapshot_price() {
        assert_eq!(association(dec!(4), dec!(2.50)).subtotal(), dec!(10.00));
    }

    #[test]
    fn subtotal_rounds_to_two_decimal_places() {
        // 0.33 * 1.55 = 0.5115 -> 0.51
        assert_eq!(association(dec!(0.33), dec!(1.55)).subtotal(), dec!(0.51));
    }

    #[test]
    fn subtotal_of_zero_priced_ingredient_is_zero() {
        assert_eq!(association(dec!(7.25), dec!(0)).subtotal(), dec!(0.00));
    }
}
