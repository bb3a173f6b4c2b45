use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    db::DbPool,
    entities::{
        ingredient::{self, Entity as IngredientEntity},
        recipe_ingredient::{self, Entity as RecipeIngredientEntity},
        waste_record::{self, Entity as WasteRecordEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Input payload for creating an ingredient
#[derive(Debug, Clone)]
pub struct CreateIngredientInput {
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
}

/// Input payload for updating an ingredient
#[derive(Debug, Clone, Default)]
pub struct UpdateIngredientInput {
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
}

/// Service for managing the ingredient ledger
#[derive(Clone)]
pub struct IngredientService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl IngredientService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an ingredient record.
    #[instrument(skip(self, input))]
    pub async fn create_ingredient(
        &self,
        input: CreateIngredientInput,
    ) -> Result<ingredient::Model, ServiceError> {
        let db = self.connection();

        validate_name_and_unit(&input.name, &input.unit)?;
        validate_amounts(input.quantity, input.unit_price)?;

        let model = ingredient::ActiveModel {
            id: Default::default(),
            name: Set(input.name.trim().to_string()),
            quantity: Set(input.quantity),
            unit: Set(input.unit.trim().to_string()),
            unit_price: Set(input.unit_price),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(db).await.map_err(|e| {
            error!("Failed to create ingredient: {}", e);
            ServiceError::db_error(e)
        })?;

        info!(
            "Ingredient created: id={}, name={}",
            created.id, created.name
        );

        self.event_sender
            .send_or_log(Event::IngredientCreated(created.id))
            .await;

        Ok(created)
    }

    /// Fetches a single ingredient.
    #[instrument(skip(self))]
    pub async fn get_ingredient(&self, id: i64) -> Result<Option<ingredient::Model>, ServiceError> {
        IngredientEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Returns paginated ingredients ordered by name.
    #[instrument(skip(self))]
    pub async fn list_ingredients(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ingredient::Model>, u64), ServiceError> {
        let db = self.connection();
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = IngredientEntity::find()
            .order_by_asc(ingredient::Column::Name)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Applies updates to an ingredient's mutable fields.
    #[instrument(skip(self, input))]
    pub async fn update_ingredient(
        &self,
        id: i64,
        input: UpdateIngredientInput,
    ) -> Result<ingredient::Model, ServiceError> {
        let db = self.connection();

        let mut model = IngredientEntity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Ingredient {} not found", id)))?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "name must not be blank".to_string(),
                ));
            }
            model.name = name.trim().to_string();
        }
        if let Some(unit) = input.unit {
            if unit.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "unit must not be blank".to_string(),
                ));
            }
            model.unit = unit.trim().to_string();
        }
        if let Some(quantity) = input.quantity {
            if quantity < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "quantity must not be negative".to_string(),
                ));
            }
            model.quantity = quantity;
        }
        if let Some(unit_price) = input.unit_price {
            if unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "unit price must not be negative".to_string(),
                ));
            }
            model.unit_price = unit_price;
        }

        let updated = model
            .into_active_model()
            .reset_all()
            .update(db)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::IngredientUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Deletes an ingredient. Refused while any recipe association still
    /// references it; waste records for the ingredient go with it.
    #[instrument(skip(self))]
    pub async fn delete_ingredient(&self, id: i64) -> Result<(), ServiceError> {
        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let ingredient = IngredientEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Ingredient {} not found", id)))?;

        let references = RecipeIngredientEntity::find()
            .filter(recipe_ingredient::Column::IngredientId.eq(id))
            .count(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        if references > 0 {
            return Err(ServiceError::ValidationError(format!(
                "Ingredient {} is referenced by at least one recipe",
                id
            )));
        }

        WasteRecordEntity::delete_many()
            .filter(waste_record::Column::IngredientId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        ingredient
            .delete(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!("Ingredient deleted: id={}", id);

        self.event_sender
            .send_or_log(Event::IngredientDeleted(id))
            .await;

        Ok(())
    }

    /// Ingredients whose on-hand quantity is strictly below the threshold.
    #[instrument(skip(self))]
    pub async fn low_stock(
        &self,
        threshold: Decimal,
    ) -> Result<Vec<ingredient::Model>, ServiceError> {
        IngredientEntity::find()
            .filter(ingredient::Column::Quantity.lt(threshold))
            .order_by_asc(ingredient::Column::Quantity)
            .all(self.connection())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Total value of the inventory: Σ quantity × unit_price over all
    /// ingredients, in fixed-point decimal.
    #[instrument(skip(self))]
    pub async fn total_inventory_value(&self) -> Result<Decimal, ServiceError> {
        let ingredients = IngredientEntity::find()
            .all(self.connection())
            .await
            .map_err(ServiceError::db_error)?;

        let mut total = ingredients
            .iter()
            .fold(Decimal::ZERO, |acc, item| acc + item.stock_value());
        total.rescale(2);

        Ok(total)
    }

    fn connection(&self) -> &DatabaseConnection {
        self.db_pool.as_ref()
    }
}

fn validate_name_and_unit(name: &str, unit: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "name must not be blank".to_string(),
        ));
    }
    if unit.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "unit must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn validate_amounts(quantity: Decimal, unit_price: Decimal) -> Result<(), ServiceError> {
    if quantity < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "quantity must not be negative".to_string(),
        ));
    }
    if unit_price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "unit price must not be negative".to_string(),
        ));
    }
    Ok(())
}
