use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    db::DbPool,
    entities::{
        ingredient::{self, Entity as IngredientEntity},
        recipe::{self, Entity as RecipeEntity},
        recipe_ingredient::{self, Entity as RecipeIngredientEntity},
        sale_recipe::{self, Entity as SaleRecipeEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// One ingredient requirement supplied when writing a recipe
#[derive(Debug, Clone)]
pub struct RecipeIngredientInput {
    pub ingredient_id: i64,
    pub quantity: Decimal,
}

/// Input payload for creating a recipe
#[derive(Debug, Clone)]
pub struct CreateRecipeInput {
    pub name: String,
    pub description: String,
    pub portions: Decimal,
    pub category: String,
    pub ingredients: Vec<RecipeIngredientInput>,
}

/// Input payload for updating a recipe. A supplied ingredient list replaces
/// the association set wholesale.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecipeInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub portions: Option<Decimal>,
    pub category: Option<String>,
    pub ingredients: Option<Vec<RecipeIngredientInput>>,
}

/// Association row joined with its ingredient, as returned in recipe details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientView {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Detailed recipe view including associations and the computed cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub portions: Decimal,
    pub category: String,
    pub created_at: chrono::DateTime<Utc>,
    pub ingredients: Vec<RecipeIngredientView>,
    pub total_cost: Decimal,
}

/// Shortfall line produced by the sufficiency check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortfallLine {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub required: Decimal,
    pub available: Decimal,
}

/// Result of comparing a recipe's requirements against the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SufficiencyReport {
    pub sufficient: bool,
    pub missing: Vec<ShortfallLine>,
}

/// Service for managing recipes, their ingredient associations, and costing
#[derive(Clone)]
pub struct RecipeService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl RecipeService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a recipe with its initial ingredient associations.
    #[instrument(skip(self, input))]
    pub async fn create_recipe(
        &self,
        input: CreateRecipeInput,
    ) -> Result<recipe::Model, ServiceError> {
        validate_recipe_fields(&input.name, &input.category, input.portions)?;

        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let model = recipe::ActiveModel {
            id: Default::default(),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            portions: Set(input.portions),
            category: Set(input.category.trim().to_string()),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(&txn).await.map_err(|e| {
            error!("Failed to create recipe: {}", e);
            ServiceError::db_error(e)
        })?;

        for item in input.ingredients {
            write_association(&txn, created.id, item.ingredient_id, item.quantity).await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!("Recipe created: id={}, name={}", created.id, created.name);

        self.event_sender
            .send_or_log(Event::RecipeCreated(created.id))
            .await;

        Ok(created)
    }

    /// Fetches a recipe with its associations and computed total cost.
    #[instrument(skip(self))]
    pub async fn get_recipe(&self, id: i64) -> Result<Option<RecipeDetail>, ServiceError> {
        let db = self.connection();

        let Some(model) = RecipeEntity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
        else {
            return Ok(None);
        };

        let detail = self.map_recipe_to_detail(model, db).await?;
        Ok(Some(detail))
    }

    /// Returns paginated recipes ordered by creation time, newest first.
    #[instrument(skip(self))]
    pub async fn list_recipes(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<recipe::Model>, u64), ServiceError> {
        let db = self.connection();
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = RecipeEntity::find()
            .order_by_desc(recipe::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Recipes in the given category, or all recipes when none is given.
    #[instrument(skip(self))]
    pub async fn recipes_by_category(
        &self,
        category: Option<String>,
    ) -> Result<Vec<recipe::Model>, ServiceError> {
        let mut query = RecipeEntity::find().order_by_asc(recipe::Column::Name);
        if let Some(category) = category {
            query = query.filter(recipe::Column::Category.eq(category));
        }

        query
            .all(self.connection())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Applies updates to a recipe. When `ingredients` is supplied the
    /// association set is replaced in full, each row snapshotting the
    /// ingredient's current price; the whole update is one transaction.
    #[instrument(skip(self, input))]
    pub async fn update_recipe(
        &self,
        id: i64,
        input: UpdateRecipeInput,
    ) -> Result<(), ServiceError> {
        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let mut model = RecipeEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Recipe {} not found", id)))?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "name must not be blank".to_string(),
                ));
            }
            model.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            model.description = description;
        }
        if let Some(portions) = input.portions {
            if portions <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "portions must be greater than zero".to_string(),
                ));
            }
            model.portions = portions;
        }
        if let Some(category) = input.category {
            if category.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "category must not be blank".to_string(),
                ));
            }
            model.category = category.trim().to_string();
        }

        model
            .into_active_model()
            .reset_all()
            .update(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        if let Some(ingredients) = input.ingredients {
            RecipeIngredientEntity::delete_many()
                .filter(recipe_ingredient::Column::RecipeId.eq(id))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;

            for item in ingredients {
                write_association(&txn, id, item.ingredient_id, item.quantity).await?;
            }
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender.send_or_log(Event::RecipeUpdated(id)).await;

        Ok(())
    }

    /// Deletes a recipe together with its association rows and sale links.
    #[instrument(skip(self))]
    pub async fn delete_recipe(&self, id: i64) -> Result<(), ServiceError> {
        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let recipe = RecipeEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Recipe {} not found", id)))?;

        RecipeIngredientEntity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        SaleRecipeEntity::delete_many()
            .filter(sale_recipe::Column::RecipeId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        recipe.delete(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!("Recipe deleted: id={}", id);

        self.event_sender.send_or_log(Event::RecipeDeleted(id)).await;

        Ok(())
    }

    /// Creates or updates the unique association between a recipe and an
    /// ingredient. The unit price snapshot is refreshed from the ingredient
    /// inside the same transaction as the write.
    #[instrument(skip(self))]
    pub async fn associate(
        &self,
        recipe_id: i64,
        ingredient_id: i64,
        quantity: Decimal,
    ) -> Result<recipe_ingredient::Model, ServiceError> {
        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        ensure_recipe_exists(&txn, recipe_id).await?;
        let association = write_association(&txn, recipe_id, ingredient_id, quantity).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::IngredientAssociated {
                recipe_id,
                ingredient_id,
                quantity: association.quantity,
                unit_price: association.unit_price,
            })
            .await;

        Ok(association)
    }

    /// Removes the association between a recipe and an ingredient.
    #[instrument(skip(self))]
    pub async fn dissociate(&self, recipe_id: i64, ingredient_id: i64) -> Result<(), ServiceError> {
        let db = self.connection();

        let association = RecipeIngredientEntity::find()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .filter(recipe_ingredient::Column::IngredientId.eq(ingredient_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Recipe {} has no association with ingredient {}",
                    recipe_id, ingredient_id
                ))
            })?;

        association
            .delete(db)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::IngredientDissociated {
                recipe_id,
                ingredient_id,
            })
            .await;

        Ok(())
    }

    /// Association rows, optionally restricted to one recipe.
    #[instrument(skip(self))]
    pub async fn list_associations(
        &self,
        recipe_id: Option<i64>,
    ) -> Result<Vec<recipe_ingredient::Model>, ServiceError> {
        let mut query =
            RecipeIngredientEntity::find().order_by_asc(recipe_ingredient::Column::Id);
        if let Some(recipe_id) = recipe_id {
            query = query.filter(recipe_ingredient::Column::RecipeId.eq(recipe_id));
        }

        query
            .all(self.connection())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Total cost of a recipe: Σ quantity × snapshotted unit price over its
    /// associations. Recomputed on every call; an association-free recipe
    /// costs zero. Ingredient price changes do not show up here until the
    /// association is written again.
    #[instrument(skip(self))]
    pub async fn total_cost(&self, recipe_id: i64) -> Result<Decimal, ServiceError> {
        let db = self.connection();

        ensure_recipe_exists(db, recipe_id).await?;

        let associations = RecipeIngredientEntity::find()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut total = associations
            .iter()
            .fold(Decimal::ZERO, |acc, row| acc + row.subtotal());
        total.rescale(2);

        Ok(total)
    }

    /// Compares each association's required quantity against the
    /// ingredient's on-hand quantity and reports the shortfalls.
    #[instrument(skip(self))]
    pub async fn check_ingredient_sufficiency(
        &self,
        recipe_id: i64,
    ) -> Result<SufficiencyReport, ServiceError> {
        let db = self.connection();

        ensure_recipe_exists(db, recipe_id).await?;

        let rows = RecipeIngredientEntity::find()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .find_also_related(IngredientEntity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut missing = Vec::new();
        for (association, maybe_ingredient) in rows {
            let Some(ingredient) = maybe_ingredient else {
                continue;
            };
            if ingredient.quantity < association.quantity {
                missing.push(ShortfallLine {
                    ingredient_id: ingredient.id,
                    ingredient_name: ingredient.name,
                    required: association.quantity,
                    available: ingredient.quantity,
                });
            }
        }

        Ok(SufficiencyReport {
            sufficient: missing.is_empty(),
            missing,
        })
    }

    fn connection(&self) -> &DatabaseConnection {
        self.db_pool.as_ref()
    }

    async fn map_recipe_to_detail(
        &self,
        model: recipe::Model,
        db: &DatabaseConnection,
    ) -> Result<RecipeDetail, ServiceError> {
        let rows = RecipeIngredientEntity::find()
            .filter(recipe_ingredient::Column::RecipeId.eq(model.id))
            .find_also_related(IngredientEntity)
            .order_by_asc(recipe_ingredient::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut views = Vec::with_capacity(rows.len());
        let mut total_cost = Decimal::ZERO;
        for (association, maybe_ingredient) in rows {
            let subtotal = association.subtotal();
            total_cost += subtotal;
            let (name, unit) = maybe_ingredient
                .map(|i| (i.name, i.unit))
                .unwrap_or_default();
            views.push(RecipeIngredientView {
                ingredient_id: association.ingredient_id,
                ingredient_name: name,
                unit,
                quantity: association.quantity,
                unit_price: association.unit_price,
                subtotal,
            });
        }

        total_cost.rescale(2);

        Ok(RecipeDetail {
            id: model.id,
            name: model.name,
            description: model.description,
            portions: model.portions,
            category: model.category,
            created_at: model.created_at,
            ingredients: views,
            total_cost,
        })
    }
}

fn validate_recipe_fields(
    name: &str,
    category: &str,
    portions: Decimal,
) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "name must not be blank".to_string(),
        ));
    }
    if category.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "category must not be blank".to_string(),
        ));
    }
    if portions <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "portions must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_recipe_exists<C>(conn: &C, recipe_id: i64) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let exists = RecipeEntity::find_by_id(recipe_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if exists.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Recipe {} not found",
            recipe_id
        )));
    }

    Ok(())
}

/// Upserts the unique (recipe, ingredient) association row. The ingredient
/// is read and its current unit price persisted onto the row within the
/// caller's transaction, so the snapshot cannot interleave with a
/// concurrent price update.
async fn write_association<C>(
    conn: &C,
    recipe_id: i64,
    ingredient_id: i64,
    quantity: Decimal,
) -> Result<recipe_ingredient::Model, ServiceError>
where
    C: ConnectionTrait,
{
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "quantity must be greater than zero".to_string(),
        ));
    }

    let ingredient = IngredientEntity::find_by_id(ingredient_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Ingredient {} does not exist",
                ingredient_id
            ))
        })?;

    let now = Utc::now();

    let existing = RecipeIngredientEntity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .filter(recipe_ingredient::Column::IngredientId.eq(ingredient_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let written = match existing {
        Some(mut row) => {
            row.quantity = quantity;
            row.unit_price = ingredient.unit_price;
            row.updated_at = now;
            row.into_active_model()
                .reset_all()
                .update(conn)
                .await
                .map_err(ServiceError::db_error)?
        }
        None => {
            let row = recipe_ingredient::ActiveModel {
                id: Default::default(),
                recipe_id: Set(recipe_id),
                ingredient_id: Set(ingredient_id),
                quantity: Set(quantity),
                unit_price: Set(ingredient.unit_price),
                created_at: Set(now),
                updated_at: Set(now),
            };
            row.insert(conn).await.map_err(ServiceError::db_error)?
        }
    };

    Ok(written)
}
