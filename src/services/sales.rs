use chrono::{DateTime, Utc};
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
        recipe::{self, Entity as RecipeEntity},
        sale::{self, Entity as SaleEntity},
        sale_recipe::{self, Entity as SaleRecipeEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Input payload for recording a sale
#[derive(Debug, Clone)]
pub struct CreateSaleInput {
    pub recipe_ids: Vec<i64>,
    pub total: Decimal,
    pub completed: bool,
}

/// Input payload for updating a sale. A supplied recipe list replaces the
/// linked set wholesale.
#[derive(Debug, Clone, Default)]
pub struct UpdateSaleInput {
    pub recipe_ids: Option<Vec<i64>>,
    pub total: Option<Decimal>,
    pub completed: Option<bool>,
}

/// Sale together with the ids of the recipes it covers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    pub id: i64,
    pub total: Decimal,
    pub completed: bool,
    pub sale_date: DateTime<Utc>,
    pub recipe_ids: Vec<i64>,
}

/// Aggregate counters over a (possibly period-bounded) set of sales
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSummary {
    pub completed_sales: u64,
    pub pending_sales: u64,
    pub completed_total: Decimal,
}

/// Service for recording sales and computing period summaries
#[derive(Clone)]
pub struct SalesService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl SalesService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a sale and links every referenced recipe, all in one
    /// transaction.
    #[instrument(skip(self, input))]
    pub async fn record_sale(&self, input: CreateSaleInput) -> Result<SaleDetail, ServiceError> {
        if input.total < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "total must not be negative".to_string(),
            ));
        }

        let recipe_ids = dedupe_preserving_order(&input.recipe_ids);
        if recipe_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "a sale must reference at least one recipe".to_string(),
            ));
        }

        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        resolve_recipes(&txn, &recipe_ids).await?;

        let model = sale::ActiveModel {
            id: Default::default(),
            total: Set(input.total),
            completed: Set(input.completed),
            sale_date: Set(Utc::now()),
        };

        let created = model.insert(&txn).await.map_err(|e| {
            error!("Failed to record sale: {}", e);
            ServiceError::db_error(e)
        })?;

        for recipe_id in &recipe_ids {
            let link = sale_recipe::ActiveModel {
                id: Default::default(),
                sale_id: Set(created.id),
                recipe_id: Set(*recipe_id),
            };
            link.insert(&txn).await.map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            "Sale recorded: id={}, total={}, recipes={}",
            created.id,
            created.total,
            recipe_ids.len()
        );

        self.event_sender
            .send_or_log(Event::SaleRecorded(created.id))
            .await;

        Ok(SaleDetail {
            id: created.id,
            total: created.total,
            completed: created.completed,
            sale_date: created.sale_date,
            recipe_ids,
        })
    }

    /// Fetches a sale and its linked recipe ids.
    #[instrument(skip(self))]
    pub async fn get_sale(&self, id: i64) -> Result<Option<SaleDetail>, ServiceError> {
        let db = self.connection();

        let Some(model) = SaleEntity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
        else {
            return Ok(None);
        };

        let recipe_ids = self.linked_recipe_ids(db, id).await?;

        Ok(Some(SaleDetail {
            id: model.id,
            total: model.total,
            completed: model.completed,
            sale_date: model.sale_date,
            recipe_ids,
        }))
    }

    /// Returns paginated sales, newest first, optionally bounded to a
    /// [start, end] period.
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        page: u64,
        limit: u64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(Vec<sale::Model>, u64), ServiceError> {
        let db = self.connection();
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let mut query = SaleEntity::find().order_by_desc(sale::Column::SaleDate);
        if let Some(start) = start {
            query = query.filter(sale::Column::SaleDate.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(sale::Column::SaleDate.lte(end));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Applies updates to a sale. When `recipe_ids` is supplied the link set
    /// is cleared and rebuilt inside the transaction.
    #[instrument(skip(self, input))]
    pub async fn update_sale(
        &self,
        id: i64,
        input: UpdateSaleInput,
    ) -> Result<SaleDetail, ServiceError> {
        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let mut model = SaleEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;

        if let Some(total) = input.total {
            if total < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "total must not be negative".to_string(),
                ));
            }
            model.total = total;
        }
        if let Some(completed) = input.completed {
            model.completed = completed;
        }

        let model = model
            .into_active_model()
            .reset_all()
            .update(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let recipe_ids = if let Some(recipe_ids) = input.recipe_ids {
            let recipe_ids = dedupe_preserving_order(&recipe_ids);
            if recipe_ids.is_empty() {
                return Err(ServiceError::ValidationError(
                    "a sale must reference at least one recipe".to_string(),
                ));
            }
            resolve_recipes(&txn, &recipe_ids).await?;

            SaleRecipeEntity::delete_many()
                .filter(sale_recipe::Column::SaleId.eq(id))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;

            for recipe_id in &recipe_ids {
                let link = sale_recipe::ActiveModel {
                    id: Default::default(),
                    sale_id: Set(id),
                    recipe_id: Set(*recipe_id),
                };
                link.insert(&txn).await.map_err(ServiceError::db_error)?;
            }

            recipe_ids
        } else {
            self.linked_recipe_ids(&txn, id).await?
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender.send_or_log(Event::SaleUpdated(id)).await;

        Ok(SaleDetail {
            id: model.id,
            total: model.total,
            completed: model.completed,
            sale_date: model.sale_date,
            recipe_ids,
        })
    }

    /// Deletes a sale and its recipe links.
    #[instrument(skip(self))]
    pub async fn delete_sale(&self, id: i64) -> Result<(), ServiceError> {
        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let sale = SaleEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;

        SaleRecipeEntity::delete_many()
            .filter(sale_recipe::Column::SaleId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        sale.delete(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender.send_or_log(Event::SaleDeleted(id)).await;

        Ok(())
    }

    /// Counts completed and pending sales and sums completed totals over an
    /// optional period.
    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<SalesSummary, ServiceError> {
        let db = self.connection();

        let mut query = SaleEntity::find();
        if let Some(start) = start {
            query = query.filter(sale::Column::SaleDate.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(sale::Column::SaleDate.lte(end));
        }

        let sales = query.all(db).await.map_err(ServiceError::db_error)?;

        let mut completed_sales = 0u64;
        let mut pending_sales = 0u64;
        let mut completed_total = Decimal::ZERO;
        for sale in &sales {
            if sale.completed {
                completed_sales += 1;
                completed_total += sale.total;
            } else {
                pending_sales += 1;
            }
        }

        completed_total.rescale(2);

        Ok(SalesSummary {
            completed_sales,
            pending_sales,
            completed_total,
        })
    }

    fn connection(&self) -> &DatabaseConnection {
        self.db_pool.as_ref()
    }

    async fn linked_recipe_ids<C>(&self, conn: &C, sale_id: i64) -> Result<Vec<i64>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let links = SaleRecipeEntity::find()
            .filter(sale_recipe::Column::SaleId.eq(sale_id))
            .order_by_asc(sale_recipe::Column::Id)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(links.into_iter().map(|link| link.recipe_id).collect())
    }
}

/// Fails with a ValidationError naming the first recipe id that does not
/// resolve to an existing recipe.
async fn resolve_recipes<C>(conn: &C, recipe_ids: &[i64]) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let found = RecipeEntity::find()
        .filter(recipe::Column::Id.is_in(recipe_ids.to_vec()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if found.len() != recipe_ids.len() {
        let found_ids: Vec<i64> = found.iter().map(|r| r.id).collect();
        let missing = recipe_ids
            .iter()
            .find(|id| !found_ids.contains(id))
            .copied()
            .unwrap_or_default();
        return Err(ServiceError::ValidationError(format!(
            "Recipe {} does not exist",
            missing
        )));
    }

    Ok(())
}

fn dedupe_preserving_order(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(**id))
        .copied()
        .collect()
}
