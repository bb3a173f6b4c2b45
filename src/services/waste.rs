use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    db::DbPool,
    entities::{
        ingredient::{self, Entity as IngredientEntity},
        waste_record::{self, Entity as WasteRecordEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Per-ingredient aggregate over waste records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteSummaryLine {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub total_quantity: Decimal,
}

/// Service for recording waste events against the ingredient ledger
#[derive(Clone)]
pub struct WasteService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl WasteService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a waste event. The ingredient's on-hand quantity is adjusted
    /// upward by the waste quantity through an in-database increment, in the
    /// same transaction that persists the record, so concurrent submissions
    /// against one ingredient cannot lose updates.
    ///
    /// TODO: confirm with the inventory owners whether waste should decrement
    /// the on-hand quantity instead; the upward adjustment mirrors the
    /// behavior the bookkeeping has relied on so far.
    #[instrument(skip(self))]
    pub async fn record_waste(
        &self,
        ingredient_id: i64,
        quantity: Decimal,
    ) -> Result<waste_record::Model, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let db = self.connection();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let exists = IngredientEntity::find_by_id(ingredient_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        if exists.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Ingredient {} does not exist",
                ingredient_id
            )));
        }

        IngredientEntity::update_many()
            .col_expr(
                ingredient::Column::Quantity,
                Expr::col(ingredient::Column::Quantity).add(quantity),
            )
            .filter(ingredient::Column::Id.eq(ingredient_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let record = waste_record::ActiveModel {
            id: Default::default(),
            ingredient_id: Set(ingredient_id),
            quantity: Set(quantity),
            recorded_at: Set(Utc::now()),
        };

        let created = record.insert(&txn).await.map_err(|e| {
            error!("Failed to record waste: {}", e);
            ServiceError::db_error(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            "Waste recorded: id={}, ingredient_id={}, quantity={}",
            created.id, ingredient_id, quantity
        );

        self.event_sender
            .send_or_log(Event::WasteRecorded {
                waste_id: created.id,
                ingredient_id,
                quantity,
            })
            .await;

        Ok(created)
    }

    /// Fetches a single waste record.
    #[instrument(skip(self))]
    pub async fn get_waste_record(
        &self,
        id: i64,
    ) -> Result<Option<waste_record::Model>, ServiceError> {
        WasteRecordEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Returns paginated waste records, newest first, optionally bounded to
    /// a [start, end] period.
    #[instrument(skip(self))]
    pub async fn list_waste_records(
        &self,
        page: u64,
        limit: u64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(Vec<waste_record::Model>, u64), ServiceError> {
        let db = self.connection();
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let mut query =
            WasteRecordEntity::find().order_by_desc(waste_record::Column::RecordedAt);
        if let Some(start) = start {
            query = query.filter(waste_record::Column::RecordedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(waste_record::Column::RecordedAt.lte(end));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Deletes a waste record. The ledger adjustment made when the record
    /// was created is left in place.
    #[instrument(skip(self))]
    pub async fn delete_waste_record(&self, id: i64) -> Result<(), ServiceError> {
        let db = self.connection();

        let record = WasteRecordEntity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Waste record {} not found", id)))?;

        record.delete(db).await.map_err(ServiceError::db_error)?;

        self.event_sender.send_or_log(Event::WasteDeleted(id)).await;

        Ok(())
    }

    /// Groups waste records by ingredient, summing quantities, ordered by
    /// total descending. Optionally bounded to a [start, end] period.
    #[instrument(skip(self))]
    pub async fn summary_by_ingredient(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<WasteSummaryLine>, ServiceError> {
        let db = self.connection();

        let mut query = WasteRecordEntity::find().find_also_related(IngredientEntity);
        if let Some(start) = start {
            query = query.filter(waste_record::Column::RecordedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(waste_record::Column::RecordedAt.lte(end));
        }

        let rows = query.all(db).await.map_err(ServiceError::db_error)?;

        let mut totals: BTreeMap<i64, (String, Decimal)> = BTreeMap::new();
        for (record, maybe_ingredient) in rows {
            let name = maybe_ingredient.map(|i| i.name).unwrap_or_default();
            let entry = totals
                .entry(record.ingredient_id)
                .or_insert((name, Decimal::ZERO));
            entry.1 += record.quantity;
        }

        let mut lines: Vec<WasteSummaryLine> = totals
            .into_iter()
            .map(|(ingredient_id, (ingredient_name, mut total_quantity))| {
                total_quantity.rescale(2);
                WasteSummaryLine {
                    ingredient_id,
                    ingredient_name,
                    total_quantity,
                }
            })
            .collect();

        lines.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));

        Ok(lines)
    }

    fn connection(&self) -> &DatabaseConnection {
        self.db_pool.as_ref()
    }
}
