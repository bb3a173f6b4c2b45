use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PeriodParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::sales::{CreateSaleInput, UpdateSaleInput},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for sales endpoints
pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(record_sale))
        .route("/summary", get(sales_summary))
        .route("/:id", get(get_sale).put(update_sale).delete(delete_sale))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    pub recipe_ids: Vec<i64>,
    pub total: Decimal,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSaleRequest {
    pub recipe_ids: Option<Vec<i64>>,
    pub total: Option<Decimal>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SaleListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub start: Option<chrono::DateTime<chrono::Utc>>,
    pub end: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

// Handler functions

/// Record a sale referencing one or more recipes
async fn record_sale(
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let sale = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: payload.recipe_ids,
            total: payload.total,
            completed: payload.completed,
        })
        .await
        .map_err(map_service_error)?;

    info!("Sale recorded: {}", sale.id);

    Ok(created_response(sale))
}

/// Get a sale and its linked recipe ids
async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let maybe_sale = state
        .services
        .sales
        .get_sale(id)
        .await
        .map_err(map_service_error)?;

    if let Some(sale) = maybe_sale {
        Ok(success_response(sale))
    } else {
        Err(ApiError::NotFound(format!("Sale with ID {} not found", id)))
    }
}

/// List sales with pagination and optional period bounds
async fn list_sales(
    State(state): State<AppState>,
    Query(params): Query<SaleListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.max(1);
    let per_page = params.per_page.max(1);

    let (sales, total) = state
        .services
        .sales
        .list_sales(page, per_page, params.start, params.end)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "sales": sales,
        "total": total,
        "page": page,
        "per_page": per_page
    })))
}

/// Update a sale; a supplied recipe list replaces the linked set
async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let sale = state
        .services
        .sales
        .update_sale(
            id,
            UpdateSaleInput {
                recipe_ids: payload.recipe_ids,
                total: payload.total,
                completed: payload.completed,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("Sale updated: {}", id);

    Ok(success_response(sale))
}

/// Delete a sale
async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .sales
        .delete_sale(id)
        .await
        .map_err(map_service_error)?;

    info!("Sale deleted: {}", id);

    Ok(no_content_response())
}

/// Completed/pending counts and completed revenue over an optional period
async fn sales_summary(
    State(state): State<AppState>,
    Query(params): Query<PeriodParams>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .sales
        .summary(params.start, params.end)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}
