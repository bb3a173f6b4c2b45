use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::ingredients::{CreateIngredientInput, UpdateIngredientInput},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for ingredient endpoints
pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ingredients).post(create_ingredient))
        .route("/low-stock", get(low_stock))
        .route("/inventory-value", get(inventory_value))
        .route(
            "/:id",
            get(get_ingredient)
                .put(update_ingredient)
                .delete(delete_ingredient),
        )
}

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIngredientRequest {
    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: String,
    pub quantity: Decimal,
    #[validate(length(min = 1, message = "unit must not be blank"))]
    pub unit: String,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateIngredientRequest {
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LowStockParams {
    /// Overrides the configured threshold (strictly-below comparison)
    pub threshold: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryValueResponse {
    pub total_value: Decimal,
}

// Handler functions

/// List ingredients with pagination
#[utoipa::path(
    get,
    path = "/api/v1/ingredients",
    params(PaginationParams),
    responses(
        (status = 200, description = "Ingredient list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "ingredients"
)]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.max(1);
    let per_page = params.per_page.max(1);

    let (items, total) = state
        .services
        .ingredients
        .list_ingredients(page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "ingredients": items,
        "total": total,
        "page": page,
        "per_page": per_page
    })))
}

/// Create a new ingredient
#[utoipa::path(
    post,
    path = "/api/v1/ingredients",
    request_body = CreateIngredientRequest,
    responses(
        (status = 201, description = "Ingredient created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "ingredients"
)]
pub async fn create_ingredient(
    State(state): State<AppState>,
    Json(payload): Json<CreateIngredientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let ingredient = state
        .services
        .ingredients
        .create_ingredient(CreateIngredientInput {
            name: payload.name,
            quantity: payload.quantity,
            unit: payload.unit,
            unit_price: payload.unit_price,
        })
        .await
        .map_err(map_service_error)?;

    info!("Ingredient created: {}", ingredient.id);

    Ok(created_response(ingredient))
}

/// Get an ingredient by ID
#[utoipa::path(
    get,
    path = "/api/v1/ingredients/{id}",
    responses(
        (status = 200, description = "Ingredient returned"),
        (status = 404, description = "Ingredient not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ingredients"
)]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let maybe_ingredient = state
        .services
        .ingredients
        .get_ingredient(id)
        .await
        .map_err(map_service_error)?;

    if let Some(ingredient) = maybe_ingredient {
        Ok(success_response(ingredient))
    } else {
        Err(ApiError::NotFound(format!(
            "Ingredient with ID {} not found",
            id
        )))
    }
}

/// Update an ingredient
#[utoipa::path(
    put,
    path = "/api/v1/ingredients/{id}",
    request_body = UpdateIngredientRequest,
    responses(
        (status = 200, description = "Ingredient updated"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Ingredient not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ingredients"
)]
pub async fn update_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateIngredientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let ingredient = state
        .services
        .ingredients
        .update_ingredient(
            id,
            UpdateIngredientInput {
                name: payload.name,
                quantity: payload.quantity,
                unit: payload.unit,
                unit_price: payload.unit_price,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("Ingredient updated: {}", id);

    Ok(success_response(ingredient))
}

/// Delete an ingredient. Refused while a recipe still references it.
#[utoipa::path(
    delete,
    path = "/api/v1/ingredients/{id}",
    responses(
        (status = 204, description = "Ingredient deleted"),
        (status = 400, description = "Ingredient is referenced by a recipe", body = crate::errors::ErrorResponse),
        (status = 404, description = "Ingredient not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ingredients"
)]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .ingredients
        .delete_ingredient(id)
        .await
        .map_err(map_service_error)?;

    info!("Ingredient deleted: {}", id);

    Ok(no_content_response())
}

/// List ingredients below the low-stock threshold
#[utoipa::path(
    get,
    path = "/api/v1/ingredients/low-stock",
    params(LowStockParams),
    responses(
        (status = 200, description = "Low-stock ingredients returned")
    ),
    tag = "ingredients"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    Query(params): Query<LowStockParams>,
) -> Result<impl IntoResponse, ApiError> {
    let threshold = params
        .threshold
        .unwrap_or_else(|| state.config.low_stock_threshold());

    let items = state
        .services
        .ingredients
        .low_stock(threshold)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "threshold": threshold,
        "ingredients": items
    })))
}

/// Total value of the inventory
#[utoipa::path(
    get,
    path = "/api/v1/ingredients/inventory-value",
    responses(
        (status = 200, description = "Inventory valuation returned", body = InventoryValueResponse)
    ),
    tag = "ingredients"
)]
pub async fn inventory_value(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let total_value = state
        .services
        .ingredients
        .total_inventory_value()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(InventoryValueResponse { total_value }))
}
