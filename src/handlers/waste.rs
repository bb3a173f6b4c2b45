use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PeriodParams,
};
use crate::{errors::ApiError, handlers::AppState};
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

/// Creates the router for waste-record endpoints
pub fn waste_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_waste_records).post(record_waste))
        .route("/summary", get(waste_summary))
        .route("/:id", get(get_waste_record).delete(delete_waste_record))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordWasteRequest {
    pub ingredient_id: i64,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WasteListParams {
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

/// Record a waste event against an ingredient
async fn record_waste(
    State(state): State<AppState>,
    Json(payload): Json<RecordWasteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let record = state
        .services
        .waste
        .record_waste(payload.ingredient_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    info!("Waste recorded: {}", record.id);

    Ok(created_response(record))
}

/// Get a waste record by ID
async fn get_waste_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let maybe_record = state
        .services
        .waste
        .get_waste_record(id)
        .await
        .map_err(map_service_error)?;

    if let Some(record) = maybe_record {
        Ok(success_response(record))
    } else {
        Err(ApiError::NotFound(format!(
            "Waste record with ID {} not found",
            id
        )))
    }
}

/// List waste records with pagination and optional period bounds
async fn list_waste_records(
    State(state): State<AppState>,
    Query(params): Query<WasteListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.max(1);
    let per_page = params.per_page.max(1);

    let (records, total) = state
        .services
        .waste
        .list_waste_records(page, per_page, params.start, params.end)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "waste_records": records,
        "total": total,
        "page": page,
        "per_page": per_page
    })))
}

/// Delete a waste record
async fn delete_waste_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .waste
        .delete_waste_record(id)
        .await
        .map_err(map_service_error)?;

    info!("Waste record deleted: {}", id);

    Ok(no_content_response())
}

/// Per-ingredient waste totals, descending, over an optional period
async fn waste_summary(
    State(state): State<AppState>,
    Query(params): Query<PeriodParams>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .waste
        .summary_by_ingredient(params.start, params.end)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}
