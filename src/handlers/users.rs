use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginationParams,
};
use crate::{
    entities::user,
    errors::ApiError,
    handlers::AppState,
    services::users::{CreateUserInput, UpdateUserInput},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for user endpoints
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "username must not be blank"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User view without credential material
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

// Handler functions

/// Create a new user
async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .users
        .create_user(CreateUserInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(map_service_error)?;

    info!("User created: {}", created.id);

    Ok(created_response(UserResponse::from(created)))
}

/// Get a user by ID
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let maybe_user = state
        .services
        .users
        .get_user(id)
        .await
        .map_err(map_service_error)?;

    if let Some(model) = maybe_user {
        Ok(success_response(UserResponse::from(model)))
    } else {
        Err(ApiError::NotFound(format!("User with ID {} not found", id)))
    }
}

/// List users with pagination
async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.max(1);
    let per_page = params.per_page.max(1);

    let (users, total) = state
        .services
        .users
        .list_users(page, per_page)
        .await
        .map_err(map_service_error)?;

    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok(success_response(serde_json::json!({
        "users": users,
        "total": total,
        "page": page,
        "per_page": per_page
    })))
}

/// Update a user
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .users
        .update_user(
            id,
            UpdateUserInput {
                username: payload.username,
                email: payload.email,
                password: payload.password,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("User updated: {}", id);

    Ok(success_response(UserResponse::from(updated)))
}

/// Delete a user
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .users
        .delete_user(id)
        .await
        .map_err(map_service_error)?;

    info!("User deleted: {}", id);

    Ok(no_content_response())
}
