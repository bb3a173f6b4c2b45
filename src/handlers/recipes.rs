use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::recipes::{
        CreateRecipeInput, RecipeIngredientInput, UpdateRecipeInput,
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for recipe endpoints
pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/by-category", get(recipes_by_category))
        .route(
            "/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/:id/cost", get(recipe_cost))
        .route("/:id/check-ingredients", post(check_ingredients))
        .route(
            "/:id/ingredients",
            get(list_recipe_ingredients).post(associate_ingredient),
        )
        .route(
            "/:id/ingredients/:ingredient_id",
            axum::routing::put(reassociate_ingredient).delete(dissociate_ingredient),
        )
}

/// Creates the router for the flat association collection
pub fn recipe_ingredient_routes() -> Router<AppState> {
    Router::new().route("/", get(list_associations))
}

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecipeIngredientRequest {
    pub ingredient_id: i64,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub portions: Decimal,
    #[validate(length(min = 1, message = "category must not be blank"))]
    pub category: String,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredientRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub portions: Option<Decimal>,
    pub category: Option<String>,
    pub ingredients: Option<Vec<RecipeIngredientRequest>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssociateIngredientRequest {
    pub ingredient_id: i64,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReassociateIngredientRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssociationFilterParams {
    /// Restrict the listing to one recipe's associations
    pub recipe: Option<i64>,
}

fn to_ingredient_inputs(items: Vec<RecipeIngredientRequest>) -> Vec<RecipeIngredientInput> {
    items
        .into_iter()
        .map(|item| RecipeIngredientInput {
            ingredient_id: item.ingredient_id,
            quantity: item.quantity,
        })
        .collect()
}

// Handler functions

/// Create a new recipe with its initial ingredient list
async fn create_recipe(
    State(state): State<AppState>,
    Json(payload): Json<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let recipe = state
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: payload.name,
            description: payload.description,
            portions: payload.portions,
            category: payload.category,
            ingredients: to_ingredient_inputs(payload.ingredients),
        })
        .await
        .map_err(map_service_error)?;

    info!("Recipe created: {}", recipe.id);

    Ok(created_response(recipe))
}

/// Get a recipe with its associations and computed cost
async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let maybe_recipe = state
        .services
        .recipes
        .get_recipe(id)
        .await
        .map_err(map_service_error)?;

    if let Some(recipe) = maybe_recipe {
        Ok(success_response(recipe))
    } else {
        Err(ApiError::NotFound(format!(
            "Recipe with ID {} not found",
            id
        )))
    }
}

/// List recipes with pagination
async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.max(1);
    let per_page = params.per_page.max(1);

    let (recipes, total) = state
        .services
        .recipes
        .list_recipes(page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "recipes": recipes,
        "total": total,
        "page": page,
        "per_page": per_page
    })))
}

/// List recipes in a category (all recipes when no category is given)
async fn recipes_by_category(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let recipes = state
        .services
        .recipes
        .recipes_by_category(params.category)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(recipes))
}

/// Update a recipe; a supplied ingredient list replaces the association set
async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .recipes
        .update_recipe(
            id,
            UpdateRecipeInput {
                name: payload.name,
                description: payload.description,
                portions: payload.portions,
                category: payload.category,
                ingredients: payload.ingredients.map(to_ingredient_inputs),
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("Recipe updated: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Recipe updated successfully"
    })))
}

/// Delete a recipe
async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .recipes
        .delete_recipe(id)
        .await
        .map_err(map_service_error)?;

    info!("Recipe deleted: {}", id);

    Ok(no_content_response())
}

/// Computed total cost of a recipe at its snapshotted ingredient prices
async fn recipe_cost(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let total_cost = state
        .services
        .recipes
        .total_cost(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "recipe_id": id,
        "total_cost": total_cost
    })))
}

/// Check whether the ledger holds enough of every ingredient for the recipe
async fn check_ingredients(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .recipes
        .check_ingredient_sufficiency(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(report))
}

/// List a recipe's association rows
async fn list_recipe_ingredients(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let associations = state
        .services
        .recipes
        .list_associations(Some(id))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(associations))
}

/// Associate an ingredient to a recipe (creates or refreshes the unique row)
async fn associate_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AssociateIngredientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let association = state
        .services
        .recipes
        .associate(id, payload.ingredient_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    info!(
        "Ingredient {} associated to recipe {}",
        payload.ingredient_id, id
    );

    Ok(created_response(association))
}

/// Re-associate an ingredient, updating quantity and refreshing the price snapshot
async fn reassociate_ingredient(
    State(state): State<AppState>,
    Path((id, ingredient_id)): Path<(i64, i64)>,
    Json(payload): Json<ReassociateIngredientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let association = state
        .services
        .recipes
        .associate(id, ingredient_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(association))
}

/// Remove an ingredient association from a recipe
async fn dissociate_ingredient(
    State(state): State<AppState>,
    Path((id, ingredient_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .recipes
        .dissociate(id, ingredient_id)
        .await
        .map_err(map_service_error)?;

    info!("Ingredient {} dissociated from recipe {}", ingredient_id, id);

    Ok(no_content_response())
}

/// Flat association listing, optionally filtered by recipe
async fn list_associations(
    State(state): State<AppState>,
    Query(params): Query<AssociationFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let associations = state
        .services
        .recipes
        .list_associations(params.recipe)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(associations))
}
