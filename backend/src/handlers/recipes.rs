//! HTTP handlers for cocktail recipes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::CurrentUser;
use crate::services::recipes::{
    CreateRecipeInput, Recipe, RecipeFilter, ServeRecipeInput, UpdateRecipeInput,
};
use crate::services::transactions::InventoryTransaction;
use crate::services::{RecipeService, TransactionService};
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    params(RecipeFilter),
    responses((status = 200, description = "Recipes with costing", body = PaginatedResponse<Recipe>)),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn list_recipes(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<RecipeFilter>,
) -> AppResult<Json<PaginatedResponse<Recipe>>> {
    let service = RecipeService::new(state.db);
    Ok(Json(service.list_recipes(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    request_body = CreateRecipeInput,
    responses(
        (status = 201, description = "Recipe created", body = Recipe),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRecipeInput>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let service = RecipeService::new(state.db);
    let recipe = service.create_recipe(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe", body = Recipe),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Recipe>> {
    let service = RecipeService::new(state.db);
    Ok(Json(service.get_recipe(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/recipes/{id}",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    request_body = UpdateRecipeInput,
    responses((status = 200, description = "Recipe updated", body = Recipe)),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRecipeInput>,
) -> AppResult<Json<Recipe>> {
    let service = RecipeService::new(state.db);
    Ok(Json(service.update_recipe(&current_user.0, id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    responses((status = 204, description = "Recipe deleted")),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn delete_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = RecipeService::new(state.db);
    service.delete_recipe(&current_user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Take the ingredients for a number of servings out of stock
#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/serve",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    request_body = ServeRecipeInput,
    responses(
        (status = 201, description = "Usage transaction recorded", body = InventoryTransaction),
        (status = 422, description = "Insufficient stock", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn serve_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ServeRecipeInput>,
) -> AppResult<(StatusCode, Json<InventoryTransaction>)> {
    let service = RecipeService::new(state.db.clone());
    let transaction_id = service.serve_recipe(&current_user.0, id, input).await?;
    let transaction = TransactionService::new(state.db)
        .get_transaction(transaction_id)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}
