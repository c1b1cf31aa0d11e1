//! HTTP handlers for product categories

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::{permissions, Access, CurrentUser};
use crate::services::categories::{
    Category, CategoryFilter, CreateCategoryInput, UpdateCategoryInput,
};
use crate::services::products::{Product, ProductFilter};
use crate::services::{CategoryService, ProductService};
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(CategoryFilter),
    responses((status = 200, description = "Categories", body = PaginatedResponse<Category>)),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<CategoryFilter>,
) -> AppResult<Json<PaginatedResponse<Category>>> {
    let service = CategoryService::new(state.db);
    Ok(Json(service.list_categories(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already used", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = CategoryService::new(state.db);
    let category = service.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    Ok(Json(service.get_category(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryInput,
    responses((status = 200, description = "Category updated", body = Category)),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<Category>> {
    permissions::staff_or_read_only(&current_user.0, Access::Update)?;
    let service = CategoryService::new(state.db);
    Ok(Json(service.update_category(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 409, description = "Category still has products", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = CategoryService::new(state.db);
    service.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Products in a category
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/products",
    params(("id" = Uuid, Path, description = "Category ID"), ProductFilter),
    responses((status = 200, description = "Products", body = PaginatedResponse<Product>)),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn list_category_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<ProductFilter>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    CategoryService::new(state.db.clone()).get_category(id).await?;
    filter.category_id = Some(id);
    let service = ProductService::new(state.db);
    Ok(Json(service.list_products(filter).await?))
}
