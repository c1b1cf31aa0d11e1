//! HTTP handlers for products

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::{permissions, Access, CurrentUser};
use crate::services::inventory_items::{InventoryItem, InventoryItemFilter};
use crate::services::products::{CreateProductInput, Product, ProductFilter, UpdateProductInput};
use crate::services::transactions::{TransactionFilter, TransactionSummary};
use crate::services::{InventoryItemService, ProductService, TransactionService};
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductFilter),
    responses((status = 200, description = "Products", body = PaginatedResponse<Product>)),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.list_products(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "SKU already used for this supplier", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = ProductService::new(state.db);
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with stock totals", body = Product),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.get_product(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductInput,
    responses((status = 200, description = "Product updated", body = Product)),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    permissions::staff_or_read_only(&current_user.0, Access::Update)?;
    let service = ProductService::new(state.db);
    Ok(Json(service.update_product(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 409, description = "Product is referenced", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = ProductService::new(state.db);
    service.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stock of a product at every location
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/inventory",
    params(("id" = Uuid, Path, description = "Product ID"), InventoryItemFilter),
    responses((status = 200, description = "Inventory items", body = PaginatedResponse<InventoryItem>)),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_product_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<InventoryItemFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryItem>>> {
    ProductService::new(state.db.clone()).get_product(id).await?;
    filter.product_id = Some(id);
    let service = InventoryItemService::new(state.db);
    Ok(Json(service.list_items(filter).await?))
}

/// Transactions with a line for this product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/transactions",
    params(("id" = Uuid, Path, description = "Product ID"), TransactionFilter),
    responses((status = 200, description = "Transactions", body = PaginatedResponse<TransactionSummary>)),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_product_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<TransactionFilter>,
) -> AppResult<Json<PaginatedResponse<TransactionSummary>>> {
    ProductService::new(state.db.clone()).get_product(id).await?;
    filter.product_id = Some(id);
    let service = TransactionService::new(state.db);
    Ok(Json(service.list_transactions(filter).await?))
}
