//! HTTP handlers for stock balances

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::{permissions, Access, CurrentUser};
use crate::services::inventory_items::{
    CreateInventoryItemInput, InventoryItem, InventoryItemFilter, InventoryLedger,
    UpdateInventoryItemInput,
};
use crate::services::transactions::{TransactionFilter, TransactionSummary};
use crate::services::{InventoryItemService, TransactionService};
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/inventory-items",
    params(InventoryItemFilter),
    responses((status = 200, description = "Inventory items", body = PaginatedResponse<InventoryItem>)),
    security(("bearer_auth" = [])),
    tag = "Inventory Items"
)]
pub async fn list_inventory_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<InventoryItemFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryItem>>> {
    let service = InventoryItemService::new(state.db);
    Ok(Json(service.list_items(filter).await?))
}

/// Start tracking a product at a location with an opening balance
#[utoipa::path(
    post,
    path = "/api/v1/inventory-items",
    request_body = CreateInventoryItemInput,
    responses(
        (status = 201, description = "Inventory item created", body = InventoryItem),
        (status = 409, description = "Product already tracked at this location", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Items"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInventoryItemInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = InventoryItemService::new(state.db);
    let item = service.create_item(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-items/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item", body = InventoryItem),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Items"
)]
pub async fn get_inventory_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let service = InventoryItemService::new(state.db);
    Ok(Json(service.get_item(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory-items/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryItemInput,
    responses((status = 200, description = "Inventory item updated", body = InventoryItem)),
    security(("bearer_auth" = [])),
    tag = "Inventory Items"
)]
pub async fn update_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateInventoryItemInput>,
) -> AppResult<Json<InventoryItem>> {
    permissions::staff_or_read_only(&current_user.0, Access::Update)?;
    let service = InventoryItemService::new(state.db);
    Ok(Json(service.update_item(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory-items/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 204, description = "Inventory item deleted"),
        (status = 409, description = "Item holds stock or has completed transactions", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Items"
)]
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = InventoryItemService::new(state.db);
    service.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Transactions that moved this balance
#[utoipa::path(
    get,
    path = "/api/v1/inventory-items/{id}/transactions",
    params(("id" = Uuid, Path, description = "Inventory item ID"), TransactionFilter),
    responses((status = 200, description = "Transactions", body = PaginatedResponse<TransactionSummary>)),
    security(("bearer_auth" = [])),
    tag = "Inventory Items"
)]
pub async fn list_inventory_item_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<TransactionFilter>,
) -> AppResult<Json<PaginatedResponse<TransactionSummary>>> {
    let item = InventoryItemService::new(state.db.clone()).get_item(id).await?;
    filter.product_id = Some(item.product_id);
    filter.location_id = Some(item.location_id);
    let service = TransactionService::new(state.db);
    Ok(Json(service.list_transactions(filter).await?))
}

/// Compare the stored quantity with the transaction history
#[utoipa::path(
    get,
    path = "/api/v1/inventory-items/{id}/ledger",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses((status = 200, description = "Ledger check", body = InventoryLedger)),
    security(("bearer_auth" = [])),
    tag = "Inventory Items"
)]
pub async fn get_inventory_item_ledger(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryLedger>> {
    let service = InventoryItemService::new(state.db);
    Ok(Json(service.ledger(id).await?))
}
