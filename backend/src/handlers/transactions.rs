//! HTTP handlers for inventory transactions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::CurrentUser;
use crate::services::transactions::{
    CreateTransactionInput, InventoryTransaction, TransactionFilter, TransactionSummary,
    UpdateTransactionInput,
};
use crate::services::TransactionService;
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/inventory-transactions",
    params(TransactionFilter),
    responses((status = 200, description = "Transactions", body = PaginatedResponse<TransactionSummary>)),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<PaginatedResponse<TransactionSummary>>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.list_transactions(filter).await?))
}

/// Record a transaction; completed ones move stock immediately
#[utoipa::path(
    post,
    path = "/api/v1/inventory-transactions",
    request_body = CreateTransactionInput,
    responses(
        (status = 201, description = "Transaction recorded", body = InventoryTransaction),
        (status = 400, description = "Invalid line items", body = ErrorResponse),
        (status = 422, description = "Insufficient stock", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransactionInput>,
) -> AppResult<(StatusCode, Json<InventoryTransaction>)> {
    let service = TransactionService::new(state.db);
    let transaction = service.create_transaction(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction with line items", body = InventoryTransaction),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryTransaction>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.get_transaction(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory-transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    request_body = UpdateTransactionInput,
    responses(
        (status = 200, description = "Transaction updated", body = InventoryTransaction),
        (status = 422, description = "Transaction is no longer pending", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn update_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTransactionInput>,
) -> AppResult<Json<InventoryTransaction>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.update_transaction(&current_user.0, id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory-transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 422, description = "Completed transactions are kept", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = TransactionService::new(state.db);
    service.delete_transaction(&current_user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory-transactions/{id}/complete",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction completed", body = InventoryTransaction),
        (status = 422, description = "Not pending or insufficient stock", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn complete_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryTransaction>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.complete_transaction(&current_user.0, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory-transactions/{id}/cancel",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction cancelled", body = InventoryTransaction),
        (status = 422, description = "Not pending", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn cancel_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryTransaction>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.cancel_transaction(&current_user.0, id).await?))
}
