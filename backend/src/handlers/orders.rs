//! HTTP handlers for supplier purchase orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::CurrentUser;
use crate::services::orders::{
    CreateOrderInput, Order, OrderFilter, OrderItemInput, ReceiveOrderInput, UpdateOrderInput,
    UpdateOrderItemInput,
};
use crate::services::OrderService;
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderFilter),
    responses((status = 200, description = "Orders", body = PaginatedResponse<Order>)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.list_orders(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.db);
    let order = service.create_order(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items and totals", body = Order),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.get_order(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderInput,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 422, description = "Order is received or cancelled", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.update_order(&current_user.0, id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 422, description = "Only draft and pending orders can be deleted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = OrderService::new(state.db);
    service.delete_order(&current_user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderItemInput,
    responses(
        (status = 201, description = "Item added", body = Order),
        (status = 422, description = "Items are locked once the order is placed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn add_order_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<OrderItemInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.db);
    let order = service.add_item(&current_user.0, id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("item_id" = Uuid, Path, description = "Order item ID")
    ),
    request_body = UpdateOrderItemInput,
    responses((status = 200, description = "Item updated", body = Order)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateOrderItemInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.update_item(&current_user.0, id, item_id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("item_id" = Uuid, Path, description = "Order item ID")
    ),
    responses((status = 200, description = "Item removed", body = Order)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn remove_order_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.remove_item(&current_user.0, id, item_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/place",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order placed with the supplier", body = Order),
        (status = 422, description = "Order is not draft or pending, or has no items", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.place_order(&current_user.0, id).await?))
}

/// Receive a placed order into stock
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/receive",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ReceiveOrderInput,
    responses(
        (status = 200, description = "Order received", body = Order),
        (status = 422, description = "Order is not placed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn receive_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    input: Option<Json<ReceiveOrderInput>>,
) -> AppResult<Json<Order>> {
    let input = input.map(|Json(input)| input).unwrap_or_default();
    let service = OrderService::new(state.db);
    Ok(Json(service.receive_order(&current_user.0, id, input).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = Order),
        (status = 422, description = "Received orders cannot be cancelled", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.cancel_order(&current_user.0, id).await?))
}
