//! HTTP handlers for suppliers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::{permissions, Access, CurrentUser};
use crate::services::orders::{Order, OrderFilter};
use crate::services::products::{Product, ProductFilter};
use crate::services::suppliers::{
    CreateSupplierInput, Supplier, SupplierFilter, UpdateSupplierInput,
};
use crate::services::{OrderService, ProductService, SupplierService};
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    params(SupplierFilter),
    responses((status = 200, description = "Suppliers", body = PaginatedResponse<Supplier>)),
    security(("bearer_auth" = [])),
    tag = "Suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<SupplierFilter>,
) -> AppResult<Json<PaginatedResponse<Supplier>>> {
    let service = SupplierService::new(state.db);
    Ok(Json(service.list_suppliers(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierInput,
    responses(
        (status = 201, description = "Supplier created", body = Supplier),
        (status = 400, description = "Invalid contact details", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = SupplierService::new(state.db);
    let supplier = service.create_supplier(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier", body = Supplier),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db);
    Ok(Json(service.get_supplier(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = UpdateSupplierInput,
    responses((status = 200, description = "Supplier updated", body = Supplier)),
    security(("bearer_auth" = [])),
    tag = "Suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    permissions::staff_or_read_only(&current_user.0, Access::Update)?;
    let service = SupplierService::new(state.db);
    Ok(Json(service.update_supplier(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 409, description = "Supplier still has products or orders", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = SupplierService::new(state.db);
    service.delete_supplier(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Products bought from a supplier
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}/products",
    params(("id" = Uuid, Path, description = "Supplier ID"), ProductFilter),
    responses((status = 200, description = "Products", body = PaginatedResponse<Product>)),
    security(("bearer_auth" = [])),
    tag = "Suppliers"
)]
pub async fn list_supplier_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<ProductFilter>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    SupplierService::new(state.db.clone()).get_supplier(id).await?;
    filter.supplier_id = Some(id);
    let service = ProductService::new(state.db);
    Ok(Json(service.list_products(filter).await?))
}

/// Orders placed with a supplier
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}/orders",
    params(("id" = Uuid, Path, description = "Supplier ID"), OrderFilter),
    responses((status = 200, description = "Orders", body = PaginatedResponse<Order>)),
    security(("bearer_auth" = [])),
    tag = "Suppliers"
)]
pub async fn list_supplier_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    SupplierService::new(state.db.clone()).get_supplier(id).await?;
    filter.supplier_id = Some(id);
    let service = OrderService::new(state.db);
    Ok(Json(service.list_orders(filter).await?))
}
