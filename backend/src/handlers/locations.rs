//! HTTP handlers for storage and service locations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::{permissions, Access, CurrentUser};
use crate::services::counts::{CountFilter, InventoryCount};
use crate::services::inventory_items::{InventoryItem, InventoryItemFilter};
use crate::services::locations::{
    CreateLocationInput, Location, LocationFilter, UpdateLocationInput,
};
use crate::services::transactions::{TransactionFilter, TransactionSummary};
use crate::services::{CountService, InventoryItemService, LocationService, TransactionService};
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/locations",
    params(LocationFilter),
    responses((status = 200, description = "Locations", body = PaginatedResponse<Location>)),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<LocationFilter>,
) -> AppResult<Json<PaginatedResponse<Location>>> {
    let service = LocationService::new(state.db);
    Ok(Json(service.list_locations(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationInput,
    responses((status = 201, description = "Location created", body = Location)),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn create_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLocationInput>,
) -> AppResult<(StatusCode, Json<Location>)> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = LocationService::new(state.db);
    let location = service.create_location(input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location", body = Location),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Location>> {
    let service = LocationService::new(state.db);
    Ok(Json(service.get_location(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = UpdateLocationInput,
    responses((status = 200, description = "Location updated", body = Location)),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn update_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateLocationInput>,
) -> AppResult<Json<Location>> {
    permissions::staff_or_read_only(&current_user.0, Access::Update)?;
    let service = LocationService::new(state.db);
    Ok(Json(service.update_location(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 409, description = "Location is referenced", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn delete_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    permissions::staff_or_read_only(&current_user.0, Access::Write)?;
    let service = LocationService::new(state.db);
    service.delete_location(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stock held at a location
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}/inventory",
    params(("id" = Uuid, Path, description = "Location ID"), InventoryItemFilter),
    responses((status = 200, description = "Inventory items", body = PaginatedResponse<InventoryItem>)),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn list_location_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<InventoryItemFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryItem>>> {
    LocationService::new(state.db.clone()).get_location(id).await?;
    filter.location_id = Some(id);
    let service = InventoryItemService::new(state.db);
    Ok(Json(service.list_items(filter).await?))
}

/// Counts taken at a location
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}/inventory-counts",
    params(("id" = Uuid, Path, description = "Location ID"), CountFilter),
    responses((status = 200, description = "Inventory counts", body = PaginatedResponse<InventoryCount>)),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn list_location_counts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<CountFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryCount>>> {
    LocationService::new(state.db.clone()).get_location(id).await?;
    filter.location_id = Some(id);
    let service = CountService::new(state.db);
    Ok(Json(service.list_counts(filter).await?))
}

/// Transactions moving stock in or out of a location
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}/transactions",
    params(("id" = Uuid, Path, description = "Location ID"), TransactionFilter),
    responses((status = 200, description = "Transactions", body = PaginatedResponse<TransactionSummary>)),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn list_location_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<TransactionFilter>,
) -> AppResult<Json<PaginatedResponse<TransactionSummary>>> {
    LocationService::new(state.db.clone()).get_location(id).await?;
    filter.location_id = Some(id);
    let service = TransactionService::new(state.db);
    Ok(Json(service.list_transactions(filter).await?))
}
