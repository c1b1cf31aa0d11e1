//! HTTP handlers for physical inventory counts

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::CurrentUser;
use crate::services::counts::{
    AddCountItemInput, CountFilter, CountItem, CountItemFilter, CreateCountInput,
    InventoryCount, RecordCountInput, UpdateCountInput, VarianceReport,
};
use crate::services::reporting::{export_to_csv, ReportFormat, ReportQuery};
use crate::services::CountService;
use crate::AppState;
use shared::PaginatedResponse;

#[utoipa::path(
    get,
    path = "/api/v1/inventory-counts",
    params(CountFilter),
    responses((status = 200, description = "Inventory counts", body = PaginatedResponse<InventoryCount>)),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn list_counts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<CountFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryCount>>> {
    let service = CountService::new(state.db);
    Ok(Json(service.list_counts(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory-counts",
    request_body = CreateCountInput,
    responses(
        (status = 201, description = "Count started", body = InventoryCount),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn create_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCountInput>,
) -> AppResult<(StatusCode, Json<InventoryCount>)> {
    let service = CountService::new(state.db);
    let count = service.create_count(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(count)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-counts/{id}",
    params(("id" = Uuid, Path, description = "Count ID")),
    responses(
        (status = 200, description = "Inventory count", body = InventoryCount),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn get_count(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryCount>> {
    let service = CountService::new(state.db);
    Ok(Json(service.get_count(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory-counts/{id}",
    params(("id" = Uuid, Path, description = "Count ID")),
    request_body = UpdateCountInput,
    responses(
        (status = 200, description = "Count updated", body = InventoryCount),
        (status = 422, description = "Count is closed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn update_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCountInput>,
) -> AppResult<Json<InventoryCount>> {
    let service = CountService::new(state.db);
    Ok(Json(service.update_count(&current_user.0, id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory-counts/{id}",
    params(("id" = Uuid, Path, description = "Count ID")),
    responses(
        (status = 204, description = "Count deleted"),
        (status = 422, description = "Completed counts are kept", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn delete_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CountService::new(state.db);
    service.delete_count(&current_user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-counts/{id}/items",
    params(("id" = Uuid, Path, description = "Count ID"), CountItemFilter),
    responses((status = 200, description = "Count items", body = PaginatedResponse<CountItem>)),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn list_count_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(filter): Query<CountItemFilter>,
) -> AppResult<Json<PaginatedResponse<CountItem>>> {
    let service = CountService::new(state.db);
    Ok(Json(service.list_items(id, filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory-counts/{id}/items",
    params(("id" = Uuid, Path, description = "Count ID")),
    request_body = AddCountItemInput,
    responses(
        (status = 201, description = "Product added to the count", body = CountItem),
        (status = 409, description = "Product already on the count", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn add_count_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AddCountItemInput>,
) -> AppResult<(StatusCode, Json<CountItem>)> {
    let service = CountService::new(state.db);
    let item = service.add_item(&current_user.0, id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory-counts/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Count ID"),
        ("item_id" = Uuid, Path, description = "Count item ID")
    ),
    request_body = RecordCountInput,
    responses(
        (status = 200, description = "Counted quantity recorded", body = CountItem),
        (status = 422, description = "Count is closed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn record_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<RecordCountInput>,
) -> AppResult<Json<CountItem>> {
    let service = CountService::new(state.db);
    Ok(Json(service.record_count(&current_user.0, id, item_id, input).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-counts/{id}/uncounted-items",
    params(("id" = Uuid, Path, description = "Count ID"), CountItemFilter),
    responses((status = 200, description = "Items still to count", body = PaginatedResponse<CountItem>)),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn list_uncounted_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(filter): Query<CountItemFilter>,
) -> AppResult<Json<PaginatedResponse<CountItem>>> {
    let service = CountService::new(state.db);
    Ok(Json(service.uncounted_items(id, filter.page, filter.page_size).await?))
}

/// Close the count and post the stock adjustments
#[utoipa::path(
    post,
    path = "/api/v1/inventory-counts/{id}/complete",
    params(("id" = Uuid, Path, description = "Count ID")),
    responses(
        (status = 200, description = "Count completed", body = InventoryCount),
        (status = 422, description = "Count is not in progress", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn complete_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryCount>> {
    let service = CountService::new(state.db);
    Ok(Json(service.complete_count(&current_user.0, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory-counts/{id}/cancel",
    params(("id" = Uuid, Path, description = "Count ID")),
    responses(
        (status = 200, description = "Count cancelled", body = InventoryCount),
        (status = 422, description = "Count is not in progress", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn cancel_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryCount>> {
    let service = CountService::new(state.db);
    Ok(Json(service.cancel_count(&current_user.0, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-counts/{id}/variance-report",
    params(("id" = Uuid, Path, description = "Count ID"), ReportQuery),
    responses((status = 200, description = "Variance per counted product, JSON or CSV", body = VarianceReport)),
    security(("bearer_auth" = [])),
    tag = "Inventory Counts"
)]
pub async fn variance_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let service = CountService::new(state.db);
    let report = service.variance_report(id).await?;

    if query.format() == ReportFormat::Csv {
        let csv = export_to_csv(&report.lines)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"variance_report.csv\""),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(report).into_response())
    }
}
