//! HTTP handlers for user accounts and preferences

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorResponse};
use crate::middleware::{permissions, Access, CurrentUser};
use crate::services::users::{
    RegisterUserInput, UpdatePreferencesInput, UpdateUserInput, User, UserFilter,
    UserPreferences,
};
use crate::services::UserService;
use crate::AppState;
use shared::PaginatedResponse;

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = RegisterUserInput,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Username taken", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(input): Json<RegisterUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let service = UserService::new(state.db);
    let user = service.register(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users (staff only)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Users", body = PaginatedResponse<User>),
        (status = 403, description = "Not staff", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    if !current_user.0.is_staff() {
        return Err(AppError::InsufficientPermissions);
    }
    let service = UserService::new(state.db);
    Ok(Json(service.list_users(filter).await?))
}

/// The signed-in user's account
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "Current user", body = User)),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    Ok(Json(service.get_user(current_user.0.user_id).await?))
}

/// Get a user (self or staff)
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    permissions::owner_or_staff(&current_user.0, id)?;
    let service = UserService::new(state.db);
    Ok(Json(service.get_user(id).await?))
}

/// Update a user (self or staff)
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserInput,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    permissions::owner_or_staff(&current_user.0, id)?;
    let service = UserService::new(state.db);
    Ok(Json(service.update_user(&current_user.0, id, input).await?))
}

/// Delete a user (superuser only)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not a superuser", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    permissions::admin_or_read_only(&current_user.0, Access::Write)?;
    let service = UserService::new(state.db);
    service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get a user's preferences (self or staff)
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/preferences",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Preferences", body = UserPreferences)),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_preferences(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserPreferences>> {
    permissions::owner_or_staff(&current_user.0, id)?;
    let service = UserService::new(state.db);
    Ok(Json(service.get_preferences(id).await?))
}

/// Update a user's preferences (self or staff)
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/preferences",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdatePreferencesInput,
    responses((status = 200, description = "Preferences updated", body = UserPreferences)),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_preferences(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePreferencesInput>,
) -> AppResult<Json<UserPreferences>> {
    permissions::owner_or_staff(&current_user.0, id)?;
    let service = UserService::new(state.db);
    Ok(Json(service.update_preferences(id, input).await?))
}
