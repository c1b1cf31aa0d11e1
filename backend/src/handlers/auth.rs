//! Authentication handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult, ErrorResponse};
use crate::services::auth::{AuthTokens, RefreshRequest, TokenRequest, VerifyRequest};
use crate::services::AuthService;
use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct TokenVerification {
    pub valid: bool,
    pub user_id: String,
    pub username: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Obtain an access and refresh token pair
#[utoipa::path(
    post,
    path = "/api/v1/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Tokens issued", body = AuthTokens),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> AppResult<Json<AuthTokens>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.obtain_token(body).await?;
    Ok(Json(tokens))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = AuthTokens),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<AuthTokens>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.refresh_token(&body.refresh).await?;
    Ok(Json(tokens))
}

/// Check that an access token is valid
#[utoipa::path(
    post,
    path = "/api/v1/token/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Token is valid", body = TokenVerification),
        (status = 401, description = "Token is invalid or expired", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_token(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> AppResult<Json<TokenVerification>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let claims = auth_service.verify_token(&body.token)?;

    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0);
    if expires_at.is_none() {
        return Err(AppError::InvalidToken);
    }

    Ok(Json(TokenVerification {
        valid: true,
        user_id: claims.sub,
        username: claims.username,
        expires_at,
    }))
}
