//! Authentication middleware
//!
//! Validates the bearer access token and places an [`AuthUser`] in the
//! request extensions for handlers to pick up through [`CurrentUser`].

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl AuthUser {
    /// Superusers are treated as staff everywhere
    pub fn is_staff(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    pub fn owns(&self, owner: Option<Uuid>) -> bool {
        owner == Some(self.user_id)
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    let claims = match decode_access_token(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return AppError::InvalidToken.into_response(),
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        username: claims.username,
        is_staff: claims.is_staff,
        is_superuser: claims.is_superuser,
    });

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequestParts;
    use axum::http::request::Parts;

    fn parts() -> Parts {
        axum::http::Request::builder()
            .uri("/api/v1/products")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_current_user_requires_authentication() {
        let mut parts = parts();
        let result = tokio_test::block_on(CurrentUser::from_request_parts(&mut parts, &()));
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_current_user_reads_request_extension() {
        let user_id = Uuid::new_v4();
        let mut parts = parts();
        parts.extensions.insert(AuthUser {
            user_id,
            username: "bar_manager".to_string(),
            is_staff: false,
            is_superuser: true,
        });

        let CurrentUser(user) =
            tokio_test::block_on(CurrentUser::from_request_parts(&mut parts, &())).unwrap();
        assert_eq!(user.user_id, user_id);
        assert!(user.is_staff());
        assert!(user.owns(Some(user_id)));
        assert!(!user.owns(None));
    }
}
