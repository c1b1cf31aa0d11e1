//! Authentication service: token issue, refresh rotation and verification

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

const ACCESS: &str = "access";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Credentials accepted by the token endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub token: String,
}

/// User info needed to sign in
#[derive(Debug, sqlx::FromRow)]
struct LoginRow {
    id: Uuid,
    username: String,
    password_hash: String,
    is_staff: bool,
    is_superuser: bool,
    is_active: bool,
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })?;

    if claims.token_type != ACCESS {
        return Err(AppError::InvalidToken);
    }
    Ok(claims)
}

/// Hash a refresh token for storage: SHA-256, base64url without padding
pub fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Authenticate with username and password
    pub async fn obtain_token(&self, input: TokenRequest) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, LoginRow>(
            r#"
            SELECT id, username, password_hash, is_staff, is_superuser, is_active
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(&input.username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(user.id, &user.username, user.is_staff, user.is_superuser)?;
        self.store_refresh_token(user.id, &tokens.refresh).await?;

        tracing::info!(user_id = %user.id, "User signed in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair, revoking the old one
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, LoginRow>(
            r#"
            SELECT u.id, u.username, u.password_hash, u.is_staff, u.is_superuser, u.is_active
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            FOR UPDATE OF rt
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&mut *tx)
            .await?;

        let tokens = self.generate_tokens(user.id, &user.username, user.is_staff, user.is_superuser)?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(hash_token(&tokens.refresh))
        .bind(Utc::now() + Duration::seconds(self.refresh_token_expiry))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(tokens)
    }

    /// Validate an access token and return claims
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode_access_token(token, &self.jwt_secret)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(
        &self,
        user_id: Uuid,
        username: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            is_staff,
            is_superuser,
            token_type: ACCESS.to_string(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Opaque refresh token, only its hash is stored
        let refresh = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        Ok(AuthTokens {
            access,
            refresh,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn sign(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn claims(token_type: &str, exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4().to_string(),
            username: "manager".to_string(),
            is_staff: true,
            is_superuser: false,
            token_type: token_type.to_string(),
            exp: now + exp_offset,
            iat: now,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let original = claims(ACCESS, 3600);
        let decoded = decode_access_token(&sign(&original), SECRET).unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert!(decoded.is_staff);
    }

    #[test]
    fn test_expired_token_is_reported() {
        let token = sign(&claims(ACCESS, -3600));
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret_or_type_is_invalid() {
        let token = sign(&claims(ACCESS, 3600));
        assert!(matches!(
            decode_access_token(&token, "other-secret"),
            Err(AppError::InvalidToken)
        ));
        let token = sign(&claims("refresh", 3600));
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_hash_token_is_stable_and_fits_column() {
        let hash = hash_token("abc");
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
        assert_eq!(hash.len(), 43);
    }
}
