//! Error handling for the CocktailAI inventory server
//!
//! Every error leaves the API as `{ "error": { "code", "message", "field"? } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::StockError;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error(
        "Insufficient stock for product {product_id} at location {location_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: Uuid,
        location_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

/// Field named by a unique constraint from the migrations
fn unique_constraint_field(constraint: &str) -> &'static str {
    match constraint {
        "users_username_key" => "username",
        "categories_name_key" => "name",
        "uq_products_supplier_sku" => "sku",
        "uq_inventory_items_product_location" => "product_id, location_id",
        "uq_count_items_count_product" => "product_id",
        "orders_order_number_key" => "order_number",
        "uq_order_items_order_product" => "product_id",
        _ => "record",
    }
}

/// Column named by a default `{table}_{column}_check` constraint
fn check_constraint_field(table: Option<&str>, constraint: Option<&str>) -> String {
    let Some(name) = constraint.and_then(|c| c.strip_suffix("_check")) else {
        return "record".to_string();
    };
    table
        .and_then(|t| name.strip_prefix(t))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(name)
        .to_string()
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    let field = db_err.constraint().map(unique_constraint_field);
                    return AppError::DuplicateEntry(field.unwrap_or("record").to_string());
                }
                // foreign_key_violation
                Some("23503") => {
                    return AppError::conflict(
                        db_err.table().unwrap_or("resource"),
                        "The record is referenced by other records or references a missing record",
                    );
                }
                // check_violation
                Some("23514") => {
                    return AppError::validation(
                        check_constraint_field(db_err.table(), db_err.constraint()),
                        "Value is outside the allowed range",
                    );
                }
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Empty => AppError::validation("items", err.to_string()),
            StockError::InvalidLine { line, reason } => AppError::validation(
                format!("items[{}].{}", line, reason.field()),
                reason.to_string(),
            ),
            StockError::InsufficientStock {
                product_id,
                location_id,
                available,
                requested,
            } => AppError::InsufficientStock {
                product_id,
                location_id,
                available,
                requested,
            },
            StockError::BalanceOverflow { .. } => AppError::validation("items", err.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) | AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidStateTransition(_) | AppError::InsufficientStock { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn detail(&self) -> ErrorDetail {
        let (code, message, field) = match self {
            AppError::InvalidCredentials => (
                "INVALID_CREDENTIALS",
                "Invalid username or password".to_string(),
                None,
            ),
            AppError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired".to_string(), None),
            AppError::InvalidToken => ("INVALID_TOKEN", "Invalid token".to_string(), None),
            AppError::InsufficientPermissions => (
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action".to_string(),
                None,
            ),
            AppError::Unauthorized(message) => ("UNAUTHORIZED", message.clone(), None),
            AppError::Validation { field, message } => {
                ("VALIDATION_ERROR", message.clone(), Some(field.clone()))
            }
            AppError::ValidationError(message) => ("VALIDATION_ERROR", message.clone(), None),
            AppError::DuplicateEntry(field) => (
                "DUPLICATE_ENTRY",
                format!("A record with this {} already exists", field),
                Some(field.clone()),
            ),
            AppError::Conflict { resource, message } => {
                ("CONFLICT", message.clone(), Some(resource.clone()))
            }
            AppError::NotFound(resource) => ("NOT_FOUND", format!("{} not found", resource), None),
            AppError::InvalidStateTransition(message) => {
                ("INVALID_STATE_TRANSITION", message.clone(), None)
            }
            AppError::InsufficientStock { .. } => {
                ("INSUFFICIENT_STOCK", self.to_string(), Some("quantity".to_string()))
            }
            AppError::DatabaseError(_) => {
                ("DATABASE_ERROR", "A database error occurred".to_string(), None)
            }
            AppError::Internal(message) => ("INTERNAL_ERROR", message.clone(), None),
            AppError::InternalError(_) => (
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
                None,
            ),
        };
        ErrorDetail {
            code: code.to_string(),
            message,
            field,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.detail(),
            }),
        )
            .into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::LineError;

    #[test]
    fn test_stock_errors_map_to_api_errors() {
        let err: AppError = StockError::InvalidLine {
            line: 2,
            reason: LineError::MissingDestination,
        }
        .into();
        match &err {
            AppError::Validation { field, .. } => {
                assert_eq!(field, "items[2].destination_location_id")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = StockError::InsufficientStock {
            product_id: Uuid::nil(),
            location_id: Uuid::nil(),
            available: dec!(1),
            requested: dec!(2),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.detail().code, "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::DuplicateEntry("sku".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidStateTransition("done".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InsufficientPermissions.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("Product".into()).detail().message,
            "Product not found"
        );
    }

    #[test]
    fn test_stock_overflow_is_a_validation_error() {
        let err: AppError = StockError::BalanceOverflow {
            product_id: Uuid::nil(),
            location_id: Uuid::nil(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail().field.as_deref(), Some("items"));
    }

    #[test]
    fn test_check_constraint_fields() {
        assert_eq!(
            check_constraint_field(Some("inventory_items"), Some("inventory_items_quantity_check")),
            "quantity"
        );
        assert_eq!(
            check_constraint_field(Some("orders"), Some("order_items_unit_price_check")),
            "order_items_unit_price"
        );
        assert_eq!(check_constraint_field(None, None), "record");
    }

    #[test]
    fn test_unique_constraint_fields() {
        assert_eq!(unique_constraint_field("uq_products_supplier_sku"), "sku");
        assert_eq!(unique_constraint_field("something_else"), "record");
    }
}
