//! User accounts and per-user preferences

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use shared::{
    validate_email, validate_password, validate_phone, validate_username, DefaultView,
    PaginatedResponse, Pagination, PreferenceDefaults, MAX_ITEMS_PER_PAGE,
};

const USER_COLUMNS: &str = r#"
    id, username, email, first_name, last_name, phone_number, position, company_name,
    location, is_staff, is_superuser, is_active, last_login_at, created_at, updated_at
"#;

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// A user account, without credentials
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub position: String,
    pub company_name: String,
    pub location: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserInput {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub position: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub password: Option<String>,
    /// Superuser only
    pub is_staff: Option<bool>,
    /// Superuser only
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub search: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub items_per_page: i32,
    pub default_view: DefaultView,
    pub low_stock_alerts: bool,
    pub order_status_notifications: bool,
    pub inventory_count_reminders: bool,
    pub date_format: String,
    pub time_format: String,
    pub timezone: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePreferencesInput {
    pub items_per_page: Option<i32>,
    pub default_view: Option<DefaultView>,
    pub low_stock_alerts: Option<bool>,
    pub order_status_notifications: Option<bool>,
    pub inventory_count_reminders: Option<bool>,
    pub date_format: Option<String>,
    pub time_format: Option<String>,
    pub timezone: Option<String>,
}

fn check(field: &str, result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|message| AppError::validation(field, message))
}

impl RegisterUserInput {
    fn validate(&self) -> AppResult<()> {
        check("username", validate_username(&self.username))?;
        if !self.email.is_empty() {
            check("email", validate_email(&self.email))?;
        }
        if !self.phone_number.is_empty() {
            check("phone_number", validate_phone(&self.phone_number))?;
        }
        check("password", validate_password(&self.password))?;
        if self.password != self.password_confirm {
            return Err(AppError::validation(
                "password_confirm",
                "Password fields didn't match",
            ));
        }
        Ok(())
    }
}

/// Accepted `ordering` fields and the expressions they sort by
const USER_ORDERING: &[(&str, &str)] = &[
    ("username", "username"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("last_login_at", "last_login_at"),
];

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an account together with its default preferences
    pub async fn register(&self, input: RegisterUserInput) -> AppResult<User> {
        input.validate()?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name,
                               phone_number, position, company_name, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone_number)
        .bind(&input.position)
        .bind(&input.company_name)
        .bind(&input.location)
        .fetch_one(&mut *tx)
        .await?;

        let defaults = PreferenceDefaults::default();
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, items_per_page, default_view, date_format,
                                          time_format, timezone)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(defaults.items_per_page)
        .bind(defaults.default_view)
        .bind(&defaults.date_format)
        .bind(&defaults.time_format)
        .bind(&defaults.timezone)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn list_users(&self, filter: UserFilter) -> AppResult<PaginatedResponse<User>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), USER_ORDERING, "username")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1
                   OR first_name ILIKE $1 OR last_name ILIKE $1)
              AND ($2::bool IS NULL OR is_staff = $2)
              AND ($3::bool IS NULL OR is_active = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {WHERE}"))
            .bind(&search)
            .bind(filter.is_staff)
            .bind(filter.is_active)
            .fetch_one(&self.db)
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users {WHERE} {order_by} LIMIT $4 OFFSET $5"
        ))
        .bind(&search)
        .bind(filter.is_staff)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(users, pagination, total as u64))
    }

    pub async fn update_user(
        &self,
        actor: &AuthUser,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        let existing = self.get_user(user_id).await?;

        if (input.is_staff.is_some() || input.is_active.is_some()) && !actor.is_superuser {
            return Err(AppError::InsufficientPermissions);
        }

        let email = input.email.unwrap_or(existing.email);
        if !email.is_empty() {
            check("email", validate_email(&email))?;
        }
        let phone_number = input.phone_number.unwrap_or(existing.phone_number);
        if !phone_number.is_empty() {
            check("phone_number", validate_phone(&phone_number))?;
        }
        let password_hash = match input.password {
            Some(password) => {
                check("password", validate_password(&password))?;
                Some(
                    hash(&password, DEFAULT_COST).map_err(|e| {
                        AppError::Internal(format!("Password hashing failed: {}", e))
                    })?,
                )
            }
            None => None,
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = $1, first_name = $2, last_name = $3, phone_number = $4, position = $5,
                company_name = $6, location = $7, is_staff = $8, is_active = $9,
                password_hash = COALESCE($10, password_hash)
            WHERE id = $11
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&email)
        .bind(input.first_name.unwrap_or(existing.first_name))
        .bind(input.last_name.unwrap_or(existing.last_name))
        .bind(&phone_number)
        .bind(input.position.unwrap_or(existing.position))
        .bind(input.company_name.unwrap_or(existing.company_name))
        .bind(input.location.unwrap_or(existing.location))
        .bind(input.is_staff.unwrap_or(existing.is_staff))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(password_hash)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }
        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    pub async fn get_preferences(&self, user_id: Uuid) -> AppResult<UserPreferences> {
        // Accounts created outside the API may lack a row
        sqlx::query(
            "INSERT INTO user_preferences (user_id) SELECT id FROM users WHERE id = $1 ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        sqlx::query_as::<_, UserPreferences>(
            r#"
            SELECT user_id, items_per_page, default_view, low_stock_alerts,
                   order_status_notifications, inventory_count_reminders, date_format,
                   time_format, timezone, updated_at
            FROM user_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        input: UpdatePreferencesInput,
    ) -> AppResult<UserPreferences> {
        let existing = self.get_preferences(user_id).await?;

        let items_per_page = input.items_per_page.unwrap_or(existing.items_per_page);
        if !(1..=MAX_ITEMS_PER_PAGE).contains(&items_per_page) {
            return Err(AppError::validation(
                "items_per_page",
                format!("Items per page must be between 1 and {}", MAX_ITEMS_PER_PAGE),
            ));
        }

        let prefs = sqlx::query_as::<_, UserPreferences>(
            r#"
            UPDATE user_preferences
            SET items_per_page = $1, default_view = $2, low_stock_alerts = $3,
                order_status_notifications = $4, inventory_count_reminders = $5,
                date_format = $6, time_format = $7, timezone = $8
            WHERE user_id = $9
            RETURNING user_id, items_per_page, default_view, low_stock_alerts,
                      order_status_notifications, inventory_count_reminders, date_format,
                      time_format, timezone, updated_at
            "#,
        )
        .bind(items_per_page)
        .bind(input.default_view.unwrap_or(existing.default_view))
        .bind(input.low_stock_alerts.unwrap_or(existing.low_stock_alerts))
        .bind(
            input
                .order_status_notifications
                .unwrap_or(existing.order_status_notifications),
        )
        .bind(
            input
                .inventory_count_reminders
                .unwrap_or(existing.inventory_count_reminders),
        )
        .bind(input.date_format.unwrap_or(existing.date_format))
        .bind(input.time_format.unwrap_or(existing.time_format))
        .bind(input.timezone.unwrap_or(existing.timezone))
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(password: &str, confirm: &str) -> RegisterUserInput {
        RegisterUserInput {
            username: "barback".to_string(),
            email: "barback@example.com".to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            position: String::new(),
            company_name: String::new(),
            location: String::new(),
        }
    }

    #[test]
    fn test_registration_requires_matching_passwords() {
        assert!(registration("longpassword", "longpassword").validate().is_ok());
        match registration("longpassword", "different1").validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "password_confirm"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_registration_rejects_short_password() {
        match registration("short", "short").validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "password"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
