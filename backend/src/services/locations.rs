//! Storage and service locations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{validate_name, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct LocationService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_storage: bool,
    pub is_service: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLocationInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_storage: bool,
    #[serde(default)]
    pub is_service: bool,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateLocationInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_storage: Option<bool>,
    pub is_service: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationFilter {
    pub search: Option<String>,
    pub is_storage: Option<bool>,
    pub is_service: Option<bool>,
    pub is_active: Option<bool>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

const LOCATION_COLUMNS: &str =
    "id, name, description, is_storage, is_service, is_active, created_at, updated_at";

/// Accepted `ordering` fields and the expressions they sort by
const LOCATION_ORDERING: &[(&str, &str)] = &[("name", "name"), ("created_at", "created_at"), ("updated_at", "updated_at")];

impl LocationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_location(&self, input: CreateLocationInput) -> AppResult<Location> {
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;

        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations (name, description, is_storage, is_service, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.is_storage)
        .bind(input.is_service)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        Ok(location)
    }

    pub async fn get_location(&self, id: Uuid) -> AppResult<Location> {
        sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))
    }

    pub async fn list_locations(
        &self,
        filter: LocationFilter,
    ) -> AppResult<PaginatedResponse<Location>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), LOCATION_ORDERING, "name")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2::bool IS NULL OR is_storage = $2)
              AND ($3::bool IS NULL OR is_service = $3)
              AND ($4::bool IS NULL OR is_active = $4)
        "#;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM locations {WHERE}"))
                .bind(&search)
                .bind(filter.is_storage)
                .bind(filter.is_service)
                .bind(filter.is_active)
                .fetch_one(&self.db)
                .await?;

        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations {WHERE} {order_by} LIMIT $5 OFFSET $6"
        ))
        .bind(&search)
        .bind(filter.is_storage)
        .bind(filter.is_service)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(locations, pagination, total as u64))
    }

    pub async fn update_location(
        &self,
        id: Uuid,
        input: UpdateLocationInput,
    ) -> AppResult<Location> {
        let existing = self.get_location(id).await?;

        let name = input.name.unwrap_or(existing.name);
        validate_name(&name).map_err(|m| AppError::validation("name", m))?;

        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            UPDATE locations
            SET name = $1, description = $2, is_storage = $3, is_service = $4, is_active = $5
            WHERE id = $6
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(name.trim())
        .bind(input.description.unwrap_or(existing.description))
        .bind(input.is_storage.unwrap_or(existing.is_storage))
        .bind(input.is_service.unwrap_or(existing.is_service))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(location)
    }

    /// Fails with a conflict while transactions or counts still reference the location
    pub async fn delete_location(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Location".to_string()));
        }
        Ok(())
    }
}
