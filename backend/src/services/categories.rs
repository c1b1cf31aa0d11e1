//! Product categories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{validate_name, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

const SELECT_CATEGORY: &str = r#"
    SELECT c.id, c.name, c.description, c.is_active,
           (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count,
           c.created_at, c.updated_at
    FROM categories c
"#;

/// Accepted `ordering` fields and the expressions they sort by
const CATEGORY_ORDERING: &[(&str, &str)] = &[("name", "c.name"), ("created_at", "c.created_at"), ("updated_at", "c.updated_at")];

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_category(&self, input: CreateCategoryInput) -> AppResult<Category> {
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO categories (name, description, is_active)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        self.get_category(id).await
    }

    pub async fn get_category(&self, id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    pub async fn list_categories(
        &self,
        filter: CategoryFilter,
    ) -> AppResult<PaginatedResponse<Category>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), CATEGORY_ORDERING, "c.name")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR c.name ILIKE $1 OR c.description ILIKE $1)
              AND ($2::bool IS NULL OR c.is_active = $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM categories c {WHERE}"
        ))
        .bind(&search)
        .bind(filter.is_active)
        .fetch_one(&self.db)
        .await?;

        let categories = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} {WHERE} {order_by} LIMIT $3 OFFSET $4"
        ))
        .bind(&search)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(categories, pagination, total as u64))
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> AppResult<Category> {
        let existing = self.get_category(id).await?;

        let name = input.name.unwrap_or(existing.name);
        validate_name(&name).map_err(|m| AppError::validation("name", m))?;

        sqlx::query(
            "UPDATE categories SET name = $1, description = $2, is_active = $3 WHERE id = $4",
        )
        .bind(name.trim())
        .bind(input.description.unwrap_or(existing.description))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get_category(id).await
    }

    /// Categories still holding products cannot be removed
    pub async fn delete_category(&self, id: Uuid) -> AppResult<()> {
        let category = self.get_category(id).await?;
        if category.product_count > 0 {
            return Err(AppError::conflict(
                "category",
                format!(
                    "Category is used by {} product(s) and cannot be deleted",
                    category.product_count
                ),
            ));
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
