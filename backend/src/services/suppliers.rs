//! Suppliers that products are bought from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{validate_email, validate_name, validate_phone, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub notes: String,
    pub is_active: bool,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSupplierInput {
    pub name: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub notes: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SupplierFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

const SELECT_SUPPLIER: &str = r#"
    SELECT s.id, s.name, s.contact_name, s.email, s.phone, s.address, s.website, s.notes,
           s.is_active,
           (SELECT COUNT(*) FROM products p WHERE p.supplier_id = s.id) AS product_count,
           s.created_at, s.updated_at
    FROM suppliers s
"#;

/// Blank contact fields are allowed; filled ones must be well-formed
fn validate_contact(name: &str, email: &str, phone: &str) -> AppResult<()> {
    validate_name(name).map_err(|m| AppError::validation("name", m))?;
    if !email.is_empty() {
        validate_email(email).map_err(|m| AppError::validation("email", m))?;
    }
    if !phone.is_empty() {
        validate_phone(phone).map_err(|m| AppError::validation("phone", m))?;
    }
    Ok(())
}

/// Accepted `ordering` fields and the expressions they sort by
const SUPPLIER_ORDERING: &[(&str, &str)] = &[("name", "s.name"), ("created_at", "s.created_at"), ("updated_at", "s.updated_at")];

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        validate_contact(&input.name, &input.email, &input.phone)?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO suppliers (name, contact_name, email, phone, address, website, notes, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.contact_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.website)
        .bind(&input.notes)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        self.get_supplier(id).await
    }

    pub async fn get_supplier(&self, id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!("{SELECT_SUPPLIER} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn list_suppliers(
        &self,
        filter: SupplierFilter,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), SUPPLIER_ORDERING, "s.name")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR s.name ILIKE $1 OR s.contact_name ILIKE $1
                   OR s.email ILIKE $1 OR s.phone ILIKE $1)
              AND ($2::bool IS NULL OR s.is_active = $2)
        "#;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM suppliers s {WHERE}"))
                .bind(&search)
                .bind(filter.is_active)
                .fetch_one(&self.db)
                .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "{SELECT_SUPPLIER} {WHERE} {order_by} LIMIT $3 OFFSET $4"
        ))
        .bind(&search)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(suppliers, pagination, total as u64))
    }

    pub async fn update_supplier(
        &self,
        id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get_supplier(id).await?;

        let name = input.name.unwrap_or(existing.name);
        let email = input.email.unwrap_or(existing.email);
        let phone = input.phone.unwrap_or(existing.phone);
        validate_contact(&name, &email, &phone)?;

        sqlx::query(
            r#"
            UPDATE suppliers
            SET name = $1, contact_name = $2, email = $3, phone = $4, address = $5,
                website = $6, notes = $7, is_active = $8
            WHERE id = $9
            "#,
        )
        .bind(name.trim())
        .bind(input.contact_name.unwrap_or(existing.contact_name))
        .bind(&email)
        .bind(&phone)
        .bind(input.address.unwrap_or(existing.address))
        .bind(input.website.unwrap_or(existing.website))
        .bind(input.notes.unwrap_or(existing.notes))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get_supplier(id).await
    }

    /// Suppliers with products or orders cannot be removed
    pub async fn delete_supplier(&self, id: Uuid) -> AppResult<()> {
        let supplier = self.get_supplier(id).await?;
        if supplier.product_count > 0 {
            return Err(AppError::conflict(
                "supplier",
                format!(
                    "Supplier is used by {} product(s) and cannot be deleted",
                    supplier.product_count
                ),
            ));
        }

        sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_validation() {
        assert!(validate_contact("Acme Spirits", "", "").is_ok());
        assert!(validate_contact("Acme Spirits", "sales@acme.com", "(555) 010-2000").is_ok());
        match validate_contact("Acme Spirits", "sales-at-acme", "") {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "email"),
            other => panic!("unexpected {:?}", other),
        }
        match validate_contact("Acme Spirits", "", "12") {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "phone"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
