//! Product catalog with stock-level indicators

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    stock_value, validate_name, validate_non_negative, validate_positive, PaginatedResponse,
    Pagination, StockLevels, StockStatus, UnitType,
};

#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product row with its summed stock
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    sku: String,
    description: String,
    barcode: String,
    category_id: Uuid,
    category_name: String,
    supplier_id: Option<Uuid>,
    supplier_name: Option<String>,
    unit_price: Decimal,
    unit_size: Decimal,
    unit_type: UnitType,
    par_level: Decimal,
    reorder_point: Decimal,
    reorder_quantity: Decimal,
    notes: String,
    is_active: bool,
    total_quantity: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub barcode: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub unit_price: Decimal,
    pub unit_size: Decimal,
    pub unit_type: UnitType,
    pub par_level: Decimal,
    pub reorder_point: Decimal,
    pub reorder_quantity: Decimal,
    pub notes: String,
    pub is_active: bool,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
    pub below_par_level: bool,
    pub needs_reorder: bool,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let levels = StockLevels::new(row.par_level, row.reorder_point);
        Self {
            total_value: stock_value(row.total_quantity, row.unit_price),
            below_par_level: levels.below_par_level(row.total_quantity),
            needs_reorder: levels.needs_reorder(row.total_quantity),
            stock_status: levels.status(row.total_quantity),
            id: row.id,
            name: row.name,
            sku: row.sku,
            description: row.description,
            barcode: row.barcode,
            category_id: row.category_id,
            category_name: row.category_name,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            unit_price: row.unit_price,
            unit_size: row.unit_size,
            unit_type: row.unit_type,
            par_level: row.par_level,
            reorder_point: row.reorder_point,
            reorder_quantity: row.reorder_quantity,
            notes: row.notes,
            is_active: row.is_active,
            total_quantity: row.total_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductInput {
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub barcode: String,
    pub category_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub unit_price: Decimal,
    pub unit_size: Decimal,
    #[serde(default)]
    pub unit_type: UnitType,
    #[serde(default)]
    pub par_level: Decimal,
    #[serde(default)]
    pub reorder_point: Decimal,
    #[serde(default)]
    pub reorder_quantity: Decimal,
    #[serde(default)]
    pub notes: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub unit_price: Option<Decimal>,
    pub unit_size: Option<Decimal>,
    pub unit_type: Option<UnitType>,
    pub par_level: Option<Decimal>,
    pub reorder_point: Option<Decimal>,
    pub reorder_quantity: Option<Decimal>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Matches name, SKU, barcode and description
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub unit_type: Option<UnitType>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub below_par: Option<bool>,
    pub needs_reorder: Option<bool>,
    pub is_active: Option<bool>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Numeric fields checked on create and update
struct ProductNumbers {
    unit_price: Decimal,
    unit_size: Decimal,
    par_level: Decimal,
    reorder_point: Decimal,
    reorder_quantity: Decimal,
}

impl ProductNumbers {
    fn validate(&self) -> AppResult<()> {
        let non_negative = |field: &str, value| {
            validate_non_negative(value).map_err(|m| AppError::validation(field, m))
        };
        non_negative("unit_price", self.unit_price)?;
        validate_positive(self.unit_size).map_err(|m| AppError::validation("unit_size", m))?;
        non_negative("par_level", self.par_level)?;
        non_negative("reorder_point", self.reorder_point)?;
        non_negative("reorder_quantity", self.reorder_quantity)?;
        Ok(())
    }
}

const SELECT_PRODUCT: &str = r#"
    WITH stock AS (
        SELECT product_id, SUM(quantity) AS total_quantity
        FROM inventory_items
        GROUP BY product_id
    )
    SELECT p.id, p.name, p.sku, p.description, p.barcode,
           p.category_id, c.name AS category_name,
           p.supplier_id, s.name AS supplier_name,
           p.unit_price, p.unit_size, p.unit_type, p.par_level, p.reorder_point,
           p.reorder_quantity, p.notes, p.is_active,
           COALESCE(st.total_quantity, 0) AS total_quantity,
           p.created_at, p.updated_at
    FROM products p
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN suppliers s ON s.id = p.supplier_id
    LEFT JOIN stock st ON st.product_id = p.id
"#;

/// Accepted `ordering` fields and the expressions they sort by
const PRODUCT_ORDERING: &[(&str, &str)] = &[
    ("name", "p.name"),
    ("sku", "p.sku"),
    ("category_name", "c.name"),
    ("supplier_name", "s.name"),
    ("unit_price", "p.unit_price"),
    ("total_quantity", "COALESCE(st.total_quantity, 0)"),
    ("created_at", "p.created_at"),
    ("updated_at", "p.updated_at"),
];

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;
        ProductNumbers {
            unit_price: input.unit_price,
            unit_size: input.unit_size,
            par_level: input.par_level,
            reorder_point: input.reorder_point,
            reorder_quantity: input.reorder_quantity,
        }
        .validate()?;
        self.ensure_references(input.category_id, input.supplier_id)
            .await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO products (name, sku, description, barcode, category_id, supplier_id,
                                  unit_price, unit_size, unit_type, par_level, reorder_point,
                                  reorder_quantity, notes, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(input.sku.trim())
        .bind(&input.description)
        .bind(&input.barcode)
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(input.unit_price)
        .bind(input.unit_size)
        .bind(input.unit_type)
        .bind(input.par_level)
        .bind(input.reorder_point)
        .bind(input.reorder_quantity)
        .bind(&input.notes)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %id, "Product created");
        self.get_product(id).await
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Product::from)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> AppResult<PaginatedResponse<Product>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), PRODUCT_ORDERING, "p.name")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR p.name ILIKE $1 OR p.sku ILIKE $1
                   OR p.barcode ILIKE $1 OR p.description ILIKE $1)
              AND ($2::uuid IS NULL OR p.category_id = $2)
              AND ($3::uuid IS NULL OR p.supplier_id = $3)
              AND ($4::product_unit_type IS NULL OR p.unit_type = $4)
              AND ($5::numeric IS NULL OR p.unit_price >= $5)
              AND ($6::numeric IS NULL OR p.unit_price <= $6)
              AND ($7::bool IS NULL OR (COALESCE(st.total_quantity, 0) < p.par_level) = $7)
              AND ($8::bool IS NULL OR (COALESCE(st.total_quantity, 0) <= p.reorder_point) = $8)
              AND ($9::bool IS NULL OR p.is_active = $9)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            WITH stock AS (
                SELECT product_id, SUM(quantity) AS total_quantity
                FROM inventory_items
                GROUP BY product_id
            )
            SELECT COUNT(*)
            FROM products p
            LEFT JOIN stock st ON st.product_id = p.id
            {WHERE}
            "#
        ))
        .bind(&search)
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.unit_type)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.below_par)
        .bind(filter.needs_reorder)
        .bind(filter.is_active)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{SELECT_PRODUCT} {WHERE} {order_by} LIMIT $10 OFFSET $11"
        ))
        .bind(&search)
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.unit_type)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.below_par)
        .bind(filter.needs_reorder)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let products = rows.into_iter().map(Product::from).collect();
        Ok(PaginatedResponse::new(products, pagination, total as u64))
    }

    pub async fn update_product(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let existing = self.get_product(id).await?;

        let name = input.name.unwrap_or(existing.name);
        validate_name(&name).map_err(|m| AppError::validation("name", m))?;
        let numbers = ProductNumbers {
            unit_price: input.unit_price.unwrap_or(existing.unit_price),
            unit_size: input.unit_size.unwrap_or(existing.unit_size),
            par_level: input.par_level.unwrap_or(existing.par_level),
            reorder_point: input.reorder_point.unwrap_or(existing.reorder_point),
            reorder_quantity: input.reorder_quantity.unwrap_or(existing.reorder_quantity),
        };
        numbers.validate()?;
        let category_id = input.category_id.unwrap_or(existing.category_id);
        let supplier_id = input.supplier_id.or(existing.supplier_id);
        self.ensure_references(category_id, supplier_id).await?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = $1, sku = $2, description = $3, barcode = $4, category_id = $5,
                supplier_id = $6, unit_price = $7, unit_size = $8, unit_type = $9,
                par_level = $10, reorder_point = $11, reorder_quantity = $12, notes = $13,
                is_active = $14
            WHERE id = $15
            "#,
        )
        .bind(name.trim())
        .bind(input.sku.unwrap_or(existing.sku).trim())
        .bind(input.description.unwrap_or(existing.description))
        .bind(input.barcode.unwrap_or(existing.barcode))
        .bind(category_id)
        .bind(supplier_id)
        .bind(numbers.unit_price)
        .bind(numbers.unit_size)
        .bind(input.unit_type.unwrap_or(existing.unit_type))
        .bind(numbers.par_level)
        .bind(numbers.reorder_point)
        .bind(numbers.reorder_quantity)
        .bind(input.notes.unwrap_or(existing.notes))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get_product(id).await
    }

    /// Products with transaction, order or recipe history cannot be removed
    pub async fn delete_product(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn ensure_references(&self, category_id: Uuid, supplier_id: Option<Uuid>) -> AppResult<()> {
        let category_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(&self.db)
                .await?;
        if !category_exists {
            return Err(AppError::validation("category_id", "Category does not exist"));
        }

        if let Some(supplier_id) = supplier_id {
            let supplier_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
            )
            .bind(supplier_id)
            .fetch_one(&self.db)
            .await?;
            if !supplier_exists {
                return Err(AppError::validation("supplier_id", "Supplier does not exist"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn numbers() -> ProductNumbers {
        ProductNumbers {
            unit_price: dec!(30.00),
            unit_size: dec!(750),
            par_level: dec!(6),
            reorder_point: dec!(2),
            reorder_quantity: dec!(12),
        }
    }

    #[test]
    fn test_product_numbers_validation() {
        assert!(numbers().validate().is_ok());

        let zero_size = ProductNumbers {
            unit_size: Decimal::ZERO,
            ..numbers()
        };
        match zero_size.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "unit_size"),
            other => panic!("unexpected {:?}", other),
        }

        let negative_price = ProductNumbers {
            unit_price: dec!(-1),
            ..numbers()
        };
        assert!(negative_price.validate().is_err());
    }
}
