//! Stock balances per product and location

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::transactions::{record_transaction, NewTransaction, NewTransactionItem};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use shared::{
    replay, stock_value, validate_non_negative, PaginatedResponse, Pagination, StockKey,
    StockLevels, StockLine, StockStatus, TransactionStatus, TransactionType,
};

#[derive(Clone)]
pub struct InventoryItemService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct InventoryItemRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    sku: String,
    unit_price: Decimal,
    par_level: Decimal,
    reorder_point: Decimal,
    location_id: Uuid,
    location_name: String,
    quantity: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_value: Decimal,
    /// Product-wide level, judged on this location's quantity
    pub stock_status: StockStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InventoryItemRow> for InventoryItem {
    fn from(row: InventoryItemRow) -> Self {
        let levels = StockLevels::new(row.par_level, row.reorder_point);
        Self {
            total_value: stock_value(row.quantity, row.unit_price),
            stock_status: levels.status(row.quantity),
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            location_id: row.location_id,
            location_name: row.location_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInventoryItemInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// Opening balance
    #[serde(default)]
    pub quantity: Decimal,
    pub is_active: Option<bool>,
}

/// Quantities only move through transactions once the item exists
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateInventoryItemInput {
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryItemFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub min_quantity: Option<Decimal>,
    pub max_quantity: Option<Decimal>,
    /// Matches product name, SKU and location name
    pub search: Option<String>,
    pub is_active: Option<bool>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Stored balance compared with the sum of completed transaction lines
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryLedger {
    pub inventory_item_id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub stored_quantity: Decimal,
    pub ledger_quantity: Decimal,
    pub difference: Decimal,
    pub in_sync: bool,
    pub transaction_count: i64,
}

const SELECT_ITEM: &str = r#"
    SELECT ii.id, ii.product_id, p.name AS product_name, p.sku, p.unit_price,
           p.par_level, p.reorder_point, ii.location_id, l.name AS location_name,
           ii.quantity, ii.is_active, ii.created_at, ii.updated_at
    FROM inventory_items ii
    JOIN products p ON p.id = ii.product_id
    JOIN locations l ON l.id = ii.location_id
"#;

/// Accepted `ordering` fields and the expressions they sort by
const ITEM_ORDERING: &[(&str, &str)] = &[
    ("product_name", "p.name"),
    ("location_name", "l.name"),
    ("quantity", "ii.quantity"),
    ("created_at", "ii.created_at"),
    ("updated_at", "ii.updated_at"),
];

impl InventoryItemService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a balance row; a non-zero opening quantity is posted as a completed adjustment
    pub async fn create_item(
        &self,
        user: &AuthUser,
        input: CreateInventoryItemInput,
    ) -> AppResult<InventoryItem> {
        validate_non_negative(input.quantity).map_err(|m| AppError::validation("quantity", m))?;

        let mut tx = self.db.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO inventory_items (product_id, location_id, quantity, is_active)
            VALUES ($1, $2, 0, $3)
            RETURNING id
            "#,
        )
        .bind(input.product_id)
        .bind(input.location_id)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        let unit_price =
            sqlx::query_scalar::<_, Decimal>("SELECT unit_price FROM products WHERE id = $1")
                .bind(input.product_id)
                .fetch_one(&mut *tx)
                .await?;

        if let Some(opening) = opening_balance(id, &input, unit_price, Utc::now().date_naive(), user)
        {
            record_transaction(&mut tx, opening).await?;
        }

        tx.commit().await?;

        tracing::info!(
            inventory_item_id = %id,
            product_id = %input.product_id,
            location_id = %input.location_id,
            quantity = %input.quantity,
            "Opening balance recorded"
        );

        self.get_item(id).await
    }

    pub async fn get_item(&self, id: Uuid) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItemRow>(&format!("{SELECT_ITEM} WHERE ii.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(InventoryItem::from)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    pub async fn list_items(
        &self,
        filter: InventoryItemFilter,
    ) -> AppResult<PaginatedResponse<InventoryItem>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), ITEM_ORDERING, "p.name, l.name")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR ii.product_id = $1)
              AND ($2::uuid IS NULL OR ii.location_id = $2)
              AND ($3::numeric IS NULL OR ii.quantity >= $3)
              AND ($4::numeric IS NULL OR ii.quantity <= $4)
              AND ($5::text IS NULL OR p.name ILIKE $5 OR p.sku ILIKE $5 OR l.name ILIKE $5)
              AND ($6::bool IS NULL OR ii.is_active = $6)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*)
            FROM inventory_items ii
            JOIN products p ON p.id = ii.product_id
            JOIN locations l ON l.id = ii.location_id
            {WHERE}
            "#
        ))
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.min_quantity)
        .bind(filter.max_quantity)
        .bind(&search)
        .bind(filter.is_active)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, InventoryItemRow>(&format!(
            "{SELECT_ITEM} {WHERE} {order_by} LIMIT $7 OFFSET $8"
        ))
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.min_quantity)
        .bind(filter.max_quantity)
        .bind(&search)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(InventoryItem::from)
        .collect();

        Ok(PaginatedResponse::new(items, pagination, total as u64))
    }

    pub async fn update_item(
        &self,
        id: Uuid,
        input: UpdateInventoryItemInput,
    ) -> AppResult<InventoryItem> {
        let existing = self.get_item(id).await?;

        sqlx::query("UPDATE inventory_items SET is_active = $1 WHERE id = $2")
            .bind(input.is_active.unwrap_or(existing.is_active))
            .bind(id)
            .execute(&self.db)
            .await?;

        self.get_item(id).await
    }

    /// Delete an empty balance that no completed transaction has touched
    pub async fn delete_item(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let (product_id, location_id, quantity) = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            "SELECT product_id, location_id, quantity FROM inventory_items WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        let completed_lines = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM inventory_transaction_items i
            JOIN inventory_transactions t ON t.id = i.transaction_id
            WHERE t.status = 'completed'
              AND i.product_id = $1
              AND (i.location_id = $2 OR i.destination_location_id = $2)
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(reason) = deletion_blocker(quantity, completed_lines) {
            return Err(AppError::conflict("Inventory item", reason));
        }

        sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(inventory_item_id = %id, "Inventory item deleted");
        Ok(())
    }

    /// Recompute the balance from completed transactions
    pub async fn ledger(&self, id: Uuid) -> AppResult<InventoryLedger> {
        let item = self.get_item(id).await?;

        let history = sqlx::query_as::<_, (Uuid, TransactionType, Uuid, Uuid, Option<Uuid>, Decimal)>(
            r#"
            SELECT t.id, t.transaction_type, i.product_id, i.location_id,
                   i.destination_location_id, i.quantity
            FROM inventory_transaction_items i
            JOIN inventory_transactions t ON t.id = i.transaction_id
            WHERE t.status = 'completed'
              AND i.product_id = $1
              AND (i.location_id = $2 OR i.destination_location_id = $2)
            "#,
        )
        .bind(item.product_id)
        .bind(item.location_id)
        .fetch_all(&self.db)
        .await?;

        let mut transactions: Vec<Uuid> = history.iter().map(|row| row.0).collect();
        transactions.sort();
        transactions.dedup();

        let totals = replay(history.into_iter().map(
            |(_, transaction_type, product_id, location_id, destination_location_id, quantity)| {
                (
                    transaction_type,
                    StockLine {
                        product_id,
                        location_id,
                        destination_location_id,
                        quantity,
                    },
                )
            },
        ));
        let ledger_quantity = totals
            .get(&StockKey::new(item.product_id, item.location_id))
            .copied()
            .unwrap_or_default();
        let difference = item.quantity - ledger_quantity;

        Ok(InventoryLedger {
            inventory_item_id: item.id,
            product_id: item.product_id,
            location_id: item.location_id,
            stored_quantity: item.quantity,
            ledger_quantity,
            difference,
            in_sync: difference.is_zero(),
            transaction_count: transactions.len() as i64,
        })
    }
}

/// Completed adjustment carrying a new item's opening quantity, if any
fn opening_balance(
    id: Uuid,
    input: &CreateInventoryItemInput,
    unit_price: Decimal,
    date: NaiveDate,
    user: &AuthUser,
) -> Option<NewTransaction> {
    if input.quantity.is_zero() {
        return None;
    }
    Some(NewTransaction {
        transaction_type: TransactionType::Adjustment,
        status: TransactionStatus::Completed,
        transaction_date: date,
        reference: format!("OPENING-{}", id.simple()),
        notes: "Opening balance".to_string(),
        performed_by: Some(user.user_id),
        items: vec![NewTransactionItem {
            line: StockLine::new(input.product_id, input.location_id, input.quantity),
            unit_price,
            notes: String::new(),
        }],
    })
}

/// Why a balance cannot be deleted
fn deletion_blocker(quantity: Decimal, completed_lines: i64) -> Option<&'static str> {
    if !quantity.is_zero() {
        Some("Inventory item still holds stock; adjust it to zero first")
    } else if completed_lines > 0 {
        Some("Inventory item has completed transactions")
    } else {
        None
    }
}
