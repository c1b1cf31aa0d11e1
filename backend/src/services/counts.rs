//! Physical inventory counts
//!
//! A count snapshots expected quantities at one location, collects counted
//! quantities, and on completion posts a single adjustment transaction that
//! brings stock in line with what was counted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::transactions::{lock_balances, record_transaction, NewTransaction, NewTransactionItem};
use crate::error::{AppError, AppResult};
use crate::middleware::{permissions, Access, AuthUser};
use shared::{
    count_variance, progress_percentage, validate_name, validate_non_negative,
    variance_percentage, CountStatus, PaginatedResponse, Pagination, StockKey, StockLine,
    TransactionStatus, TransactionType, VarianceLine, VarianceSummary,
};

#[derive(Clone)]
pub struct CountService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct CountRow {
    id: Uuid,
    name: String,
    description: String,
    location_id: Uuid,
    location_name: String,
    status: CountStatus,
    scheduled_date: Option<NaiveDate>,
    completed_at: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    created_by_username: Option<String>,
    completed_by: Option<Uuid>,
    adjustment_transaction_id: Option<Uuid>,
    notes: String,
    total_items: i64,
    counted_items: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryCount {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub status: CountStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_by_username: Option<String>,
    /// Assigned before completion, then the user who completed it
    pub completed_by: Option<Uuid>,
    pub adjustment_transaction_id: Option<Uuid>,
    pub notes: String,
    pub total_items: i64,
    pub counted_items: i64,
    pub progress_percentage: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CountRow> for InventoryCount {
    fn from(row: CountRow) -> Self {
        Self {
            progress_percentage: progress_percentage(
                row.total_items.max(0) as u64,
                row.counted_items.max(0) as u64,
            ),
            id: row.id,
            name: row.name,
            description: row.description,
            location_id: row.location_id,
            location_name: row.location_name,
            status: row.status,
            scheduled_date: row.scheduled_date,
            completed_at: row.completed_at,
            created_by: row.created_by,
            created_by_username: row.created_by_username,
            completed_by: row.completed_by,
            adjustment_transaction_id: row.adjustment_transaction_id,
            notes: row.notes,
            total_items: row.total_items,
            counted_items: row.counted_items,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CountItemRow {
    id: Uuid,
    count_id: Uuid,
    product_id: Uuid,
    product_name: String,
    sku: String,
    unit_price: Decimal,
    expected_quantity: Decimal,
    counted_quantity: Option<Decimal>,
    is_counted: bool,
    counted_by: Option<Uuid>,
    counted_at: Option<DateTime<Utc>>,
    notes: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountItem {
    pub id: Uuid,
    pub count_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub expected_quantity: Decimal,
    pub counted_quantity: Option<Decimal>,
    pub is_counted: bool,
    pub variance: Option<Decimal>,
    pub variance_percentage: Option<Decimal>,
    pub counted_by: Option<Uuid>,
    pub counted_at: Option<DateTime<Utc>>,
    pub notes: String,
}

impl From<CountItemRow> for CountItem {
    fn from(row: CountItemRow) -> Self {
        let counted = row.counted_quantity.filter(|_| row.is_counted);
        Self {
            variance: count_variance(row.expected_quantity, counted),
            variance_percentage: variance_percentage(row.expected_quantity, counted),
            id: row.id,
            count_id: row.count_id,
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            expected_quantity: row.expected_quantity,
            counted_quantity: row.counted_quantity,
            is_counted: row.is_counted,
            counted_by: row.counted_by,
            counted_at: row.counted_at,
            notes: row.notes,
        }
    }
}

impl CountItemRow {
    fn variance_line(&self) -> VarianceLine {
        VarianceLine::new(
            self.product_id,
            self.product_name.clone(),
            Some(self.sku.clone()).filter(|sku| !sku.is_empty()),
            self.expected_quantity,
            self.counted_quantity.filter(|_| self.is_counted),
            self.unit_price,
        )
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCountInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location_id: Uuid,
    pub scheduled_date: Option<NaiveDate>,
    /// User assigned to carry out the count
    pub completed_by: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
    /// Add every inventory item at the location with its current quantity
    #[serde(default = "default_true")]
    pub populate_items: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCountInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_by: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCountItemInput {
    pub product_id: Uuid,
    /// Defaults to the current quantity at the count's location
    pub expected_quantity: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordCountInput {
    pub counted_quantity: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CountFilter {
    pub status: Option<CountStatus>,
    pub location_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches name, location name and notes
    pub search: Option<String>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CountItemFilter {
    pub is_counted: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VarianceReport {
    pub count_id: Uuid,
    pub count_name: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub status: CountStatus,
    pub lines: Vec<VarianceLine>,
    pub summary: VarianceSummary,
}

const SELECT_COUNT: &str = r#"
    SELECT c.id, c.name, c.description, c.location_id, l.name AS location_name, c.status,
           c.scheduled_date, c.completed_at, c.created_by, u.username AS created_by_username,
           c.completed_by, c.adjustment_transaction_id, c.notes,
           (SELECT COUNT(*) FROM inventory_count_items i WHERE i.count_id = c.id) AS total_items,
           (SELECT COUNT(*) FROM inventory_count_items i
             WHERE i.count_id = c.id AND i.is_counted) AS counted_items,
           c.is_active, c.created_at, c.updated_at
    FROM inventory_counts c
    JOIN locations l ON l.id = c.location_id
    LEFT JOIN users u ON u.id = c.created_by
"#;

const SELECT_ITEM: &str = r#"
    SELECT i.id, i.count_id, i.product_id, p.name AS product_name, p.sku, p.unit_price,
           i.expected_quantity, i.counted_quantity, i.is_counted, i.counted_by, i.counted_at,
           i.notes
    FROM inventory_count_items i
    JOIN products p ON p.id = i.product_id
"#;

/// Header fields needed for permission and state checks
#[derive(Debug, FromRow)]
struct CountHeader {
    location_id: Uuid,
    status: CountStatus,
    created_by: Option<Uuid>,
    completed_by: Option<Uuid>,
}

async fn lock_count(conn: &mut PgConnection, id: Uuid) -> AppResult<CountHeader> {
    sqlx::query_as::<_, CountHeader>(
        r#"
        SELECT location_id, status, created_by, completed_by
        FROM inventory_counts
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory count".to_string()))
}

fn ensure_open(status: CountStatus) -> AppResult<()> {
    if status.is_open() {
        Ok(())
    } else {
        Err(AppError::InvalidStateTransition(format!(
            "Count is {} and can no longer be changed",
            status.as_str()
        )))
    }
}

/// Accepted `ordering` fields and the expressions they sort by
const COUNT_ORDERING: &[(&str, &str)] = &[
    ("name", "c.name"),
    ("scheduled_date", "c.scheduled_date"),
    ("status", "c.status"),
    ("created_at", "c.created_at"),
];

impl CountService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_count(
        &self,
        user: &AuthUser,
        input: CreateCountInput,
    ) -> AppResult<InventoryCount> {
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;

        let mut tx = self.db.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO inventory_counts (name, description, location_id, scheduled_date,
                                          created_by, completed_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.location_id)
        .bind(input.scheduled_date)
        .bind(user.user_id)
        .bind(input.completed_by)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        if input.populate_items {
            let populated = sqlx::query(
                r#"
                INSERT INTO inventory_count_items (count_id, product_id, expected_quantity)
                SELECT $1, ii.product_id, ii.quantity
                FROM inventory_items ii
                WHERE ii.location_id = $2 AND ii.is_active
                "#,
            )
            .bind(id)
            .bind(input.location_id)
            .execute(&mut *tx)
            .await?;
            tracing::debug!(count_id = %id, items = populated.rows_affected(), "Count populated");
        }

        tx.commit().await?;

        tracing::info!(count_id = %id, location_id = %input.location_id, "Inventory count started");
        self.get_count(id).await
    }

    pub async fn get_count(&self, id: Uuid) -> AppResult<InventoryCount> {
        sqlx::query_as::<_, CountRow>(&format!("{SELECT_COUNT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(InventoryCount::from)
            .ok_or_else(|| AppError::NotFound("Inventory count".to_string()))
    }

    pub async fn list_counts(
        &self,
        filter: CountFilter,
    ) -> AppResult<PaginatedResponse<InventoryCount>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), COUNT_ORDERING, "c.created_at DESC, c.id")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::inventory_count_status IS NULL OR c.status = $1)
              AND ($2::uuid IS NULL OR c.location_id = $2)
              AND ($3::uuid IS NULL OR c.created_by = $3)
              AND ($4::date IS NULL OR c.scheduled_date >= $4)
              AND ($5::date IS NULL OR c.scheduled_date <= $5)
              AND ($6::text IS NULL OR c.name ILIKE $6 OR l.name ILIKE $6 OR c.notes ILIKE $6)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*)
            FROM inventory_counts c
            JOIN locations l ON l.id = c.location_id
            {WHERE}
            "#
        ))
        .bind(filter.status)
        .bind(filter.location_id)
        .bind(filter.created_by)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let counts = sqlx::query_as::<_, CountRow>(&format!(
            "{SELECT_COUNT} {WHERE} {order_by} LIMIT $7 OFFSET $8"
        ))
        .bind(filter.status)
        .bind(filter.location_id)
        .bind(filter.created_by)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(InventoryCount::from)
        .collect();

        Ok(PaginatedResponse::new(counts, pagination, total as u64))
    }

    pub async fn update_count(
        &self,
        user: &AuthUser,
        id: Uuid,
        input: UpdateCountInput,
    ) -> AppResult<InventoryCount> {
        let mut tx = self.db.begin().await?;
        let header = lock_count(&mut tx, id).await?;
        permissions::count_participant(
            user,
            Access::Update,
            header.created_by,
            header.completed_by,
            header.status,
        )?;
        ensure_open(header.status)?;

        if let Some(name) = &input.name {
            validate_name(name).map_err(|m| AppError::validation("name", m))?;
        }

        sqlx::query(
            r#"
            UPDATE inventory_counts
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                scheduled_date = COALESCE($3, scheduled_date),
                completed_by = COALESCE($4, completed_by),
                notes = COALESCE($5, notes)
            WHERE id = $6
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(input.scheduled_date)
        .bind(input.completed_by)
        .bind(&input.notes)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_count(id).await
    }

    pub async fn delete_count(&self, user: &AuthUser, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let header = lock_count(&mut tx, id).await?;
        permissions::count_participant(
            user,
            Access::Write,
            header.created_by,
            header.completed_by,
            header.status,
        )?;
        if header.status == CountStatus::Completed {
            return Err(AppError::InvalidStateTransition(
                "Completed counts cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM inventory_counts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_items(
        &self,
        count_id: Uuid,
        filter: CountItemFilter,
    ) -> AppResult<PaginatedResponse<CountItem>> {
        self.get_count(count_id).await?;
        let pagination = Pagination::new(filter.page, filter.page_size);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM inventory_count_items i
            WHERE i.count_id = $1 AND ($2::bool IS NULL OR i.is_counted = $2)
            "#,
        )
        .bind(count_id)
        .bind(filter.is_counted)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, CountItemRow>(&format!(
            r#"
            {SELECT_ITEM}
            WHERE i.count_id = $1 AND ($2::bool IS NULL OR i.is_counted = $2)
            ORDER BY p.name
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(count_id)
        .bind(filter.is_counted)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(CountItem::from)
        .collect();

        Ok(PaginatedResponse::new(items, pagination, total as u64))
    }

    pub async fn uncounted_items(
        &self,
        count_id: Uuid,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> AppResult<PaginatedResponse<CountItem>> {
        self.list_items(
            count_id,
            CountItemFilter {
                is_counted: Some(false),
                page,
                page_size,
            },
        )
        .await
    }

    async fn get_item(&self, count_id: Uuid, item_id: Uuid) -> AppResult<CountItem> {
        sqlx::query_as::<_, CountItemRow>(&format!(
            "{SELECT_ITEM} WHERE i.count_id = $1 AND i.id = $2"
        ))
        .bind(count_id)
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .map(CountItem::from)
        .ok_or_else(|| AppError::NotFound("Count item".to_string()))
    }

    pub async fn add_item(
        &self,
        user: &AuthUser,
        count_id: Uuid,
        input: AddCountItemInput,
    ) -> AppResult<CountItem> {
        let mut tx = self.db.begin().await?;
        let header = lock_count(&mut tx, count_id).await?;
        permissions::count_participant(
            user,
            Access::Update,
            header.created_by,
            header.completed_by,
            header.status,
        )?;
        ensure_open(header.status)?;

        let expected = match input.expected_quantity {
            Some(expected) => {
                validate_non_negative(expected)
                    .map_err(|m| AppError::validation("expected_quantity", m))?;
                expected
            }
            None => sqlx::query_scalar::<_, Decimal>(
                "SELECT quantity FROM inventory_items WHERE product_id = $1 AND location_id = $2",
            )
            .bind(input.product_id)
            .bind(header.location_id)
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or_default(),
        };

        let item_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO inventory_count_items (count_id, product_id, expected_quantity, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(count_id)
        .bind(input.product_id)
        .bind(expected)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_item(count_id, item_id).await
    }

    /// Record the counted quantity of one item
    pub async fn record_count(
        &self,
        user: &AuthUser,
        count_id: Uuid,
        item_id: Uuid,
        input: RecordCountInput,
    ) -> AppResult<CountItem> {
        validate_non_negative(input.counted_quantity)
            .map_err(|m| AppError::validation("counted_quantity", m))?;

        let mut tx = self.db.begin().await?;
        let header = lock_count(&mut tx, count_id).await?;
        permissions::count_participant(
            user,
            Access::Update,
            header.created_by,
            header.completed_by,
            header.status,
        )?;
        ensure_open(header.status)?;

        let result = sqlx::query(
            r#"
            UPDATE inventory_count_items
            SET counted_quantity = $1,
                is_counted = TRUE,
                counted_by = $2,
                counted_at = NOW(),
                notes = COALESCE($3, notes)
            WHERE id = $4 AND count_id = $5
            "#,
        )
        .bind(input.counted_quantity)
        .bind(user.user_id)
        .bind(&input.notes)
        .bind(item_id)
        .bind(count_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Count item".to_string()));
        }

        tx.commit().await?;
        self.get_item(count_id, item_id).await
    }

    /// in_progress -> completed, posting one adjustment for every counted
    /// item whose count differs from current stock
    pub async fn complete_count(&self, user: &AuthUser, id: Uuid) -> AppResult<InventoryCount> {
        let mut tx = self.db.begin().await?;
        let header = lock_count(&mut tx, id).await?;
        permissions::count_participant(
            user,
            Access::Write,
            header.created_by,
            header.completed_by,
            header.status,
        )?;
        if !header.status.can_transition_to(CountStatus::Completed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot complete a {} count",
                header.status.as_str()
            )));
        }

        let counted = sqlx::query_as::<_, (Uuid, Decimal, Decimal)>(
            r#"
            SELECT i.product_id, i.counted_quantity, p.unit_price
            FROM inventory_count_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.count_id = $1 AND i.is_counted AND i.counted_quantity IS NOT NULL
            ORDER BY i.product_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let keys: Vec<StockKey> = counted
            .iter()
            .map(|(product_id, _, _)| StockKey::new(*product_id, header.location_id))
            .collect();
        let current = lock_balances(&mut tx, &keys).await?;

        let items: Vec<NewTransactionItem> = counted
            .iter()
            .filter_map(|(product_id, counted_quantity, unit_price)| {
                let key = StockKey::new(*product_id, header.location_id);
                let delta = *counted_quantity - current.get(&key).copied().unwrap_or_default();
                (!delta.is_zero()).then(|| NewTransactionItem {
                    line: StockLine::new(*product_id, header.location_id, delta),
                    unit_price: *unit_price,
                    notes: String::new(),
                })
            })
            .collect();

        let adjustment_id = if items.is_empty() {
            None
        } else {
            let adjustments = items.len();
            let transaction_id = record_transaction(
                &mut tx,
                NewTransaction {
                    transaction_type: TransactionType::Adjustment,
                    status: TransactionStatus::Completed,
                    transaction_date: Utc::now().date_naive(),
                    reference: format!("COUNT-{}", id.simple()),
                    notes: "Inventory count adjustment".to_string(),
                    performed_by: Some(user.user_id),
                    items,
                },
            )
            .await?;
            tracing::info!(count_id = %id, adjustments, "Count variances posted");
            Some(transaction_id)
        };

        sqlx::query(
            r#"
            UPDATE inventory_counts
            SET status = 'completed', completed_at = NOW(), completed_by = $1,
                adjustment_transaction_id = $2
            WHERE id = $3
            "#,
        )
        .bind(user.user_id)
        .bind(adjustment_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(count_id = %id, "Inventory count completed");
        self.get_count(id).await
    }

    /// in_progress -> cancelled; stock is untouched
    pub async fn cancel_count(&self, user: &AuthUser, id: Uuid) -> AppResult<InventoryCount> {
        let mut tx = self.db.begin().await?;
        let header = lock_count(&mut tx, id).await?;
        permissions::count_participant(
            user,
            Access::Write,
            header.created_by,
            header.completed_by,
            header.status,
        )?;
        if !header.status.can_transition_to(CountStatus::Cancelled) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot cancel a {} count",
                header.status.as_str()
            )));
        }

        sqlx::query("UPDATE inventory_counts SET status = 'cancelled' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(count_id = %id, "Inventory count cancelled");
        self.get_count(id).await
    }

    pub async fn variance_report(&self, id: Uuid) -> AppResult<VarianceReport> {
        let count = self.get_count(id).await?;

        let lines: Vec<VarianceLine> = sqlx::query_as::<_, CountItemRow>(&format!(
            "{SELECT_ITEM} WHERE i.count_id = $1 ORDER BY p.name"
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?
        .iter()
        .map(CountItemRow::variance_line)
        .collect();

        Ok(VarianceReport {
            count_id: count.id,
            count_name: count.name,
            location_id: count.location_id,
            location_name: count.location_name,
            status: count.status,
            summary: VarianceSummary::from_lines(&lines),
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item_row(expected: Decimal, counted: Option<Decimal>, is_counted: bool) -> CountItemRow {
        CountItemRow {
            id: Uuid::new_v4(),
            count_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Campari".to_string(),
            sku: String::new(),
            unit_price: dec!(24.00),
            expected_quantity: expected,
            counted_quantity: counted,
            is_counted,
            counted_by: None,
            counted_at: None,
            notes: String::new(),
        }
    }

    #[test]
    fn test_count_item_variance() {
        let item = CountItem::from(item_row(dec!(10), Some(dec!(8.5)), true));
        assert_eq!(item.variance, Some(dec!(-1.5)));
        assert_eq!(item.variance_percentage, Some(dec!(-15.00)));
    }

    #[test]
    fn test_uncounted_item_has_no_variance() {
        let item = CountItem::from(item_row(dec!(10), Some(dec!(8.5)), false));
        assert_eq!(item.variance, None);

        let line = item_row(dec!(10), None, false).variance_line();
        assert_eq!(line.value_impact, None);
        assert_eq!(line.sku, None);
    }

    #[test]
    fn test_variance_line_value_impact() {
        let line = item_row(dec!(4), Some(dec!(6)), true).variance_line();
        assert_eq!(line.variance, Some(dec!(2)));
        assert_eq!(line.value_impact, Some(dec!(48.00)));
    }

    #[test]
    fn test_closed_counts_reject_changes() {
        assert!(ensure_open(CountStatus::InProgress).is_ok());
        assert!(matches!(
            ensure_open(CountStatus::Completed),
            Err(AppError::InvalidStateTransition(_))
        ));
    }
}
