//! Inventory transactions and the database side of stock mutation
//!
//! Completing a transaction locks every touched `inventory_items` row with
//! `SELECT ... FOR UPDATE` in sorted key order, runs the shared stock engine
//! on the locked quantities and writes the results back, all inside the
//! caller's database transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{permissions, Access, AuthUser};
use shared::{
    apply_transaction, line_total_value, prepare_lines, touched_keys, validate_non_negative,
    validate_not_future,
    AppliedTransaction, PaginatedResponse, Pagination, StockKey, StockLine, TransactionStatus,
    TransactionType,
};

#[derive(Clone)]
pub struct TransactionService {
    db: PgPool,
}

/// Transaction header with line aggregates
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub transaction_date: NaiveDate,
    pub reference: String,
    pub notes: String,
    pub performed_by: Option<Uuid>,
    pub performed_by_username: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub item_count: i64,
    pub total_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct TransactionItemRow {
    id: Uuid,
    line_number: i32,
    product_id: Uuid,
    product_name: String,
    location_id: Uuid,
    location_name: String,
    destination_location_id: Option<Uuid>,
    destination_location_name: Option<String>,
    quantity: Decimal,
    unit_price: Decimal,
    notes: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionItem {
    pub id: Uuid,
    pub line_number: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub destination_location_id: Option<Uuid>,
    pub destination_location_name: Option<String>,
    /// Signed delta applied at `location_id`
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_value: Decimal,
    pub notes: String,
}

impl From<TransactionItemRow> for TransactionItem {
    fn from(row: TransactionItemRow) -> Self {
        Self {
            total_value: line_total_value(row.quantity, row.unit_price),
            id: row.id,
            line_number: row.line_number,
            product_id: row.product_id,
            product_name: row.product_name,
            location_id: row.location_id,
            location_name: row.location_name,
            destination_location_id: row.destination_location_id,
            destination_location_name: row.destination_location_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            notes: row.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryTransaction {
    #[serde(flatten)]
    pub summary: TransactionSummary,
    pub items: Vec<TransactionItem>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransactionItemInput {
    pub product_id: Uuid,
    /// Source location for transfers
    pub location_id: Uuid,
    pub destination_location_id: Option<Uuid>,
    pub quantity: Decimal,
    /// Defaults to the product's unit price
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransactionInput {
    pub transaction_type: TransactionType,
    /// `completed` (default) applies stock immediately, `pending` defers it
    pub status: Option<TransactionStatus>,
    pub transaction_date: Option<NaiveDate>,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub notes: String,
    pub items: Vec<TransactionItemInput>,
}

/// Edits allowed while a transaction is pending
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTransactionInput {
    pub transaction_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Replaces every line when present
    pub items: Option<Vec<TransactionItemInput>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub product_id: Option<Uuid>,
    /// Matches source or destination location
    pub location_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches reference and notes
    pub search: Option<String>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// One stored line of a transaction about to be recorded
#[derive(Debug, Clone)]
pub struct NewTransactionItem {
    pub line: StockLine,
    pub unit_price: Decimal,
    pub notes: String,
}

/// A transaction about to be recorded, by the API or by another workflow
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub transaction_date: NaiveDate,
    pub reference: String,
    pub notes: String,
    pub performed_by: Option<Uuid>,
    pub items: Vec<NewTransactionItem>,
}

const SELECT_SUMMARY: &str = r#"
    SELECT t.id, t.transaction_type, t.status, t.transaction_date, t.reference, t.notes,
           t.performed_by, u.username AS performed_by_username, t.completed_at,
           (SELECT COUNT(*) FROM inventory_transaction_items i WHERE i.transaction_id = t.id)
               AS item_count,
           (SELECT COALESCE(SUM(ABS(i.quantity) * i.unit_price), 0)
              FROM inventory_transaction_items i WHERE i.transaction_id = t.id) AS total_value,
           t.created_at, t.updated_at
    FROM inventory_transactions t
    LEFT JOIN users u ON u.id = t.performed_by
"#;

/// Accepted `ordering` fields and the expressions they sort by
const TRANSACTION_ORDERING: &[(&str, &str)] = &[
    ("transaction_date", "t.transaction_date"),
    ("transaction_type", "t.transaction_type"),
    ("status", "t.status"),
    ("reference", "t.reference"),
    ("created_at", "t.created_at"),
    ("completed_at", "t.completed_at"),
];

/// Lock the given balances, creating zero rows for pairs never stocked
///
/// Keys must be sorted so concurrent writers always lock in the same order.
pub(crate) async fn lock_balances(
    conn: &mut PgConnection,
    keys: &[StockKey],
) -> AppResult<HashMap<StockKey, Decimal>> {
    for key in keys {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (product_id, location_id, quantity)
            VALUES ($1, $2, 0)
            ON CONFLICT (product_id, location_id) DO NOTHING
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .execute(&mut *conn)
        .await?;
    }

    let mut balances = HashMap::with_capacity(keys.len());
    for key in keys {
        let quantity = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT quantity FROM inventory_items
            WHERE product_id = $1 AND location_id = $2
            FOR UPDATE
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .fetch_one(&mut *conn)
        .await?;
        balances.insert(*key, quantity);
    }
    Ok(balances)
}

/// Lock, apply and write back stock for prepared lines
///
/// Must run inside an open database transaction; the locks are held until it
/// commits, and dropping it without commit rolls every write back.
pub(crate) async fn apply_stock(
    conn: &mut PgConnection,
    transaction_type: TransactionType,
    lines: &[StockLine],
) -> AppResult<AppliedTransaction> {
    let keys = touched_keys(transaction_type, lines);
    let mut balances = lock_balances(conn, &keys).await?;

    let applied = apply_transaction(&mut balances, transaction_type, lines)?;

    for (key, quantity) in &applied.balances {
        sqlx::query(
            r#"
            UPDATE inventory_items SET quantity = $1
            WHERE product_id = $2 AND location_id = $3
            "#,
        )
        .bind(quantity)
        .bind(key.product_id)
        .bind(key.location_id)
        .execute(&mut *conn)
        .await?;
    }

    tracing::info!(
        transaction_type = %transaction_type,
        movements = applied.movements.len(),
        "Stock updated"
    );

    Ok(applied)
}

/// Check the initial status and bring every line to its stored sign
fn prepare_new(new: &NewTransaction) -> AppResult<Vec<StockLine>> {
    if !matches!(
        new.status,
        TransactionStatus::Pending | TransactionStatus::Completed
    ) {
        return Err(AppError::validation(
            "status",
            "New transactions must be pending or completed",
        ));
    }
    let raw: Vec<StockLine> = new.items.iter().map(|item| item.line).collect();
    Ok(prepare_lines(new.transaction_type, &raw)?)
}

/// Insert a transaction with its lines; completed ones move stock immediately
pub(crate) async fn record_transaction(
    conn: &mut PgConnection,
    new: NewTransaction,
) -> AppResult<Uuid> {
    let lines = prepare_new(&new)?;

    let completed_at = (new.status == TransactionStatus::Completed).then(Utc::now);

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO inventory_transactions (transaction_type, status, transaction_date,
                                            reference, notes, performed_by, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(new.transaction_type)
    .bind(new.status)
    .bind(new.transaction_date)
    .bind(&new.reference)
    .bind(&new.notes)
    .bind(new.performed_by)
    .bind(completed_at)
    .fetch_one(&mut *conn)
    .await?;

    insert_items(conn, id, &lines, &new.items).await?;

    if new.status == TransactionStatus::Completed {
        apply_stock(conn, new.transaction_type, &lines).await?;
    }

    tracing::info!(
        transaction_id = %id,
        transaction_type = %new.transaction_type,
        status = new.status.as_str(),
        lines = lines.len(),
        "Inventory transaction recorded"
    );

    Ok(id)
}

async fn insert_items(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    lines: &[StockLine],
    items: &[NewTransactionItem],
) -> AppResult<()> {
    for (idx, (line, item)) in lines.iter().zip(items).enumerate() {
        sqlx::query(
            r#"
            INSERT INTO inventory_transaction_items (transaction_id, line_number, product_id,
                location_id, destination_location_id, quantity, unit_price, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(transaction_id)
        .bind(idx as i32 + 1)
        .bind(line.product_id)
        .bind(line.location_id)
        .bind(line.destination_location_id)
        .bind(line.quantity)
        .bind(item.unit_price)
        .bind(&item.notes)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl TransactionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_transaction(
        &self,
        user: &AuthUser,
        input: CreateTransactionInput,
    ) -> AppResult<InventoryTransaction> {
        let today = Utc::now().date_naive();
        let transaction_date = input.transaction_date.unwrap_or(today);
        validate_not_future(transaction_date, today)
            .map_err(|m| AppError::validation("transaction_date", m))?;

        let mut tx = self.db.begin().await?;
        let items = resolve_items(&mut tx, &input.items).await?;

        let id = record_transaction(
            &mut tx,
            NewTransaction {
                transaction_type: input.transaction_type,
                status: input.status.unwrap_or_default(),
                transaction_date,
                reference: input.reference,
                notes: input.notes,
                performed_by: Some(user.user_id),
                items,
            },
        )
        .await?;

        tx.commit().await?;

        self.get_transaction(id).await
    }

    pub async fn get_transaction(&self, id: Uuid) -> AppResult<InventoryTransaction> {
        let summary = self.get_summary(id).await?;

        let items = sqlx::query_as::<_, TransactionItemRow>(
            r#"
            SELECT i.id, i.line_number, i.product_id, p.name AS product_name,
                   i.location_id, l.name AS location_name,
                   i.destination_location_id, d.name AS destination_location_name,
                   i.quantity, i.unit_price, i.notes
            FROM inventory_transaction_items i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            LEFT JOIN locations d ON d.id = i.destination_location_id
            WHERE i.transaction_id = $1
            ORDER BY i.line_number
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(TransactionItem::from)
        .collect();

        Ok(InventoryTransaction { summary, items })
    }

    async fn get_summary(&self, id: Uuid) -> AppResult<TransactionSummary> {
        sqlx::query_as::<_, TransactionSummary>(&format!("{SELECT_SUMMARY} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory transaction".to_string()))
    }

    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> AppResult<PaginatedResponse<TransactionSummary>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(
            filter.ordering.as_deref(),
            TRANSACTION_ORDERING,
            "t.transaction_date DESC, t.created_at DESC, t.id",
        )?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::inventory_transaction_type IS NULL OR t.transaction_type = $1)
              AND ($2::inventory_transaction_status IS NULL OR t.status = $2)
              AND ($3::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM inventory_transaction_items i
                    WHERE i.transaction_id = t.id AND i.product_id = $3))
              AND ($4::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM inventory_transaction_items i
                    WHERE i.transaction_id = t.id
                      AND (i.location_id = $4 OR i.destination_location_id = $4)))
              AND ($5::uuid IS NULL OR t.performed_by = $5)
              AND ($6::date IS NULL OR t.transaction_date >= $6)
              AND ($7::date IS NULL OR t.transaction_date <= $7)
              AND ($8::text IS NULL OR t.reference ILIKE $8 OR t.notes ILIKE $8)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM inventory_transactions t {WHERE}"
        ))
        .bind(filter.transaction_type)
        .bind(filter.status)
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.performed_by)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let transactions = sqlx::query_as::<_, TransactionSummary>(&format!(
            r#"
            {SELECT_SUMMARY} {WHERE}
            {order_by}
            LIMIT $9 OFFSET $10
            "#
        ))
        .bind(filter.transaction_type)
        .bind(filter.status)
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.performed_by)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(transactions, pagination, total as u64))
    }

    /// Pending transactions only; completed ones never change
    pub async fn update_transaction(
        &self,
        user: &AuthUser,
        id: Uuid,
        input: UpdateTransactionInput,
    ) -> AppResult<InventoryTransaction> {
        let mut tx = self.db.begin().await?;
        let (transaction_type, status, performed_by) = lock_header(&mut tx, id).await?;
        permissions::owner_or_staff_or_read_only(user, Access::Update, performed_by)?;
        if !status.is_mutable() {
            return Err(AppError::InvalidStateTransition(format!(
                "A {} transaction cannot be modified",
                status.as_str()
            )));
        }

        if let Some(date) = input.transaction_date {
            validate_not_future(date, Utc::now().date_naive())
                .map_err(|m| AppError::validation("transaction_date", m))?;
        }

        sqlx::query(
            r#"
            UPDATE inventory_transactions
            SET transaction_date = COALESCE($1, transaction_date),
                reference = COALESCE($2, reference),
                notes = COALESCE($3, notes)
            WHERE id = $4
            "#,
        )
        .bind(input.transaction_date)
        .bind(&input.reference)
        .bind(&input.notes)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(inputs) = input.items {
            let items = resolve_items(&mut tx, &inputs).await?;
            let raw: Vec<StockLine> = items.iter().map(|item| item.line).collect();
            let lines = prepare_lines(transaction_type, &raw)?;

            sqlx::query("DELETE FROM inventory_transaction_items WHERE transaction_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_items(&mut tx, id, &lines, &items).await?;
        }

        tx.commit().await?;
        self.get_transaction(id).await
    }

    /// pending -> completed, moving stock in the same database transaction
    pub async fn complete_transaction(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> AppResult<InventoryTransaction> {
        let mut tx = self.db.begin().await?;
        let (transaction_type, status, performed_by) = lock_header(&mut tx, id).await?;
        permissions::owner_or_staff_or_read_only(user, Access::Write, performed_by)?;
        if !status.can_transition_to(TransactionStatus::Completed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot complete a {} transaction",
                status.as_str()
            )));
        }

        let lines = load_lines(&mut tx, id).await?;
        apply_stock(&mut tx, transaction_type, &lines).await?;

        sqlx::query(
            "UPDATE inventory_transactions SET status = 'completed', completed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(transaction_id = %id, "Inventory transaction completed");
        self.get_transaction(id).await
    }

    /// pending -> cancelled; stock is untouched
    pub async fn cancel_transaction(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> AppResult<InventoryTransaction> {
        let mut tx = self.db.begin().await?;
        let (_, status, performed_by) = lock_header(&mut tx, id).await?;
        permissions::owner_or_staff_or_read_only(user, Access::Write, performed_by)?;
        if !status.can_transition_to(TransactionStatus::Cancelled) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot cancel a {} transaction",
                status.as_str()
            )));
        }

        sqlx::query("UPDATE inventory_transactions SET status = 'cancelled' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(transaction_id = %id, "Inventory transaction cancelled");
        self.get_transaction(id).await
    }

    pub async fn delete_transaction(&self, user: &AuthUser, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let (_, status, performed_by) = lock_header(&mut tx, id).await?;
        permissions::owner_or_staff_or_read_only(user, Access::Write, performed_by)?;
        if status == TransactionStatus::Completed {
            return Err(AppError::InvalidStateTransition(
                "Completed transactions cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM inventory_transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Reject a location id with no matching row
pub(crate) async fn ensure_location(
    conn: &mut PgConnection,
    location_id: Uuid,
    field: &str,
) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM locations WHERE id = $1)")
            .bind(location_id)
            .fetch_one(&mut *conn)
            .await?;
    if exists {
        Ok(())
    } else {
        Err(missing_location(field.to_string()))
    }
}

/// Lock a transaction header for a state change
async fn lock_header(
    conn: &mut PgConnection,
    id: Uuid,
) -> AppResult<(TransactionType, TransactionStatus, Option<Uuid>)> {
    sqlx::query_as::<_, (TransactionType, TransactionStatus, Option<Uuid>)>(
        r#"
        SELECT transaction_type, status, performed_by
        FROM inventory_transactions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory transaction".to_string()))
}

async fn load_lines(conn: &mut PgConnection, id: Uuid) -> AppResult<Vec<StockLine>> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Option<Uuid>, Decimal)>(
        r#"
        SELECT product_id, location_id, destination_location_id, quantity
        FROM inventory_transaction_items
        WHERE transaction_id = $1
        ORDER BY line_number
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(product_id, location_id, destination_location_id, quantity)| StockLine {
                product_id,
                location_id,
                destination_location_id,
                quantity,
            },
        )
        .collect())
}

/// Check referenced products and locations exist and fill in default prices
async fn resolve_items(
    conn: &mut PgConnection,
    inputs: &[TransactionItemInput],
) -> AppResult<Vec<NewTransactionItem>> {
    let product_ids: Vec<Uuid> = inputs.iter().map(|i| i.product_id).collect();
    let prices: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT id, unit_price FROM products WHERE id = ANY($1)",
    )
    .bind(&product_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let location_ids: Vec<Uuid> = inputs
        .iter()
        .flat_map(|i| std::iter::once(i.location_id).chain(i.destination_location_id))
        .collect();
    let known_locations: HashSet<Uuid> =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM locations WHERE id = ANY($1)")
            .bind(&location_ids)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();

    build_items(inputs, &prices, &known_locations)
}

fn missing_location(field: String) -> AppError {
    AppError::validation(field, "Location does not exist")
}

/// Lines for the given inputs, using the product's price when none is given
fn build_items(
    inputs: &[TransactionItemInput],
    prices: &HashMap<Uuid, Decimal>,
    known_locations: &HashSet<Uuid>,
) -> AppResult<Vec<NewTransactionItem>> {
    inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| {
            let price = prices.get(&input.product_id).ok_or_else(|| {
                AppError::validation(format!("items[{}].product_id", idx), "Product does not exist")
            })?;
            if !known_locations.contains(&input.location_id) {
                return Err(missing_location(format!("items[{}].location_id", idx)));
            }
            if let Some(dest) = input.destination_location_id {
                if !known_locations.contains(&dest) {
                    return Err(missing_location(format!(
                        "items[{}].destination_location_id",
                        idx
                    )));
                }
            }
            let unit_price = input.unit_price.unwrap_or(*price);
            validate_non_negative(unit_price)
                .map_err(|m| AppError::validation(format!("items[{}].unit_price", idx), m))?;
            Ok(NewTransactionItem {
                line: StockLine {
                    product_id: input.product_id,
                    location_id: input.location_id,
                    destination_location_id: input.destination_location_id,
                    quantity: input.quantity,
                },
                unit_price,
                notes: input.notes.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn field_of(err: AppError) -> String {
        match err {
            AppError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    fn input(product_id: Uuid, location_id: Uuid, quantity: Decimal) -> TransactionItemInput {
        TransactionItemInput {
            product_id,
            location_id,
            destination_location_id: None,
            quantity,
            unit_price: None,
            notes: String::new(),
        }
    }

    fn new_transaction(status: TransactionStatus) -> NewTransaction {
        NewTransaction {
            transaction_type: TransactionType::Usage,
            status,
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            reference: String::new(),
            notes: String::new(),
            performed_by: None,
            items: vec![NewTransactionItem {
                line: StockLine {
                    product_id: Uuid::new_v4(),
                    location_id: Uuid::new_v4(),
                    destination_location_id: None,
                    quantity: dec!(2),
                },
                unit_price: dec!(1.50),
                notes: String::new(),
            }],
        }
    }

    #[test]
    fn test_item_total_value_ignores_sign() {
        let row = TransactionItemRow {
            id: Uuid::new_v4(),
            line_number: 1,
            product_id: Uuid::new_v4(),
            product_name: "Gin".to_string(),
            location_id: Uuid::new_v4(),
            location_name: "Main Bar".to_string(),
            destination_location_id: None,
            destination_location_name: None,
            quantity: dec!(-3.5),
            unit_price: dec!(20.00),
            notes: String::new(),
        };
        let item = TransactionItem::from(row);
        assert_eq!(item.quantity, dec!(-3.5));
        assert_eq!(item.total_value, dec!(70.00));
    }

    #[test]
    fn test_build_items_defaults_price_and_reports_unknown_ids() {
        let gin = Uuid::new_v4();
        let bar = Uuid::new_v4();
        let prices = HashMap::from([(gin, dec!(25.00))]);
        let locations = HashSet::from([bar]);

        let items = build_items(&[input(gin, bar, dec!(2))], &prices, &locations).unwrap();
        assert_eq!(items[0].unit_price, dec!(25.00));
        assert_eq!(items[0].line.quantity, dec!(2));

        let unknown_product = input(Uuid::new_v4(), bar, dec!(1));
        let err = build_items(&[input(gin, bar, dec!(1)), unknown_product], &prices, &locations)
            .unwrap_err();
        assert_eq!(field_of(err), "items[1].product_id");

        let err = build_items(&[input(gin, Uuid::new_v4(), dec!(1))], &prices, &locations)
            .unwrap_err();
        assert_eq!(field_of(err), "items[0].location_id");

        let mut transfer = input(gin, bar, dec!(1));
        transfer.destination_location_id = Some(Uuid::new_v4());
        let err = build_items(&[transfer], &prices, &locations).unwrap_err();
        assert_eq!(field_of(err), "items[0].destination_location_id");
    }

    #[test]
    fn test_build_items_rejects_bad_unit_prices() {
        let gin = Uuid::new_v4();
        let bar = Uuid::new_v4();
        let prices = HashMap::from([(gin, dec!(25.00))]);
        let locations = HashSet::from([bar]);

        for price in [dec!(-1), dec!(0.005)] {
            let mut line = input(gin, bar, dec!(1));
            line.unit_price = Some(price);
            let err = build_items(&[line], &prices, &locations).unwrap_err();
            assert_eq!(field_of(err), "items[0].unit_price");
        }
    }

    #[test]
    fn test_new_transactions_start_pending_or_completed() {
        assert!(prepare_new(&new_transaction(TransactionStatus::Pending)).is_ok());
        assert!(prepare_new(&new_transaction(TransactionStatus::Completed)).is_ok());
        let err = prepare_new(&new_transaction(TransactionStatus::Cancelled)).unwrap_err();
        assert_eq!(field_of(err), "status");
    }

    #[test]
    fn test_missing_location_is_a_field_error() {
        let err = missing_location("location_id".to_string());
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(field_of(err), "location_id");
    }

    #[test]
    fn test_request_body_becomes_stored_lines() {
        let gin = Uuid::new_v4();
        let cellar = Uuid::new_v4();
        let bar = Uuid::new_v4();
        let body = serde_json::json!({
            "transaction_type": "usage",
            "items": [
                { "product_id": gin, "location_id": bar, "quantity": "1.25" },
                { "product_id": gin, "location_id": cellar, "quantity": "-2", "unit_price": "30.00" }
            ]
        });
        let input: CreateTransactionInput = serde_json::from_value(body).unwrap();
        assert_eq!(input.status, None);

        let prices = HashMap::from([(gin, dec!(28.00))]);
        let locations = HashSet::from([cellar, bar]);
        let items = build_items(&input.items, &prices, &locations).unwrap();
        let new = NewTransaction {
            transaction_type: input.transaction_type,
            status: input.status.unwrap_or_default(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            reference: input.reference,
            notes: input.notes,
            performed_by: None,
            items,
        };
        let lines = prepare_new(&new).unwrap();

        // usage is stored as a decrease whatever sign the client sent
        assert_eq!(lines[0].quantity, dec!(-1.25));
        assert_eq!(lines[0].location_id, bar);
        assert_eq!(lines[1].quantity, dec!(-2));
        assert_eq!(new.items[0].unit_price, dec!(28.00));
        assert_eq!(new.items[1].unit_price, dec!(30.00));
    }
}
