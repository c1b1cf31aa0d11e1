//! Purchase orders to suppliers
//!
//! Receiving an order posts a completed purchase transaction, so stock and
//! the order's received quantities change in one database transaction.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::transactions::{
    ensure_location, record_transaction, NewTransaction, NewTransactionItem,
};
use crate::error::{AppError, AppResult};
use crate::middleware::{permissions, Access, AuthUser};
use shared::{
    generate_order_number, line_total_price, validate_non_negative, validate_positive,
    OrderSchedule, OrderStatus, OrderTotals, PaginatedResponse, Pagination, ReceivingStatus,
    StockLine, TransactionStatus, TransactionType,
};

#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    supplier_id: Uuid,
    supplier_name: String,
    status: OrderStatus,
    order_date: Option<NaiveDate>,
    expected_delivery_date: Option<NaiveDate>,
    actual_delivery_date: Option<NaiveDate>,
    shipping_cost: Decimal,
    tax: Decimal,
    discount: Decimal,
    notes: String,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
    receipt_transaction_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    sku: String,
    quantity: Decimal,
    unit_price: Decimal,
    received_quantity: Decimal,
    notes: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub received_quantity: Decimal,
    pub receiving_status: ReceivingStatus,
    pub notes: String,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            total_price: line_total_price(row.quantity, row.unit_price),
            receiving_status: ReceivingStatus::from_quantities(row.quantity, row.received_quantity),
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            quantity: row.quantity,
            unit_price: row.unit_price,
            received_quantity: row.received_quantity,
            notes: row.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub status: OrderStatus,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub totals: OrderTotals,
    pub notes: String,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub receipt_transaction_id: Option<Uuid>,
    pub is_active: bool,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    fn assemble(row: OrderRow, items: Vec<OrderItem>) -> Self {
        let totals = OrderTotals::calculate(
            items.iter().map(|item| (item.quantity, item.unit_price)),
            row.shipping_cost,
            row.tax,
            row.discount,
        );
        Self {
            id: row.id,
            order_number: row.order_number,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            status: row.status,
            order_date: row.order_date,
            expected_delivery_date: row.expected_delivery_date,
            actual_delivery_date: row.actual_delivery_date,
            totals,
            notes: row.notes,
            created_by: row.created_by,
            updated_by: row.updated_by,
            receipt_transaction_id: row.receipt_transaction_id,
            is_active: row.is_active,
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    /// Defaults to the product's unit price
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderInput {
    pub supplier_id: Uuid,
    /// `draft` (default) or `pending`
    pub status: Option<OrderStatus>,
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
}

/// Header edits; status changes go through the place, receive and cancel actions
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderInput {
    pub supplier_id: Option<Uuid>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub shipping_cost: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderItemInput {
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReceivedItemInput {
    pub order_item_id: Uuid,
    pub received_quantity: Decimal,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReceiveOrderInput {
    /// Defaults to the first active storage location
    pub location_id: Option<Uuid>,
    /// Items left out are received in full
    #[serde(default)]
    pub items: Vec<ReceivedItemInput>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub supplier_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches order number, supplier name and notes
    pub search: Option<String>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

const SELECT_ORDER: &str = r#"
    SELECT o.id, o.order_number, o.supplier_id, s.name AS supplier_name, o.status,
           o.order_date, o.expected_delivery_date, o.actual_delivery_date,
           o.shipping_cost, o.tax, o.discount, o.notes, o.created_by, o.updated_by,
           o.receipt_transaction_id, o.is_active, o.created_at, o.updated_at
    FROM orders o
    JOIN suppliers s ON s.id = o.supplier_id
"#;

const SELECT_ITEM: &str = r#"
    SELECT i.id, i.order_id, i.product_id, p.name AS product_name, p.sku,
           i.quantity, i.unit_price, i.received_quantity, i.notes
    FROM order_items i
    JOIN products p ON p.id = i.product_id
"#;

#[derive(Debug, FromRow)]
struct OrderHeader {
    status: OrderStatus,
    order_number: String,
    order_date: Option<NaiveDate>,
    expected_delivery_date: Option<NaiveDate>,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
}

async fn lock_order(conn: &mut PgConnection, id: Uuid) -> AppResult<OrderHeader> {
    sqlx::query_as::<_, OrderHeader>(
        r#"
        SELECT status, order_number, order_date, expected_delivery_date, created_by, updated_by
        FROM orders
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

fn check_money(field: &str, value: Decimal) -> AppResult<()> {
    validate_non_negative(value).map_err(|m| AppError::validation(field, m))
}

fn check_schedule(schedule: OrderSchedule) -> AppResult<()> {
    schedule
        .validate(Utc::now().date_naive())
        .map_err(|e| AppError::validation(e.field, e.message))
}

fn ensure_items_editable(status: OrderStatus) -> AppResult<()> {
    if status.items_editable() {
        Ok(())
    } else {
        Err(AppError::InvalidStateTransition(format!(
            "Items of a {} order cannot be changed",
            status.as_str()
        )))
    }
}

async fn product_price(conn: &mut PgConnection, product_id: Uuid) -> AppResult<Decimal> {
    sqlx::query_scalar::<_, Decimal>("SELECT unit_price FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::validation("product_id", "Product does not exist"))
}

async fn insert_item(
    conn: &mut PgConnection,
    order_id: Uuid,
    field_prefix: &str,
    input: &OrderItemInput,
) -> AppResult<Uuid> {
    validate_positive(input.quantity)
        .map_err(|m| AppError::validation(format!("{field_prefix}quantity"), m))?;
    let unit_price = match input.unit_price {
        Some(price) => price,
        None => product_price(conn, input.product_id).await?,
    };
    check_money(&format!("{field_prefix}unit_price"), unit_price)?;

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO order_items (order_id, product_id, quantity, unit_price, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(order_id)
    .bind(input.product_id)
    .bind(input.quantity)
    .bind(unit_price)
    .bind(&input.notes)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Received quantity per order line; lines not listed arrive in full
fn received_quantities(
    lines: &[(Uuid, Uuid, Decimal, Decimal)],
    received: &[ReceivedItemInput],
) -> AppResult<Vec<Decimal>> {
    let overrides: HashMap<Uuid, Decimal> = received
        .iter()
        .map(|r| (r.order_item_id, r.received_quantity))
        .collect();

    for (idx, r) in received.iter().enumerate() {
        if !lines.iter().any(|(id, ..)| *id == r.order_item_id) {
            return Err(AppError::validation(
                format!("items[{}].order_item_id", idx),
                "Item does not belong to this order",
            ));
        }
        validate_non_negative(r.received_quantity).map_err(|m| {
            AppError::validation(format!("items[{}].received_quantity", idx), m)
        })?;
    }

    Ok(lines
        .iter()
        .map(|(id, _, ordered, _)| overrides.get(id).copied().unwrap_or(*ordered))
        .collect())
}

/// Accepted `ordering` fields and the expressions they sort by
const ORDER_ORDERING: &[(&str, &str)] = &[
    ("order_number", "o.order_number"),
    ("order_date", "o.order_date"),
    ("expected_delivery_date", "o.expected_delivery_date"),
    ("status", "o.status"),
    ("created_at", "o.created_at"),
];

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_order(&self, user: &AuthUser, input: CreateOrderInput) -> AppResult<Order> {
        let status = input.status.unwrap_or_default();
        if !matches!(status, OrderStatus::Draft | OrderStatus::Pending) {
            return Err(AppError::validation(
                "status",
                "New orders must be draft or pending",
            ));
        }
        check_money("shipping_cost", input.shipping_cost)?;
        check_money("tax", input.tax)?;
        check_money("discount", input.discount)?;
        check_schedule(OrderSchedule {
            status,
            order_date: None,
            expected_delivery_date: input.expected_delivery_date,
            actual_delivery_date: None,
        })?;

        let mut tx = self.db.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (order_number, supplier_id, status, expected_delivery_date,
                                shipping_cost, tax, discount, notes, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id
            "#,
        )
        .bind(generate_order_number())
        .bind(input.supplier_id)
        .bind(status)
        .bind(input.expected_delivery_date)
        .bind(input.shipping_cost)
        .bind(input.tax)
        .bind(input.discount)
        .bind(&input.notes)
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        for (idx, item) in input.items.iter().enumerate() {
            insert_item(&mut tx, id, &format!("items[{}].", idx), item).await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %id, items = input.items.len(), "Order created");
        self.get_order(id).await
    }

    pub async fn get_order(&self, id: Uuid) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "{SELECT_ITEM} WHERE i.order_id = $1 ORDER BY p.name"
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

        Ok(Order::assemble(row, items))
    }

    pub async fn list_orders(&self, filter: OrderFilter) -> AppResult<PaginatedResponse<Order>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), ORDER_ORDERING, "o.created_at DESC, o.id")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::order_status IS NULL OR o.status = $1)
              AND ($2::uuid IS NULL OR o.supplier_id = $2)
              AND ($3::uuid IS NULL OR o.created_by = $3)
              AND ($4::date IS NULL OR o.order_date >= $4)
              AND ($5::date IS NULL OR o.order_date <= $5)
              AND ($6::text IS NULL OR o.order_number ILIKE $6 OR s.name ILIKE $6
                   OR o.notes ILIKE $6)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM orders o JOIN suppliers s ON s.id = o.supplier_id {WHERE}"
        ))
        .bind(filter.status)
        .bind(filter.supplier_id)
        .bind(filter.created_by)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} {WHERE} {order_by} LIMIT $7 OFFSET $8"
        ))
        .bind(filter.status)
        .bind(filter.supplier_id)
        .bind(filter.created_by)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in sqlx::query_as::<_, OrderItemRow>(&format!(
            "{SELECT_ITEM} WHERE i.order_id = ANY($1) ORDER BY p.name"
        ))
        .bind(&ids)
        .fetch_all(&self.db)
        .await?
        {
            items_by_order
                .entry(row.order_id)
                .or_default()
                .push(OrderItem::from(row));
        }

        let orders = rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                Order::assemble(row, items)
            })
            .collect();

        Ok(PaginatedResponse::new(orders, pagination, total as u64))
    }

    pub async fn update_order(
        &self,
        user: &AuthUser,
        id: Uuid,
        input: UpdateOrderInput,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, id).await?;
        permissions::order_participant(
            user,
            Access::Update,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        if !header.status.is_editable() {
            return Err(AppError::InvalidStateTransition(format!(
                "A {} order cannot be modified",
                header.status.as_str()
            )));
        }

        for (field, value) in [
            ("shipping_cost", input.shipping_cost),
            ("tax", input.tax),
            ("discount", input.discount),
        ] {
            if let Some(value) = value {
                check_money(field, value)?;
            }
        }
        check_schedule(OrderSchedule {
            status: header.status,
            order_date: input.order_date.or(header.order_date),
            expected_delivery_date: input.expected_delivery_date.or(header.expected_delivery_date),
            actual_delivery_date: None,
        })?;

        sqlx::query(
            r#"
            UPDATE orders
            SET supplier_id = COALESCE($1, supplier_id),
                order_date = COALESCE($2, order_date),
                expected_delivery_date = COALESCE($3, expected_delivery_date),
                shipping_cost = COALESCE($4, shipping_cost),
                tax = COALESCE($5, tax),
                discount = COALESCE($6, discount),
                notes = COALESCE($7, notes),
                updated_by = $8
            WHERE id = $9
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.order_date)
        .bind(input.expected_delivery_date)
        .bind(input.shipping_cost)
        .bind(input.tax)
        .bind(input.discount)
        .bind(&input.notes)
        .bind(user.user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_order(id).await
    }

    pub async fn delete_order(&self, user: &AuthUser, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, id).await?;
        permissions::order_participant(
            user,
            Access::Write,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        if !header.status.items_editable() {
            return Err(AppError::InvalidStateTransition(format!(
                "A {} order cannot be deleted",
                header.status.as_str()
            )));
        }

        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn add_item(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        input: OrderItemInput,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, order_id).await?;
        permissions::order_participant(
            user,
            Access::Update,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        ensure_items_editable(header.status)?;

        insert_item(&mut tx, order_id, "", &input).await?;
        touch(&mut tx, order_id, user.user_id).await?;

        tx.commit().await?;
        self.get_order(order_id).await
    }

    pub async fn update_item(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        item_id: Uuid,
        input: UpdateOrderItemInput,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, order_id).await?;
        permissions::order_participant(
            user,
            Access::Update,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        ensure_items_editable(header.status)?;

        if let Some(quantity) = input.quantity {
            validate_positive(quantity).map_err(|m| AppError::validation("quantity", m))?;
        }
        if let Some(price) = input.unit_price {
            check_money("unit_price", price)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE order_items
            SET quantity = COALESCE($1, quantity),
                unit_price = COALESCE($2, unit_price),
                notes = COALESCE($3, notes)
            WHERE id = $4 AND order_id = $5
            "#,
        )
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(&input.notes)
        .bind(item_id)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Order item".to_string()));
        }
        touch(&mut tx, order_id, user.user_id).await?;

        tx.commit().await?;
        self.get_order(order_id).await
    }

    pub async fn remove_item(&self, user: &AuthUser, order_id: Uuid, item_id: Uuid) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, order_id).await?;
        permissions::order_participant(
            user,
            Access::Update,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        ensure_items_editable(header.status)?;

        let result = sqlx::query("DELETE FROM order_items WHERE id = $1 AND order_id = $2")
            .bind(item_id)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Order item".to_string()));
        }
        touch(&mut tx, order_id, user.user_id).await?;

        tx.commit().await?;
        self.get_order(order_id).await
    }

    /// draft/pending -> placed, dated today
    pub async fn place_order(&self, user: &AuthUser, id: Uuid) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, id).await?;
        permissions::order_participant(
            user,
            Access::Write,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        if !header.status.can_transition_to(OrderStatus::Placed) {
            return Err(AppError::InvalidStateTransition(
                "Only draft or pending orders can be placed".to_string(),
            ));
        }

        let item_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if item_count == 0 {
            return Err(AppError::validation("items", "An order needs at least one item"));
        }

        sqlx::query(
            r#"
            UPDATE orders
            SET status = 'placed', order_date = CURRENT_DATE, updated_by = $1
            WHERE id = $2
            "#,
        )
        .bind(user.user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, order_number = %header.order_number, "Order placed");
        self.get_order(id).await
    }

    /// placed -> received, moving the received quantities into stock
    pub async fn receive_order(
        &self,
        user: &AuthUser,
        id: Uuid,
        input: ReceiveOrderInput,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, id).await?;
        permissions::order_participant(
            user,
            Access::Write,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        if !header.status.can_transition_to(OrderStatus::Received) {
            return Err(AppError::InvalidStateTransition(
                "Only placed orders can be received".to_string(),
            ));
        }

        let location_id = match input.location_id {
            Some(location_id) => {
                ensure_location(&mut tx, location_id, "location_id").await?;
                location_id
            }
            None => sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM locations WHERE is_storage AND is_active ORDER BY name LIMIT 1",
            )
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::validation("location_id", "No active storage location to receive into")
            })?,
        };

        let lines = sqlx::query_as::<_, (Uuid, Uuid, Decimal, Decimal)>(
            r#"
            SELECT id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let received = received_quantities(&lines, &input.items)?;

        let mut items = Vec::new();
        for ((item_id, product_id, _, unit_price), quantity) in lines.iter().zip(&received) {
            sqlx::query("UPDATE order_items SET received_quantity = $1 WHERE id = $2")
                .bind(quantity)
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
            if !quantity.is_zero() {
                items.push(NewTransactionItem {
                    line: StockLine::new(*product_id, location_id, *quantity),
                    unit_price: *unit_price,
                    notes: String::new(),
                });
            }
        }

        let receipt_id = if items.is_empty() {
            None
        } else {
            Some(
                record_transaction(
                    &mut tx,
                    NewTransaction {
                        transaction_type: TransactionType::Purchase,
                        status: TransactionStatus::Completed,
                        transaction_date: Utc::now().date_naive(),
                        reference: header.order_number.clone(),
                        notes: format!("Received from order {}", header.order_number),
                        performed_by: Some(user.user_id),
                        items,
                    },
                )
                .await?,
            )
        };

        sqlx::query(
            r#"
            UPDATE orders
            SET status = 'received', actual_delivery_date = CURRENT_DATE,
                receipt_transaction_id = $1, updated_by = $2
            WHERE id = $3
            "#,
        )
        .bind(receipt_id)
        .bind(user.user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            order_number = %header.order_number,
            location_id = %location_id,
            "Order received"
        );
        self.get_order(id).await
    }

    /// Any open order -> cancelled
    pub async fn cancel_order(&self, user: &AuthUser, id: Uuid) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let header = lock_order(&mut tx, id).await?;
        permissions::order_participant(
            user,
            Access::Write,
            header.created_by,
            header.updated_by,
            header.status,
        )?;
        if !header.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot cancel a {} order",
                header.status.as_str()
            )));
        }

        sqlx::query("UPDATE orders SET status = 'cancelled', updated_by = $1 WHERE id = $2")
            .bind(user.user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, "Order cancelled");
        self.get_order(id).await
    }
}

async fn touch(conn: &mut PgConnection, order_id: Uuid, user_id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE orders SET updated_by = $1 WHERE id = $2")
        .bind(user_id)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
