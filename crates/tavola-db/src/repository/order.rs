//! # Order Repository
//!
//! Orders, their frozen items and the order number counter.
//!
//! ## Guarded Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every state change is a conditional UPDATE on the expected state:     │
//! │                                                                         │
//! │  transition_status   WHERE id = ? AND status = :from                   │
//! │  mark_paid           WHERE id = ? AND payment_status = 'UNPAID'        │
//! │                        AND status <> 'CANCELLED'                        │
//! │  mark_cancelled      WHERE id = ? AND status <> 'CANCELLED'            │
//! │                                                                         │
//! │  0 rows affected means another request got there first. A void that   │
//! │  loses this race never restores stock a second time.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Order Numbers
//! `order_sequences` holds one counter per (branch, prefix, business day).
//! `next_sequence` bumps it with a single upsert, so two concurrent orders
//! can never read the same value. `UNIQUE (branch_id, order_number)` is the
//! final backstop.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use tavola_core::input::PageRequest;
use tavola_core::{
    AttributeSelection, Financials, GuestInfo, Money, Order, OrderItem, OrderSource, OrderStatus,
    PaymentMethod, PaymentStatus,
};

const ORDER_COLUMNS: &str = "id, branch_id, order_number, order_source, status, payment_status,
    payment_method, table_id, guest_name, guest_whatsapp, guest_pax, notes,
    subtotal, discount, tax, service_charge, total, created_by,
    created_at, updated_at, completed_at";

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    branch_id: String,
    order_number: String,
    order_source: OrderSource,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: Option<PaymentMethod>,
    table_id: Option<String>,
    guest_name: Option<String>,
    guest_whatsapp: Option<String>,
    guest_pax: Option<i64>,
    notes: Option<String>,
    subtotal: Money,
    discount: Money,
    tax: Money,
    service_charge: Money,
    total: Money,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        let guest_info = match (self.guest_name, self.guest_whatsapp) {
            (Some(name), Some(whatsapp)) => Some(GuestInfo {
                name,
                whatsapp,
                pax: self.guest_pax.unwrap_or(1),
            }),
            _ => None,
        };

        Order {
            id: self.id,
            branch_id: self.branch_id,
            order_number: self.order_number,
            order_source: self.order_source,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            table_id: self.table_id,
            guest_info,
            notes: self.notes,
            items,
            financials: Financials {
                subtotal: self.subtotal,
                discount: self.discount,
                tax: self.tax,
                service_charge: self.service_charge,
                total: self.total,
            },
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    name: String,
    qty: i64,
    price_at_moment: Money,
    note: Option<String>,
    attributes: String,
}

impl OrderItemRow {
    fn into_item(self) -> DbResult<OrderItem> {
        let attributes: Vec<AttributeSelection> = serde_json::from_str(&self.attributes)?;
        Ok(OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            name: self.name,
            qty: self.qty,
            price_at_moment: self.price_at_moment,
            note: self.note,
            attributes,
        })
    }
}

// =============================================================================
// Query Parameters
// =============================================================================

/// Filters for [`OrderRepository::list`]. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// `None` lists every branch.
    pub branch_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub order_source: Option<OrderSource>,
    pub table_id: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Unit-of-work statements
    // =========================================================================

    /// Bumps and returns the counter for `(branch, prefix, day)`. First call
    /// of the day returns 1.
    pub async fn next_sequence(
        conn: &mut SqliteConnection,
        branch_id: &str,
        prefix: &str,
        business_day: &str,
    ) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO order_sequences (branch_id, prefix, business_day, last_value)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT (branch_id, prefix, business_day)
             DO UPDATE SET last_value = last_value + 1
             RETURNING last_value",
        )
        .bind(branch_id)
        .bind(prefix)
        .bind(business_day)
        .fetch_one(&mut *conn)
        .await?;

        debug!(branch_id = %branch_id, prefix = %prefix, business_day = %business_day, value, "Next order sequence");
        Ok(value)
    }

    /// Inserts the order row and its items.
    ///
    /// ## Arguments
    /// * `idempotency_key` - stored under `UNIQUE (branch_id, idempotency_key)`
    pub async fn insert(
        conn: &mut SqliteConnection,
        order: &Order,
        idempotency_key: Option<&str>,
    ) -> DbResult<()> {
        debug!(id = %order.id, order_number = %order.order_number, "Inserting order");

        let guest = order.guest_info.as_ref();
        sqlx::query(
            "INSERT INTO orders (
                id, branch_id, order_number, order_source, status, payment_status,
                payment_method, table_id, guest_name, guest_whatsapp, guest_pax, notes,
                subtotal, discount, tax, service_charge, total, created_by,
                idempotency_key, created_at, updated_at, completed_at
             ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18,
                ?19, ?20, ?21, ?22
             )",
        )
        .bind(&order.id)
        .bind(&order.branch_id)
        .bind(&order.order_number)
        .bind(order.order_source)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(&order.table_id)
        .bind(guest.map(|g| g.name.as_str()))
        .bind(guest.map(|g| g.whatsapp.as_str()))
        .bind(guest.map(|g| g.pax))
        .bind(&order.notes)
        .bind(order.financials.subtotal)
        .bind(order.financials.discount)
        .bind(order.financials.tax)
        .bind(order.financials.service_charge)
        .bind(order.financials.total)
        .bind(&order.created_by)
        .bind(idempotency_key)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.completed_at)
        .execute(&mut *conn)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            let attributes = serde_json::to_string(&item.attributes)?;
            sqlx::query(
                "INSERT INTO order_items (
                    id, order_id, position, product_id, name, qty, price_at_moment, note, attributes
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.qty)
            .bind(item.price_at_moment)
            .bind(&item.note)
            .bind(attributes)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Removes an order and its items. Compensation for a failed creation.
    pub async fn delete(conn: &mut SqliteConnection, order_id: &str) -> DbResult<bool> {
        debug!(id = %order_id, "Deleting order");

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Moves `from -> to`. Stamps `completed_at` when `to` is COMPLETED.
    ///
    /// ## Returns
    /// `false` if the order is no longer in `from`.
    pub async fn transition_status(
        conn: &mut SqliteConnection,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %order_id, from = %from, to = %to, "Transitioning order status");

        let completed_at = (to == OrderStatus::Completed).then_some(at);
        let result = sqlx::query(
            "UPDATE orders
             SET status = ?1, updated_at = ?2, completed_at = COALESCE(?3, completed_at)
             WHERE id = ?4 AND status = ?5",
        )
        .bind(to)
        .bind(at)
        .bind(completed_at)
        .bind(order_id)
        .bind(from)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// UNPAID -> PAID on a live order.
    pub async fn mark_paid(
        conn: &mut SqliteConnection,
        order_id: &str,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders
             SET payment_status = 'PAID', payment_method = ?1, updated_at = ?2
             WHERE id = ?3 AND payment_status = 'UNPAID' AND status <> 'CANCELLED'",
        )
        .bind(method)
        .bind(at)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Sets CANCELLED; PAID becomes REFUNDED.
    ///
    /// ## Returns
    /// `false` if the order was already cancelled.
    pub async fn mark_cancelled(
        conn: &mut SqliteConnection,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders
             SET status = 'CANCELLED',
                 payment_status = CASE WHEN payment_status = 'PAID' THEN 'REFUNDED' ELSE payment_status END,
                 updated_at = ?1
             WHERE id = ?2 AND status <> 'CANCELLED'",
        )
        .bind(at)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Loads one order with items on the given connection.
    pub async fn fetch(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, name, qty, price_at_moment, note, attributes
             FROM order_items WHERE order_id = ?1 ORDER BY position",
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(OrderItemRow::into_item)
        .collect::<DbResult<Vec<_>>>()?;

        Ok(Some(row.into_order(items)))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order with its items.
    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, order_id).await
    }

    /// Order previously created with `key` in `branch_id`, if any.
    pub async fn find_by_idempotency_key(
        &self,
        branch_id: &str,
        key: &str,
    ) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM orders WHERE branch_id = ?1 AND idempotency_key = ?2",
        )
        .bind(branch_id)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

        match id {
            Some(id) => Self::fetch(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// Most recent order carrying `order_number`, optionally within a branch.
    pub async fn find_by_number(
        &self,
        order_number: &str,
        branch_id: Option<&str>,
    ) -> DbResult<Option<Order>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM orders WHERE order_number = ");
        qb.push_bind(order_number);
        if let Some(branch_id) = branch_id {
            qb.push(" AND branch_id = ").push_bind(branch_id);
        }
        qb.push(" ORDER BY created_at DESC LIMIT 1");

        let mut conn = self.pool.acquire().await?;
        let id: Option<String> = qb
            .build_query_scalar::<String>()
            .fetch_optional(&mut *conn)
            .await?;

        match id {
            Some(id) => Self::fetch(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// Filtered, newest-first page of orders plus the total match count.
    pub async fn list(&self, query: &OrderQuery) -> DbResult<(Vec<Order>, i64)> {
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE 1 = 1");
        push_order_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));
        push_order_filters(&mut qb, query);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset());

        let rows = qb.build_query_as::<OrderRow>().fetch_all(&self.pool).await?;
        let orders = self.attach_items(rows).await?;

        Ok((orders, total))
    }

    /// CONFIRMED and COOKING orders, oldest first.
    pub async fn kitchen_queue(&self, branch_id: Option<&str>) -> DbResult<Vec<Order>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ('CONFIRMED', 'COOKING')"
        ));
        if let Some(branch_id) = branch_id {
            qb.push(" AND branch_id = ").push_bind(branch_id);
        }
        qb.push(" ORDER BY created_at ASC, rowid ASC");

        let rows = qb.build_query_as::<OrderRow>().fetch_all(&self.pool).await?;
        self.attach_items(rows).await
    }

    /// Order numbers of unpaid, non-cancelled orders seated at `table_id`.
    pub async fn unpaid_on_table(&self, table_id: &str) -> DbResult<Vec<String>> {
        let numbers: Vec<String> = sqlx::query_scalar(
            "SELECT order_number FROM orders
             WHERE table_id = ?1 AND payment_status = 'UNPAID' AND status <> 'CANCELLED'
             ORDER BY created_at",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(numbers)
    }

    /// Loads items for a batch of order rows with one query.
    async fn attach_items(&self, rows: Vec<OrderRow>) -> DbResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, order_id, product_id, name, qty, price_at_moment, note, attributes
             FROM order_items WHERE order_id IN (",
        );
        let mut separated = qb.separated(", ");
        for row in &rows {
            separated.push_bind(row.id.as_str());
        }
        separated.push_unseparated(") ORDER BY order_id, position");

        let item_rows = qb
            .build_query_as::<OrderItemRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for item_row in item_rows {
            let item = item_row.into_item()?;
            by_order.entry(item.order_id.clone()).or_default().push(item);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }
}

fn push_order_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, query: &'a OrderQuery) {
    if let Some(branch_id) = &query.branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id.as_str());
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(payment_status) = query.payment_status {
        qb.push(" AND payment_status = ").push_bind(payment_status);
    }
    if let Some(source) = query.order_source {
        qb.push(" AND order_source = ").push_bind(source);
    }
    if let Some(table_id) = &query.table_id {
        qb.push(" AND table_id = ").push_bind(table_id.as_str());
    }
    if let Some(from) = query.created_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(before) = query.created_before {
        qb.push(" AND created_at < ").push_bind(before);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
