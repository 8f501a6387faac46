//! # Inventory Log Repository
//!
//! Append-only stock movement history. Rows are inserted, never updated.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tavola_core::input::PageRequest;
use tavola_core::{InventoryLogEntry, StockReason};

/// Repository for the inventory log.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Appends one entry on the given connection.
    pub async fn append(conn: &mut SqliteConnection, entry: &InventoryLogEntry) -> DbResult<()> {
        debug!(
            product_id = %entry.product_id,
            qty_change = entry.qty_change,
            reason = entry.reason.as_str(),
            "Appending inventory log"
        );

        sqlx::query(
            "INSERT INTO inventory_logs (
                id, branch_id, product_id, product_name,
                qty_change, qty_before, qty_after, reason,
                reference_id, actor_id, note, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&entry.id)
        .bind(&entry.branch_id)
        .bind(&entry.product_id)
        .bind(&entry.product_name)
        .bind(entry.qty_change)
        .bind(entry.qty_before)
        .bind(entry.qty_after)
        .bind(entry.reason)
        .bind(&entry.reference_id)
        .bind(&entry.actor_id)
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Appends a batch, one statement per entry, on a pooled connection.
    pub async fn append_all(&self, entries: &[InventoryLogEntry]) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        for entry in entries {
            Self::append(&mut conn, entry).await?;
        }
        Ok(())
    }

    /// Newest-first page of log entries.
    ///
    /// ## Arguments
    /// * `branch_id` - `None` for every branch
    /// * `product_id` - optional product filter
    pub async fn list(
        &self,
        branch_id: Option<&str>,
        product_id: Option<&str>,
        page: PageRequest,
    ) -> DbResult<(Vec<InventoryLogEntry>, i64)> {
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM inventory_logs WHERE 1 = 1");
        push_filters(&mut count_qb, branch_id, product_id);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, branch_id, product_id, product_name, qty_change, qty_before, qty_after,
                    reason, reference_id, actor_id, note, created_at
             FROM inventory_logs WHERE 1 = 1",
        );
        push_filters(&mut qb, branch_id, product_id);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<InventoryLogEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Entries written for one order, oldest first.
    pub async fn for_reference(&self, reference_id: &str) -> DbResult<Vec<InventoryLogEntry>> {
        let rows = sqlx::query_as::<_, InventoryLogEntry>(
            "SELECT id, branch_id, product_id, product_name, qty_change, qty_before, qty_after,
                    reason, reference_id, actor_id, note, created_at
             FROM inventory_logs
             WHERE reference_id = ?1
             ORDER BY rowid",
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sum of logged changes for a product and reason.
    pub async fn net_change(&self, product_id: &str, reason: StockReason) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(qty_change), 0) FROM inventory_logs
             WHERE product_id = ?1 AND reason = ?2",
        )
        .bind(product_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }
}

fn push_filters<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    branch_id: Option<&'a str>,
    product_id: Option<&'a str>,
) {
    if let Some(branch_id) = branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id);
    }
    if let Some(product_id) = product_id {
        qb.push(" AND product_id = ").push_bind(product_id);
    }
}
