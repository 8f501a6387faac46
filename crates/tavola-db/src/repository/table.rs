//! # Table Repository
//!
//! Dining tables and their link to the active order.
//!
//! Occupancy uses the same conditional-update pattern as stock: the
//! `WHERE` clause carries the precondition, `rows_affected` reports whether
//! it held.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tavola_core::Table;

const TABLE_COLUMNS: &str =
    "id, branch_id, number, name, capacity, status, current_order_id, reservation, updated_at";

/// Repository for dining tables.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Table>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Table>> {
        let table = sqlx::query_as::<_, Table>(&format!(
            "SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(table)
    }

    /// Tables ordered by number, optionally within one branch.
    pub async fn list(&self, branch_id: Option<&str>) -> DbResult<Vec<Table>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TABLE_COLUMNS} FROM dining_tables"));
        if let Some(branch_id) = branch_id {
            qb.push(" WHERE branch_id = ").push_bind(branch_id);
        }
        qb.push(" ORDER BY branch_id, number");

        Ok(qb.build_query_as::<Table>().fetch_all(&self.pool).await?)
    }

    /// Inserts a table. Floor-plan management is external; this serves the
    /// seed binary and tests.
    pub async fn insert(&self, table: &Table) -> DbResult<()> {
        debug!(id = %table.id, number = %table.number, "Inserting table");

        sqlx::query(
            "INSERT INTO dining_tables (
                id, branch_id, number, name, capacity, status, current_order_id, reservation, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&table.id)
        .bind(&table.branch_id)
        .bind(&table.number)
        .bind(&table.name)
        .bind(table.capacity)
        .bind(table.status)
        .bind(&table.current_order_id)
        .bind(&table.reservation)
        .bind(table.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Seats `order_id` at a table that is available or reserved. Clears
    /// any reservation.
    ///
    /// ## Returns
    /// `false` if the table is occupied (or gone).
    pub async fn occupy(
        conn: &mut SqliteConnection,
        table_id: &str,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(table_id = %table_id, order_id = %order_id, "Occupying table");

        let result = sqlx::query(
            "UPDATE dining_tables
             SET status = 'occupied', current_order_id = ?1, reservation = NULL, updated_at = ?2
             WHERE id = ?3 AND status IN ('available', 'reserved') AND current_order_id IS NULL",
        )
        .bind(order_id)
        .bind(at)
        .bind(table_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Frees the table only while it is still linked to `order_id`.
    pub async fn release_if_linked(
        conn: &mut SqliteConnection,
        table_id: &str,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(table_id = %table_id, order_id = %order_id, "Releasing table");

        let result = sqlx::query(
            "UPDATE dining_tables
             SET status = 'available', current_order_id = NULL, updated_at = ?1
             WHERE id = ?2 AND current_order_id = ?3",
        )
        .bind(at)
        .bind(table_id)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Unconditionally returns the table to `available`.
    pub async fn reset(conn: &mut SqliteConnection, table_id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        debug!(table_id = %table_id, "Resetting table");

        let result = sqlx::query(
            "UPDATE dining_tables
             SET status = 'available', current_order_id = NULL, reservation = NULL, updated_at = ?1
             WHERE id = ?2",
        )
        .bind(at)
        .bind(table_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{table, test_db};
    use tavola_core::TableStatus;

    #[tokio::test]
    async fn test_occupy_and_release() {
        let db = test_db().await;
        db.tables().insert(&table("t-1", "b-1", "A1")).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

        assert!(TableRepository::occupy(&mut conn, "t-1", "o-1", now).await.unwrap());
        // Second order cannot take the same table
        assert!(!TableRepository::occupy(&mut conn, "t-1", "o-2", now).await.unwrap());
        // Only the linked order releases it
        assert!(!TableRepository::release_if_linked(&mut conn, "t-1", "o-2", now).await.unwrap());

        let t = TableRepository::fetch(&mut conn, "t-1").await.unwrap().unwrap();
        assert_eq!(t.status, TableStatus::Occupied);
        assert_eq!(t.current_order_id.as_deref(), Some("o-1"));

        assert!(TableRepository::release_if_linked(&mut conn, "t-1", "o-1", now).await.unwrap());
        let t = TableRepository::fetch(&mut conn, "t-1").await.unwrap().unwrap();
        assert_eq!(t.status, TableStatus::Available);
        assert!(t.current_order_id.is_none());
    }

    #[tokio::test]
    async fn test_reserved_table_can_be_seated() {
        let db = test_db().await;
        let mut reserved = table("t-2", "b-1", "B2");
        reserved.status = TableStatus::Reserved;
        reserved.reservation = Some("{\"name\":\"Dewi\",\"at\":\"19:00\"}".to_string());
        db.tables().insert(&reserved).await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        assert!(TableRepository::occupy(&mut conn, "t-2", "o-9", Utc::now()).await.unwrap());
        let t = TableRepository::fetch(&mut conn, "t-2").await.unwrap().unwrap();
        assert!(t.reservation.is_none());
        drop(conn);

        assert_eq!(db.tables().list(Some("b-1")).await.unwrap().len(), 1);
        assert!(db.tables().list(Some("b-2")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_table_number_rejected() {
        let db = test_db().await;
        db.tables().insert(&table("t-1", "b-1", "A1")).await.unwrap();
        let err = db.tables().insert(&table("t-2", "b-1", "A1")).await.unwrap_err();
        assert!(err.is_unique_violation_on("number"));
        // Same number in another branch is fine
        db.tables().insert(&table("t-3", "b-2", "A1")).await.unwrap();
    }
}
