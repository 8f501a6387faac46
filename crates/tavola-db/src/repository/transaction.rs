//! # Transaction Repository
//!
//! Immutable payment records. One row per successful `pay`.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tavola_core::Transaction;

/// Repository for payment transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn insert(conn: &mut SqliteConnection, tx: &Transaction) -> DbResult<()> {
        debug!(id = %tx.id, order_id = %tx.order_id, amount = tx.amount.units(), "Recording transaction");

        sqlx::query(
            "INSERT INTO transactions (
                id, order_id, branch_id, payment_method, amount, change_due, actor_id, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&tx.id)
        .bind(&tx.order_id)
        .bind(&tx.branch_id)
        .bind(tx.payment_method)
        .bind(tx.amount)
        .bind(tx.change)
        .bind(&tx.actor_id)
        .bind(tx.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Payments recorded against an order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(
            r#"SELECT id, order_id, branch_id, payment_method, amount, change_due AS "change",
                      actor_id, created_at
               FROM transactions
               WHERE order_id = ?1
               ORDER BY created_at, rowid"#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
