//! # Table Coordinator
//!
//! Keeps `dining_tables.current_order_id` in step with the order it seats.
//!
//! ```text
//!   available ──occupy(order)──▶ occupied ──release(order)──▶ available
//!   reserved  ──occupy(order)──▶ occupied
//!   any       ──reset(force)───▶ available
//! ```
//!
//! `occupy` and `release` run inside the caller's unit of work. The status
//! guard sits in the `UPDATE`'s `WHERE` clause, so two orders cannot claim
//! the same table.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use tavola_core::{CallerContext, CoreError, Table};
use tavola_db::{Database, TableRepository};

use crate::error::OrderResult;

#[derive(Debug, Clone)]
pub struct TableCoordinator {
    db: Database,
}

impl TableCoordinator {
    pub fn new(db: Database) -> Self {
        TableCoordinator { db }
    }

    /// Seats `order_id` at `table`.
    ///
    /// ## Errors
    /// * `CoreError::TableUnavailable` - another active order holds it
    pub async fn occupy(
        conn: &mut SqliteConnection,
        table: &Table,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> OrderResult<()> {
        if TableRepository::occupy(conn, &table.id, order_id, at).await? {
            Ok(())
        } else {
            Err(CoreError::TableUnavailable {
                table_id: table.id.clone(),
                table_number: table.number.clone(),
            }
            .into())
        }
    }

    /// Frees the table if `order_id` still holds it.
    ///
    /// ## Returns
    /// `false` when the table was already released or reassigned.
    pub async fn release(
        conn: &mut SqliteConnection,
        table_id: &str,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> OrderResult<bool> {
        Ok(TableRepository::release_if_linked(conn, table_id, order_id, at).await?)
    }

    /// Returns a table to `available`.
    ///
    /// Without `force`, a table with unpaid orders is refused and the
    /// error lists their numbers. Forcing requires void capability and
    /// leaves those orders untouched.
    pub async fn reset(&self, caller: &CallerContext, table_id: &str, force: bool) -> OrderResult<Table> {
        caller.require_staff()?;
        let table = self.get(caller, table_id).await?;

        if force {
            caller.require_void()?;
        } else {
            let unpaid = self.db.orders().unpaid_on_table(&table.id).await?;
            if !unpaid.is_empty() {
                return Err(CoreError::TableHasUnpaidOrders {
                    table_id: table.id.clone(),
                    order_numbers: unpaid,
                }
                .into());
            }
        }

        let mut conn = self.db.acquire().await?;
        TableRepository::reset(&mut conn, &table.id, Utc::now()).await?;
        let reset = TableRepository::fetch(&mut conn, &table.id)
            .await?
            .ok_or_else(|| CoreError::TableNotFound(table.id.clone()))?;

        info!(
            table_id = %table.id,
            number = %table.number,
            force,
            previous_order = ?table.current_order_id,
            "Table reset"
        );
        Ok(reset)
    }

    /// A table visible to `caller`.
    pub async fn get(&self, caller: &CallerContext, table_id: &str) -> OrderResult<Table> {
        caller.require_staff()?;
        self.db
            .tables()
            .get_by_id(table_id)
            .await?
            .filter(|t| caller.can_access(&t.branch_id))
            .ok_or_else(|| CoreError::TableNotFound(table_id.to_string()).into())
    }

    /// Tables in the caller's scope.
    pub async fn list(&self, caller: &CallerContext) -> OrderResult<Vec<Table>> {
        caller.require_staff()?;
        Ok(self.db.tables().list(caller.read_scope()).await?)
    }
}
