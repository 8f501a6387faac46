//! # Stock Ledger
//!
//! Per-product stock counters plus the append-only movement log.
//!
//! ## Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve([Latte ×2, Croissant ×1, Matcha ×5])                           │
//! │                                                                         │
//! │   1. UPDATE … stock = stock - 2 WHERE id = latte     AND stock >= 2  ✓  │
//! │   2. UPDATE … stock = stock - 1 WHERE id = croissant AND stock >= 1  ✓  │
//! │   3. UPDATE … stock = stock - 5 WHERE id = matcha    AND stock >= 5  ✗  │
//! │                                                                         │
//! │   compensate in reverse: croissant +1, latte +2                         │
//! │   SELECT stock FROM products WHERE id = matcha   (message only)         │
//! │   → InsufficientStock { Matcha, requested 5, available 3 }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each decrement is one conditional statement, so two requests racing for
//! the last unit cannot both win and stock never goes negative. No
//! in-process lock is involved.
//!
//! Log writes after a committed reservation or release are best-effort:
//! a failure is logged at `warn` and the stock change stands.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use tavola_core::input::StockAdjustmentInput;
use tavola_core::validation::validate_stock_adjustment;
use tavola_core::{CallerContext, CoreError, InventoryLogEntry, StockReason};
use tavola_db::{Database, InventoryRepository, ProductRepository};

use crate::error::OrderResult;

// =============================================================================
// Types
// =============================================================================

/// One product quantity to reserve or release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: String,
    /// Name used in error messages and log rows.
    pub product_name: String,
    pub qty: i64,
}

impl StockLine {
    pub fn new(product_id: impl Into<String>, product_name: impl Into<String>, qty: i64) -> Self {
        StockLine {
            product_id: product_id.into(),
            product_name: product_name.into(),
            qty,
        }
    }
}

/// An applied stock change, enough to write its log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: String,
    pub product_name: String,
    pub qty_change: i64,
    pub qty_before: i64,
    pub qty_after: i64,
}

/// Result of a successful [`StockLedger::reserve`], in request order.
#[derive(Debug, Clone, Default)]
pub struct ReservedBatch {
    pub movements: Vec<StockMovement>,
}

impl ReservedBatch {
    /// Lines to hand back to [`StockLedger::release`] when undoing.
    pub fn lines(&self) -> Vec<StockLine> {
        self.movements
            .iter()
            .map(|m| StockLine::new(&m.product_id, &m.product_name, -m.qty_change))
            .collect()
    }
}

/// Context written on every log row of one operation.
#[derive(Debug, Clone)]
pub struct LogContext<'a> {
    pub branch_id: &'a str,
    pub reason: StockReason,
    pub reference_id: Option<&'a str>,
    pub actor_id: &'a str,
    pub note: Option<&'a str>,
}

// =============================================================================
// Stock Ledger
// =============================================================================

#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
}

impl StockLedger {
    pub fn new(db: Database) -> Self {
        StockLedger { db }
    }

    /// Reserves every line, or none of them.
    ///
    /// Lines are processed in request order. On the first refusal every
    /// earlier line is incremented back before the error is returned.
    ///
    /// ## Errors
    /// * `CoreError::InsufficientStock` - with a snapshot of what was left
    pub async fn reserve(conn: &mut SqliteConnection, lines: &[StockLine]) -> OrderResult<ReservedBatch> {
        let mut batch = ReservedBatch::default();

        for line in lines {
            let reserved = match ProductRepository::try_decrement_stock(&mut *conn, &line.product_id, line.qty).await {
                Ok(reserved) => reserved,
                Err(e) => {
                    Self::compensate(conn, &batch).await;
                    return Err(e.into());
                }
            };

            match reserved {
                Some(qty_after) => batch.movements.push(StockMovement {
                    product_id: line.product_id.clone(),
                    product_name: line.product_name.clone(),
                    qty_change: -line.qty,
                    qty_before: qty_after + line.qty,
                    qty_after,
                }),
                None => {
                    Self::compensate(conn, &batch).await;
                    let available = ProductRepository::current_stock(&mut *conn, &line.product_id)
                        .await
                        .ok()
                        .flatten()
                        .unwrap_or(0);
                    return Err(CoreError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        product_name: line.product_name.clone(),
                        requested: line.qty,
                        available,
                    }
                    .into());
                }
            }
        }

        Ok(batch)
    }

    /// Adds every line back. Products that no longer exist are skipped.
    pub async fn release(conn: &mut SqliteConnection, lines: &[StockLine]) -> OrderResult<Vec<StockMovement>> {
        let mut movements = Vec::with_capacity(lines.len());

        for line in lines {
            match ProductRepository::increment_stock(&mut *conn, &line.product_id, line.qty).await? {
                Some(qty_after) => movements.push(StockMovement {
                    product_id: line.product_id.clone(),
                    product_name: line.product_name.clone(),
                    qty_change: line.qty,
                    qty_before: qty_after - line.qty,
                    qty_after,
                }),
                None => warn!(
                    product_id = %line.product_id,
                    qty = line.qty,
                    "Product gone, stock not restored"
                ),
            }
        }

        Ok(movements)
    }

    /// Undoes a partial batch in reverse order. Failures are logged; the
    /// audit log is what reconciles them.
    async fn compensate(conn: &mut SqliteConnection, batch: &ReservedBatch) {
        for movement in batch.movements.iter().rev() {
            let qty = -movement.qty_change;
            if let Err(e) = ProductRepository::increment_stock(&mut *conn, &movement.product_id, qty).await {
                warn!(
                    product_id = %movement.product_id,
                    qty,
                    error = %e,
                    "Stock compensation failed"
                );
            }
        }
    }

    /// Appends one log row per movement on a pooled connection.
    ///
    /// Best-effort: the stock change has already committed.
    pub async fn log_changes(&self, movements: &[StockMovement], ctx: LogContext<'_>) {
        if movements.is_empty() {
            return;
        }

        let entries = build_entries(movements, &ctx);
        if let Err(e) = self.db.inventory().append_all(&entries).await {
            warn!(
                reference_id = ?ctx.reference_id,
                reason = ctx.reason.as_str(),
                entries = entries.len(),
                error = %e,
                "Inventory log write failed"
            );
        }
    }

    /// Manual RESTOCK / WASTAGE / ADJUSTMENT.
    ///
    /// Negative changes use the same conditional decrement as orders, so an
    /// adjustment can never push stock below zero. The stock change and its
    /// log row commit together.
    pub async fn adjust(
        &self,
        caller: &CallerContext,
        input: &StockAdjustmentInput,
    ) -> OrderResult<InventoryLogEntry> {
        caller.require_staff()?;
        validate_stock_adjustment(input)?;

        let product = self
            .db
            .products()
            .get_by_id(&input.product_id)
            .await?
            .filter(|p| caller.can_access(&p.branch_id))
            .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;

        let mut tx = self.db.begin().await?;

        let qty_after = if input.qty_change < 0 {
            let qty = -input.qty_change;
            match ProductRepository::try_decrement_stock(&mut *tx, &product.id, qty).await? {
                Some(after) => after,
                None => {
                    let available = ProductRepository::current_stock(&mut *tx, &product.id)
                        .await?
                        .unwrap_or(0);
                    return Err(CoreError::InsufficientStock {
                        product_id: product.id.clone(),
                        product_name: product.name.clone(),
                        requested: qty,
                        available,
                    }
                    .into());
                }
            }
        } else {
            ProductRepository::increment_stock(&mut *tx, &product.id, input.qty_change)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product.id.clone()))?
        };

        let movement = StockMovement {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            qty_change: input.qty_change,
            qty_before: qty_after - input.qty_change,
            qty_after,
        };
        let ctx = LogContext {
            branch_id: &product.branch_id,
            reason: input.reason,
            reference_id: None,
            actor_id: caller.actor_id(),
            note: input.note.as_deref(),
        };
        let entry = log_entry(&movement, &ctx, Utc::now());
        InventoryRepository::append(&mut *tx, &entry).await?;

        tx.commit().await.map_err(tavola_db::DbError::from)?;

        info!(
            product_id = %product.id,
            qty_change = input.qty_change,
            qty_after,
            reason = input.reason.as_str(),
            "Stock adjusted"
        );
        Ok(entry)
    }
}

fn build_entries(movements: &[StockMovement], ctx: &LogContext<'_>) -> Vec<InventoryLogEntry> {
    let now = Utc::now();
    movements.iter().map(|m| log_entry(m, ctx, now)).collect()
}

fn log_entry(m: &StockMovement, ctx: &LogContext<'_>, at: DateTime<Utc>) -> InventoryLogEntry {
    InventoryLogEntry {
        id: Uuid::new_v4().to_string(),
        branch_id: ctx.branch_id.to_string(),
        product_id: m.product_id.clone(),
        product_name: m.product_name.clone(),
        qty_change: m.qty_change,
        qty_before: m.qty_before,
        qty_after: m.qty_after,
        reason: ctx.reason,
        reference_id: ctx.reference_id.map(str::to_string),
        actor_id: ctx.actor_id.to_string(),
        note: ctx.note.map(str::to_string),
        created_at: at,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{product, test_db};
    use crate::OrderError;
    use tavola_core::Role;

    #[tokio::test]
    async fn test_reserve_decrements_in_order() {
        let db = test_db().await;
        db.products().insert(&product("p-1", "b-1", "Latte", 30_000, 3)).await.unwrap();
        db.products().insert(&product("p-2", "b-1", "Croissant", 18_000, 5)).await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let batch = StockLedger::reserve(
            &mut conn,
            &[StockLine::new("p-1", "Latte", 2), StockLine::new("p-2", "Croissant", 1)],
        )
        .await
        .unwrap();

        assert_eq!(batch.movements.len(), 2);
        assert_eq!(batch.movements[0].qty_before, 3);
        assert_eq!(batch.movements[0].qty_after, 1);
        assert_eq!(batch.movements[0].qty_change, -2);
        assert_eq!(batch.lines()[1], StockLine::new("p-2", "Croissant", 1));
    }

    #[tokio::test]
    async fn test_failed_batch_restores_earlier_lines() {
        let db = test_db().await;
        db.products().insert(&product("p-1", "b-1", "Latte", 30_000, 3)).await.unwrap();
        db.products().insert(&product("p-2", "b-1", "Matcha", 35_000, 3)).await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let err = StockLedger::reserve(
            &mut conn,
            &[StockLine::new("p-1", "Latte", 2), StockLine::new("p-2", "Matcha", 5)],
        )
        .await
        .unwrap_err();
        drop(conn);

        match err {
            OrderError::Domain(CoreError::InsufficientStock {
                product_name,
                requested,
                available,
                ..
            }) => {
                assert_eq!(product_name, "Matcha");
                assert_eq!(requested, 5);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.products().stock_of("p-1").await.unwrap(), Some(3));
        assert_eq!(db.products().stock_of("p-2").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_unknown_product_is_refused() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        let err = StockLedger::reserve(&mut conn, &[StockLine::new("ghost", "Ghost", 1)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Domain(CoreError::InsufficientStock { available: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_release_and_log() {
        let db = test_db().await;
        db.products().insert(&product("p-1", "b-1", "Latte", 30_000, 1)).await.unwrap();
        let ledger = StockLedger::new(db.clone());

        let mut conn = db.acquire().await.unwrap();
        let movements = StockLedger::release(
            &mut conn,
            &[StockLine::new("p-1", "Latte", 2), StockLine::new("gone", "Gone", 1)],
        )
        .await
        .unwrap();
        drop(conn);

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].qty_before, 1);
        assert_eq!(movements[0].qty_after, 3);

        ledger
            .log_changes(
                &movements,
                LogContext {
                    branch_id: "b-1",
                    reason: StockReason::Return,
                    reference_id: Some("o-1"),
                    actor_id: "u-1",
                    note: None,
                },
            )
            .await;
        let logs = db.inventory().for_reference("o-1").await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].reason, StockReason::Return);
        assert_eq!(logs[0].qty_after, logs[0].qty_before + logs[0].qty_change);
    }

    #[tokio::test]
    async fn test_adjust_restock_and_wastage() {
        let db = test_db().await;
        db.products().insert(&product("p-1", "b-1", "Croissant", 18_000, 4)).await.unwrap();
        let ledger = StockLedger::new(db.clone());
        let manager = CallerContext::staff("u-1", Role::Manager, "b-1");

        let entry = ledger
            .adjust(
                &manager,
                &StockAdjustmentInput {
                    product_id: "p-1".into(),
                    qty_change: 6,
                    reason: StockReason::Restock,
                    note: Some("morning delivery".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!((entry.qty_before, entry.qty_after), (4, 10));

        let err = ledger
            .adjust(
                &manager,
                &StockAdjustmentInput {
                    product_id: "p-1".into(),
                    qty_change: -11,
                    reason: StockReason::Wastage,
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Domain(CoreError::InsufficientStock { available: 10, .. })
        ));
        assert_eq!(db.products().stock_of("p-1").await.unwrap(), Some(10));
        assert_eq!(db.inventory().net_change("p-1", StockReason::Restock).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_adjust_rejects_other_branch_and_order_reason() {
        let db = test_db().await;
        db.products().insert(&product("p-1", "b-1", "Croissant", 18_000, 4)).await.unwrap();
        let ledger = StockLedger::new(db.clone());

        let outsider = CallerContext::staff("u-2", Role::Manager, "b-2");
        let err = ledger
            .adjust(
                &outsider,
                &StockAdjustmentInput {
                    product_id: "p-1".into(),
                    qty_change: 1,
                    reason: StockReason::Adjustment,
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let manager = CallerContext::staff("u-1", Role::Manager, "b-1");
        let err = ledger
            .adjust(
                &manager,
                &StockAdjustmentInput {
                    product_id: "p-1".into(),
                    qty_change: -1,
                    reason: StockReason::Order,
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_adjust_refuses_extreme_quantities() {
        let db = test_db().await;
        db.products().insert(&product("p-1", "b-1", "Croissant", 18_000, 4)).await.unwrap();
        let ledger = StockLedger::new(db.clone());
        let manager = CallerContext::staff("u-1", Role::Manager, "b-1");

        for (qty_change, reason) in [(i64::MIN, StockReason::Wastage), (i64::MAX, StockReason::Restock)] {
            let err = ledger
                .adjust(
                    &manager,
                    &StockAdjustmentInput {
                        product_id: "p-1".into(),
                        qty_change,
                        reason,
                        note: None,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, OrderError::Domain(CoreError::Validation(_))));
        }
        assert_eq!(db.products().stock_of("p-1").await.unwrap(), Some(4));
    }
}
