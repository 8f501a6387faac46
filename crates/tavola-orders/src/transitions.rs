//! # Order Transition Service
//!
//! Kitchen status changes, payment and void.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  status                                                                 │
//! │    PENDING ──▶ CONFIRMED ──▶ COOKING ──▶ READY ──▶ COMPLETED            │
//! │       │            │            │          │                            │
//! │       └────────────┴────────────┴──────────┴──▶ CANCELLED (void path)   │
//! │                                                                         │
//! │  payment_status (independent of status)                                 │
//! │    UNPAID ──pay──▶ PAID ──void──▶ REFUNDED                              │
//! │                                                                         │
//! │  table: released on COMPLETED and on CANCELLED                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each operation checks its rule on a fresh read, then repeats the check in
//! the `UPDATE`'s `WHERE` clause. A request that loses a race sees the rule
//! violation, not a half-applied change.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tavola_core::input::PayOrderInput;
use tavola_core::order::validate_transition;
use tavola_core::validation::validate_payment;
use tavola_core::{
    CallerContext, CoreError, Money, Order, OrderEvent, OrderStatus, OrderStatusEvent,
    PaymentStatus, StockReason, Transaction,
};
use tavola_db::{Database, DbError, OrderRepository, TransactionRepository};

use crate::error::OrderResult;
use crate::ledger::{LogContext, StockLedger, StockLine};
use crate::notifier::EventNotifier;
use crate::tables::TableCoordinator;

/// Result of a successful payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub order: Order,
    pub transaction: Transaction,
    pub change: Money,
}

#[derive(Clone)]
pub struct OrderTransitionService {
    db: Database,
    notifier: Arc<dyn EventNotifier>,
    ledger: StockLedger,
}

impl OrderTransitionService {
    pub fn new(db: Database, notifier: Arc<dyn EventNotifier>) -> Self {
        OrderTransitionService {
            ledger: StockLedger::new(db.clone()),
            db,
            notifier,
        }
    }

    /// Moves an order along the kitchen flow.
    ///
    /// CANCELLED is accepted here only where the state machine allows it and
    /// is then carried out by [`void`](Self::void), which needs void
    /// capability and restores stock.
    ///
    /// ## Errors
    /// * `CoreError::InvalidTransition` - not an edge of the state machine
    /// * `CoreError::OrderNotFound` - missing or outside the caller's branch
    pub async fn update_status(
        &self,
        caller: &CallerContext,
        order_id: &str,
        to: OrderStatus,
    ) -> OrderResult<Order> {
        caller.require_staff()?;
        let order = self.load(caller, order_id).await?;
        let from = order.status;
        validate_transition(from, to)?;

        if to == OrderStatus::Cancelled {
            return self.void(caller, order_id).await;
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        if !OrderRepository::transition_status(&mut *tx, &order.id, from, to, now).await? {
            // Someone moved it first; report against what it is now
            drop(tx);
            let current = self.load(caller, order_id).await?;
            return Err(CoreError::InvalidTransition {
                from: current.status,
                to,
            }
            .into());
        }
        if to == OrderStatus::Completed {
            if let Some(table_id) = order.table_id.as_deref() {
                TableCoordinator::release(&mut *tx, table_id, &order.id, now).await?;
            }
        }
        tx.commit().await.map_err(DbError::from)?;

        let updated = self.load(caller, order_id).await?;
        self.emit_status(&updated, from);

        info!(
            order_id = %updated.id,
            order_number = %updated.order_number,
            from = %from,
            to = %to,
            "Order status updated"
        );
        Ok(updated)
    }

    /// Records payment in full.
    ///
    /// ## Errors
    /// * `CoreError::AlreadyPaid` - payment status is not UNPAID
    /// * `CoreError::NotPayable` - order was cancelled
    /// * `CoreError::InsufficientPayment` - `amount < total`
    pub async fn pay(
        &self,
        caller: &CallerContext,
        order_id: &str,
        input: &PayOrderInput,
    ) -> OrderResult<PaymentReceipt> {
        caller.require_staff()?;
        validate_payment(input)?;
        let order = self.load(caller, order_id).await?;
        check_payable(&order)?;

        let total = order.financials.total;
        if input.amount < total {
            return Err(CoreError::InsufficientPayment {
                total,
                tendered: input.amount,
            }
            .into());
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            branch_id: order.branch_id.clone(),
            payment_method: input.payment_method,
            amount: input.amount,
            change: input.amount - total,
            actor_id: caller.actor_id().to_string(),
            created_at: now,
        };

        let mut tx = self.db.begin().await?;
        if !OrderRepository::mark_paid(&mut *tx, &order.id, input.payment_method, now).await? {
            drop(tx);
            let current = self.load(caller, order_id).await?;
            check_payable(&current)?;
            return Err(CoreError::AlreadyPaid(current.order_number).into());
        }
        TransactionRepository::insert(&mut *tx, &transaction).await?;
        tx.commit().await.map_err(DbError::from)?;

        let paid = self.load(caller, order_id).await?;
        info!(
            order_id = %paid.id,
            order_number = %paid.order_number,
            method = ?input.payment_method,
            amount = input.amount.units(),
            change = transaction.change.units(),
            "Order paid"
        );
        Ok(PaymentReceipt {
            order: paid,
            change: transaction.change,
            transaction,
        })
    }

    /// Cancels an order and puts its stock back.
    ///
    /// ## What This Does
    /// 1. CANCELLED (PAID becomes REFUNDED), guarded against a second void
    /// 2. Every item's qty returned to stock
    /// 3. Table released if this order still holds it
    /// 4. After commit: one RETURN log row per item, `order_status_update`
    ///
    /// ## Errors
    /// * `CoreError::PermissionDenied` - caller lacks void capability
    /// * `CoreError::AlreadyCancelled` - stock is never restored twice
    pub async fn void(&self, caller: &CallerContext, order_id: &str) -> OrderResult<Order> {
        caller.require_void()?;
        let order = self.load(caller, order_id).await?;
        if order.status == OrderStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled(order.order_number).into());
        }

        let lines: Vec<StockLine> = order
            .items
            .iter()
            .map(|item| StockLine::new(&item.product_id, &item.name, item.qty))
            .collect();

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        if !OrderRepository::mark_cancelled(&mut *tx, &order.id, now).await? {
            return Err(CoreError::AlreadyCancelled(order.order_number).into());
        }
        let movements = StockLedger::release(&mut *tx, &lines).await?;
        if let Some(table_id) = order.table_id.as_deref() {
            TableCoordinator::release(&mut *tx, table_id, &order.id, now).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        self.ledger
            .log_changes(
                &movements,
                LogContext {
                    branch_id: &order.branch_id,
                    reason: StockReason::Return,
                    reference_id: Some(&order.id),
                    actor_id: caller.actor_id(),
                    note: None,
                },
            )
            .await;

        let voided = self.load(caller, order_id).await?;
        self.emit_status(&voided, order.status);

        if order.payment_status == PaymentStatus::Paid {
            warn!(order_id = %order.id, total = order.financials.total.units(), "Paid order voided, refund due");
        }
        info!(
            order_id = %voided.id,
            order_number = %voided.order_number,
            previous = %order.status,
            restored_lines = movements.len(),
            "Order voided"
        );
        Ok(voided)
    }

    async fn load(&self, caller: &CallerContext, order_id: &str) -> OrderResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .filter(|o| caller.can_access(&o.branch_id))
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
    }

    fn emit_status(&self, order: &Order, previous_status: OrderStatus) {
        self.notifier
            .notify(&OrderEvent::OrderStatusUpdate(OrderStatusEvent {
                order_id: order.id.clone(),
                order_number: order.order_number.clone(),
                branch_id: order.branch_id.clone(),
                status: order.status,
                previous_status,
                updated_at: order.updated_at,
            }));
    }
}

fn check_payable(order: &Order) -> OrderResult<()> {
    if order.status == OrderStatus::Cancelled {
        return Err(CoreError::NotPayable {
            order_number: order.order_number.clone(),
            status: order.status,
        }
        .into());
    }
    if order.payment_status != PaymentStatus::Unpaid {
        return Err(CoreError::AlreadyPaid(order.order_number.clone()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{product, test_db};
    use crate::OrderError;
    use tavola_core::{Financials, OrderItem, OrderSource, PaymentMethod, Role};

    /// Inserts a PENDING order for two units of p-1 without going through
    /// the pipeline; stock is whatever the test seeded.
    async fn seed_order(db: &Database, id: &str, total: i64) -> Order {
        db.products().insert(&product("p-1", "b-1", "Latte", total / 2, 5)).await.unwrap();
        let now = Utc::now();
        let order = Order {
            id: id.to_string(),
            branch_id: "b-1".into(),
            order_number: format!("POS-20250101-{id}"),
            order_source: OrderSource::Pos,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            table_id: None,
            guest_info: None,
            notes: None,
            items: vec![OrderItem {
                id: format!("{id}-i1"),
                order_id: id.to_string(),
                product_id: "p-1".into(),
                name: "Latte".into(),
                qty: 2,
                price_at_moment: Money::from_units(total / 2),
                note: None,
                attributes: vec![],
            }],
            financials: Financials {
                subtotal: Money::from_units(total),
                discount: Money::zero(),
                tax: Money::zero(),
                service_charge: Money::zero(),
                total: Money::from_units(total),
            },
            created_by: Some("u-1".into()),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        let mut conn = db.acquire().await.unwrap();
        OrderRepository::insert(&mut conn, &order, None).await.unwrap();
        order
    }

    fn service(db: &Database) -> OrderTransitionService {
        OrderTransitionService::new(db.clone(), Arc::new(crate::notifier::NoopNotifier))
    }

    #[tokio::test]
    async fn test_cooking_requires_confirmed() {
        let db = test_db().await;
        seed_order(&db, "o-1", 60_000).await;
        let kitchen = CallerContext::staff("u-k", Role::Kitchen, "b-1");

        let err = service(&db)
            .update_status(&kitchen, "o-1", OrderStatus::Cooking)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Domain(CoreError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Cooking
            })
        ));
    }

    #[tokio::test]
    async fn test_pay_computes_change() {
        let db = test_db().await;
        seed_order(&db, "o-1", 66_000).await;
        let cashier = CallerContext::staff("u-1", Role::Cashier, "b-1");
        let svc = service(&db);

        let short = PayOrderInput {
            payment_method: PaymentMethod::Cash,
            amount: Money::from_units(50_000),
        };
        assert!(matches!(
            svc.pay(&cashier, "o-1", &short).await.unwrap_err(),
            OrderError::Domain(CoreError::InsufficientPayment { .. })
        ));

        let cash = PayOrderInput {
            payment_method: PaymentMethod::Cash,
            amount: Money::from_units(100_000),
        };
        let receipt = svc.pay(&cashier, "o-1", &cash).await.unwrap();
        assert_eq!(receipt.change.units(), 34_000);
        assert_eq!(receipt.order.payment_status, PaymentStatus::Paid);
        assert_eq!(receipt.order.payment_method, Some(PaymentMethod::Cash));

        assert!(matches!(
            svc.pay(&cashier, "o-1", &cash).await.unwrap_err(),
            OrderError::Domain(CoreError::AlreadyPaid(_))
        ));
        assert_eq!(db.transactions().list_for_order("o-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_void_requires_capability() {
        let db = test_db().await;
        seed_order(&db, "o-1", 60_000).await;
        let cashier = CallerContext::staff("u-1", Role::Cashier, "b-1");

        let err = service(&db).void(&cashier, "o-1").await.unwrap_err();
        assert!(matches!(err, OrderError::Domain(CoreError::PermissionDenied(_))));
        assert_eq!(db.products().stock_of("p-1").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_paid_void_becomes_refunded() {
        let db = test_db().await;
        seed_order(&db, "o-1", 60_000).await;
        let manager = CallerContext::staff("u-m", Role::Manager, "b-1");
        let svc = service(&db);

        svc.pay(
            &manager,
            "o-1",
            &PayOrderInput {
                payment_method: PaymentMethod::Qris,
                amount: Money::from_units(60_000),
            },
        )
        .await
        .unwrap();
        let voided = svc.void(&manager, "o-1").await.unwrap();

        assert_eq!(voided.status, OrderStatus::Cancelled);
        assert_eq!(voided.payment_status, PaymentStatus::Refunded);
        assert_eq!(db.products().stock_of("p-1").await.unwrap(), Some(7));

        let err = svc
            .pay(
                &manager,
                "o-1",
                &PayOrderInput {
                    payment_method: PaymentMethod::Cash,
                    amount: Money::from_units(60_000),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Domain(CoreError::NotPayable { .. })));
    }

    #[tokio::test]
    async fn test_other_branch_sees_not_found() {
        let db = test_db().await;
        seed_order(&db, "o-1", 60_000).await;
        let outsider = CallerContext::staff("u-9", Role::Manager, "b-2");

        let err = service(&db)
            .update_status(&outsider, "o-1", OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
