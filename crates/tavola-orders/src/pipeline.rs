//! # Order Creation Pipeline
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create_order(caller, input, key)                  │
//! │                                                                         │
//! │  1. validate          source allowed for caller, shape, guest details   │
//! │  2. branch            scoped caller → own branch, owner → explicit      │
//! │  3. idempotency       key seen before? → return that order              │
//! │  4. resolve           products in branch + active, priced options,      │
//! │                       table in branch + seatable                        │
//! │  5. snapshot          price_at_moment = price + Σ modifiers, financials │
//! │  ── unit of work ──────────────────────────────────────────────────     │
//! │  6. reserve stock     StockLedger::reserve (all lines or none)          │
//! │  7. order number      atomic per-branch, per-day counter                │
//! │  8. persist           PENDING / UNPAID                                  │
//! │  9. occupy table      conditional update                                │
//! │  ── commit ────────────────────────────────────────────────────────     │
//! │ 10. ORDER log rows    best-effort                                       │
//! │ 11. emit new_order                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1-5 only read, so a failure there mutates nothing. Steps 6-9 run
//! as one transaction or, in compensating mode, as autocommit statements
//! whose undo actions are stacked as they succeed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tavola_core::input::CreateOrderInput;
use tavola_core::order::{business_day_key, compute_financials, format_order_number};
use tavola_core::validation::validate_create_order;
use tavola_core::{
    AttributeSelection, CallerContext, CoreError, Money, NewOrderEvent, Order, OrderEvent,
    OrderItem, OrderStatus, PaymentStatus, Product, ProductOption, StockReason, Table,
    ValidationError,
};
use tavola_db::{Database, DbError, OrderRepository};

use crate::config::{CreationMode, EngineConfig};
use crate::error::{OrderError, OrderResult};
use crate::ledger::{LogContext, ReservedBatch, StockLedger, StockLine};
use crate::notifier::EventNotifier;
use crate::tables::TableCoordinator;

// =============================================================================
// Types
// =============================================================================

/// Outcome of [`OrderPipeline::create_order`].
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order: Order,
    /// `false` when an idempotency key matched an earlier order.
    pub created: bool,
}

/// A fully priced order that has not touched the database yet.
struct Draft {
    order: Order,
    lines: Vec<StockLine>,
    table: Option<Table>,
}

/// Undo action for an autocommitted step.
#[derive(Debug)]
enum Compensation {
    RestoreStock(Vec<StockLine>),
    DeleteOrder(String),
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Clone)]
pub struct OrderPipeline {
    db: Database,
    config: Arc<EngineConfig>,
    notifier: Arc<dyn EventNotifier>,
    ledger: StockLedger,
}

impl OrderPipeline {
    pub fn new(db: Database, config: Arc<EngineConfig>, notifier: Arc<dyn EventNotifier>) -> Self {
        OrderPipeline {
            ledger: StockLedger::new(db.clone()),
            db,
            config,
            notifier,
        }
    }

    /// Creates an order.
    ///
    /// ## Arguments
    /// * `idempotency_key` - repeated keys within a branch return the
    ///   original order with `created = false` and reserve nothing
    ///
    /// ## Errors
    /// * `CoreError::Validation` - bad input, nothing touched
    /// * `CoreError::ProductNotFound` / `ProductInactive` / `TableNotFound`
    /// * `CoreError::InsufficientStock` - no stock changed
    /// * `CoreError::TableUnavailable` - table taken, stock restored
    /// * `OrderError::DuplicateOrderNumber` - retryable
    pub async fn create_order(
        &self,
        caller: &CallerContext,
        input: &CreateOrderInput,
        idempotency_key: Option<&str>,
    ) -> OrderResult<CreatedOrder> {
        caller.require_can_create(input.order_source)?;
        validate_create_order(input)?;
        let branch_id = caller.write_branch(input.branch_id.as_deref())?;
        let key = idempotency_key.map(str::trim).filter(|k| !k.is_empty());

        if let Some(key) = key {
            if let Some(existing) = self.db.orders().find_by_idempotency_key(&branch_id, key).await? {
                info!(order_id = %existing.id, "Idempotent replay, returning existing order");
                return Ok(CreatedOrder {
                    order: existing,
                    created: false,
                });
            }
        }

        let mut draft = self.prepare(caller, &branch_id, input).await?;

        let result = match self.config.creation_mode {
            CreationMode::Transactional => self.persist_transactional(&mut draft, key).await,
            CreationMode::Compensating => self.persist_compensating(&mut draft, key).await,
        };

        let batch = match (result, key) {
            (Ok(batch), _) => batch,
            (Err(OrderError::Store(e)), Some(key)) if e.is_unique_violation_on("idempotency_key") => {
                // Lost the race to a concurrent request with the same key
                let winner = self
                    .db
                    .orders()
                    .find_by_idempotency_key(&branch_id, key)
                    .await?
                    .ok_or(OrderError::Store(e))?;
                info!(order_id = %winner.id, "Concurrent idempotent request, returning winner");
                return Ok(CreatedOrder {
                    order: winner,
                    created: false,
                });
            }
            (Err(e), _) => return Err(e),
        };

        let order = draft.order;
        self.ledger
            .log_changes(
                &batch.movements,
                LogContext {
                    branch_id: &order.branch_id,
                    reason: StockReason::Order,
                    reference_id: Some(&order.id),
                    actor_id: caller.actor_id(),
                    note: None,
                },
            )
            .await;

        self.notifier.notify(&OrderEvent::NewOrder(NewOrderEvent::from_order(
            &order,
            draft.table.as_ref(),
        )));

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            branch_id = %order.branch_id,
            items = order.items.len(),
            total = order.financials.total.units(),
            mode = %self.config.creation_mode,
            "Order created"
        );
        Ok(CreatedOrder {
            order,
            created: true,
        })
    }

    // =========================================================================
    // Resolution (read-only)
    // =========================================================================

    async fn prepare(
        &self,
        caller: &CallerContext,
        branch_id: &str,
        input: &CreateOrderInput,
    ) -> OrderResult<Draft> {
        let mut seen = HashSet::new();
        let product_ids: Vec<String> = input
            .items
            .iter()
            .filter(|line| seen.insert(line.product_id.as_str()))
            .map(|line| line.product_id.clone())
            .collect();

        let products: HashMap<String, Product> = self
            .db
            .products()
            .get_many(&product_ids)
            .await?
            .into_iter()
            .filter(|p| p.branch_id == branch_id)
            .map(|p| (p.id.clone(), p))
            .collect();
        let options = OptionIndex::new(self.db.products().options_for(&product_ids).await?);

        let order_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(input.items.len());
        let mut lines = Vec::with_capacity(input.items.len());

        for line in &input.items {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            if !product.is_active {
                return Err(CoreError::ProductInactive {
                    id: product.id.clone(),
                    name: product.name.clone(),
                }
                .into());
            }

            let mut attributes = Vec::with_capacity(line.attributes.len());
            for choice in &line.attributes {
                let price_modifier = options
                    .modifier(&product.id, &choice.name, &choice.selected_option)
                    .ok_or_else(|| ValidationError::UnknownAttributeOption {
                        product: product.name.clone(),
                        attribute: choice.name.clone(),
                        option: choice.selected_option.clone(),
                    })?;
                attributes.push(AttributeSelection {
                    name: choice.name.clone(),
                    selected_option: choice.selected_option.clone(),
                    price_modifier,
                });
            }

            let price_at_moment = product.price + attributes.iter().map(|a| a.price_modifier).sum::<Money>();
            if price_at_moment.is_negative() {
                return Err(ValidationError::InvalidFormat {
                    field: "attributes".to_string(),
                    reason: format!("options price {} below zero", product.name),
                }
                .into());
            }

            items.push(OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                name: product.name.clone(),
                qty: line.qty,
                price_at_moment,
                note: line.note.clone(),
                attributes,
            });
            lines.push(StockLine::new(&product.id, &product.name, line.qty));
        }

        let table = match input.table_id.as_deref() {
            Some(table_id) => {
                let table = self
                    .db
                    .tables()
                    .get_by_id(table_id)
                    .await?
                    .filter(|t| t.branch_id == branch_id)
                    .ok_or_else(|| CoreError::TableNotFound(table_id.to_string()))?;
                if !table.can_seat() {
                    return Err(CoreError::TableUnavailable {
                        table_id: table.id.clone(),
                        table_number: table.number.clone(),
                    }
                    .into());
                }
                Some(table)
            }
            None => None,
        };

        let financials = compute_financials(
            items.iter().map(|i| (i.price_at_moment, i.qty)),
            self.config.rates,
            input.applies_service_charge(),
        );
        let now = Utc::now();

        let order = Order {
            id: order_id,
            branch_id: branch_id.to_string(),
            order_number: String::new(),
            order_source: input.order_source,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            table_id: table.as_ref().map(|t| t.id.clone()),
            guest_info: input.guest_info.clone(),
            notes: input.notes.clone(),
            items,
            financials,
            created_by: (!caller.is_guest()).then(|| caller.user_id.clone()),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        debug!(
            order_id = %order.id,
            subtotal = order.financials.subtotal.units(),
            total = order.financials.total.units(),
            "Order priced"
        );
        Ok(Draft { order, lines, table })
    }

    // =========================================================================
    // Unit of work
    // =========================================================================

    async fn persist_transactional(&self, draft: &mut Draft, key: Option<&str>) -> OrderResult<ReservedBatch> {
        let mut tx = self.db.begin().await?;
        let batch = self.write_steps(&mut *tx, draft, key, None).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(batch)
    }

    async fn persist_compensating(&self, draft: &mut Draft, key: Option<&str>) -> OrderResult<ReservedBatch> {
        let mut conn = self.db.acquire().await?;
        let mut undo = Vec::new();

        match self.write_steps(&mut *conn, draft, key, Some(&mut undo)).await {
            Ok(batch) => Ok(batch),
            Err(e) => {
                warn!(
                    order_id = %draft.order.id,
                    steps = undo.len(),
                    error = %e,
                    "Order creation failed, compensating"
                );
                run_compensations(&mut *conn, undo).await;
                Err(e)
            }
        }
    }

    /// Steps 6-9. With an undo stack, each successful step pushes its undo action.
    async fn write_steps(
        &self,
        conn: &mut SqliteConnection,
        draft: &mut Draft,
        key: Option<&str>,
        mut undo: Option<&mut Vec<Compensation>>,
    ) -> OrderResult<ReservedBatch> {
        let batch = StockLedger::reserve(&mut *conn, &draft.lines).await?;
        if let Some(undo) = undo.as_mut() {
            undo.push(Compensation::RestoreStock(batch.lines()));
        }

        let order = &mut draft.order;
        let day = self.config.business_day(order.created_at);
        let seq = OrderRepository::next_sequence(
            &mut *conn,
            &order.branch_id,
            order.order_source.prefix(),
            &business_day_key(day),
        )
        .await?;
        order.order_number = format_order_number(order.order_source, day, seq);

        if let Err(e) = OrderRepository::insert(&mut *conn, order, key).await {
            return Err(if e.is_unique_violation_on("order_number") {
                OrderError::DuplicateOrderNumber(order.order_number.clone())
            } else {
                e.into()
            });
        }
        if let Some(undo) = undo.as_mut() {
            undo.push(Compensation::DeleteOrder(order.id.clone()));
        }

        if let Some(table) = &draft.table {
            TableCoordinator::occupy(&mut *conn, table, &order.id, order.created_at).await?;
        }

        Ok(batch)
    }
}

/// Runs undo actions newest first. Failures are logged and skipped.
async fn run_compensations(conn: &mut SqliteConnection, undo: Vec<Compensation>) {
    for step in undo.into_iter().rev() {
        let outcome = match &step {
            Compensation::RestoreStock(lines) => StockLedger::release(&mut *conn, lines).await.map(|_| ()),
            Compensation::DeleteOrder(order_id) => OrderRepository::delete(&mut *conn, order_id)
                .await
                .map(|_| ())
                .map_err(OrderError::from),
        };
        if let Err(e) = outcome {
            warn!(step = ?step, error = %e, "Compensation step failed");
        }
    }
}

/// Priced options keyed by `(product, attribute, option)`.
struct OptionIndex {
    modifiers: HashMap<(String, String, String), Money>,
}

impl OptionIndex {
    fn new(options: Vec<ProductOption>) -> Self {
        let modifiers = options
            .into_iter()
            .map(|o| ((o.product_id, o.attribute_name, o.option_name), o.price_modifier))
            .collect();
        OptionIndex { modifiers }
    }

    fn modifier(&self, product_id: &str, attribute: &str, option: &str) -> Option<Money> {
        self.modifiers
            .get(&(product_id.to_string(), attribute.to_string(), option.to_string()))
            .copied()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
