//! # Order Queries
//!
//! Read side: caller-scoped lookups, the order list, the kitchen queue and
//! public tracking. Nothing here writes.

use std::sync::Arc;

use chrono::Duration;

use tavola_core::input::{OrderFilter, PageRequest};
use tavola_core::validation::validate_date_range;
use tavola_core::{
    CallerContext, CoreError, InventoryLogEntry, Order, OrderTracking, Page, Transaction,
};
use tavola_db::{Database, OrderQuery};

use crate::config::EngineConfig;
use crate::error::OrderResult;

#[derive(Debug, Clone)]
pub struct OrderQueries {
    db: Database,
    config: Arc<EngineConfig>,
}

impl OrderQueries {
    pub fn new(db: Database, config: Arc<EngineConfig>) -> Self {
        OrderQueries { db, config }
    }

    /// An order visible to `caller`.
    pub async fn get(&self, caller: &CallerContext, order_id: &str) -> OrderResult<Order> {
        caller.require_staff()?;
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .filter(|o| caller.can_access(&o.branch_id))
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
    }

    /// Newest-first page of orders in the caller's scope.
    ///
    /// `date_from` / `date_to` are business days, both inclusive.
    pub async fn list(&self, caller: &CallerContext, filter: &OrderFilter) -> OrderResult<Page<Order>> {
        caller.require_staff()?;
        validate_date_range(filter.date_from, filter.date_to)?;

        let page = filter.page_request();
        let query = OrderQuery {
            branch_id: caller.read_scope().map(str::to_string),
            status: filter.status,
            payment_status: filter.payment_status,
            order_source: filter.order_source,
            table_id: filter.table_id.clone(),
            created_from: filter.date_from.map(|day| self.config.day_start(day)),
            created_before: filter
                .date_to
                .map(|day| self.config.day_start(day) + Duration::days(1)),
            page,
        };

        let (data, total) = self.db.orders().list(&query).await?;
        Ok(Page {
            data,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    /// CONFIRMED and COOKING orders, oldest first.
    pub async fn kitchen(&self, caller: &CallerContext) -> OrderResult<Vec<Order>> {
        caller.require_staff()?;
        Ok(self.db.orders().kitchen_queue(caller.read_scope()).await?)
    }

    /// Public status lookup by order number.
    ///
    /// Order numbers repeat across branches, so `branch_id` narrows the
    /// search; without it the most recent match wins.
    pub async fn track(&self, order_number: &str, branch_id: Option<&str>) -> OrderResult<OrderTracking> {
        self.db
            .orders()
            .find_by_number(order_number, branch_id)
            .await?
            .map(|order| OrderTracking::from(&order))
            .ok_or_else(|| CoreError::OrderNotFound(order_number.to_string()).into())
    }

    /// Payments recorded against an order.
    pub async fn transactions(&self, caller: &CallerContext, order_id: &str) -> OrderResult<Vec<Transaction>> {
        caller.require_staff()?;
        let order = self.get(caller, order_id).await?;
        Ok(self.db.transactions().list_for_order(&order.id).await?)
    }

    /// Inventory log, newest first.
    pub async fn inventory_logs(
        &self,
        caller: &CallerContext,
        product_id: Option<&str>,
        page: PageRequest,
    ) -> OrderResult<Page<InventoryLogEntry>> {
        caller.require_staff()?;
        let (data, total) = self
            .db
            .inventory()
            .list(caller.read_scope(), product_id, page)
            .await?;
        Ok(Page {
            data,
            total,
            page: page.page,
            limit: page.limit,
        })
    }
}
