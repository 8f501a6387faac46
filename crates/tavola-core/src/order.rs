//! # Order Rules
//!
//! Pure order logic: financials, order numbers and the status machine.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   PENDING ──► CONFIRMED ──► COOKING ──► READY ──► COMPLETED             │
//! │      │            │            │          │                             │
//! │      └────────────┴────────────┴──────────┴──────► CANCELLED            │
//! │                                                                         │
//! │   Payment is independent:  UNPAID ──► PAID ──► REFUNDED (on void)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation always goes through the void path so stock is restored.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Rate};
use crate::types::{Financials, OrderSource, OrderStatus};

// =============================================================================
// Financials
// =============================================================================

/// Rates applied when an order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRates {
    pub tax: Rate,
    pub service_charge: Rate,
}

impl Default for PricingRates {
    fn default() -> Self {
        PricingRates {
            tax: Rate::from_bps(crate::DEFAULT_TAX_RATE_BPS),
            service_charge: Rate::from_bps(crate::DEFAULT_SERVICE_CHARGE_BPS),
        }
    }
}

/// Computes order financials from `(price_at_moment, qty)` lines.
///
/// ## Formula
/// ```text
/// subtotal       = Σ price_at_moment × qty
/// tax            = round(subtotal × tax_rate)
/// service_charge = apply ? round(subtotal × service_rate) : 0
/// discount       = 0
/// total          = subtotal - discount + tax + service_charge
/// ```
///
/// ## Example
/// ```rust
/// use tavola_core::money::{Money, Rate};
/// use tavola_core::order::{compute_financials, PricingRates};
///
/// let rates = PricingRates { tax: Rate::from_bps(1000), service_charge: Rate::zero() };
/// let f = compute_financials([(Money::from_units(30_000), 2)], rates, false);
/// assert_eq!(f.total.units(), 66_000);
/// ```
pub fn compute_financials<I>(lines: I, rates: PricingRates, apply_service_charge: bool) -> Financials
where
    I: IntoIterator<Item = (Money, i64)>,
{
    let subtotal: Money = lines
        .into_iter()
        .map(|(price, qty)| price.multiply_quantity(qty))
        .sum();
    let discount = Money::zero();
    let tax = subtotal.apply_rate(rates.tax);
    let service_charge = if apply_service_charge {
        subtotal.apply_rate(rates.service_charge)
    } else {
        Money::zero()
    };

    Financials {
        subtotal,
        discount,
        tax,
        service_charge,
        total: subtotal - discount + tax + service_charge,
    }
}

// =============================================================================
// Order Numbers
// =============================================================================

/// Calendar day an order belongs to, shifted by the branch UTC offset.
///
/// A restaurant at UTC+7 closing at 01:00 local time still stamps
/// late orders with the local date.
pub fn business_day(at: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    (at + Duration::minutes(i64::from(utc_offset_minutes))).date_naive()
}

/// `{PREFIX}-{YYYYMMDD}-{seq:04}`. Sequences past 9999 widen naturally.
///
/// ```rust
/// use chrono::NaiveDate;
/// use tavola_core::order::format_order_number;
/// use tavola_core::OrderSource;
///
/// let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// assert_eq!(format_order_number(OrderSource::Pos, day, 1), "POS-20250101-0001");
/// ```
pub fn format_order_number(source: OrderSource, day: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{:04}", source.prefix(), day.format("%Y%m%d"), seq)
}

/// The `YYYYMMDD` key the sequence counter is partitioned by.
pub fn business_day_key(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

// =============================================================================
// Status Transitions
// =============================================================================

/// Whether `from -> to` is an edge of the status machine.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Confirmed, Cooking)
            | (Cooking, Ready)
            | (Ready, Completed)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
            | (Cooking, Cancelled)
            | (Ready, Cancelled)
    )
}

pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> CoreResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
