//! # Validation Module
//!
//! Input validation run before any stock or order mutation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (pos-api)                                     │
//! │  └── Type validation (deserialization, enum values)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Shape rules: non-empty items, qty range, guest details            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine (tavola-orders)                                       │
//! │  └── Lookups: product exists / active / in branch, options exist       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  └── CHECK (stock >= 0), UNIQUE order numbers, foreign keys            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::input::{CreateOrderInput, PayOrderInput, StockAdjustmentInput};
use crate::types::{GuestInfo, OrderSource, StockReason};
use crate::{MAX_ITEM_QUANTITY, MAX_NOTE_LENGTH, MAX_ORDER_LINES, MAX_STOCK_ADJUSTMENT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a line quantity.
///
/// ```rust
/// use tavola_core::validation::validate_quantity;
///
/// assert!(validate_quantity(2).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(1000).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "qty".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

fn validate_note(field: &str, note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(n) if n.chars().count() > MAX_NOTE_LENGTH => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// WEB orders must identify the guest.
fn validate_guest(guest: Option<&GuestInfo>) -> ValidationResult<()> {
    let guest = guest.ok_or_else(|| ValidationError::required("guest_info"))?;
    validate_required("guest_info.name", &guest.name)?;
    validate_required("guest_info.whatsapp", &guest.whatsapp)?;
    if guest.pax < 1 {
        return Err(ValidationError::MustBePositive {
            field: "guest_info.pax".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Shape checks for a new order.
///
/// ## Rules
/// - At least one line, at most [`MAX_ORDER_LINES`]
/// - Every line has a product id and `1 <= qty <= MAX_ITEM_QUANTITY`
/// - Attribute choices name both attribute and option, once per attribute
/// - WEB orders carry guest name, WhatsApp number and party size
pub fn validate_create_order(input: &CreateOrderInput) -> ValidationResult<()> {
    if input.items.is_empty() {
        return Err(ValidationError::required("items"));
    }
    if input.items.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    for line in &input.items {
        validate_required("items.product_id", &line.product_id)?;
        validate_quantity(line.qty)?;
        validate_note("items.note", line.note.as_deref())?;

        let mut seen: Vec<&str> = Vec::with_capacity(line.attributes.len());
        for choice in &line.attributes {
            validate_required("attributes.name", &choice.name)?;
            validate_required("attributes.selected_option", &choice.selected_option)?;
            if seen.contains(&choice.name.as_str()) {
                return Err(ValidationError::InvalidFormat {
                    field: "attributes".to_string(),
                    reason: format!("attribute '{}' selected more than once", choice.name),
                });
            }
            seen.push(&choice.name);
        }
    }

    if input.order_source == OrderSource::Web {
        validate_guest(input.guest_info.as_ref())?;
    }
    validate_note("notes", input.notes.as_deref())?;

    Ok(())
}

pub fn validate_payment(input: &PayOrderInput) -> ValidationResult<()> {
    if input.amount.units() <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Manual stock movements: non-zero, at most `MAX_STOCK_ADJUSTMENT` either
/// way, and a staff reason.
pub fn validate_stock_adjustment(input: &StockAdjustmentInput) -> ValidationResult<()> {
    validate_required("product_id", &input.product_id)?;
    if input.qty_change == 0 {
        return Err(ValidationError::InvalidFormat {
            field: "qty_change".to_string(),
            reason: "must not be zero".to_string(),
        });
    }
    if !(-MAX_STOCK_ADJUSTMENT..=MAX_STOCK_ADJUSTMENT).contains(&input.qty_change) {
        return Err(ValidationError::OutOfRange {
            field: "qty_change".to_string(),
            min: -MAX_STOCK_ADJUSTMENT,
            max: MAX_STOCK_ADJUSTMENT,
        });
    }
    if !input.reason.is_manual() {
        return Err(ValidationError::NotAllowed {
            field: "reason".to_string(),
            allowed: StockReason::MANUAL
                .iter()
                .map(|r| r.as_str().to_string())
                .collect(),
        });
    }
    if input.reason == StockReason::Restock && input.qty_change < 0 {
        return Err(ValidationError::MustBePositive {
            field: "qty_change".to_string(),
        });
    }
    validate_note("note", input.note.as_deref())
}

pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "date_from".to_string(),
                reason: "must not be after date_to".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{AttributeChoice, OrderLineInput};
    use crate::money::Money;
    use crate::types::PaymentMethod;

    fn line(product_id: &str, qty: i64) -> OrderLineInput {
        OrderLineInput {
            product_id: product_id.to_string(),
            qty,
            note: None,
            attributes: Vec::new(),
        }
    }

    fn pos_order(items: Vec<OrderLineInput>) -> CreateOrderInput {
        CreateOrderInput {
            order_source: OrderSource::Pos,
            branch_id: None,
            table_id: None,
            guest_info: None,
            items,
            notes: None,
            apply_service_charge: None,
        }
    }

    #[test]
    fn test_valid_pos_order() {
        assert!(validate_create_order(&pos_order(vec![line("p-1", 2)])).is_ok());
    }

    #[test]
    fn test_empty_items_rejected() {
        let err = validate_create_order(&pos_order(vec![])).unwrap_err();
        assert!(matches!(err, ValidationError::Required { ref field } if field == "items"));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_create_order(&pos_order(vec![line("p-1", 0)])).is_err());
        assert!(validate_create_order(&pos_order(vec![line("p-1", -3)])).is_err());
        assert!(validate_create_order(&pos_order(vec![line("p-1", MAX_ITEM_QUANTITY)])).is_ok());
    }

    #[test]
    fn test_web_order_requires_guest() {
        let mut input = pos_order(vec![line("p-1", 1)]);
        input.order_source = OrderSource::Web;
        assert!(validate_create_order(&input).is_err());

        input.guest_info = Some(GuestInfo {
            name: "Sari".to_string(),
            whatsapp: "".to_string(),
            pax: 2,
        });
        let err = validate_create_order(&input).unwrap_err();
        assert!(err.to_string().contains("whatsapp"));

        input.guest_info = Some(GuestInfo {
            name: "Sari".to_string(),
            whatsapp: "+62811000111".to_string(),
            pax: 0,
        });
        assert!(validate_create_order(&input).is_err());

        input.guest_info.as_mut().unwrap().pax = 3;
        assert!(validate_create_order(&input).is_ok());
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let mut l = line("p-1", 1);
        l.attributes = vec![
            AttributeChoice {
                name: "Size".into(),
                selected_option: "Large".into(),
            },
            AttributeChoice {
                name: "Size".into(),
                selected_option: "Small".into(),
            },
        ];
        assert!(validate_create_order(&pos_order(vec![l])).is_err());
    }

    #[test]
    fn test_payment_amount_positive() {
        let pay = PayOrderInput {
            payment_method: PaymentMethod::Cash,
            amount: Money::zero(),
        };
        assert!(validate_payment(&pay).is_err());
    }

    #[test]
    fn test_stock_adjustment_rules() {
        let mut adj = StockAdjustmentInput {
            product_id: "p-1".into(),
            qty_change: 10,
            reason: StockReason::Restock,
            note: None,
        };
        assert!(validate_stock_adjustment(&adj).is_ok());

        adj.qty_change = 0;
        assert!(validate_stock_adjustment(&adj).is_err());

        adj.qty_change = -2;
        assert!(validate_stock_adjustment(&adj).is_err());

        adj.reason = StockReason::Wastage;
        assert!(validate_stock_adjustment(&adj).is_ok());

        adj.reason = StockReason::Return;
        assert!(matches!(
            validate_stock_adjustment(&adj),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_stock_adjustment_magnitude_is_bounded() {
        let mut adj = StockAdjustmentInput {
            product_id: "p-1".into(),
            qty_change: i64::MIN,
            reason: StockReason::Wastage,
            note: None,
        };
        assert!(matches!(
            validate_stock_adjustment(&adj),
            Err(ValidationError::OutOfRange { .. })
        ));

        adj.qty_change = -MAX_STOCK_ADJUSTMENT;
        assert!(validate_stock_adjustment(&adj).is_ok());

        adj.reason = StockReason::Restock;
        adj.qty_change = MAX_STOCK_ADJUSTMENT + 1;
        assert!(validate_stock_adjustment(&adj).is_err());
        adj.qty_change = i64::MAX;
        assert!(validate_stock_adjustment(&adj).is_err());
    }

    #[test]
    fn test_date_range() {
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 1);
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 31);
        assert!(validate_date_range(d1, d2).is_ok());
        assert!(validate_date_range(d2, d1).is_err());
        assert!(validate_date_range(None, d1).is_ok());
    }
}
