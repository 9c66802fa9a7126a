//! Normalized ERP order records.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A sales order as seen by the storefront, independent of the ERP's
/// response shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// ERP order number (the only identity an order has here).
    pub number: String,
    /// Local wall-clock time the order was placed, if the ERP sent a
    /// parseable date.
    pub placed_at: Option<NaiveDateTime>,
    /// Free-text status label as reported by the ERP.
    pub status: String,
    /// Gross order value. Always populated.
    pub total: Decimal,
    /// Buyer contact.
    pub customer: Customer,
    /// Line items, empty when the listing endpoint omits them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Calendar day the order was placed on.
    #[must_use]
    pub fn placed_on(&self) -> Option<NaiveDate> {
        self.placed_at.map(|at| at.date())
    }

    /// Sum of `unit_value × quantity` over all line items, saturating at
    /// the `Decimal` bounds.
    #[must_use]
    pub fn items_total(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |total, item| total.saturating_add(item.subtotal()))
    }
}

/// Buyer attached to an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A single order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_value: Decimal,
}

impl OrderItem {
    /// Line value (`unit_value × quantity`), saturating at the `Decimal`
    /// bounds.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_value.saturating_mul(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(unit_value: Decimal, quantity: i64) -> OrderItem {
        OrderItem {
            product_name: "Camiseta".to_string(),
            quantity: Decimal::from(quantity),
            unit_value,
        }
    }

    #[test]
    fn test_items_total_sums_lines() {
        let order = Order {
            number: "1".to_string(),
            placed_at: None,
            status: String::new(),
            total: Decimal::ZERO,
            customer: Customer::default(),
            items: vec![item(Decimal::new(5000, 2), 2), item(Decimal::new(1050, 2), 3)],
        };
        assert_eq!(order.items_total(), Decimal::new(13150, 2));
    }

    #[test]
    fn test_items_total_saturates_on_overflow() {
        let order = Order {
            items: vec![item(Decimal::MAX, 2), item(Decimal::MAX, 1)],
            ..Order::default()
        };
        assert_eq!(order.items[0].subtotal(), Decimal::MAX);
        assert_eq!(order.items_total(), Decimal::MAX);
    }

    #[test]
    fn test_placed_on_uses_calendar_day() {
        let placed_at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let order = Order {
            number: "1".to_string(),
            placed_at: Some(placed_at),
            status: String::new(),
            total: Decimal::ZERO,
            customer: Customer::default(),
            items: vec![],
        };
        assert_eq!(order.placed_on(), NaiveDate::from_ymd_opt(2024, 1, 1));
    }
}
