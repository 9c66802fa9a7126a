//! Derived sales metrics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::Order;

/// Today's sales figures plus a short feed of recent orders.
///
/// Recomputed on every request and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSnapshot {
    /// Gross value of today's orders, regardless of status.
    pub today_total: Decimal,
    /// Number of distinct orders placed today.
    pub new_order_count: usize,
    /// Most recent orders first.
    pub recent_orders: Vec<Order>,
}

impl SalesSnapshot {
    /// Whether the snapshot carries no data at all (e.g. ERP unreachable).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.today_total.is_zero() && self.new_order_count == 0 && self.recent_orders.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = SalesSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.today_total, Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_serializes_total_as_string() {
        let snapshot = SalesSnapshot {
            today_total: Decimal::new(19990, 2),
            new_order_count: 1,
            recent_orders: vec![],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["today_total"], "199.90");
        assert_eq!(json["new_order_count"], 1);
    }
}
