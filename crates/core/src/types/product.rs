//! Normalized ERP product records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product as synchronized from the ERP.
///
/// `price` and `current_stock` are never negative; fields the ERP omits
/// default to zero or an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// ERP product ID, used as the upsert key locally.
    pub external_id: String,
    pub name: String,
    pub price: Decimal,
    pub current_stock: i64,
    pub sku: String,
    pub description: String,
    pub category: String,
}

impl Product {
    /// Whether the ERP reports any units on hand.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.current_stock > 0
    }
}
