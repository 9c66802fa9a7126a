//! Core record types for Loja.
//!
//! The ERP client normalizes upstream payloads into these shapes; the
//! dashboard and checkout only ever see these.

pub mod order;
pub mod product;
pub mod sales;

pub use order::{Customer, Order, OrderItem};
pub use product::Product;
pub use sales::SalesSnapshot;
