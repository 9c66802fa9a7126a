//! Loja Core - Shared types library.
//!
//! This crate provides the record types exchanged between Loja components:
//! - `admin` - ERP synchronization client and dashboard JSON endpoints
//! - `cli` - Operator commands (migrations, manual syncs)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Normalized orders, products, and derived sales snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
