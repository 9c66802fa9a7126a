//! Loja admin library.
//!
//! The Bling ERP synchronization client plus the admin service around it:
//! configuration, settings/product persistence, and the JSON API consumed by
//! the storefront's dashboard.
//!
//! # Security
//!
//! This crate holds the Bling API key and OAuth tokens, which grant write
//! access to the store's inventory. Bind to a private interface only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bling;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
