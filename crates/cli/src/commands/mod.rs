//! CLI subcommand implementations.

pub mod bling;
pub mod migrate;
