//! High-level operations.
//!
//! This module contains the implementation of Shipyard commands.

pub mod clean;
pub mod generate;
pub mod query;

pub use clean::clean;
pub use generate::{generate, GenerateOptions, GenerateReport, MissingProvider};
pub use query::{module_order, providers, uses, ProviderEntry};
