//! Command implementations

pub mod clean;
pub mod completions;
pub mod generate;
pub mod order;
pub mod providers;
pub mod uses;
