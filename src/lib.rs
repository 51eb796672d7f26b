//! Shipyard - a multi-target build orchestrator for modular projects
//!
//! This crate provides the core library functionality for Shipyard:
//! dependency ordering, target-aware capability resolution, source
//! analysis and transactional generation of build artifacts.

pub mod analysis;
pub mod core;
pub mod generate;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities for Shipyard unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides throw-away project fixtures and a capturing shell.
#[cfg(test)]
pub mod test_support;

pub use core::{Module, Target, Workspace};
pub use generate::FileSynthesizer;
pub use util::context::GlobalContext;
