//! Test utilities for shipyard unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use shipyard::test_support::{java, WorkspaceFixture};
//!
//! let fixture = WorkspaceFixture::new("demo")
//!     .module("core", "")
//!     .file("core/src/Main.java", java::plain("com.example", "Main"))
//!     .write();
//! ```

pub mod fixtures;

pub use fixtures::*;

use crate::util::shell::{ColorChoice, Shell, ShellMode, Verbosity};

/// A shell that records status lines without colors.
pub fn capture_shell() -> Shell {
    Shell::capturing(ShellMode::Human {
        verbosity: Verbosity::Normal,
        color: ColorChoice::Never,
    })
}
