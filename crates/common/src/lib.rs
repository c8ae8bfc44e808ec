//! Shared infrastructure for the pegvm workspace.
//!
//! - [`debug`] - Per-module logging controlled via the `PEGVM_DEBUG`
//!   environment variable
//! - [`intern`] - String interning using arena allocation

pub mod debug;
pub mod intern;

pub use debug::{create_logger, Logger};
pub use intern::StringInterner;
