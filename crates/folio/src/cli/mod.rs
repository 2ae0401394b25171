//! CLI support for the `folio` binary.

pub mod args;
pub mod commands;
pub mod context;
pub mod logging;

pub use context::CommandContext;
