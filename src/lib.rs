#![deny(missing_docs)]
//! Command helper: pick a configured shell command, fill its templated
//! arguments, and send the result to a persistent shell.

/// Command catalog and pick-list construction.
pub mod catalog;
/// Command-line interface.
pub mod cli;
/// Config discovery, parsing and validation.
pub mod config;
/// Error types.
pub mod error;
/// Log subscriber setup.
pub mod logging;
/// Prompt abstraction used by runs.
pub mod prompt;
/// The run flow.
pub mod runner;
/// Placeholder substitution.
pub mod template;
/// Persistent terminal handling.
pub mod terminal;
/// Shared types.
pub mod types;
