use std::io;

use thiserror::Error;

/// Top-level application errors.
///
/// A cancelled prompt or an empty selection is never an error; these variants
/// only cover configuration problems and host failures (prompt I/O, shell).
#[derive(Debug, Error)]
pub enum HelperError {
    /// Input was syntactically valid but semantically unsupported.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Config file could not be selected or parsed.
    #[error("invalid config: {0}")]
    Config(String),
    /// Named resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Persistent shell could not be started or written to.
    #[error("terminal error: {0}")]
    Terminal(String),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A typed result used across the crate.
pub type Result<T> = std::result::Result<T, HelperError>;

/// Generic invalid-input error.
pub const ERROR_CODE_INVALID_INPUT: &str = "E100";
/// Config selection or parse error.
pub const ERROR_CODE_CONFIG: &str = "E110";
/// Resource lookup failed.
pub const ERROR_CODE_NOT_FOUND: &str = "E300";
/// Persistent shell failure.
pub const ERROR_CODE_TERMINAL: &str = "E400";
/// Filesystem or stream I/O failed.
pub const ERROR_CODE_IO: &str = "E900";
/// Internal serialization failure.
pub const ERROR_CODE_INTERNAL: &str = "E999";

const ERROR_EXPLANATION_E100: &str = r#"E100 invalid input

The command arguments are syntactically valid but semantically unsupported.

Common fixes:
  - Run `command-helper help <command>` for exact argument usage.
  - The interactive picker needs a terminal; use `--answer` when piping."#;
const ERROR_EXPLANATION_E110: &str = r#"E110 invalid config

The selected config file could not be read as a command catalog.

Recovery:
  command-helper config path
  - Check `version = 1` and the `[commands.<name>]` tables.
  - Each `args` entry is either a string or `{ choices = [...] }`.
  - JSON settings files keep commands under "command-helper.commands".
  - The file must be a regular file that is not world writable (`chmod o-w`)."#;
const ERROR_EXPLANATION_E300: &str = r#"E300 resource not found

The referenced command name is not in the loaded catalog.

Recovery:
  command-helper list"#;
const ERROR_EXPLANATION_E400: &str = r#"E400 terminal error

The persistent shell could not be started or stopped accepting input.

Recovery:
  - Check `[terminal] shell` in the config or the `SHELL` variable.
  - Retry the command."#;
const ERROR_EXPLANATION_E900: &str = r#"E900 I/O failure

A filesystem or stream operation failed.

Recovery:
  - Check that the config file is readable.
  - Retry the command."#;
const ERROR_EXPLANATION_E999: &str = r#"E999 internal failure

An unexpected serialization failure occurred.

Recovery:
  - Retry with `COMMAND_HELPER_LOG=debug` and report the output."#;

const KNOWN_ERROR_CODES: [&str; 6] = [
    ERROR_CODE_INVALID_INPUT,
    ERROR_CODE_CONFIG,
    ERROR_CODE_NOT_FOUND,
    ERROR_CODE_TERMINAL,
    ERROR_CODE_IO,
    ERROR_CODE_INTERNAL,
];

/// Returns the stable error code for a runtime error.
pub fn classify_error_code(error: &HelperError) -> &'static str {
    match error {
        HelperError::InvalidInput(_) => ERROR_CODE_INVALID_INPUT,
        HelperError::Config(_) => ERROR_CODE_CONFIG,
        HelperError::NotFound(_) => ERROR_CODE_NOT_FOUND,
        HelperError::Terminal(_) => ERROR_CODE_TERMINAL,
        HelperError::Io(_) => ERROR_CODE_IO,
        HelperError::Json(_) => ERROR_CODE_INTERNAL,
    }
}

/// Normalizes a user-provided error code for lookups.
pub fn normalize_error_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Returns an explanation block for a known error code.
pub fn explain_error_code(raw: &str) -> Option<&'static str> {
    let normalized = normalize_error_code(raw);
    match normalized.as_str() {
        ERROR_CODE_INVALID_INPUT => Some(ERROR_EXPLANATION_E100),
        ERROR_CODE_CONFIG => Some(ERROR_EXPLANATION_E110),
        ERROR_CODE_NOT_FOUND => Some(ERROR_EXPLANATION_E300),
        ERROR_CODE_TERMINAL => Some(ERROR_EXPLANATION_E400),
        ERROR_CODE_IO => Some(ERROR_EXPLANATION_E900),
        ERROR_CODE_INTERNAL => Some(ERROR_EXPLANATION_E999),
        _ => None,
    }
}

/// Stable list of explainable error codes.
pub fn known_error_codes() -> &'static [&'static str] {
    &KNOWN_ERROR_CODES
}
