//! CLI Exit Code Registry
//!
//! Single source of truth for `refmerge` exit codes.
//! Scripts and schedulers branch on these, so treat them as a contract.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                    |
//! |------|-----------|------------------------------------------------|
//! | 0    | Universal | Success                                        |
//! | 2    | Universal | CLI usage error (bad args, no output target)   |
//! | 60   | link      | Config file unreadable, malformed, or invalid  |
//! | 61   | link      | An input table could not be read or parsed     |
//! | 62   | link      | Pipeline failed structurally                   |
//! | 63   | link      | Output table or report could not be written    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `link_exit_code` or the command's error handling

use refmerge_linkage::LinkageError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Link (60-69)
// =============================================================================

/// Config cannot be read, is not valid TOML, or fails validation.
pub const EXIT_LINK_INVALID_CONFIG: u8 = 60;

/// A primary or source CSV cannot be read or parsed.
pub const EXIT_LINK_INPUT: u8 = 61;

/// Structural failure while running stages (missing table, column collision).
pub const EXIT_LINK_RUNTIME: u8 = 62;

/// Output CSV or JSON report cannot be written.
pub const EXIT_LINK_OUTPUT: u8 = 63;

/// Map an engine error to its exit code.
pub fn link_exit_code(err: &LinkageError) -> u8 {
    match err {
        LinkageError::ConfigParse(_)
        | LinkageError::ConfigValidation(_)
        | LinkageError::UnknownSource(_)
        | LinkageError::KeyArity { .. } => EXIT_LINK_INVALID_CONFIG,
        LinkageError::Csv(_) | LinkageError::Io(_) => EXIT_LINK_INPUT,
        LinkageError::MissingTable(_) | LinkageError::ColumnCollision { .. } => EXIT_LINK_RUNTIME,
    }
}
