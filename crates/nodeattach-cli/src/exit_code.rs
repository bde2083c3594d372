//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and provide meaningful
//! status information for scripting and automation.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage error (bad arguments, bad configuration values)
pub const USAGE_ERROR: u8 = 2;

/// The node has no attachment directory
pub const NO_DIRECTORY: u8 = 3;

/// The outline document could not be read or parsed
pub const DOCUMENT_INVALID: u8 = 4;

/// Permission denied on the filesystem
pub const PERMISSION_DENIED: u8 = 5;

/// The destination already exists
pub const ALREADY_EXISTS: u8 = 6;

/// File or directory not found
pub const NOT_FOUND: u8 = 7;

/// Operation cancelled or interrupted
pub const CANCELLED: u8 = 8;
