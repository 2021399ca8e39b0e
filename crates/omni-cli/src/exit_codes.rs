//! Exit codes for CLI operations
//!
//! Follows the Unix convention with a few codes specific to templates.

/// Operation completed without errors
pub const SUCCESS: i32 = 0;

/// Unspecified failure
pub const ERROR: i32 = 1;

/// The template failed structural validation
pub const VALIDATION_ERROR: i32 = 2;

/// A template could not be composed, split or parsed
pub const TEMPLATE_ERROR: i32 = 3;

/// File not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
