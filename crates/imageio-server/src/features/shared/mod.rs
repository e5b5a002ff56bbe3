//! Shared utilities for feature modules
//!
//! - **validation**: input validation helpers
//! - **test_helpers**: in-memory feature state for route tests (test-only)

pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use validation::{validate_id, validate_name, NameValidationError};
