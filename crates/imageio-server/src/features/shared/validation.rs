//! Input validation helpers

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameValidationError {
    #[error("Name is required and cannot be empty")]
    Required,
    #[error("Name must be at most {max_length} characters")]
    TooLong { max_length: usize },
}

/// Validate a display name
///
/// # Rules
/// - Must not be empty after trimming
/// - At most `max_length` characters after trimming
pub fn validate_name(name: &str, max_length: usize) -> Result<(), NameValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameValidationError::Required);
    }

    if trimmed.chars().count() > max_length {
        return Err(NameValidationError::TooLong { max_length });
    }

    Ok(())
}

/// Database ids are positive
pub fn validate_id(id: i64) -> bool {
    id > 0
}
