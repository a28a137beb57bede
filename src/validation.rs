use crate::error::{AppError, AppResult};

/// Maximum length for example names, in characters.
///
/// Matches the bounded `name` column of the examples table.
pub const MAX_NAME_LENGTH: usize = 100;

/// Validate an example name before it reaches the repository.
///
/// Rules:
/// - Must contain at least one non-whitespace character
/// - Must not exceed 100 characters
///
/// The name is stored exactly as supplied; surrounding whitespace is only
/// ignored for the emptiness check.
pub fn validate_example_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Example name cannot be empty".to_string(),
        ));
    }

    let length = name.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Example name cannot exceed {MAX_NAME_LENGTH} characters (got {length})"
        )));
    }

    Ok(())
}
