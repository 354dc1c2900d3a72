use crate::error::{AppError, Result};

/// Validates a class display name.
pub fn validate_class_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Class name must not be empty".to_string()));
    }
    if trimmed.len() > 255 {
        return Err(AppError::Validation(
            "Class name must be at most 255 characters".to_string(),
        ));
    }
    Ok(())
}

/// Validates a class enrollment code, e.g. "CS101".
pub fn validate_class_code(code: &str) -> Result<()> {
    if code.len() < 2 || code.len() > 32 {
        return Err(AppError::Validation(
            "Class code must be between 2 and 32 characters".to_string(),
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Validation(
            "Class code can only contain letters, numbers, and hyphens".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_must_be_non_blank() {
        assert!(validate_class_name("Computer Science Fundamentals").is_ok());
        assert!(validate_class_name("  ").is_err());
    }

    #[test]
    fn class_codes_are_short_identifiers() {
        assert!(validate_class_code("CS101").is_ok());
        assert!(validate_class_code("phys-2").is_ok());
        assert!(validate_class_code("x").is_err());
        assert!(validate_class_code("has space").is_err());
    }
}
