use crate::error::{AppError, Result};

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: &str) -> Result<()> {
    if username.len() < 3 {
        return Err(AppError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    if username.len() > 64 {
        return Err(AppError::Validation(
            "Username must be at most 64 characters".to_string(),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, dots, underscores, and hyphens"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validates a password.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a display name.
pub fn validate_full_name(full_name: &str) -> Result<()> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Full name must not be empty".to_string()));
    }
    if trimmed.len() > 255 {
        return Err(AppError::Validation(
            "Full name must be at most 255 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_bounded_and_charset_limited() {
        assert!(validate_username("joao.silva").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
        assert!(validate_username("no spaces").is_err());
    }

    #[test]
    fn passwords_are_length_bounded() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("tiny").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn full_names_must_be_non_blank() {
        assert!(validate_full_name("Maria Santos").is_ok());
        assert!(validate_full_name("   ").is_err());
    }
}
