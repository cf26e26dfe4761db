use crate::error::{AppError, Result};

/// Validates an email address.
///
/// # Arguments
///
/// * `email` - The email to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the email is valid.
pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() || email.len() > 255 {
        return Err(AppError::Validation(
            "Email must be between 1 and 255 characters".to_string(),
        ));
    }

    if email.chars().any(|c| c.is_whitespace()) {
        return Err(AppError::Validation(
            "Email must not contain whitespace".to_string(),
        ));
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(AppError::Validation("Invalid email domain".to_string()));
    }

    Ok(())
}

/// Validates a password against the minimum policy: 8 to 128 characters
/// with at least one letter and one digit.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AppError::Validation(
            "Password must contain at least one letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password must contain at least one digit".to_string(),
        ));
    }

    Ok(())
}
