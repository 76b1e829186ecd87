//! Validation helpers and constants for API handlers

use validator::ValidationError;

/// Identity provider's minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Longest password the identity provider accepts (bcrypt input limit)
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Password rules shared by setup-admin, create-user and update-user-password
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_short"));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_long"));
    }
    if password.trim().is_empty() {
        return Err(ValidationError::new("password_blank"));
    }
    Ok(())
}

/// Payment provider customer ids look like `cus_...`
pub fn validate_billing_customer_id(id: &str) -> Result<(), ValidationError> {
    let valid = id.starts_with("cus_")
        && id.len() > 4
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_customer_id"))
    }
}
