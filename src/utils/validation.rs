use crate::error::{AppError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(AppError::BadRequest("Invalid email address".to_string())),
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Name cannot be empty".to_string()));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_needs_one_at_between_non_empty_parts() {
        assert!(validate_email("buyer@shop.ge").is_ok());
        assert!(validate_email("buyer@localhost").is_ok());
        assert!(validate_email("@shop.ge").is_err());
        assert!(validate_email("buyer@").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_email("buyer.shop.ge").is_err());
    }

    #[test]
    fn password_length_counts_chars() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("ბბბბბბ").is_ok());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Buyer@Shop.GE "), "buyer@shop.ge");
    }
}
