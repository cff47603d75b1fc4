//! Field-level checks shared by entity and patch validators.

use crate::errors::ModelError;

/// Names are required and must contain something besides whitespace.
pub fn validate_name(label: &str, name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::invalid(format!("{label} name is required")));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ModelError::invalid("invalid email")),
    }
}

pub fn validate_reference(field: &str, id: &str) -> Result<(), ModelError> {
    if id.trim().is_empty() {
        return Err(ModelError::invalid(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::invalid(format!("{field} must be a non-negative number")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_name_is_rejected() {
        assert!(validate_name("category", "  \t").is_err());
        assert!(validate_name("category", " Dairy ").is_ok());
    }

    #[test]
    fn email_needs_both_halves() {
        assert!(validate_email("admin@grocer.in").is_ok());
        assert!(validate_email("@grocer.in").is_err());
        assert!(validate_email("admin@").is_err());
        assert!(validate_email("admin").is_err());
    }

    #[test]
    fn negative_and_nan_amounts_are_rejected() {
        assert!(validate_non_negative("price", 0.0).is_ok());
        assert!(validate_non_negative("price", -1.0).is_err());
        assert!(validate_non_negative("price", f64::NAN).is_err());
    }
}
