//! Validation helpers for DTOs.

use validator::{ValidationError, ValidationErrors};

/// Rejects empty or whitespace-only text.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Record `err` under `field` when `result` failed.
pub fn collect(errors: &mut ValidationErrors, field: &'static str, result: Result<(), ValidationError>) {
    if let Err(err) = result {
        errors.add(field, err);
    }
}

/// Build a field error with a human-readable message.
pub fn field_error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let message: String = message.into();
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Turn accumulated errors into a result.
pub fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(validate_not_blank("Science").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \t").is_err());
    }

    #[test]
    fn collect_and_finish() {
        let mut errors = ValidationErrors::new();
        collect(&mut errors, "name", validate_not_blank("ok"));
        assert!(finish(errors.clone()).is_ok());

        collect(&mut errors, "name", validate_not_blank(" "));
        let err = finish(errors).unwrap_err();
        assert!(err.field_errors().contains_key("name"));
    }
}
