//! Input validation helpers
//!
//! Text length limits shared by the inventory, order and POS handlers.
//! SQLite TEXT has no built-in length enforcement.

use crate::utils::AppError;

/// Names: customer name, payment method label
pub const MAX_NAME_LEN: usize = 200;

/// Notes, reasons, resolution notes
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: variant keys, discount codes, payment references
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Address lines
pub const MAX_ADDRESS_LEN: usize = 500;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("restock", "reason", MAX_NOTE_LEN).is_ok());
        assert!(validate_required_text("   ", "reason", MAX_NOTE_LEN).is_err());
        assert!(validate_required_text(&"x".repeat(501), "reason", MAX_NOTE_LEN).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text(&None, "notes", MAX_NOTE_LEN).is_ok());
        assert!(validate_optional_text(&Some("ok".into()), "notes", MAX_NOTE_LEN).is_ok());
        assert!(validate_optional_text(&Some("x".repeat(101)), "code", MAX_SHORT_TEXT_LEN).is_err());
    }
}
