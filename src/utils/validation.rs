//! Input validation primitives.
//!
//! Provides ergonomic helpers for common validation patterns:
//! - Validating non-empty strings
//! - Email address validation (certificate contact)

use crate::error::{Error, Result};
use regex::Regex;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message))
    } else {
        Ok(trimmed)
    }
}

/// Check whether a value looks like a valid email address.
pub fn is_valid_email(value: &str) -> bool {
    match Regex::new(EMAIL_PATTERN) {
        Ok(re) => re.is_match(value),
        Err(_) => false,
    }
}

/// Require a valid email address for the given field.
pub fn require_email<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    if is_valid_email(value) {
        Ok(value)
    } else {
        Err(Error::validation_invalid_argument(
            field,
            format!("'{}' is not a valid email address", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_non_empty_passes_for_non_empty() {
        let result = require_non_empty("api", "serviceName", "msg");
        assert_eq!(result.unwrap(), "api");
    }

    #[test]
    fn require_non_empty_trims_whitespace() {
        let result = require_non_empty("  api  ", "serviceName", "msg");
        assert_eq!(result.unwrap(), "api");
    }

    #[test]
    fn require_non_empty_fails_for_whitespace_only() {
        let result = require_non_empty("   ", "serviceName", "Cannot be empty");
        assert!(result.is_err());
    }

    #[test]
    fn accepts_plain_email() {
        assert!(is_valid_email("ops@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn require_email_reports_field() {
        let err = require_email("nope", "certEmail").unwrap_err();
        assert!(err.message.contains("nope"));
    }
}
