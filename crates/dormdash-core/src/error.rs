//! # Error Types
//!
//! Validation errors for core value types and record payloads. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Validation failures carry the offending field and, where useful, the
//! rejected input, so the calling layer can render a message without
//! re-deriving what went wrong.

use thiserror::Error;

/// A payload or value failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    #[error("{field} is required")]
    Empty {
        /// The field name.
        field: &'static str,
    },

    /// A monetary amount must be strictly positive.
    #[error("{field} must be greater than zero")]
    NonPositiveAmount {
        /// The field name.
        field: &'static str,
    },

    /// A monetary amount could not be parsed.
    #[error("invalid amount: {0:?} (expected dollars with at most two decimals)")]
    InvalidAmount(String),

    /// Email address does not have the `local@domain` shape.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    /// Email address is outside the community's domain.
    #[error("email {email:?} must use the @{domain} domain")]
    EmailDomain {
        /// The rejected email.
        email: String,
        /// The required domain.
        domain: String,
    },

    /// Password shorter than the configured minimum.
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum number of characters.
        min: usize,
    },

    /// A schedule or timestamp string is not well-formed.
    #[error("invalid date/time {value:?}: {reason}")]
    InvalidDateTime {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Unknown service category name.
    #[error("unknown service category: {0:?}")]
    UnknownCategory(String),

    /// An identifier string is not a valid UUID.
    #[error("invalid {kind} id: {value:?}")]
    InvalidId {
        /// The identifier kind (`user`, `service`, ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Two user references that must differ are the same user.
    #[error("{first} and {second} must be different users")]
    SameUser {
        /// The first field.
        first: &'static str,
        /// The second field.
        second: &'static str,
    },

    /// A password digest string is not in `sha256:<salt>:<hash>` form.
    #[error("malformed password digest")]
    MalformedDigest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_display() {
        let err = ValidationError::Empty { field: "title" };
        assert_eq!(err.to_string(), "title is required");
    }

    #[test]
    fn email_domain_display_names_both_parts() {
        let err = ValidationError::EmailDomain {
            email: "bevo@gmail.com".to_string(),
            domain: "utexas.edu".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bevo@gmail.com"));
        assert!(msg.contains("@utexas.edu"));
    }

    #[test]
    fn invalid_id_display() {
        let err = ValidationError::InvalidId {
            kind: "service",
            value: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "invalid service id: \"nope\"");
    }
}
