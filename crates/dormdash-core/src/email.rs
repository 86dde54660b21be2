//! # Email Addresses
//!
//! Emails are the login handle and must be unique across users, so they
//! are normalized once, at construction: trimmed and lower-cased. Two
//! spellings of the same mailbox can then never register twice.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A normalized email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and normalize an email address.
    ///
    /// Requires exactly one `@`, a non-empty local part, a domain with at
    /// least one dot, and no whitespace.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let invalid = || ValidationError::InvalidEmail(raw.to_string());
        if normalized.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        let labels_ok = domain.split('.').count() >= 2 && domain.split('.').all(|l| !l.is_empty());
        if !labels_ok {
            return Err(invalid());
        }
        Ok(Self(normalized))
    }

    /// The normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the `@`.
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map(|(_, d)| d).unwrap_or_default()
    }

    /// Require the address to belong to `domain` (e.g. `utexas.edu`).
    pub fn ensure_domain(&self, domain: &str) -> Result<(), ValidationError> {
        if self.domain().eq_ignore_ascii_case(domain.trim_start_matches('@')) {
            Ok(())
        } else {
            Err(ValidationError::EmailDomain {
                email: self.0.clone(),
                domain: domain.trim_start_matches('@').to_string(),
            })
        }
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}
