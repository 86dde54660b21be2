//! # Marketplace Errors
//!
//! One enum per concern. A lookup that finds nothing is `Ok(None)`, not
//! an error; these enums cover what the caller has to react to.

use dormdash_core::ValidationError;
use dormdash_state::TransitionError;
use dormdash_store::StoreError;
use thiserror::Error;

/// Errors from marketplace and conversation operations.
#[derive(Error, Debug)]
pub enum MarketError {
    /// The entity store failed.
    #[error("storage error: {0}")]
    Store(#[source] StoreError),

    /// A payload or patch failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A status change was refused by its state machine.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// A referenced user does not exist.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// A referenced service does not exist.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// Another account already uses this email.
    #[error("an account with email {0} already exists")]
    EmailTaken(String),

    /// The service no longer accepts bids or purchases.
    #[error("service {service} is {status}, not active")]
    ServiceNotActive {
        /// The service id.
        service: String,
        /// Its current status.
        status: String,
    },

    /// A provider tried to bid on or buy their own service.
    #[error("user {user} provides service {service} and cannot bid on or buy it")]
    OwnService {
        /// The acting user.
        user: String,
        /// The service id.
        service: String,
    },

    /// A user posted into a conversation they are not part of.
    #[error("user {user} is not a participant of conversation {conversation}")]
    NotAParticipant {
        /// The sender.
        user: String,
        /// The conversation id.
        conversation: String,
    },
}

/// Why a sign-in attempt failed.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No account has this email.
    #[error("no account found for this email")]
    NotFound,

    /// The account exists but the password does not match.
    #[error("incorrect password")]
    WrongPassword,

    /// The entity store failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Why a signup step failed.
#[derive(Error, Debug)]
pub enum SignupError {
    /// The signup form is invalid.
    #[error("{0}")]
    InvalidForm(#[from] ValidationError),

    /// Another account already uses this email.
    #[error("an account with email {0} already exists")]
    EmailTaken(String),

    /// No code is pending for this email (never issued, or already used).
    #[error("no verification code pending for {email}")]
    CodeNotFound {
        /// The candidate email.
        email: String,
    },

    /// The submitted code does not match. The pending code is kept.
    #[error("verification code does not match")]
    CodeMismatch,

    /// The entity store failed.
    #[error("storage error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for MarketError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(v) => Self::Validation(v),
            other => Self::Store(other),
        }
    }
}

impl From<StoreError> for SignupError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(v) => Self::InvalidForm(v),
            other => Self::Store(other),
        }
    }
}

impl SignupError {
    /// Whether the same pending signup can be retried with another code.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CodeMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_distinct() {
        assert_ne!(
            AuthError::NotFound.to_string(),
            AuthError::WrongPassword.to_string()
        );
    }

    #[test]
    fn only_mismatch_is_retryable() {
        assert!(SignupError::CodeMismatch.is_retryable());
        assert!(!SignupError::CodeNotFound {
            email: "a@utexas.edu".to_string()
        }
        .is_retryable());
        assert!(!SignupError::EmailTaken("a@utexas.edu".to_string()).is_retryable());
    }

    #[test]
    fn transition_error_passes_through() {
        let err: MarketError = TransitionError::Terminal {
            machine: "service",
            state: "completed".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "service is completed, which is terminal");
    }

    #[test]
    fn store_validation_surfaces_as_validation() {
        let err: MarketError = StoreError::from(ValidationError::Empty { field: "title" }).into();
        assert!(matches!(err, MarketError::Validation(_)));
        let err: SignupError = StoreError::from(ValidationError::Empty { field: "name" }).into();
        assert!(matches!(err, SignupError::InvalidForm(_)));
    }
}
