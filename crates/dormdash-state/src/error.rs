//! # Transition Errors
//!
//! Rejections carry the machine, the current state and the attempted
//! target, so a caller can say exactly which move was refused.

use thiserror::Error;

/// A status change was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The target state is not reachable from the current state.
    #[error("invalid {machine} transition: {from} -> {to}")]
    Invalid {
        /// Which state machine (`service`, `bid`, `transaction`).
        machine: &'static str,
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The current state is terminal.
    #[error("{machine} is {state}, which is terminal")]
    Terminal {
        /// Which state machine.
        machine: &'static str,
        /// The terminal state.
        state: String,
    },

    /// Another bid on the same service has already been accepted.
    #[error("bid {accepted} is already accepted for this service")]
    AlreadyAccepted {
        /// The bid holding the acceptance.
        accepted: String,
    },
}
