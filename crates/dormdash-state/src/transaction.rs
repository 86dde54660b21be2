//! # Transaction Status
//!
//! ```text
//! Pending ──▶ Completed ──▶ Refunded (terminal)
//!    │                        ▲
//!    └────────────────────────┘
//! ```
//!
//! Buy-now records transactions directly as `Completed`: the payment step
//! is mocked and settles synchronously. `Pending` exists for flows where
//! settlement is deferred.

use serde::{Deserialize, Serialize};

use crate::Lifecycle;

/// The state of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionStatus {
    /// Payment initiated, not yet settled.
    Pending,
    /// Payment settled.
    Completed,
    /// Payment returned to the buyer (terminal).
    Refunded,
}

impl TransactionStatus {
    /// The serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
        }
    }
}

impl Lifecycle for TransactionStatus {
    const MACHINE: &'static str = "transaction";

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded)
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Refunded)
                | (Self::Completed, Self::Refunded)
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_can_be_refunded() {
        assert_eq!(
            TransactionStatus::Completed.transition(TransactionStatus::Refunded),
            Ok(TransactionStatus::Refunded)
        );
    }

    #[test]
    fn completed_cannot_go_back_to_pending() {
        assert!(TransactionStatus::Completed
            .transition(TransactionStatus::Pending)
            .is_err());
    }

    #[test]
    fn refunded_is_terminal() {
        assert!(TransactionStatus::Refunded.is_terminal());
        assert!(TransactionStatus::Refunded
            .transition(TransactionStatus::Completed)
            .is_err());
    }

    #[test]
    fn serde_names() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
