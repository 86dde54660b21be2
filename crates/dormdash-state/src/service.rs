//! # Service Listing Lifecycle
//!
//! ```text
//! Active ──▶ InProgress ──▶ Completed (terminal)
//!                 │
//!                 └──────▶ Cancelled (terminal)
//! ```
//!
//! A listing is created `Active`. The only automatic move is
//! `Active → InProgress`, taken when a purchase is recorded. The terminal
//! states are reached only through explicit administrative updates.

use serde::{Deserialize, Serialize};

use crate::Lifecycle;

/// The lifecycle state of a listed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceStatus {
    /// Open for bids and purchase.
    #[default]
    Active,
    /// Purchased; the work is underway.
    InProgress,
    /// Work delivered (terminal).
    Completed,
    /// Called off after purchase (terminal).
    Cancelled,
}

impl ServiceStatus {
    /// Whether the listing accepts bids and purchases.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// The serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Lifecycle for ServiceStatus {
    const MACHINE: &'static str = "service";

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransitionError;

    const ALL: [ServiceStatus; 4] = [
        ServiceStatus::Active,
        ServiceStatus::InProgress,
        ServiceStatus::Completed,
        ServiceStatus::Cancelled,
    ];

    #[test]
    fn default_is_active() {
        assert_eq!(ServiceStatus::default(), ServiceStatus::Active);
        assert!(ServiceStatus::Active.is_open());
    }

    #[test]
    fn purchase_moves_active_to_in_progress() {
        assert_eq!(
            ServiceStatus::Active.transition(ServiceStatus::InProgress),
            Ok(ServiceStatus::InProgress)
        );
    }

    #[test]
    fn in_progress_reaches_both_terminals() {
        assert!(ServiceStatus::InProgress
            .transition(ServiceStatus::Completed)
            .is_ok());
        assert!(ServiceStatus::InProgress
            .transition(ServiceStatus::Cancelled)
            .is_ok());
    }

    #[test]
    fn active_cannot_skip_to_terminal() {
        assert!(matches!(
            ServiceStatus::Active.transition(ServiceStatus::Completed),
            Err(TransitionError::Invalid { .. })
        ));
        assert!(ServiceStatus::Active
            .transition(ServiceStatus::Cancelled)
            .is_err());
    }

    #[test]
    fn status_never_moves_backwards() {
        assert!(ServiceStatus::InProgress
            .transition(ServiceStatus::Active)
            .is_err());
    }

    #[test]
    fn terminal_states_reject_everything_but_themselves() {
        for terminal in [ServiceStatus::Completed, ServiceStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in ALL {
                let result = terminal.transition(next);
                if next == terminal {
                    assert_eq!(result, Ok(terminal));
                } else {
                    assert!(matches!(result, Err(TransitionError::Terminal { .. })));
                }
            }
        }
    }

    #[test]
    fn self_transition_is_a_no_op() {
        for status in ALL {
            assert_eq!(status.transition(status), Ok(status));
        }
    }

    #[test]
    fn serde_uses_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ServiceStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }
}
