//! # dormdash-state: Status State Machines
//!
//! The three status machines of the marketplace and the rules coupling
//! them, as pure functions over status values. Nothing here touches
//! storage; the market crate loads records, asks these machines what the
//! next state is, and commits the result.
//!
//! ## State Machines
//!
//! - **Service** (`service.rs`): `active → in-progress → completed | cancelled`.
//!
//! - **Bid** (`bid.rs`): `pending → accepted | rejected`, plus the
//!   settlement planner that accepts one bid and rejects every other
//!   pending bid on the same service.
//!
//! - **Transaction** (`transaction.rs`): `pending → completed → refunded`,
//!   with `pending → refunded` for payments that never settled.
//!
//! ## Design
//!
//! Statuses are plain enums checked at runtime through the [`Lifecycle`]
//! trait. Re-asserting the current state is always allowed and changes
//! nothing.

pub mod bid;
pub mod error;
pub mod service;
pub mod transaction;

pub use bid::{plan_acceptance, Acceptance, BidStatus};
pub use error::TransitionError;
pub use service::ServiceStatus;
pub use transaction::TransactionStatus;

/// Shared behavior of the status machines.
pub trait Lifecycle: Copy + Eq + std::fmt::Display {
    /// Name of the machine, used in error messages.
    const MACHINE: &'static str;

    /// Whether no transition leaves this state.
    fn is_terminal(&self) -> bool;

    /// Whether `next` is directly reachable from `self`.
    ///
    /// Does not include the self-loop; see [`Lifecycle::transition`].
    fn can_transition_to(&self, next: Self) -> bool;

    /// Validate a move to `next`.
    ///
    /// Moving to the current state is an idempotent no-op and always
    /// succeeds, including on terminal states.
    fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self == next || self.can_transition_to(next) {
            return Ok(next);
        }
        if self.is_terminal() {
            return Err(TransitionError::Terminal {
                machine: Self::MACHINE,
                state: self.to_string(),
            });
        }
        Err(TransitionError::Invalid {
            machine: Self::MACHINE,
            from: self.to_string(),
            to: next.to_string(),
        })
    }
}
