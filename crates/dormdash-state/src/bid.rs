//! # Bid Settlement
//!
//! ```text
//! Pending ──▶ Accepted (terminal)
//!    │
//!    └─────▶ Rejected (terminal)
//! ```
//!
//! Accepting a bid settles the whole service: the chosen bid becomes
//! `Accepted` and every other bid on the service that is still `Pending`
//! becomes `Rejected`. Bids already settled are left alone. At most one
//! bid per service is ever `Accepted`.
//!
//! Accept and reject are idempotent against settled bids: asking again
//! changes nothing. [`plan_acceptance`] computes the settlement without
//! touching storage, so the caller can commit every status change in one
//! write.

use serde::{Deserialize, Serialize};

use crate::{Lifecycle, TransitionError};

/// The state of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BidStatus {
    /// Awaiting the provider's decision.
    #[default]
    Pending,
    /// Chosen by the provider (terminal).
    Accepted,
    /// Declined, explicitly or because another bid won (terminal).
    Rejected,
}

impl BidStatus {
    /// Whether the provider still has to decide on this bid.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl Lifecycle for BidStatus {
    const MACHINE: &'static str = "bid";

    fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    fn can_transition_to(&self, next: Self) -> bool {
        self.is_pending() && !next.is_pending()
    }
}

impl std::fmt::Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of planning the acceptance of one bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance<Id> {
    /// The target bid was already settled; nothing changes.
    Unchanged,
    /// Accept the target and reject the listed pending siblings.
    Accept {
        /// Other bids on the service that were pending and become rejected.
        rejected: Vec<Id>,
    },
}

/// Plan the acceptance of `target`.
///
/// `bids` are all bids on the target's service, the target included or
/// not. Returns [`Acceptance::Unchanged`] when the target is not pending,
/// and [`TransitionError::AlreadyAccepted`] when another bid on the
/// service already holds the acceptance.
pub fn plan_acceptance<Id>(
    target: &Id,
    target_status: BidStatus,
    bids: &[(Id, BidStatus)],
) -> Result<Acceptance<Id>, TransitionError>
where
    Id: Clone + PartialEq + std::fmt::Display,
{
    if !target_status.is_pending() {
        return Ok(Acceptance::Unchanged);
    }
    if let Some((holder, _)) = bids
        .iter()
        .find(|(id, status)| id != target && *status == BidStatus::Accepted)
    {
        return Err(TransitionError::AlreadyAccepted {
            accepted: holder.to_string(),
        });
    }
    let rejected = bids
        .iter()
        .filter(|(id, status)| id != target && status.is_pending())
        .map(|(id, _)| id.clone())
        .collect();
    Ok(Acceptance::Accept { rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pending_settles_either_way() {
        assert_eq!(
            BidStatus::Pending.transition(BidStatus::Accepted),
            Ok(BidStatus::Accepted)
        );
        assert_eq!(
            BidStatus::Pending.transition(BidStatus::Rejected),
            Ok(BidStatus::Rejected)
        );
    }

    #[test]
    fn settled_bids_cannot_flip() {
        assert!(matches!(
            BidStatus::Accepted.transition(BidStatus::Rejected),
            Err(TransitionError::Terminal { .. })
        ));
        assert!(BidStatus::Rejected.transition(BidStatus::Accepted).is_err());
        assert!(BidStatus::Rejected.transition(BidStatus::Pending).is_err());
    }

    #[test]
    fn reasserting_a_settled_status_is_allowed() {
        assert_eq!(
            BidStatus::Accepted.transition(BidStatus::Accepted),
            Ok(BidStatus::Accepted)
        );
        assert_eq!(
            BidStatus::Rejected.transition(BidStatus::Rejected),
            Ok(BidStatus::Rejected)
        );
    }

    #[test]
    fn acceptance_rejects_only_pending_siblings() {
        let bids = vec![
            (1u32, BidStatus::Pending),
            (2, BidStatus::Pending),
            (3, BidStatus::Rejected),
            (4, BidStatus::Pending),
        ];
        let plan = plan_acceptance(&2, BidStatus::Pending, &bids).unwrap();
        assert_eq!(plan, Acceptance::Accept { rejected: vec![1, 4] });
    }

    #[test]
    fn acceptance_of_settled_target_is_unchanged() {
        let bids = vec![(1u32, BidStatus::Rejected), (2, BidStatus::Pending)];
        assert_eq!(
            plan_acceptance(&1, BidStatus::Rejected, &bids),
            Ok(Acceptance::Unchanged)
        );
        assert_eq!(
            plan_acceptance(&1, BidStatus::Accepted, &[(1u32, BidStatus::Accepted)]),
            Ok(Acceptance::Unchanged)
        );
    }

    #[test]
    fn acceptance_refused_when_another_bid_holds_it() {
        let bids = vec![(1u32, BidStatus::Accepted), (2, BidStatus::Pending)];
        assert_eq!(
            plan_acceptance(&2, BidStatus::Pending, &bids),
            Err(TransitionError::AlreadyAccepted {
                accepted: "1".to_string()
            })
        );
    }

    #[test]
    fn acceptance_without_siblings_rejects_nothing() {
        assert_eq!(
            plan_acceptance(&7u32, BidStatus::Pending, &[]),
            Ok(Acceptance::Accept { rejected: vec![] })
        );
    }

    fn status() -> impl Strategy<Value = BidStatus> {
        prop_oneof![
            Just(BidStatus::Pending),
            Just(BidStatus::Rejected),
        ]
    }

    proptest! {
        /// After applying a plan, exactly one bid is accepted and no
        /// previously settled bid changed.
        #[test]
        fn settlement_leaves_exactly_one_accepted(
            statuses in proptest::collection::vec(status(), 1..12),
            pick in any::<prop::sample::Index>(),
        ) {
            let bids: Vec<(usize, BidStatus)> = statuses.into_iter().enumerate().collect();
            let target = pick.index(bids.len());
            let target_status = bids[target].1;
            let plan = plan_acceptance(&target, target_status, &bids).unwrap();

            let after: Vec<BidStatus> = bids
                .iter()
                .map(|(id, status)| match &plan {
                    Acceptance::Unchanged => *status,
                    Acceptance::Accept { .. } if *id == target => BidStatus::Accepted,
                    Acceptance::Accept { rejected } if rejected.contains(id) => BidStatus::Rejected,
                    Acceptance::Accept { .. } => *status,
                })
                .collect();

            if target_status.is_pending() {
                prop_assert_eq!(after.iter().filter(|s| **s == BidStatus::Accepted).count(), 1);
                prop_assert!(after.iter().all(|s| !s.is_pending()));
            } else {
                prop_assert_eq!(plan, Acceptance::Unchanged);
            }
            for ((_, before), now) in bids.iter().zip(&after) {
                if !before.is_pending() {
                    prop_assert_eq!(before, now);
                }
            }
        }
    }
}
