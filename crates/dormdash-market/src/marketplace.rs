//! # Marketplace Lifecycle Engine
//!
//! Every state change on services, bids and transactions, and the rules
//! that couple them:
//!
//! - **Accepting a bid** accepts the target and rejects every other
//!   pending bid on the same service, in one commit. Settled bids are not
//!   re-evaluated. At most one bid per service is ever accepted.
//! - **Buying now** records a completed transaction at the listed price
//!   and moves the service to `in-progress`, in one commit.
//! - Bids and purchases require an `active` service, and a provider
//!   cannot bid on or buy their own service.
//!
//! Unknown ids in the operation's subject (the bid being accepted, the
//! service being bought) are `Ok(None)`. Unknown ids in a payload (the
//! provider of a new service, the buyer) are errors.

use std::cmp::Reverse;
use std::str::FromStr;

use dormdash_core::{
    Amount, BidId, ServiceCategory, ServiceId, TransactionId, UserId, ValidationError,
};
use dormdash_state::{
    plan_acceptance, Acceptance, BidStatus, Lifecycle, ServiceStatus, TransactionStatus,
};
use dormdash_store::{EntityStore, StoreError, Txn};

use crate::error::MarketError;
use crate::model::{
    Bid, BidPatch, NewBid, NewService, NewTransaction, Service, ServicePatch, Transaction,
    TransactionPatch, User,
};

// ── Browse ─────────────────────────────────────────────────────────────

/// Ordering of browse results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently listed first.
    #[default]
    Newest,
    /// Cheapest first.
    PriceLow,
    /// Most expensive first.
    PriceHigh,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "price-low" | "price_low" => Ok(Self::PriceLow),
            "price-high" | "price_high" => Ok(Self::PriceHigh),
            other => Err(format!(
                "unknown sort order {other:?} (expected newest, price-low or price-high)"
            )),
        }
    }
}

/// Browse filter. Only `active` services are ever listed.
#[derive(Debug, Clone, Default)]
pub struct ServiceQuery {
    /// Case-insensitive text matched against title, description, location.
    pub search: Option<String>,
    pub category: Option<ServiceCategory>,
    pub sort: SortOrder,
}

// ── Dashboard ──────────────────────────────────────────────────────────

/// A user's activity across the marketplace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// Every service the user provides, newest first.
    pub listings: Vec<Service>,
    /// Bids the user placed, newest first.
    pub bids: Vec<Bid>,
    /// Transactions where the user is the buyer, newest first.
    pub purchases: Vec<Transaction>,
    /// Transactions where the user is the seller, newest first.
    pub earnings: Vec<Transaction>,
}

impl Dashboard {
    pub fn active_listings(&self) -> usize {
        self.listings
            .iter()
            .filter(|s| s.status == ServiceStatus::Active)
            .count()
    }

    pub fn pending_bids(&self) -> usize {
        self.bids.iter().filter(|b| b.status.is_pending()).count()
    }

    /// Sum of sales, excluding refunded ones.
    pub fn total_earned(&self) -> Amount {
        settled_total(&self.earnings)
    }

    /// Sum of purchases, excluding refunded ones.
    pub fn total_spent(&self) -> Amount {
        settled_total(&self.purchases)
    }
}

fn settled_total(txs: &[Transaction]) -> Amount {
    txs.iter()
        .filter(|t| t.status != TransactionStatus::Refunded)
        .map(|t| t.amount)
        .sum()
}

/// Newest first; records sharing a timestamp come out latest-inserted first.
fn newest_first<T>(items: &mut [T], created: impl Fn(&T) -> dormdash_core::Timestamp) {
    items.reverse();
    items.sort_by_key(|item| Reverse(created(item)));
}

// ── Engine ─────────────────────────────────────────────────────────────

/// The lifecycle engine over an [`EntityStore`].
#[derive(Debug, Clone, Copy)]
pub struct Marketplace<'a> {
    store: &'a EntityStore,
}

impl<'a> Marketplace<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    // ── Services ───────────────────────────────────────────────────────

    /// List a service. The provider must exist.
    pub fn create_service(&self, draft: NewService) -> Result<Service, MarketError> {
        self.store.transaction(|txn| {
            require_user(txn, &draft.provider_id)?;
            let service = txn.create(draft)?;
            tracing::info!(service = %service.id, provider = %service.provider_id, "service listed");
            Ok(service)
        })
    }

    pub fn service(&self, id: &ServiceId) -> Result<Option<Service>, StoreError> {
        self.store.get(id)
    }

    /// Every service, any status, in listing order.
    pub fn services(&self) -> Result<Vec<Service>, StoreError> {
        self.store.read_all()
    }

    /// Active services matching `query`.
    pub fn browse(&self, query: &ServiceQuery) -> Result<Vec<Service>, StoreError> {
        let search = query.search.as_deref().unwrap_or("");
        let mut found = self.store.filter(|s: &Service| {
            s.status == ServiceStatus::Active
                && query.category.map_or(true, |c| s.category == c)
                && s.matches_text(search)
        })?;
        match query.sort {
            SortOrder::Newest => newest_first(&mut found, |s| s.created_at),
            SortOrder::PriceLow => found.sort_by_key(|s| s.price),
            SortOrder::PriceHigh => found.sort_by_key(|s| Reverse(s.price)),
        }
        Ok(found)
    }

    /// Services listed by `provider`, newest first.
    pub fn services_by_provider(&self, provider: &UserId) -> Result<Vec<Service>, StoreError> {
        let mut found = self.store.filter(|s: &Service| &s.provider_id == provider)?;
        newest_first(&mut found, |s| s.created_at);
        Ok(found)
    }

    /// Generic partial update, including administrative status moves.
    pub fn update_service(
        &self,
        id: &ServiceId,
        patch: ServicePatch,
    ) -> Result<Option<Service>, MarketError> {
        let updated = self.store.update::<Service, _>(id, patch)?;
        if let Some(service) = &updated {
            tracing::debug!(service = %service.id, status = %service.status, "service updated");
        }
        Ok(updated)
    }

    /// `in-progress → completed`.
    pub fn complete_service(&self, id: &ServiceId) -> Result<Option<Service>, MarketError> {
        self.set_service_status(id, ServiceStatus::Completed)
    }

    /// `in-progress → cancelled`.
    pub fn cancel_service(&self, id: &ServiceId) -> Result<Option<Service>, MarketError> {
        self.set_service_status(id, ServiceStatus::Cancelled)
    }

    fn set_service_status(
        &self,
        id: &ServiceId,
        status: ServiceStatus,
    ) -> Result<Option<Service>, MarketError> {
        let updated = self.store.update::<Service, _>(id, ServicePatch::status(status))?;
        if let Some(service) = &updated {
            tracing::info!(service = %service.id, %status, "service status changed");
        }
        Ok(updated)
    }

    // ── Bids ───────────────────────────────────────────────────────────

    /// Bid on an active service.
    pub fn place_bid(&self, draft: NewBid) -> Result<Bid, MarketError> {
        self.store.transaction(|txn| {
            let service = require_service(txn, &draft.service_id)?;
            ensure_active(&service)?;
            require_user(txn, &draft.bidder_id)?;
            ensure_not_provider(&service, &draft.bidder_id)?;
            let bid = txn.create(draft)?;
            tracing::info!(bid = %bid.id, service = %bid.service_id, amount = %bid.amount, "bid placed");
            Ok(bid)
        })
    }

    pub fn bid(&self, id: &BidId) -> Result<Option<Bid>, StoreError> {
        self.store.get(id)
    }

    /// Bids on `service`, newest first.
    pub fn bids_for_service(&self, service: &ServiceId) -> Result<Vec<Bid>, StoreError> {
        let mut found = self.store.filter(|b: &Bid| &b.service_id == service)?;
        newest_first(&mut found, |b| b.created_at);
        Ok(found)
    }

    /// Bids placed by `bidder`, newest first.
    pub fn bids_by_bidder(&self, bidder: &UserId) -> Result<Vec<Bid>, StoreError> {
        let mut found = self.store.filter(|b: &Bid| &b.bidder_id == bidder)?;
        newest_first(&mut found, |b| b.created_at);
        Ok(found)
    }

    /// Accept a bid and reject its pending siblings.
    ///
    /// A bid that is already settled is returned unchanged. Refused when
    /// the service is no longer active or another bid already holds the
    /// acceptance.
    pub fn accept_bid(&self, id: &BidId) -> Result<Option<Bid>, MarketError> {
        self.store.transaction(|txn| {
            let Some(bid) = txn.get::<Bid>(id)? else {
                return Ok(None);
            };
            let siblings: Vec<(BidId, BidStatus)> = txn
                .filter(|b: &Bid| b.service_id == bid.service_id)?
                .into_iter()
                .map(|b| (b.id, b.status))
                .collect();
            let rejected = match plan_acceptance(&bid.id, bid.status, &siblings)? {
                Acceptance::Unchanged => return Ok(Some(bid)),
                Acceptance::Accept { rejected } => rejected,
            };
            let service = require_service(txn, &bid.service_id)?;
            ensure_active(&service)?;

            for other in &rejected {
                txn.update::<Bid, _>(
                    other,
                    BidPatch {
                        status: BidStatus::Rejected,
                    },
                )?;
            }
            let accepted = txn.update::<Bid, _>(
                id,
                BidPatch {
                    status: BidStatus::Accepted,
                },
            )?;
            tracing::info!(
                bid = %bid.id,
                service = %bid.service_id,
                rejected = rejected.len(),
                "bid accepted"
            );
            Ok(accepted)
        })
    }

    /// Reject one bid. Other bids are untouched; a settled bid is returned unchanged.
    pub fn reject_bid(&self, id: &BidId) -> Result<Option<Bid>, MarketError> {
        self.store.transaction(|txn| {
            let Some(bid) = txn.get::<Bid>(id)? else {
                return Ok(None);
            };
            if !bid.status.is_pending() {
                return Ok(Some(bid));
            }
            let rejected = txn.update::<Bid, _>(
                id,
                BidPatch {
                    status: BidStatus::Rejected,
                },
            )?;
            tracing::info!(bid = %bid.id, "bid rejected");
            Ok(rejected)
        })
    }

    /// Move a bid to `status`, keeping acceptance exclusive.
    ///
    /// `accepted` and `rejected` behave as [`accept_bid`](Self::accept_bid)
    /// and [`reject_bid`](Self::reject_bid). Asking for `pending` only
    /// succeeds on a bid that is still pending.
    pub fn update_bid(&self, id: &BidId, status: BidStatus) -> Result<Option<Bid>, MarketError> {
        match status {
            BidStatus::Accepted => self.accept_bid(id),
            BidStatus::Rejected => self.reject_bid(id),
            BidStatus::Pending => {
                let Some(bid) = self.store.get::<Bid>(id)? else {
                    return Ok(None);
                };
                bid.status.transition(BidStatus::Pending)?;
                Ok(Some(bid))
            }
        }
    }

    // ── Purchases ──────────────────────────────────────────────────────

    /// Buy an active service outright at its listed price.
    ///
    /// Records a `completed` transaction and moves the service to
    /// `in-progress`, in one commit.
    pub fn buy_now(
        &self,
        service: &ServiceId,
        buyer: &UserId,
    ) -> Result<Option<Transaction>, MarketError> {
        self.store.transaction(|txn| {
            let Some(listing) = txn.get::<Service>(service)? else {
                return Ok(None);
            };
            ensure_active(&listing)?;
            require_user(txn, buyer)?;
            ensure_not_provider(&listing, buyer)?;
            let tx = txn.create(NewTransaction {
                service_id: listing.id.clone(),
                buyer_id: buyer.clone(),
                seller_id: listing.provider_id.clone(),
                amount: listing.price,
                status: TransactionStatus::Completed,
            })?;
            txn.update::<Service, _>(service, ServicePatch::status(ServiceStatus::InProgress))?;
            tracing::info!(
                transaction = %tx.id,
                service = %tx.service_id,
                amount = %tx.amount,
                "purchase recorded"
            );
            Ok(Some(tx))
        })
    }

    pub fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        self.store.get(id)
    }

    /// Transactions where `user` is buyer or seller, newest first.
    pub fn transactions_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, StoreError> {
        let mut found = self.store.filter(|t: &Transaction| t.involves(user))?;
        newest_first(&mut found, |t| t.created_at);
        Ok(found)
    }

    /// Mark a transaction refunded.
    pub fn refund_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, MarketError> {
        let refunded = self.store.update::<Transaction, _>(
            id,
            TransactionPatch {
                status: TransactionStatus::Refunded,
            },
        )?;
        if let Some(tx) = &refunded {
            tracing::info!(transaction = %tx.id, "transaction refunded");
        }
        Ok(refunded)
    }

    // ── Dashboard ──────────────────────────────────────────────────────

    /// Listings, bids, purchases and earnings of `user`.
    pub fn dashboard(&self, user: &UserId) -> Result<Dashboard, StoreError> {
        let (purchases, earnings): (Vec<Transaction>, Vec<Transaction>) = self
            .transactions_for_user(user)?
            .into_iter()
            .partition(|t| &t.buyer_id == user);
        Ok(Dashboard {
            listings: self.services_by_provider(user)?,
            bids: self.bids_by_bidder(user)?,
            purchases,
            earnings,
        })
    }
}

fn require_user(txn: &mut Txn<'_>, id: &UserId) -> Result<User, MarketError> {
    txn.get::<User>(id)?
        .ok_or_else(|| MarketError::UnknownUser(id.to_string()))
}

fn require_service(txn: &mut Txn<'_>, id: &ServiceId) -> Result<Service, MarketError> {
    txn.get::<Service>(id)?
        .ok_or_else(|| MarketError::UnknownService(id.to_string()))
}

fn ensure_active(service: &Service) -> Result<(), MarketError> {
    if !service.status.is_open() {
        return Err(MarketError::ServiceNotActive {
            service: service.id.to_string(),
            status: service.status.to_string(),
        });
    }
    Ok(())
}

fn ensure_not_provider(service: &Service, user: &UserId) -> Result<(), MarketError> {
    if &service.provider_id == user {
        return Err(MarketError::OwnService {
            user: user.to_string(),
            service: service.id.to_string(),
        });
    }
    Ok(())
}

/// Parse a browse category from user input. Empty or `all` means no filter.
pub fn parse_category_filter(raw: &str) -> Result<Option<ServiceCategory>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    raw.parse().map(Some)
}
