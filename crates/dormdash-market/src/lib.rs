//! # dormdash-market: Marketplace Core
//!
//! The domain layer of DormDash, built entirely on `dormdash-store`:
//!
//! - **Identity & Session** (`accounts.rs`): users, credential checks,
//!   the current-user pointer, and code-gated signup.
//!
//! - **Marketplace Lifecycle Engine** (`marketplace.rs`): services, bids
//!   and transactions, bid acceptance exclusivity, buy-now.
//!
//! - **Conversation Directory** (`conversations.rs`): deduplicated
//!   two-party threads per service, ordered messages, the inbox.
//!
//! - **Records** (`model.rs`): the persisted entities with their drafts
//!   and patches.
//!
//! [`Market`] owns the store and the configuration and hands out the
//! three components, each borrowing the same store.
//!
//! ## Crate Policy
//!
//! - Every read and write goes through the [`EntityStore`].
//! - Operations that touch more than one record commit in a single store
//!   transaction.
//! - Lookups that find nothing return `Ok(None)`.

pub mod accounts;
pub mod config;
pub mod conversations;
pub mod error;
pub mod marketplace;
pub mod model;

pub use accounts::{Accounts, PendingSignup, ProfileUpdate, SignupForm};
pub use config::{ConfigError, MarketConfig};
pub use conversations::{Conversations, InboxEntry};
pub use error::{AuthError, MarketError, SignupError};
pub use marketplace::{Dashboard, Marketplace, ServiceQuery, SortOrder};
pub use model::{
    Bid, Conversation, Message, NewBid, NewService, NewUser, Service, ServicePatch, Transaction,
    User,
};

use dormdash_store::{EntityStore, StoreError};

/// The marketplace: one store, one configuration, three components.
#[derive(Debug)]
pub struct Market {
    store: EntityStore,
    config: MarketConfig,
}

impl Market {
    pub fn new(store: EntityStore, config: MarketConfig) -> Self {
        Self { store, config }
    }

    /// A throwaway marketplace with default settings.
    pub fn in_memory() -> Self {
        Self::new(EntityStore::in_memory(), MarketConfig::default())
    }

    /// A marketplace persisted under `config.data_dir`.
    pub fn open(config: MarketConfig) -> Result<Self, StoreError> {
        let store = EntityStore::open(&config.data_dir)?;
        tracing::debug!(data_dir = %config.data_dir.display(), "store opened");
        Ok(Self::new(store, config))
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn accounts(&self) -> Accounts<'_> {
        Accounts::new(&self.store, &self.config)
    }

    pub fn marketplace(&self) -> Marketplace<'_> {
        Marketplace::new(&self.store)
    }

    pub fn conversations(&self) -> Conversations<'_> {
        Conversations::new(&self.store)
    }
}
