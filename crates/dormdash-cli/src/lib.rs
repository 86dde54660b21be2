//! # dormdash-cli: Command-Line Front End
//!
//! Provides the `dormdash` command, driving every marketplace operation
//! against a file-backed store in the configured data directory. The
//! signed-in user persists between invocations through the store's
//! session pointer.
//!
//! ## Subcommands
//!
//! - `dormdash signup | login | logout | whoami`: accounts and session.
//! - `dormdash profile | verify-id | dashboard`: the signed-in user's page.
//! - `dormdash service ...`: list, browse, buy, and close out services.
//! - `dormdash bid ...`: place, accept, reject and list bids.
//! - `dormdash message ...`: threads and messages.
//! - `dormdash seed`: demo users and listings, only into an empty store.
//!
//! ```bash
//! dormdash seed
//! dormdash login --email sarah.chen@utexas.edu --password password123
//! dormdash service list --category tutoring --sort price-low
//! ```

pub mod account;
pub mod bid;
pub mod message;
pub mod seed;
pub mod service;

use anyhow::{Context, Result};
use dormdash_market::{Market, Service, User};

/// The signed-in user, or an error telling the caller to log in.
pub fn signed_in(market: &Market) -> Result<User> {
    market
        .accounts()
        .current_user()?
        .context("not signed in (run `dormdash login` first)")
}

/// A service that must exist.
pub fn existing_service(market: &Market, id: &dormdash_core::ServiceId) -> Result<Service> {
    market
        .marketplace()
        .service(id)?
        .with_context(|| format!("no service with id {id}"))
}

/// Display name of a user id, falling back to the id itself.
pub fn display_name(market: &Market, id: &dormdash_core::UserId) -> String {
    match market.accounts().user(id) {
        Ok(Some(user)) => user.name,
        _ => id.to_string(),
    }
}
