//! # Bid Subcommands
//!
//! `dormdash bid place | accept | reject | list`. Accepting or rejecting is
//! reserved for the provider of the bid's service.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use dormdash_core::{Amount, BidId, ServiceId};
use dormdash_market::{Bid, Market, NewBid};

use crate::{display_name, existing_service, signed_in};

/// Arguments for `dormdash bid`.
#[derive(Args, Debug)]
pub struct BidArgs {
    #[command(subcommand)]
    pub command: BidCommand,
}

#[derive(Subcommand, Debug)]
pub enum BidCommand {
    /// Offer an amount for an active service.
    Place {
        service: ServiceId,
        /// Offer in dollars.
        #[arg(long)]
        amount: Amount,
        /// Note to the provider.
        #[arg(long, default_value = "")]
        message: String,
    },
    /// Accept a bid on one of your services; its other bids are rejected.
    Accept { bid: BidId },
    /// Reject a bid on one of your services.
    Reject { bid: BidId },
    /// Bids on one of your services, or the bids you placed.
    List {
        #[arg(long)]
        service: Option<ServiceId>,
    },
}

/// Execute `dormdash bid`.
pub fn run_bid(args: &BidArgs, market: &Market) -> Result<u8> {
    let me = signed_in(market)?;
    match &args.command {
        BidCommand::Place {
            service,
            amount,
            message,
        } => {
            let bid = market.marketplace().place_bid(NewBid {
                service_id: service.clone(),
                bidder_id: me.id,
                amount: *amount,
                message: message.clone(),
            })?;
            println!("Bid of {} placed ({}).", bid.amount, bid.id);
            Ok(0)
        }
        BidCommand::Accept { bid } => {
            ensure_provider_of(market, bid, &me.id)?;
            let accepted = market
                .marketplace()
                .accept_bid(bid)?
                .with_context(|| format!("no bid with id {bid}"))?;
            println!(
                "Accepted {} from {}.",
                accepted.amount,
                display_name(market, &accepted.bidder_id)
            );
            Ok(0)
        }
        BidCommand::Reject { bid } => {
            ensure_provider_of(market, bid, &me.id)?;
            let rejected = market
                .marketplace()
                .reject_bid(bid)?
                .with_context(|| format!("no bid with id {bid}"))?;
            println!("Rejected bid {}.", rejected.id);
            Ok(0)
        }
        BidCommand::List { service } => {
            let bids = match service {
                Some(id) => {
                    let listing = existing_service(market, id)?;
                    if listing.provider_id != me.id {
                        bail!("only the provider can see the bids on \"{}\"", listing.title);
                    }
                    market.marketplace().bids_for_service(id)?
                }
                None => market.marketplace().bids_by_bidder(&me.id)?,
            };
            if bids.is_empty() {
                println!("No bids.");
            }
            for bid in &bids {
                print_bid(market, bid);
            }
            Ok(0)
        }
    }
}

fn ensure_provider_of(market: &Market, bid: &BidId, user: &dormdash_core::UserId) -> Result<()> {
    let found = market
        .marketplace()
        .bid(bid)?
        .with_context(|| format!("no bid with id {bid}"))?;
    let service = existing_service(market, &found.service_id)?;
    if &service.provider_id != user {
        bail!("only the provider of \"{}\" can decide on its bids", service.title);
    }
    Ok(())
}

fn print_bid(market: &Market, bid: &Bid) {
    println!(
        "{}  [{}] {}  by {}  on service {}",
        bid.id,
        bid.status,
        bid.amount,
        display_name(market, &bid.bidder_id),
        bid.service_id
    );
    if !bid.message.is_empty() {
        println!("    \"{}\"", bid.message);
    }
}
