//! # Service Subcommands
//!
//! `dormdash service create | list | show | complete | cancel | buy`.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use dormdash_core::{parse_schedule, Amount, ServiceCategory, ServiceId};
use dormdash_market::marketplace::parse_category_filter;
use dormdash_market::{Market, NewService, Service, ServiceQuery, SortOrder};

use crate::{display_name, existing_service, signed_in};

/// Arguments for `dormdash service`.
#[derive(Args, Debug)]
pub struct ServiceArgs {
    #[command(subcommand)]
    pub command: ServiceCommand,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// List a new service as the signed-in user.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// One of: moving-help, airport-rides, tutoring, cleaning, errands, other.
        #[arg(long)]
        category: ServiceCategory,
        /// Price in dollars, e.g. `40` or `12.50`.
        #[arg(long)]
        price: Amount,
        #[arg(long)]
        location: String,
        /// Local date and time, `YYYY-MM-DDTHH:MM`.
        #[arg(long)]
        when: String,
    },
    /// Browse active services.
    List {
        /// Case-insensitive text to look for in titles and descriptions.
        #[arg(long)]
        search: Option<String>,
        /// Category filter; `all` for none.
        #[arg(long, default_value = "all")]
        category: String,
        /// newest, price-low or price-high.
        #[arg(long, default_value_t = SortOrder::Newest)]
        sort: SortOrder,
        /// Show the signed-in user's own listings in every status instead.
        #[arg(long)]
        mine: bool,
    },
    /// Show one service, with its bids when you are the provider.
    Show { id: ServiceId },
    /// Mark an in-progress service completed (provider only).
    Complete { id: ServiceId },
    /// Cancel an in-progress service (provider only).
    Cancel { id: ServiceId },
    /// Buy an active service at its listed price.
    Buy { id: ServiceId },
}

/// Execute `dormdash service`.
pub fn run_service(args: &ServiceArgs, market: &Market) -> Result<u8> {
    match &args.command {
        ServiceCommand::Create {
            title,
            description,
            category,
            price,
            location,
            when,
        } => {
            let provider = signed_in(market)?;
            let date_time = parse_schedule(when)?;
            let service = market.marketplace().create_service(NewService {
                provider_id: provider.id,
                title: title.clone(),
                description: description.clone(),
                category: *category,
                price: *price,
                location: location.clone(),
                date_time,
            })?;
            println!("Listed \"{}\" for {} ({})", service.title, service.price, service.id);
            Ok(0)
        }
        ServiceCommand::List {
            search,
            category,
            sort,
            mine,
        } => {
            let services = if *mine {
                let me = signed_in(market)?;
                market.marketplace().services_by_provider(&me.id)?
            } else {
                let query = ServiceQuery {
                    search: search.clone(),
                    category: parse_category_filter(category)?,
                    sort: *sort,
                };
                market.marketplace().browse(&query)?
            };
            if services.is_empty() {
                println!("No services found.");
                return Ok(0);
            }
            for service in &services {
                print_summary(market, service);
            }
            println!("{} service(s)", services.len());
            Ok(0)
        }
        ServiceCommand::Show { id } => {
            let service = existing_service(market, id)?;
            print_detail(market, &service);
            let viewer = market.accounts().current_user()?;
            if viewer.is_some_and(|u| u.id == service.provider_id) {
                let bids = market.marketplace().bids_for_service(&service.id)?;
                println!("\nBids ({}):", bids.len());
                for bid in &bids {
                    println!(
                        "  {}  [{}] {} from {}",
                        bid.id,
                        bid.status,
                        bid.amount,
                        display_name(market, &bid.bidder_id)
                    );
                    if !bid.message.is_empty() {
                        println!("      \"{}\"", bid.message);
                    }
                }
            }
            Ok(0)
        }
        ServiceCommand::Complete { id } => {
            own_service(market, id)?;
            let service = market
                .marketplace()
                .complete_service(id)?
                .with_context(|| format!("no service with id {id}"))?;
            println!("\"{}\" is now {}.", service.title, service.status);
            Ok(0)
        }
        ServiceCommand::Cancel { id } => {
            own_service(market, id)?;
            let service = market
                .marketplace()
                .cancel_service(id)?
                .with_context(|| format!("no service with id {id}"))?;
            println!("\"{}\" is now {}.", service.title, service.status);
            Ok(0)
        }
        ServiceCommand::Buy { id } => {
            let buyer = signed_in(market)?;
            let tx = market
                .marketplace()
                .buy_now(id, &buyer.id)?
                .with_context(|| format!("no service with id {id}"))?;
            println!("Purchased for {} (transaction {}).", tx.amount, tx.id);
            Ok(0)
        }
    }
}

/// The service, if the signed-in user provides it.
fn own_service(market: &Market, id: &ServiceId) -> Result<Service> {
    let me = signed_in(market)?;
    let service = existing_service(market, id)?;
    if service.provider_id != me.id {
        bail!("only the provider can change the status of \"{}\"", service.title);
    }
    Ok(service)
}

fn print_summary(market: &Market, service: &Service) {
    println!(
        "{}  {}  {}  [{}] {}  by {}",
        service.id,
        service.price,
        service.title,
        service.category,
        service.status,
        display_name(market, &service.provider_id)
    );
}

fn print_detail(market: &Market, service: &Service) {
    println!("{}", service.title);
    println!("  id:        {}", service.id);
    println!("  provider:  {}", display_name(market, &service.provider_id));
    println!("  category:  {}", service.category);
    println!("  price:     {}", service.price);
    println!("  where:     {}", service.location);
    println!("  when:      {}", service.date_time.format("%Y-%m-%d %H:%M"));
    println!("  status:    {}", service.status);
    println!("  listed:    {}", service.created_at);
    println!();
    println!("{}", service.description);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::member;
    use dormdash_state::ServiceStatus;

    fn create(title: &str, price: u64) -> ServiceArgs {
        ServiceArgs {
            command: ServiceCommand::Create {
                title: title.to_string(),
                description: "Two hours of help".to_string(),
                category: ServiceCategory::MovingHelp,
                price: Amount::from_dollars(price),
                location: "Jester West".to_string(),
                when: "2026-03-01T10:00".to_string(),
            },
        }
    }

    fn on(command: ServiceCommand) -> ServiceArgs {
        ServiceArgs { command }
    }

    #[test]
    fn create_requires_sign_in() {
        let market = Market::in_memory();
        assert!(run_service(&create("Move boxes", 40), &market).is_err());
    }

    #[test]
    fn create_then_list_and_show() {
        let market = Market::in_memory();
        let sarah = member(&market, "Sarah", "sarah@utexas.edu");
        assert_eq!(run_service(&create("Move boxes", 40), &market).unwrap(), 0);
        let listed = market.marketplace().services_by_provider(&sarah.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].price, Amount::from_dollars(40));

        let list = on(ServiceCommand::List {
            search: Some("BOXES".to_string()),
            category: "moving-help".to_string(),
            sort: SortOrder::PriceLow,
            mine: false,
        });
        assert_eq!(run_service(&list, &market).unwrap(), 0);
        let show = on(ServiceCommand::Show {
            id: listed[0].id.clone(),
        });
        assert_eq!(run_service(&show, &market).unwrap(), 0);
        assert!(run_service(
            &on(ServiceCommand::Show {
                id: ServiceId::new()
            }),
            &market
        )
        .is_err());
    }

    #[test]
    fn bad_category_filter_is_an_error() {
        let market = Market::in_memory();
        let list = on(ServiceCommand::List {
            search: None,
            category: "juggling".to_string(),
            sort: SortOrder::Newest,
            mine: false,
        });
        assert!(run_service(&list, &market).is_err());
    }

    #[test]
    fn buy_then_provider_completes() {
        let market = Market::in_memory();
        let sarah = member(&market, "Sarah", "sarah@utexas.edu");
        run_service(&create("Move boxes", 40), &market).unwrap();
        let id = market.marketplace().services_by_provider(&sarah.id).unwrap()[0]
            .id
            .clone();

        member(&market, "Marcus", "marcus@utexas.edu");
        assert_eq!(
            run_service(&on(ServiceCommand::Buy { id: id.clone() }), &market).unwrap(),
            0
        );
        assert!(run_service(&on(ServiceCommand::Complete { id: id.clone() }), &market).is_err());

        market.accounts().set_session(&sarah.id).unwrap();
        assert_eq!(
            run_service(&on(ServiceCommand::Complete { id: id.clone() }), &market).unwrap(),
            0
        );
        let service = market.marketplace().service(&id).unwrap().unwrap();
        assert_eq!(service.status, ServiceStatus::Completed);
        assert!(run_service(&on(ServiceCommand::Cancel { id }), &market).is_err());
    }

    #[test]
    fn provider_cannot_buy_own_listing() {
        let market = Market::in_memory();
        let sarah = member(&market, "Sarah", "sarah@utexas.edu");
        run_service(&create("Move boxes", 40), &market).unwrap();
        let id = market.marketplace().services_by_provider(&sarah.id).unwrap()[0]
            .id
            .clone();
        assert!(run_service(&on(ServiceCommand::Buy { id }), &market).is_err());
    }
}
