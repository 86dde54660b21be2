//! # Demo Data
//!
//! `dormdash seed` fills an empty marketplace with two members and six
//! listings. Users are only added when there are none; listings likewise.
//! Everything goes through the regular operations, so the seeded data
//! obeys the same validation as user input.

use anyhow::{Context, Result};

use dormdash_core::{parse_schedule, Amount, Email, PasswordDigest, ServiceCategory};
use dormdash_market::{Market, NewService, NewUser};

/// Password of both demo accounts.
pub const DEMO_PASSWORD: &str = "password123";

struct DemoUser {
    name: &'static str,
    email: &'static str,
    id_verified: bool,
    bio: &'static str,
}

struct DemoService {
    provider_email: &'static str,
    title: &'static str,
    description: &'static str,
    category: ServiceCategory,
    dollars: u64,
    location: &'static str,
    when: &'static str,
}

const SARAH: &str = "sarah.chen@utexas.edu";
const MARCUS: &str = "marcus.j@utexas.edu";

const DEMO_USERS: [DemoUser; 2] = [
    DemoUser {
        name: "Sarah Chen",
        email: SARAH,
        id_verified: true,
        bio: "Junior studying Computer Science. Always happy to help fellow Longhorns!",
    },
    DemoUser {
        name: "Marcus Johnson",
        email: MARCUS,
        id_verified: false,
        bio: "Sophomore in Business. Offering rides and cleaning services on weekends.",
    },
];

const DEMO_SERVICES: [DemoService; 6] = [
    DemoService {
        provider_email: SARAH,
        title: "Help Moving Into Jester Dorm",
        description: "Need help carrying boxes and furniture up to my room in Jester West. \
                      I have about 10 boxes and a small desk. Should take about 2 hours.",
        category: ServiceCategory::MovingHelp,
        dollars: 40,
        location: "Jester West, UT Austin",
        when: "2026-03-01T10:00:00",
    },
    DemoService {
        provider_email: MARCUS,
        title: "Airport Ride to ABIA",
        description: "Need a ride from campus to Austin-Bergstrom International Airport. \
                      I have two suitcases. Flexible on exact time.",
        category: ServiceCategory::AirportRides,
        dollars: 25,
        location: "UT Austin Campus → ABIA Airport",
        when: "2026-03-05T14:00:00",
    },
    DemoService {
        provider_email: SARAH,
        title: "Calculus II Tutoring",
        description: "Offering tutoring for M 408D (Calculus II). I got an A in the class \
                      and can help with integration techniques, series, and more.",
        category: ServiceCategory::Tutoring,
        dollars: 30,
        location: "PCL (Perry-Castañeda Library)",
        when: "2026-02-28T16:00:00",
    },
    DemoService {
        provider_email: MARCUS,
        title: "Apartment Deep Clean",
        description: "Professional-quality deep cleaning for apartments near campus. \
                      Includes kitchen, bathroom, floors, and surfaces. Supplies included.",
        category: ServiceCategory::Cleaning,
        dollars: 75,
        location: "West Campus Area",
        when: "2026-03-10T09:00:00",
    },
    DemoService {
        provider_email: SARAH,
        title: "Grocery Run from H-E-B",
        description: "I'll pick up your groceries from the H-E-B on Hancock. Send me your \
                      list and I'll deliver to your dorm or apartment.",
        category: ServiceCategory::Errands,
        dollars: 15,
        location: "H-E-B Hancock Center → Campus",
        when: "2026-02-25T11:00:00",
    },
    DemoService {
        provider_email: MARCUS,
        title: "CS 314 Data Structures Help",
        description: "Tutoring for CS 314. Can help with linked lists, trees, graphs, \
                      sorting algorithms, and Big-O analysis. Bring your assignments!",
        category: ServiceCategory::Tutoring,
        dollars: 35,
        location: "GDC (Gates Dell Complex)",
        when: "2026-03-02T13:00:00",
    },
];

/// What a seeding run added.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub services: usize,
}

/// Add the demo data that is missing.
pub fn seed(market: &Market) -> Result<SeedReport> {
    let accounts = market.accounts();
    let mut report = SeedReport::default();

    if accounts.users()?.is_empty() {
        for demo in &DEMO_USERS {
            let mut draft = NewUser::new(
                demo.name,
                Email::new(demo.email)?,
                PasswordDigest::new(DEMO_PASSWORD),
            );
            draft.edu_verified = true;
            draft.bio = Some(demo.bio.to_string());
            let user = accounts.create_user(draft)?;
            if demo.id_verified {
                accounts.verify_identity(&user.id, "seed/photo-id")?;
            }
            report.users += 1;
        }
    }

    if market.marketplace().services()?.is_empty() {
        for demo in &DEMO_SERVICES {
            let Some(provider) = accounts.user_by_email(demo.provider_email)? else {
                tracing::warn!(email = demo.provider_email, title = demo.title, "demo provider missing, listing skipped");
                continue;
            };
            market
                .marketplace()
                .create_service(NewService {
                    provider_id: provider.id,
                    title: demo.title.to_string(),
                    description: demo.description.to_string(),
                    category: demo.category,
                    price: Amount::from_dollars(demo.dollars),
                    location: demo.location.to_string(),
                    date_time: parse_schedule(demo.when)?,
                })
                .with_context(|| format!("seeding \"{}\"", demo.title))?;
            report.services += 1;
        }
    }

    tracing::info!(users = report.users, services = report.services, "demo data seeded");
    Ok(report)
}

/// Execute `dormdash seed`.
pub fn run_seed(market: &Market) -> Result<u8> {
    let report = seed(market)?;
    if report == SeedReport::default() {
        println!("Marketplace already has data; nothing seeded.");
    } else {
        println!(
            "Seeded {} user(s) and {} service(s). Demo password: {DEMO_PASSWORD}",
            report.users, report.services
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dormdash_market::ServiceQuery;

    #[test]
    fn seeds_once() {
        let market = Market::in_memory();
        assert_eq!(
            seed(&market).unwrap(),
            SeedReport {
                users: 2,
                services: 6
            }
        );
        assert_eq!(seed(&market).unwrap(), SeedReport::default());
        assert_eq!(market.accounts().users().unwrap().len(), 2);
        assert_eq!(market.marketplace().services().unwrap().len(), 6);
    }

    #[test]
    fn demo_accounts_can_sign_in() {
        let market = Market::in_memory();
        seed(&market).unwrap();
        let sarah = market.accounts().sign_in(SARAH, DEMO_PASSWORD).unwrap();
        assert!(sarah.edu_verified && sarah.id_verified);
        let marcus = market.accounts().sign_in(MARCUS, DEMO_PASSWORD).unwrap();
        assert!(!marcus.id_verified);
        assert_eq!(
            market
                .marketplace()
                .services_by_provider(&marcus.id)
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn tutoring_filter_finds_both_listings() {
        let market = Market::in_memory();
        seed(&market).unwrap();
        let found = market
            .marketplace()
            .browse(&ServiceQuery {
                category: Some(ServiceCategory::Tutoring),
                ..ServiceQuery::default()
            })
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn existing_users_are_left_alone() {
        let market = Market::in_memory();
        crate::testing::member(&market, "Jane", "jane@utexas.edu");
        let report = seed(&market).unwrap();
        assert_eq!(report, SeedReport::default());
        assert_eq!(market.accounts().users().unwrap().len(), 1);
    }
}
