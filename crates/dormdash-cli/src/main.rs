//! # dormdash CLI entry point
//!
//! Parses command-line arguments, loads configuration, opens the store and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dormdash_cli::account::{
    run_dashboard, run_login, run_logout, run_profile, run_signup, run_verify_id, run_whoami,
    LoginArgs, ProfileArgs, SignupArgs, VerifyIdArgs,
};
use dormdash_cli::bid::{run_bid, BidArgs};
use dormdash_cli::message::{run_message, MessageArgs};
use dormdash_cli::seed::run_seed;
use dormdash_cli::service::{run_service, ServiceArgs};
use dormdash_market::{Market, MarketConfig};

/// DormDash: a campus marketplace for odd jobs and favors.
///
/// Sign up with a campus email, list services, bid on or buy what others
/// offer, and message providers. Data lives in a local directory.
#[derive(Parser, Debug)]
#[command(name = "dormdash", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overriding configuration and environment.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account; a verification code is requested interactively.
    Signup(SignupArgs),
    /// Sign in with email and password.
    Login(LoginArgs),
    /// Sign out.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Show or edit your profile.
    Profile(ProfileArgs),
    /// Submit a photo ID for verification.
    VerifyId(VerifyIdArgs),
    /// Your listings, bids, purchases and earnings.
    Dashboard,
    /// Create, browse, buy and close out services.
    Service(ServiceArgs),
    /// Place, accept, reject and list bids.
    Bid(BidArgs),
    /// Conversations with other members.
    Message(MessageArgs),
    /// Load demo users and listings into an empty marketplace.
    Seed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut config = MarketConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(?config, "configuration loaded");
    let market = Market::open(config).context("opening the marketplace data directory")?;

    match cli.command {
        Commands::Signup(args) => run_signup(&args, &market, &mut std::io::stdin().lock()),
        Commands::Login(args) => run_login(&args, &market),
        Commands::Logout => run_logout(&market),
        Commands::Whoami => run_whoami(&market),
        Commands::Profile(args) => run_profile(&args, &market),
        Commands::VerifyId(args) => run_verify_id(&args, &market),
        Commands::Dashboard => run_dashboard(&market),
        Commands::Service(args) => run_service(&args, &market),
        Commands::Bid(args) => run_bid(&args, &market),
        Commands::Message(args) => run_message(&args, &market),
        Commands::Seed => run_seed(&market),
    }
}
