//! # Account Subcommands
//!
//! `signup`, `login`, `logout`, `whoami`, `profile`, `verify-id` and
//! `dashboard`.
//!
//! Signup runs both steps in one invocation: the form is validated and a
//! code issued, then the code is read from standard input. A wrong code
//! can be retried; the pending signup never leaves the process.

use std::io::BufRead;

use anyhow::{bail, Result};
use clap::Args;

use dormdash_market::{
    AuthError, Market, PendingSignup, ProfileUpdate, SignupError, SignupForm, User,
};

use crate::signed_in;

/// How many codes `signup` accepts before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 3;

/// Arguments for `dormdash signup`.
#[derive(Args, Debug)]
pub struct SignupArgs {
    /// Display name.
    #[arg(long)]
    pub name: String,
    /// Campus email address.
    #[arg(long)]
    pub email: String,
    /// Password.
    #[arg(long)]
    pub password: String,
}

/// Arguments for `dormdash login`.
#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

/// Arguments for `dormdash profile`. Without flags, shows the profile.
#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// New display name.
    #[arg(long)]
    pub name: Option<String>,
    /// New bio. Pass an empty string to clear it.
    #[arg(long)]
    pub bio: Option<String>,
}

/// Arguments for `dormdash verify-id`.
#[derive(Args, Debug)]
pub struct VerifyIdArgs {
    /// Path or reference of the photo-ID upload.
    #[arg(long)]
    pub document: String,
}

/// Execute `dormdash signup`, reading the code from `input`.
pub fn run_signup(args: &SignupArgs, market: &Market, input: &mut impl BufRead) -> Result<u8> {
    let form = SignupForm {
        name: args.name.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
    };
    let pending = match market.accounts().begin_signup(form) {
        Ok(pending) => pending,
        Err(SignupError::InvalidForm(e)) => {
            println!("Cannot sign up: {e}");
            return Ok(1);
        }
        Err(SignupError::EmailTaken(email)) => {
            println!("An account with {email} already exists. Try `dormdash login`.");
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };
    println!("Verification code sent to {}.", pending.email);
    println!("(demo mode: your code is {})", pending.code);
    confirm_code(market, &pending, input)
}

/// Prompt for the code until it matches or attempts run out.
pub fn confirm_code(market: &Market, pending: &PendingSignup, input: &mut impl BufRead) -> Result<u8> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        println!("Enter the 6-digit code:");
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no verification code entered");
        }
        match market.accounts().verify_signup(pending, &line) {
            Ok(user) => {
                println!("Welcome to DormDash, {}! You are signed in.", user.name);
                return Ok(0);
            }
            Err(e) if e.is_retryable() => println!("{e}. Try again."),
            Err(e) => return Err(e.into()),
        }
    }
    println!("Too many incorrect codes. Run `dormdash signup` again for a new code.");
    Ok(1)
}

/// Execute `dormdash login`.
pub fn run_login(args: &LoginArgs, market: &Market) -> Result<u8> {
    match market.accounts().sign_in(&args.email, &args.password) {
        Ok(user) => {
            println!("Signed in as {} <{}>.", user.name, user.email);
            Ok(0)
        }
        Err(AuthError::NotFound) => {
            println!("No account found for {}.", args.email.trim());
            Ok(1)
        }
        Err(AuthError::WrongPassword) => {
            println!("Incorrect password.");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

/// Execute `dormdash logout`.
pub fn run_logout(market: &Market) -> Result<u8> {
    market.accounts().sign_out()?;
    println!("Signed out.");
    Ok(0)
}

/// Execute `dormdash whoami`.
pub fn run_whoami(market: &Market) -> Result<u8> {
    match market.accounts().current_user()? {
        Some(user) => {
            print_user(&user);
            Ok(0)
        }
        None => {
            println!("Not signed in.");
            Ok(1)
        }
    }
}

/// Execute `dormdash profile`.
pub fn run_profile(args: &ProfileArgs, market: &Market) -> Result<u8> {
    let user = signed_in(market)?;
    let user = if args.name.is_some() || args.bio.is_some() {
        let update = ProfileUpdate {
            name: args.name.clone(),
            bio: args.bio.clone(),
        };
        match market.accounts().update_profile(&user.id, update)? {
            Some(updated) => updated,
            None => bail!("account {} no longer exists", user.id),
        }
    } else {
        user
    };
    print_user(&user);
    Ok(0)
}

/// Execute `dormdash verify-id`.
pub fn run_verify_id(args: &VerifyIdArgs, market: &Market) -> Result<u8> {
    let user = signed_in(market)?;
    match market.accounts().verify_identity(&user.id, &args.document)? {
        Some(_) => {
            println!("Photo ID verified.");
            Ok(0)
        }
        None => bail!("account {} no longer exists", user.id),
    }
}

/// Execute `dormdash dashboard`.
pub fn run_dashboard(market: &Market) -> Result<u8> {
    let user = signed_in(market)?;
    let dash = market.marketplace().dashboard(&user.id)?;
    println!("Dashboard for {}", user.name);
    println!(
        "  Active listings: {}   Pending bids: {}   Purchases: {}   Earned: {}",
        dash.active_listings(),
        dash.pending_bids(),
        dash.purchases.len(),
        dash.total_earned()
    );
    println!("\nMy listings ({}):", dash.listings.len());
    for s in &dash.listings {
        println!("  {}  [{}] {}  {}", s.id, s.status, s.price, s.title);
    }
    println!("\nMy bids ({}):", dash.bids.len());
    for b in &dash.bids {
        println!("  {}  [{}] {}  service {}", b.id, b.status, b.amount, b.service_id);
    }
    println!("\nPurchases ({}), spent {}:", dash.purchases.len(), dash.total_spent());
    for t in &dash.purchases {
        println!("  {}  [{}] {}  service {}", t.id, t.status, t.amount, t.service_id);
    }
    println!("\nEarnings ({}), earned {}:", dash.earnings.len(), dash.total_earned());
    for t in &dash.earnings {
        println!("  {}  [{}] {}  service {}", t.id, t.status, t.amount, t.service_id);
    }
    Ok(0)
}

fn print_user(user: &User) {
    println!("{} <{}>", user.name, user.email);
    println!("  id:       {}", user.id);
    println!(
        "  verified: edu {}, photo ID {}",
        yes_no(user.edu_verified),
        yes_no(user.id_verified)
    );
    if let Some(bio) = &user.bio {
        println!("  bio:      {bio}");
    }
    println!("  joined:   {}", user.created_at);
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn signup_args(email: &str) -> SignupArgs {
        SignupArgs {
            name: "Jane Longhorn".to_string(),
            email: email.to_string(),
            password: "hookem123".to_string(),
        }
    }

    fn pending(market: &Market) -> PendingSignup {
        market
            .accounts()
            .begin_signup(SignupForm {
                name: "Jane Longhorn".to_string(),
                email: "jane@utexas.edu".to_string(),
                password: "hookem123".to_string(),
            })
            .unwrap()
    }

    fn wrong(code: &str) -> &'static str {
        if code == "123456" {
            "654321\n"
        } else {
            "123456\n"
        }
    }

    #[test]
    fn code_retry_then_success() {
        let market = Market::in_memory();
        let pending = pending(&market);
        let typed = format!("{}{}\n", wrong(&pending.code), pending.code);
        let code = confirm_code(&market, &pending, &mut Cursor::new(typed)).unwrap();
        assert_eq!(code, 0);
        let user = market.accounts().current_user().unwrap().unwrap();
        assert_eq!(user.email.as_str(), "jane@utexas.edu");
    }

    #[test]
    fn attempts_run_out() {
        let market = Market::in_memory();
        let pending = pending(&market);
        let typed = wrong(&pending.code).repeat(MAX_CODE_ATTEMPTS);
        let code = confirm_code(&market, &pending, &mut Cursor::new(typed)).unwrap();
        assert_eq!(code, 1);
        assert!(market.accounts().users().unwrap().is_empty());
        assert_eq!(
            market.accounts().pending_code(&pending.email).unwrap(),
            Some(pending.code.clone())
        );
    }

    #[test]
    fn end_of_input_is_an_error() {
        let market = Market::in_memory();
        let pending = pending(&market);
        assert!(confirm_code(&market, &pending, &mut Cursor::new("")).is_err());
    }

    #[test]
    fn signup_rejects_off_campus_email() {
        let market = Market::in_memory();
        let code = run_signup(
            &signup_args("jane@gmail.com"),
            &market,
            &mut Cursor::new(""),
        )
        .unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn login_reports_failures_with_exit_code() {
        let market = Market::in_memory();
        let pending = pending(&market);
        market
            .accounts()
            .verify_signup(&pending, &pending.code)
            .unwrap();
        run_logout(&market).unwrap();
        assert_eq!(run_whoami(&market).unwrap(), 1);

        let bad = LoginArgs {
            email: "jane@utexas.edu".to_string(),
            password: "wrong-password".to_string(),
        };
        assert_eq!(run_login(&bad, &market).unwrap(), 1);
        let unknown = LoginArgs {
            email: "nobody@utexas.edu".to_string(),
            password: "hookem123".to_string(),
        };
        assert_eq!(run_login(&unknown, &market).unwrap(), 1);
        let good = LoginArgs {
            email: "jane@utexas.edu".to_string(),
            password: "hookem123".to_string(),
        };
        assert_eq!(run_login(&good, &market).unwrap(), 0);
        assert_eq!(run_whoami(&market).unwrap(), 0);
    }

    #[test]
    fn profile_commands_require_sign_in() {
        let market = Market::in_memory();
        let args = ProfileArgs {
            name: None,
            bio: Some("hi".to_string()),
        };
        assert!(run_profile(&args, &market).is_err());
        assert!(run_dashboard(&market).is_err());
    }

    #[test]
    fn profile_and_id_updates_apply_to_current_user() {
        let market = Market::in_memory();
        let pending = pending(&market);
        market
            .accounts()
            .verify_signup(&pending, &pending.code)
            .unwrap();
        let args = ProfileArgs {
            name: Some("Jane L.".to_string()),
            bio: Some("Senior, ECE".to_string()),
        };
        assert_eq!(run_profile(&args, &market).unwrap(), 0);
        let verify = VerifyIdArgs {
            document: "ids/jane.png".to_string(),
        };
        assert_eq!(run_verify_id(&verify, &market).unwrap(), 0);
        let user: User = signed_in(&market).unwrap();
        assert_eq!(user.name, "Jane L.");
        assert_eq!(user.bio.as_deref(), Some("Senior, ECE"));
        assert!(user.id_verified);
        assert_eq!(run_dashboard(&market).unwrap(), 0);
    }
}
