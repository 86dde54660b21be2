//! # Message Subcommands
//!
//! `dormdash message open | send | list | inbox`. Threads are keyed by the
//! two participants and the service they are about; opening or sending
//! never creates a duplicate thread.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use dormdash_core::{ConversationId, ServiceId, UserId};
use dormdash_market::{Conversation, Market, User};

use crate::{display_name, existing_service, signed_in};

/// Arguments for `dormdash message`.
#[derive(Args, Debug)]
pub struct MessageArgs {
    #[command(subcommand)]
    pub command: MessageCommand,
}

#[derive(Subcommand, Debug)]
pub enum MessageCommand {
    /// Open (or find) the thread about a service and print its id.
    Open {
        service: ServiceId,
        /// The other participant. Defaults to the provider; required when
        /// you are the provider.
        #[arg(long)]
        to: Option<UserId>,
    },
    /// Send a message in the thread about a service.
    Send {
        service: ServiceId,
        text: String,
        #[arg(long)]
        to: Option<UserId>,
    },
    /// Print a thread, oldest message first.
    List { conversation: ConversationId },
    /// Your threads, newest first, with the latest message of each.
    Inbox,
}

/// Execute `dormdash message`.
pub fn run_message(args: &MessageArgs, market: &Market) -> Result<u8> {
    let me = signed_in(market)?;
    match &args.command {
        MessageCommand::Open { service, to } => {
            let convo = thread(market, &me, service, to.as_ref())?;
            println!("Conversation {}", convo.id);
            Ok(0)
        }
        MessageCommand::Send { service, text, to } => {
            let convo = thread(market, &me, service, to.as_ref())?;
            let message = market
                .conversations()
                .post_message(&convo.id, &me.id, text)?
                .with_context(|| format!("conversation {} disappeared", convo.id))?;
            println!("Sent ({}) in conversation {}.", message.id, convo.id);
            Ok(0)
        }
        MessageCommand::List { conversation } => {
            let convo = market
                .conversations()
                .conversation(conversation)?
                .with_context(|| format!("no conversation with id {conversation}"))?;
            if !convo.involves(&me.id) {
                bail!("you are not part of conversation {conversation}");
            }
            let messages = market.conversations().list_messages(conversation)?;
            if messages.is_empty() {
                println!("No messages yet.");
            }
            for message in &messages {
                println!(
                    "[{}] {}: {}",
                    message.created_at,
                    display_name(market, &message.sender_id),
                    message.text
                );
            }
            Ok(0)
        }
        MessageCommand::Inbox => {
            let inbox = market.conversations().inbox(&me.id)?;
            if inbox.is_empty() {
                println!("No conversations.");
            }
            for entry in &inbox {
                let other = entry
                    .conversation
                    .other_participant(&me.id)
                    .map(|id| display_name(market, id))
                    .unwrap_or_default();
                let about = match market.marketplace().service(&entry.conversation.service_id)? {
                    Some(service) => service.title,
                    None => entry.conversation.service_id.to_string(),
                };
                println!("{}  with {} about \"{}\"", entry.conversation.id, other, about);
                if let Some(last) = &entry.last_message {
                    println!("    {}: {}", display_name(market, &last.sender_id), last.text);
                }
            }
            Ok(0)
        }
    }
}

/// The thread between `me` and the counterpart on `service`.
fn thread(
    market: &Market,
    me: &User,
    service: &ServiceId,
    to: Option<&UserId>,
) -> Result<Conversation> {
    let listing = existing_service(market, service)?;
    let other = match to {
        Some(id) => id.clone(),
        None if listing.provider_id == me.id => {
            bail!("you provide \"{}\"; pass --to to pick who to message", listing.title)
        }
        None => listing.provider_id.clone(),
    };
    if market.accounts().user(&other)?.is_none() {
        bail!("no user with id {other}");
    }
    Ok(market
        .conversations()
        .get_or_create_conversation(&me.id, &other, service)?)
}
