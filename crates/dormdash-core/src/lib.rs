//! # dormdash-core: Foundational Types for DormDash
//!
//! The leaf crate of the workspace. Every other `dormdash-*` crate depends
//! on it; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `UserId`, `ServiceId`, `BidId`,
//!    `TransactionId`, `ConversationId`, `MessageId` are distinct types.
//!    Relationships between records are by id, and the compiler keeps the
//!    namespaces apart.
//!
//! 2. **Validated constructors.** `Email`, `Amount` and the schedule parser
//!    reject malformed input with a typed [`ValidationError`] instead of
//!    leaving validation to whatever screen collected the value.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is always UTC with millisecond
//!    precision, so creation order is stable enough for message threads.
//!
//! 4. **Passwords never stored in plaintext.** [`PasswordDigest`] is a
//!    salted SHA-256 digest compared in constant time.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dormdash-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod domain;
pub mod email;
pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use digest::PasswordDigest;
pub use domain::{ServiceCategory, SERVICE_CATEGORY_COUNT};
pub use email::Email;
pub use error::ValidationError;
pub use identity::{
    BidId, ConversationId, Identifier, MessageId, ServiceId, TransactionId, UserId,
};
pub use money::Amount;
pub use temporal::{parse_schedule, Timestamp};
