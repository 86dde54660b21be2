//! # Record Identifiers
//!
//! Newtype wrappers for the identifier of every persisted record. You
//! cannot pass a `BidId` where a `ServiceId` is expected, which is the
//! whole point: records refer to each other by id only, never by
//! ownership, so the id type is the relationship.
//!
//! All identifiers are random v4 UUIDs, always valid by construction.
//! Parsing from user input goes through [`std::str::FromStr`] and fails
//! with [`ValidationError::InvalidId`].

use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Common behavior of record identifiers.
///
/// The entity store uses this to mint fresh ids on creation.
pub trait Identifier:
    Clone + Eq + Hash + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
    /// Short lowercase name of the identifier namespace (`user`, `bid`, ...).
    const KIND: &'static str;

    /// Mint a fresh random identifier.
    fn generate() -> Self;
}

macro_rules! record_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Identifier for $name {
            const KIND: &'static str = $kind;

            fn generate() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

record_id!(
    /// Identifier of a community member.
    UserId,
    "user"
);

record_id!(
    /// Identifier of a listed service.
    ServiceId,
    "service"
);

record_id!(
    /// Identifier of a bid against a service.
    BidId,
    "bid"
);

record_id!(
    /// Identifier of a recorded purchase.
    TransactionId,
    "transaction"
);

record_id!(
    /// Identifier of a two-party message thread.
    ConversationId,
    "conversation"
);

record_id!(
    /// Identifier of a single message in a thread.
    MessageId,
    "message"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = UserId::generate();
        let b = UserId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn display_and_parse_round_trip() {
        let id = ServiceId::new();
        let parsed: ServiceId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = BidId::new();
        let parsed: BidId = format!("  {id}\n").parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage_with_kind() {
        let err = "demo-user-1".parse::<UserId>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidId {
                kind: "user",
                value: "demo-user-1".to_string(),
            }
        );
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = Uuid::new_v4();
        let id = ConversationId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
