//! # Marketplace Records
//!
//! The six persisted entities, each with its creation draft and, where
//! the record can change after creation, its patch. Records refer to each
//! other only by id.
//!
//! Drafts validate their own fields (non-empty text, positive amounts,
//! distinct parties); the store runs that validation before assigning
//! identity. Patches merge named fields and route status changes through
//! the state machines in `dormdash-state`.

use chrono::NaiveDateTime;
use dormdash_core::{
    Amount, BidId, ConversationId, Email, MessageId, PasswordDigest, ServiceCategory, ServiceId,
    Timestamp, TransactionId, UserId, ValidationError,
};
use dormdash_state::{BidStatus, Lifecycle, ServiceStatus, TransactionStatus};
use dormdash_store::{Draft, Patch, Record};
use serde::{Deserialize, Serialize};

use crate::error::MarketError;

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── User ───────────────────────────────────────────────────────────────

/// A community member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Normalized (lower-case) and unique across users.
    pub email: Email,
    /// Never the plaintext.
    pub password: PasswordDigest,
    /// Signed up with a verified campus email.
    pub edu_verified: bool,
    /// Passed the (mocked) photo-ID check.
    pub id_verified: bool,
    /// Reference to the uploaded ID document, once verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: Timestamp,
}

impl Record for User {
    type Id = UserId;
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &UserId {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Creation payload for [`User`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password: PasswordDigest,
    pub edu_verified: bool,
    pub id_verified: bool,
    pub bio: Option<String>,
}

impl NewUser {
    /// A new, unverified account.
    pub fn new(name: impl Into<String>, email: Email, password: PasswordDigest) -> Self {
        Self {
            name: name.into(),
            email,
            password,
            edu_verified: false,
            id_verified: false,
            bio: None,
        }
    }
}

impl Draft for NewUser {
    type Record = User;

    fn validate(&self) -> Result<(), ValidationError> {
        required(&self.name, "name")
    }

    fn into_record(self, id: UserId, created_at: Timestamp) -> User {
        User {
            id,
            name: self.name.trim().to_string(),
            email: self.email,
            password: self.password,
            edu_verified: self.edu_verified,
            id_verified: self.id_verified,
            id_document: None,
            bio: optional_text(self.bio),
            created_at,
        }
    }
}

/// Partial update of a [`User`].
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    /// An empty bio clears it.
    pub bio: Option<String>,
    pub id_verified: Option<bool>,
    pub id_document: Option<String>,
}

impl Patch<User> for UserPatch {
    type Error = MarketError;

    fn apply(self, user: &mut User) -> Result<(), MarketError> {
        if let Some(name) = self.name {
            required(&name, "name")?;
            user.name = name.trim().to_string();
        }
        if let Some(bio) = self.bio {
            user.bio = optional_text(Some(bio));
        }
        if let Some(document) = self.id_document {
            required(&document, "id_document")?;
            user.id_document = Some(document.trim().to_string());
        }
        if let Some(verified) = self.id_verified {
            user.id_verified = verified;
        }
        Ok(())
    }
}

// ── Service ────────────────────────────────────────────────────────────

/// A listed offer of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub provider_id: UserId,
    pub title: String,
    pub description: String,
    pub category: ServiceCategory,
    /// Listed price; always positive.
    pub price: Amount,
    pub location: String,
    /// When the work takes place, in campus-local wall-clock time.
    pub date_time: NaiveDateTime,
    pub status: ServiceStatus,
    pub created_at: Timestamp,
}

impl Service {
    /// Case-insensitive match of `needle` against title, description and location.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.title, &self.description, &self.location]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl Record for Service {
    type Id = ServiceId;
    const COLLECTION: &'static str = "services";

    fn id(&self) -> &ServiceId {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Creation payload for [`Service`]. New listings start `active`.
#[derive(Debug, Clone)]
pub struct NewService {
    pub provider_id: UserId,
    pub title: String,
    pub description: String,
    pub category: ServiceCategory,
    pub price: Amount,
    pub location: String,
    pub date_time: NaiveDateTime,
}

impl Draft for NewService {
    type Record = Service;

    fn validate(&self) -> Result<(), ValidationError> {
        required(&self.title, "title")?;
        required(&self.description, "description")?;
        required(&self.location, "location")?;
        self.price.ensure_positive("price")?;
        Ok(())
    }

    fn into_record(self, id: ServiceId, created_at: Timestamp) -> Service {
        Service {
            id,
            provider_id: self.provider_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            price: self.price,
            location: self.location.trim().to_string(),
            date_time: self.date_time,
            status: ServiceStatus::Active,
            created_at,
        }
    }
}

/// Partial update of a [`Service`].
///
/// A status change must be a legal move of the service lifecycle.
#[derive(Debug, Clone, Default)]
pub struct ServicePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ServiceCategory>,
    pub price: Option<Amount>,
    pub location: Option<String>,
    pub date_time: Option<NaiveDateTime>,
    pub status: Option<ServiceStatus>,
}

impl ServicePatch {
    /// A patch that only moves the status.
    pub fn status(status: ServiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Patch<Service> for ServicePatch {
    type Error = MarketError;

    fn apply(self, service: &mut Service) -> Result<(), MarketError> {
        if let Some(status) = self.status {
            service.status = service.status.transition(status)?;
        }
        if let Some(title) = self.title {
            required(&title, "title")?;
            service.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            required(&description, "description")?;
            service.description = description.trim().to_string();
        }
        if let Some(location) = self.location {
            required(&location, "location")?;
            service.location = location.trim().to_string();
        }
        if let Some(price) = self.price {
            service.price = price.ensure_positive("price")?;
        }
        if let Some(category) = self.category {
            service.category = category;
        }
        if let Some(date_time) = self.date_time {
            service.date_time = date_time;
        }
        Ok(())
    }
}

// ── Bid ────────────────────────────────────────────────────────────────

/// A counter-offer against a service's listed price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub service_id: ServiceId,
    pub bidder_id: UserId,
    pub amount: Amount,
    /// Optional note to the provider; may be empty.
    pub message: String,
    pub status: BidStatus,
    pub created_at: Timestamp,
}

impl Record for Bid {
    type Id = BidId;
    const COLLECTION: &'static str = "bids";

    fn id(&self) -> &BidId {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Creation payload for [`Bid`]. New bids start `pending`.
#[derive(Debug, Clone)]
pub struct NewBid {
    pub service_id: ServiceId,
    pub bidder_id: UserId,
    pub amount: Amount,
    pub message: String,
}

impl Draft for NewBid {
    type Record = Bid;

    fn validate(&self) -> Result<(), ValidationError> {
        self.amount.ensure_positive("amount")?;
        Ok(())
    }

    fn into_record(self, id: BidId, created_at: Timestamp) -> Bid {
        Bid {
            id,
            service_id: self.service_id,
            bidder_id: self.bidder_id,
            amount: self.amount,
            message: self.message.trim().to_string(),
            status: BidStatus::Pending,
            created_at,
        }
    }
}

/// Settles a bid. Settling to the status it already has is a no-op.
/// Outside this crate, use [`Marketplace::update_bid`](crate::Marketplace::update_bid).
#[derive(Debug, Clone, Copy)]
pub(crate) struct BidPatch {
    pub(crate) status: BidStatus,
}

impl Patch<Bid> for BidPatch {
    type Error = MarketError;

    fn apply(self, bid: &mut Bid) -> Result<(), MarketError> {
        bid.status = bid.status.transition(self.status)?;
        Ok(())
    }
}

// ── Transaction ────────────────────────────────────────────────────────

/// The record of a (mocked) payment for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub service_id: ServiceId,
    pub buyer_id: UserId,
    /// The service's provider at the time of purchase.
    pub seller_id: UserId,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub created_at: Timestamp,
}

impl Transaction {
    /// Whether `user` is the buyer or the seller.
    pub fn involves(&self, user: &UserId) -> bool {
        &self.buyer_id == user || &self.seller_id == user
    }
}

impl Record for Transaction {
    type Id = TransactionId;
    const COLLECTION: &'static str = "transactions";

    fn id(&self) -> &TransactionId {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Creation payload for [`Transaction`].
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub service_id: ServiceId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub amount: Amount,
    pub status: TransactionStatus,
}

impl Draft for NewTransaction {
    type Record = Transaction;

    fn validate(&self) -> Result<(), ValidationError> {
        if self.buyer_id == self.seller_id {
            return Err(ValidationError::SameUser {
                first: "buyer",
                second: "seller",
            });
        }
        self.amount.ensure_positive("amount")?;
        Ok(())
    }

    fn into_record(self, id: TransactionId, created_at: Timestamp) -> Transaction {
        Transaction {
            id,
            service_id: self.service_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            amount: self.amount,
            status: self.status,
            created_at,
        }
    }
}

/// Moves a transaction along its lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct TransactionPatch {
    pub status: TransactionStatus,
}

impl Patch<Transaction> for TransactionPatch {
    type Error = MarketError;

    fn apply(self, tx: &mut Transaction) -> Result<(), MarketError> {
        tx.status = tx.status.transition(self.status)?;
        Ok(())
    }
}

// ── Conversation ───────────────────────────────────────────────────────

/// A message thread between two users about one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Exactly two distinct users, in the order the thread was opened.
    pub participants: [UserId; 2],
    pub service_id: ServiceId,
    pub created_at: Timestamp,
}

impl Conversation {
    /// Whether `user` is one of the two participants.
    pub fn involves(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// Whether this is the thread of `a` and `b` (either order) about `service`.
    pub fn is_thread(&self, a: &UserId, b: &UserId, service: &ServiceId) -> bool {
        &self.service_id == service && self.involves(a) && self.involves(b)
    }

    /// The participant who is not `user`.
    pub fn other_participant(&self, user: &UserId) -> Option<&UserId> {
        match &self.participants {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }
}

impl Record for Conversation {
    type Id = ConversationId;
    const COLLECTION: &'static str = "conversations";

    fn id(&self) -> &ConversationId {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Creation payload for [`Conversation`].
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub participants: [UserId; 2],
    pub service_id: ServiceId,
}

impl Draft for NewConversation {
    type Record = Conversation;

    fn validate(&self) -> Result<(), ValidationError> {
        if self.participants[0] == self.participants[1] {
            return Err(ValidationError::SameUser {
                first: "participant",
                second: "other participant",
            });
        }
        Ok(())
    }

    fn into_record(self, id: ConversationId, created_at: Timestamp) -> Conversation {
        Conversation {
            id,
            participants: self.participants,
            service_id: self.service_id,
            created_at,
        }
    }
}

// ── Message ────────────────────────────────────────────────────────────

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    /// Trimmed, never empty.
    pub text: String,
    pub created_at: Timestamp,
}

impl Record for Message {
    type Id = MessageId;
    const COLLECTION: &'static str = "messages";

    fn id(&self) -> &MessageId {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Creation payload for [`Message`].
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
}

impl Draft for NewMessage {
    type Record = Message;

    fn validate(&self) -> Result<(), ValidationError> {
        required(&self.text, "text")
    }

    fn into_record(self, id: MessageId, created_at: Timestamp) -> Message {
        Message {
            id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            text: self.text.trim().to_string(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn when() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap()
    }

    fn new_service() -> NewService {
        NewService {
            provider_id: UserId::new(),
            title: "  Move my couch ".to_string(),
            description: "Two flights of stairs".to_string(),
            category: ServiceCategory::MovingHelp,
            price: Amount::from_dollars(40),
            location: "Jester West".to_string(),
            date_time: when(),
        }
    }

    fn service() -> Service {
        new_service().into_record(ServiceId::new(), Timestamp::now())
    }

    #[test]
    fn new_service_starts_active_and_trimmed() {
        let s = service();
        assert_eq!(s.status, ServiceStatus::Active);
        assert_eq!(s.title, "Move my couch");
    }

    #[test]
    fn new_service_rejects_blank_fields_and_zero_price() {
        let mut draft = new_service();
        draft.location = " ".to_string();
        assert_eq!(
            draft.validate(),
            Err(ValidationError::Empty { field: "location" })
        );
        let mut draft = new_service();
        draft.price = Amount::ZERO;
        assert_eq!(
            draft.validate(),
            Err(ValidationError::NonPositiveAmount { field: "price" })
        );
    }

    #[test]
    fn service_text_match_is_case_insensitive() {
        let s = service();
        assert!(s.matches_text("COUCH"));
        assert!(s.matches_text("jester"));
        assert!(s.matches_text(""));
        assert!(!s.matches_text("airport"));
    }

    #[test]
    fn service_patch_follows_lifecycle() {
        let mut s = service();
        assert!(ServicePatch::status(ServiceStatus::Completed)
            .apply(&mut s)
            .is_err());
        assert_eq!(s.status, ServiceStatus::Active);
        ServicePatch::status(ServiceStatus::InProgress)
            .apply(&mut s)
            .unwrap();
        ServicePatch::status(ServiceStatus::Completed)
            .apply(&mut s)
            .unwrap();
        assert_eq!(s.status, ServiceStatus::Completed);
    }

    #[test]
    fn service_patch_merges_only_named_fields() {
        let mut s = service();
        let before = s.clone();
        ServicePatch {
            price: Some(Amount::from_dollars(55)),
            ..ServicePatch::default()
        }
        .apply(&mut s)
        .unwrap();
        assert_eq!(s.price, Amount::from_dollars(55));
        assert_eq!(s.title, before.title);
        assert_eq!(s.status, before.status);
    }

    #[test]
    fn bid_patch_is_idempotent_on_settled_bids() {
        let mut bid = NewBid {
            service_id: ServiceId::new(),
            bidder_id: UserId::new(),
            amount: Amount::from_dollars(35),
            message: String::new(),
        }
        .into_record(BidId::new(), Timestamp::now());
        BidPatch {
            status: BidStatus::Rejected,
        }
        .apply(&mut bid)
        .unwrap();
        BidPatch {
            status: BidStatus::Rejected,
        }
        .apply(&mut bid)
        .unwrap();
        assert!(BidPatch {
            status: BidStatus::Accepted
        }
        .apply(&mut bid)
        .is_err());
        assert_eq!(bid.status, BidStatus::Rejected);
    }

    #[test]
    fn transaction_needs_distinct_parties() {
        let user = UserId::new();
        let draft = NewTransaction {
            service_id: ServiceId::new(),
            buyer_id: user.clone(),
            seller_id: user,
            amount: Amount::from_dollars(40),
            status: TransactionStatus::Completed,
        };
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::SameUser { .. })
        ));
    }

    #[test]
    fn conversation_thread_ignores_participant_order() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let service = ServiceId::new();
        let convo = NewConversation {
            participants: [a.clone(), b.clone()],
            service_id: service.clone(),
        }
        .into_record(ConversationId::new(), Timestamp::now());
        assert!(convo.is_thread(&b, &a, &service));
        assert!(!convo.is_thread(&a, &c, &service));
        assert!(!convo.is_thread(&a, &b, &ServiceId::new()));
        assert_eq!(convo.other_participant(&a), Some(&b));
        assert_eq!(convo.other_participant(&c), None);
    }

    #[test]
    fn message_text_is_trimmed_and_required() {
        let draft = NewMessage {
            conversation_id: ConversationId::new(),
            sender_id: UserId::new(),
            text: "  \n ".to_string(),
        };
        assert!(draft.validate().is_err());
        let msg = NewMessage {
            text: "  see you at 5 ".to_string(),
            ..draft
        }
        .into_record(MessageId::new(), Timestamp::now());
        assert_eq!(msg.text, "see you at 5");
    }

    #[test]
    fn user_patch_clears_bio_with_empty_text() {
        let mut user = NewUser {
            bio: Some("Senior, CS".to_string()),
            ..NewUser::new(
                "Bevo",
                Email::new("bevo@utexas.edu").unwrap(),
                PasswordDigest::new("hookem"),
            )
        }
        .into_record(UserId::new(), Timestamp::now());
        assert_eq!(user.bio.as_deref(), Some("Senior, CS"));
        UserPatch {
            bio: Some("   ".to_string()),
            ..UserPatch::default()
        }
        .apply(&mut user)
        .unwrap();
        assert_eq!(user.bio, None);
        assert!(UserPatch {
            name: Some(String::new()),
            ..UserPatch::default()
        }
        .apply(&mut user)
        .is_err());
    }
}
