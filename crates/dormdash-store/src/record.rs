//! # Record Traits
//!
//! What the store needs to know about a record type: its collection name,
//! its id, and its creation time. Creation and partial update go through
//! [`Draft`] and [`Patch`], so the store can assign identity and the
//! record types keep their own validation.

use dormdash_core::{Identifier, Timestamp, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// A persisted record.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier type.
    type Id: Identifier + Serialize + DeserializeOwned;

    /// Name of the collection holding records of this type.
    const COLLECTION: &'static str;

    /// The record's id.
    fn id(&self) -> &Self::Id;

    /// When the record was created.
    fn created_at(&self) -> Timestamp;
}

/// A creation payload: a record minus its id and creation time.
pub trait Draft {
    /// The record this draft becomes.
    type Record: Record;

    /// Field-level validation, run by the store before anything is written.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Assemble the record from the payload and the store-assigned identity.
    fn into_record(self, id: <Self::Record as Record>::Id, created_at: Timestamp) -> Self::Record;
}

/// A partial update: named fields merged over a stored record.
///
/// `apply` sees the current record and may refuse the change (for
/// example, an invalid status transition); a refused patch leaves the
/// record untouched.
pub trait Patch<T: Record> {
    /// Why a patch can be refused. Must absorb storage failures.
    type Error: From<StoreError>;

    /// Merge the patch into `record`.
    fn apply(self, record: &mut T) -> Result<(), Self::Error>;
}
